use crate::error::{Result, WireError};
use crate::service::{Instance, Service};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Result of a container lookup; its shape depends on the query
#[derive(Debug, Clone)]
pub enum Entry {
    /// `@_NAME`; `None` when the variable is not set
    Environment(Option<Value>),
    /// `@all_env`
    Environments(Map<String, Value>),
    Instance(Instance),
    Instances(Vec<Instance>),
    /// Targeted plain identifier
    Descriptor(Arc<Service>),
    /// Targeted tag query or `@all_services`
    Descriptors(Vec<Arc<Service>>),
}

impl Entry {
    fn kind(&self) -> &'static str {
        match self {
            Self::Environment(_) => "environment value",
            Self::Environments(_) => "environment",
            Self::Instance(_) => "instance",
            Self::Instances(_) => "instance list",
            Self::Descriptor(_) => "descriptor",
            Self::Descriptors(_) => "descriptor list",
        }
    }

    fn mismatch(&self, expected: &str) -> WireError {
        WireError::data_type(format!("Expected {}, lookup returned {}", expected, self.kind()))
    }

    pub fn into_instance(self) -> Result<Instance> {
        match self {
            Self::Instance(instance) => Ok(instance),
            other => Err(other.mismatch("an instance")),
        }
    }

    /// Every instance of the entry; a single instance gives a list of one
    pub fn into_instances(self) -> Result<Vec<Instance>> {
        match self {
            Self::Instance(instance) => Ok(vec![instance]),
            Self::Instances(instances) => Ok(instances),
            other => Err(other.mismatch("instances")),
        }
    }

    pub fn into_descriptor(self) -> Result<Arc<Service>> {
        match self {
            Self::Descriptor(service) => Ok(service),
            other => Err(other.mismatch("a descriptor")),
        }
    }

    /// Every descriptor of the entry; a single descriptor gives a list of one
    pub fn into_descriptors(self) -> Result<Vec<Arc<Service>>> {
        match self {
            Self::Descriptor(service) => Ok(vec![service]),
            Self::Descriptors(services) => Ok(services),
            other => Err(other.mismatch("descriptors")),
        }
    }

    pub fn into_env(self) -> Result<Option<Value>> {
        match self {
            Self::Environment(value) => Ok(value),
            other => Err(other.mismatch("an environment value")),
        }
    }

    pub fn into_environments(self) -> Result<Map<String, Value>> {
        match self {
            Self::Environments(values) => Ok(values),
            other => Err(other.mismatch("the environment")),
        }
    }
}
