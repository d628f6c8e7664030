use crate::component::Interface;
use crate::di::{Container, ServiceLocator, ServiceStack};
use crate::error::{Result, WireError};
use crate::service::Instance;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// One resolved constructor argument
#[derive(Clone)]
pub enum Argument {
    /// Scalar, environment value, default or null
    Value(Value),
    Service(Instance),
    Container(Container),
    Stack(ServiceStack),
}

impl Argument {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Value(Value::Null))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Self::Service(instance) => Some(instance),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Value(_) => "value",
            Self::Service(_) => "service",
            Self::Container(_) => "container",
            Self::Stack(_) => "service stack",
        }
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Service(instance) => f.debug_tuple("Service").field(instance).finish(),
            Self::Container(container) => f.debug_tuple("Container").field(container).finish(),
            Self::Stack(stack) => f.debug_tuple("Stack").field(stack).finish(),
        }
    }
}

/// Resolved arguments handed to a constructor, in parameter order
///
/// Accessors look arguments up by parameter name and convert them to the
/// type the constructor expects.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    service: String,
    entries: Vec<(String, Argument)>,
}

impl Arguments {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, argument: Argument) {
        self.entries.push((name.into(), argument));
    }

    pub fn with(mut self, name: impl Into<String>, argument: Argument) -> Self {
        self.push(name, argument);
        self
    }

    /// Identifier of the service being constructed
    pub fn identifier(&self) -> &str {
        &self.service
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Argument)> {
        self.entries
            .iter()
            .map(|(name, argument)| (name.as_str(), argument))
    }

    pub fn get(&self, name: &str) -> Option<&Argument> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, argument)| argument)
    }

    fn require(&self, name: &str) -> Result<&Argument> {
        self.get(name)
            .ok_or_else(|| WireError::argument_not_found(name, &self.service))
    }

    fn mismatch(&self, name: &str, expected: &str, found: &Argument) -> WireError {
        WireError::data_type(format!(
            "Argument {} of {} is a {}, expected {}",
            name,
            self.service,
            found.kind(),
            expected
        ))
    }

    /// Deserialize a value argument
    pub fn value<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        match self.require(name)? {
            Argument::Value(value) => serde_json::from_value(value.clone()).map_err(|e| {
                WireError::data_type(format!(
                    "Argument {} of {} has the wrong shape: {}",
                    name, self.service, e
                ))
            }),
            other => Err(self.mismatch(name, "value", other)),
        }
    }

    /// Like [`value`](Self::value), with null mapped to `None`
    pub fn optional_value<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        match self.require(name)? {
            Argument::Value(Value::Null) => Ok(None),
            _ => self.value(name).map(Some),
        }
    }

    pub fn instance(&self, name: &str) -> Result<Instance> {
        match self.require(name)? {
            Argument::Service(instance) => Ok(instance.clone()),
            other => Err(self.mismatch(name, "service", other)),
        }
    }

    pub fn optional_instance(&self, name: &str) -> Result<Option<Instance>> {
        match self.require(name)? {
            argument if argument.is_null() => Ok(None),
            _ => self.instance(name).map(Some),
        }
    }

    pub fn service<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
        let instance = self.instance(name)?;
        instance.downcast::<T>().ok_or_else(|| {
            WireError::data_type(format!(
                "Argument {} of {} is {}, not {}",
                name,
                self.service,
                instance.identifier(),
                std::any::type_name::<T>()
            ))
        })
    }

    pub fn optional_service<T: Any + Send + Sync>(&self, name: &str) -> Result<Option<Arc<T>>> {
        match self.require(name)? {
            argument if argument.is_null() => Ok(None),
            _ => self.service(name).map(Some),
        }
    }

    pub fn interface<I: ?Sized + Interface + Send + Sync>(&self, name: &str) -> Result<Arc<I>> {
        let instance = self.instance(name)?;
        instance.cast::<I>().ok_or_else(|| {
            WireError::data_type(format!(
                "Argument {} of {} is {}, which does not implement {}",
                name,
                self.service,
                instance.identifier(),
                I::NAME
            ))
        })
    }

    pub fn optional_interface<I: ?Sized + Interface + Send + Sync>(
        &self,
        name: &str,
    ) -> Result<Option<Arc<I>>> {
        match self.require(name)? {
            argument if argument.is_null() => Ok(None),
            _ => self.interface(name).map(Some),
        }
    }

    pub fn container(&self, name: &str) -> Result<Container> {
        match self.require(name)? {
            Argument::Container(container) => Ok(container.clone()),
            other => Err(self.mismatch(name, "container", other)),
        }
    }

    pub fn optional_container(&self, name: &str) -> Result<Option<Container>> {
        match self.require(name)? {
            argument if argument.is_null() => Ok(None),
            _ => self.container(name).map(Some),
        }
    }

    pub fn stack(&self, name: &str) -> Result<ServiceStack> {
        match self.require(name)? {
            Argument::Stack(stack) => Ok(stack.clone()),
            other => Err(self.mismatch(name, "service stack", other)),
        }
    }

    pub fn optional_stack(&self, name: &str) -> Result<Option<ServiceStack>> {
        match self.require(name)? {
            argument if argument.is_null() => Ok(None),
            _ => self.stack(name).map(Some),
        }
    }

    /// Either container-shaped argument, behind the lookup contract
    pub fn locator(&self, name: &str) -> Result<Arc<dyn ServiceLocator>> {
        match self.require(name)? {
            Argument::Container(container) => Ok(Arc::new(container.clone())),
            Argument::Stack(stack) => Ok(Arc::new(stack.clone())),
            other => Err(self.mismatch(name, "container", other)),
        }
    }

    pub fn optional_locator(&self, name: &str) -> Result<Option<Arc<dyn ServiceLocator>>> {
        match self.require(name)? {
            argument if argument.is_null() => Ok(None),
            _ => self.locator(name).map(Some),
        }
    }
}
