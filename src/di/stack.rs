use crate::component::{Component, Interface};
use crate::di::lookup::{Query, select_tagged};
use crate::di::{Entry, Instanciator, ServiceLocator};
use crate::error::{Result, WireError};
use crate::service::{Instance, Service};
use std::fmt;
use std::sync::Arc;

/// Read-only view over the services a subscriber asked for
///
/// Answers the same lookups as the container, restricted to its own
/// descriptors. Environment lookups are not part of the view.
#[derive(Clone)]
pub struct ServiceStack {
    instanciator: Arc<Instanciator>,
    services: Arc<[Arc<Service>]>,
}

impl ServiceStack {
    pub(crate) fn new(instanciator: Arc<Instanciator>, services: Vec<Arc<Service>>) -> Self {
        Self {
            instanciator,
            services: Arc::from(services),
        }
    }

    pub fn get(&self, id: &str) -> Result<Entry> {
        match Query::parse(id) {
            Query::AllServices => Ok(Entry::Descriptors(self.services.to_vec())),
            Query::Tag { name, targeted } => {
                let selected = select_tagged(self.services.iter(), name)?;
                if targeted {
                    return Ok(Entry::Descriptors(selected));
                }
                selected
                    .iter()
                    .map(|service| self.instanciator.instanciate(service))
                    .collect::<Result<Vec<_>>>()
                    .map(Entry::Instances)
            }
            Query::Identifier { id: identifier, targeted } => {
                let service = self
                    .find(identifier)
                    .ok_or_else(|| WireError::service_not_found(identifier))?;
                if targeted {
                    return Ok(Entry::Descriptor(service.clone()));
                }
                self.instanciator.instanciate(service).map(Entry::Instance)
            }
            Query::Environment(_) | Query::AllEnvironment => Err(WireError::service_not_found(id)),
        }
    }

    pub fn has(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    fn find(&self, id: &str) -> Option<&Arc<Service>> {
        self.services.iter().find(|service| service.identifier() == id)
    }

    /// Descriptors of the view, in subscription order
    pub fn services(&self) -> &[Arc<Service>] {
        &self.services
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Every service of the view, built if needed
    pub fn instances(&self) -> Result<Vec<Instance>> {
        self.services
            .iter()
            .map(|service| self.instanciator.instanciate(service))
            .collect()
    }

    pub fn resolve<T: Component>(&self) -> Result<Arc<T>> {
        let instance = self.get(T::identifier())?.into_instance()?;
        instance.downcast::<T>().ok_or_else(|| {
            WireError::data_type(format!(
                "Service {} is not a {}",
                instance.identifier(),
                std::any::type_name::<T>()
            ))
        })
    }

    /// Every service of the view implementing `I`
    pub fn all<I: ?Sized + Interface + Send + Sync>(&self) -> Result<Vec<Arc<I>>> {
        Ok(self
            .instances()?
            .iter()
            .filter_map(Instance::cast::<I>)
            .collect())
    }
}

impl ServiceLocator for ServiceStack {
    fn get(&self, id: &str) -> Result<Entry> {
        ServiceStack::get(self, id)
    }

    fn has(&self, id: &str) -> bool {
        ServiceStack::has(self, id)
    }
}

impl fmt::Debug for ServiceStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.services.iter().map(|service| service.identifier()))
            .finish()
    }
}
