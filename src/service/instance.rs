use crate::component::{Capability, Interface};
use crate::di::TagBuilder;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A materialized component
///
/// Cheap to clone; every clone points to the same singleton.
#[derive(Clone)]
pub struct Instance {
    identifier: Arc<str>,
    value: Arc<dyn Any + Send + Sync>,
    capabilities: Arc<[Capability]>,
}

impl Instance {
    pub(crate) fn new(
        identifier: &str,
        value: Arc<dyn Any + Send + Sync>,
        capabilities: Arc<[Capability]>,
    ) -> Self {
        Self {
            identifier: Arc::from(identifier),
            value,
            capabilities,
        }
    }

    /// Identifier of the descriptor that produced this instance
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.value.clone().downcast::<T>().ok()
    }

    /// View this instance through one of its declared interfaces
    pub fn cast<I: ?Sized + Interface + Send + Sync>(&self) -> Option<Arc<I>> {
        self.capabilities
            .iter()
            .find_map(|capability| capability.cast::<I>(&self.value))
    }

    /// Structural interface check over the declared capabilities.
    ///
    /// Names match exactly or through their tag form, so `LoggerInterface`
    /// and `Logger` designate the same interface.
    pub fn implements(&self, interface: &str) -> bool {
        implements(&self.capabilities, interface)
    }

    pub fn capabilities(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.capabilities.iter().map(Capability::name)
    }

    pub(crate) fn value(&self) -> Arc<dyn Any + Send + Sync> {
        self.value.clone()
    }

    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

pub(crate) fn implements(capabilities: &[Capability], interface: &str) -> bool {
    let wanted = TagBuilder::interface_name(interface);
    capabilities.iter().any(|capability| {
        capability.name() == interface || TagBuilder::interface_name(capability.name()) == wanted
    })
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("identifier", &self.identifier)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}
