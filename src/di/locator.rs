use crate::di::Entry;
use crate::error::Result;
use crate::service::Instance;

/// Lookup contract shared by the container and subscriber stacks
pub trait ServiceLocator: Send + Sync {
    fn get(&self, id: &str) -> Result<Entry>;

    /// Whether `id` names a registered descriptor
    fn has(&self, id: &str) -> bool;

    fn instance(&self, id: &str) -> Result<Instance> {
        self.get(id)?.into_instance()
    }
}
