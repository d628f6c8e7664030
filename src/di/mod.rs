mod builder;
mod container;
mod entry;
mod factory;
mod guard;
mod instanciator;
mod locator;
mod lookup;
mod stack;
mod tag_builder;

pub use builder::ContainerBuilder;
pub use container::Container;
pub use entry::Entry;
pub use factory::{SUBSCRIBER_TAG, ServiceFactory};
pub use instanciator::Instanciator;
pub use locator::ServiceLocator;
pub use stack::ServiceStack;
pub use tag_builder::TagBuilder;
