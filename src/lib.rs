//! # Meshwire
//!
//! A runtime service registry and dependency resolver.
//!
//! Components describe their constructor parameters and the interfaces they
//! implement; the container wires them together on demand, keeps one instance
//! per service and answers multi-binding lookups by tag, ordered by priority.
//!
//! ## Features
//!
//! - **Singletons**: every descriptor is built at most once, even under concurrent first access
//! - **Interface injection**: `Arc<dyn Trait>` parameters resolve to the highest priority implementor
//! - **Tags**: `#tag` lookups return every tagged service, highest priority first
//! - **Environment**: `_name` parameters read `@_NAME` from the environment namespace
//! - **Subscribers**: restricted views over the services a component subscribed to
//!
//! ## Quick Start
//!
//! ```rust
//! use meshwire::prelude::*;
//!
//! pub trait Logger: Send + Sync {
//!     fn log(&self, message: &str) -> String;
//! }
//! meshwire::interface!(Logger => "LoggerInterface");
//!
//! #[derive(Component)]
//! #[component(id = "ConsoleLogger", implements(Logger))]
//! pub struct ConsoleLogger;
//!
//! impl Logger for ConsoleLogger {
//!     fn log(&self, message: &str) -> String {
//!         format!("[console] {message}")
//!     }
//! }
//!
//! #[derive(Component)]
//! #[component(id = "Notifier")]
//! pub struct Notifier {
//!     logger: Arc<dyn Logger>,
//!     #[component(default = 30)]
//!     _timeout: u64,
//! }
//!
//! let container = ContainerBuilder::new()
//!     .component::<ConsoleLogger>()
//!     .component::<Notifier>()
//!     .build()
//!     .unwrap();
//!
//! let notifier = container.resolve::<Notifier>().unwrap();
//! assert_eq!(notifier._timeout, 30);
//! assert_eq!(notifier.logger.log("ready"), "[console] ready");
//! ```

pub mod component;
pub mod config;
pub mod di;
pub mod error;
pub mod service;
pub mod subscriber;

// Re-export core types
pub use component::{Capability, Component, Interface};
pub use di::{
    Container, ContainerBuilder, Entry, Instanciator, ServiceFactory, ServiceLocator,
    ServiceStack, TagBuilder,
};
pub use error::{Result, WireError};
pub use service::{
    Argument, Arguments, DeclaredType, Dependency, DependencyKind, Instance, Marker, Service,
    ServiceTag, TagOption,
};
pub use subscriber::Subscriber;

// Re-export the derive macro next to the trait it implements
pub use meshwire_macro::Component;

// Used by the derive macro for default values
pub use serde_json;

/// Prelude module for convenient imports
///
/// ```
/// use meshwire::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{ServiceConfig, TagConfig};
    pub use crate::di::{Container, ContainerBuilder, ServiceLocator, ServiceStack, TagBuilder};
    pub use crate::error::{Result, WireError};
    pub use crate::service::{Arguments, Dependency, Instance, Service, ServiceTag, TagOption};
    pub use crate::subscriber::Subscriber;
    pub use crate::{Capability, Component, Interface};
    pub use std::sync::Arc;
}
