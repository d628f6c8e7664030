use crate::component::Component;
use crate::config::{Environment, ServiceConfig};
use crate::di::{Container, ServiceFactory, TagBuilder};
use crate::error::Result;
use crate::service::Service;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::env;

/// Builder for a fully configured container
///
/// Collects context values, per-service configuration and descriptors, then
/// tags and registers everything in one go.
///
/// # Example
/// ```
/// use meshwire::{Arguments, ContainerBuilder, Service};
/// use meshwire::config::ServiceConfig;
///
/// let container = ContainerBuilder::new()
///     .context("env", "prod")
///     .context("TIMEOUT", 30)
///     .configure("Mailer", ServiceConfig::new().with_argument("host", "smtp.local"))
///     .service(Service::new("Mailer", |args: &Arguments| args.value::<String>("host"))
///         .with_dependencies(vec![meshwire::Dependency::scalar("host")]))
///     .build()
///     .unwrap();
///
/// assert_eq!(container.env("@_TIMEOUT"), Some(30.into()));
/// assert!(container.has("Mailer"));
/// ```
#[derive(Default)]
pub struct ContainerBuilder {
    context: Map<String, Value>,
    active_environment: Option<String>,
    configs: HashMap<String, ServiceConfig>,
    services: Vec<Service>,
    tags: TagBuilder,
}

impl ContainerBuilder {
    /// Create a new container builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a context value, registered as the environment variable `@_<key>`
    pub fn context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Add every variable of the current process to the context
    pub fn context_from_process(mut self) -> Self {
        for (key, value) in env::vars() {
            self.context.entry(key).or_insert(Value::String(value));
        }
        self
    }

    /// Environment used to filter services. Defaults to the `env` context value.
    pub fn active_environment(mut self, name: impl Into<String>) -> Self {
        self.active_environment = Some(name.into());
        self
    }

    /// Configure the service registered under `id`; earlier configuration wins
    pub fn configure(mut self, id: impl Into<String>, config: ServiceConfig) -> Self {
        match self.configs.entry(id.into()) {
            Entry::Occupied(mut existing) => existing.get_mut().merge(config),
            Entry::Vacant(slot) => {
                slot.insert(config);
            }
        }
        self
    }

    pub fn component<T: Component>(mut self) -> Self {
        self.services.push(Service::of::<T>());
        self
    }

    pub fn component_with<T: Component>(self, config: ServiceConfig) -> Self {
        self.configure(T::identifier(), config).component::<T>()
    }

    pub fn service(mut self, service: Service) -> Self {
        self.services.push(service);
        self
    }

    /// Build the container
    pub fn build(self) -> Result<Container> {
        let container = Container::with_tag_builder(self.tags);

        for (key, value) in &self.context {
            container.set_env(&Environment::key(key), value.clone())?;
        }

        let active = self.active_environment.or_else(|| {
            self.context
                .get("env")
                .and_then(Value::as_str)
                .map(String::from)
        });

        let factory = ServiceFactory::new(self.tags, self.configs);
        for service in self.services {
            let id = service.identifier().to_string();
            if let Some(config) = factory.config(&id) {
                if !config.accepts(active.as_deref()) {
                    tracing::warn!(
                        "Skipping service {}: not enabled for environment {:?}",
                        id,
                        active
                    );
                    continue;
                }
            }
            container.register(id, factory.create(service));
        }

        tracing::debug!("Container built with {} services", container.len());
        Ok(container)
    }
}
