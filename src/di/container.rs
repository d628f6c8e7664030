use crate::component::{Component, Interface};
use crate::config::Environment;
use crate::di::lookup::{Query, priority_of, select_tagged, select_tagged_all};
use crate::di::{Entry, Instanciator, ServiceLocator, TagBuilder};
use crate::error::{Result, WireError};
use crate::service::{Instance, Marker, Service, TagOption};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as Slot;
use serde_json::Value;
use std::cmp::Reverse;
use std::fmt;
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

struct Registration {
    position: u64,
    service: Arc<Service>,
}

pub(crate) struct Registry {
    services: DashMap<String, Registration>,
    env: Environment,
    instanciator: Arc<Instanciator>,
    sequence: AtomicU64,
}

/// Thread-safe service registry with lookup by identifier, tag or environment name.
///
/// Cloning is cheap and every clone shares the same registry.
///
/// # Example
/// ```
/// use meshwire::{ContainerBuilder, Service};
///
/// let container = ContainerBuilder::new()
///     .context("LOCALE", "fr")
///     .service(Service::from_instance("Greeting", String::from("hello")))
///     .build()
///     .unwrap();
///
/// let greeting = container.get("Greeting").unwrap().into_instance().unwrap();
/// assert_eq!(*greeting.downcast::<String>().unwrap(), "hello");
/// assert_eq!(container.env("@_LOCALE"), Some("fr".into()));
/// ```
///
/// The environment is written while the container is built and read-only
/// afterwards:
///
/// ```compile_fail
/// let container = meshwire::Container::new();
/// container.set_env("@_LOCALE", "en").unwrap();
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<Registry>,
}

impl Container {
    pub fn new() -> Self {
        Self::with_tag_builder(TagBuilder::new())
    }

    /// Container owning a fresh instanciator bound to it
    pub(crate) fn with_tag_builder(tags: TagBuilder) -> Self {
        let inner = Arc::new_cyclic(|registry: &Weak<Registry>| Registry {
            services: DashMap::new(),
            env: Environment::new(),
            instanciator: Arc::new(Instanciator::bound(tags, registry.clone())),
            sequence: AtomicU64::new(0),
        });
        Self { inner }
    }

    /// Container building its services through `instanciator`.
    ///
    /// An instanciator serves a single container: one still bound to a live
    /// container is rejected with [`WireError::AlreadyBound`].
    pub fn with_instanciator(instanciator: Arc<Instanciator>) -> Result<Self> {
        let inner = Arc::new(Registry {
            services: DashMap::new(),
            env: Environment::new(),
            instanciator,
            sequence: AtomicU64::new(0),
        });
        inner.instanciator.bind(&inner)?;
        Ok(Self { inner })
    }

    pub(crate) fn from_registry(inner: Arc<Registry>) -> Self {
        Self { inner }
    }

    pub(crate) fn registry(&self) -> &Arc<Registry> {
        &self.inner
    }

    /// Register `service` under `id`. A replaced descriptor keeps its position.
    pub fn register(&self, id: impl Into<String>, service: Service) -> Arc<Service> {
        let id = id.into();
        let service = Arc::new(service);
        tracing::debug!("Registering service: {}", id);

        match self.inner.services.entry(id) {
            Slot::Occupied(mut slot) => {
                slot.get_mut().service = service.clone();
            }
            Slot::Vacant(slot) => {
                let position = self.inner.sequence.fetch_add(1, Ordering::Relaxed);
                slot.insert(Registration {
                    position,
                    service: service.clone(),
                });
            }
        }
        service
    }

    /// Write an environment value; `name` must carry the `@_` prefix
    pub(crate) fn set_env(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        if !name.starts_with(Marker::Environment.as_str()) {
            return Err(WireError::data_type(format!(
                "Environment variable {} must start with {}",
                name,
                Marker::Environment
            )));
        }
        self.inner.env.set(name, value);
        Ok(())
    }

    pub fn env(&self, name: &str) -> Option<Value> {
        self.inner.env.get(name)
    }

    pub fn environment(&self) -> &Environment {
        &self.inner.env
    }

    /// Look up `id` following the container grammar.
    ///
    /// `@_NAME` reads the environment, `@all_services` and `@all_env` list
    /// everything, `#tag` selects by tag, anything else is an identifier.
    /// `@service_of_` asks for descriptors instead of instances.
    pub fn get(&self, id: &str) -> Result<Entry> {
        match Query::parse(id) {
            Query::Environment(key) => Ok(Entry::Environment(self.inner.env.get(key))),
            Query::AllServices => Ok(Entry::Descriptors(self.services())),
            Query::AllEnvironment => Ok(Entry::Environments(self.inner.env.snapshot())),
            Query::Tag { name, targeted } => {
                let selected = select_tagged(&self.services(), name)?;
                self.deliver(selected, targeted)
            }
            Query::Identifier { id, targeted } => {
                let service = self
                    .descriptor(id)
                    .ok_or_else(|| WireError::service_not_found(id))?;
                if targeted {
                    return Ok(Entry::Descriptor(service));
                }
                self.inner
                    .instanciator
                    .instanciate(&service)
                    .map(Entry::Instance)
            }
        }
    }

    /// Services carrying every tag of `tags`, by priority of the first tag.
    ///
    /// Descriptors when `targeted`, instances otherwise. No tags selects
    /// every service.
    pub fn get_by_tags(&self, tags: &[&str], targeted: bool) -> Result<Entry> {
        let selected = select_tagged_all(&self.services(), tags)?;
        self.deliver(selected, targeted)
    }

    /// Services implementing every interface of `interfaces`, by priority of
    /// the first interface tag
    pub fn get_by_interfaces(&self, interfaces: &[&str], targeted: bool) -> Result<Entry> {
        let first = interfaces.first().map(|name| TagBuilder::interface_name(name));

        let mut selected = Vec::new();
        for service in self.services() {
            if !interfaces.iter().all(|name| service.implements(name)) {
                continue;
            }
            let priority = match &first {
                Some(tag) => priority_of(&service, tag)?,
                None => 0,
            };
            selected.push((Reverse(priority), service));
        }
        selected.sort_by_key(|(priority, _)| *priority);

        let selected = selected.into_iter().map(|(_, service)| service).collect();
        self.deliver(selected, targeted)
    }

    fn deliver(&self, selected: Vec<Arc<Service>>, targeted: bool) -> Result<Entry> {
        if targeted {
            return Ok(Entry::Descriptors(selected));
        }
        selected
            .iter()
            .map(|service| self.inner.instanciator.instanciate(service))
            .collect::<Result<Vec<_>>>()
            .map(Entry::Instances)
    }

    /// Whether a descriptor is registered under the plain identifier `id`
    pub fn has(&self, id: &str) -> bool {
        self.inner.services.contains_key(id)
    }

    pub fn descriptor(&self, id: &str) -> Option<Arc<Service>> {
        self.inner
            .services
            .get(id)
            .map(|registration| registration.service.clone())
    }

    /// Every descriptor, in registration order
    pub fn services(&self) -> Vec<Arc<Service>> {
        let mut registrations: Vec<(u64, Arc<Service>)> = self
            .inner
            .services
            .iter()
            .map(|entry| (entry.position, entry.service.clone()))
            .collect();
        registrations.sort_by_key(|(position, _)| *position);
        registrations.into_iter().map(|(_, service)| service).collect()
    }

    pub fn identifiers(&self) -> Vec<String> {
        let mut identifiers: Vec<(u64, String)> = self
            .inner
            .services
            .iter()
            .map(|entry| (entry.position, entry.key().clone()))
            .collect();
        identifiers.sort_by_key(|(position, _)| *position);
        identifiers.into_iter().map(|(_, id)| id).collect()
    }

    pub fn instanciator(&self) -> Arc<Instanciator> {
        self.inner.instanciator.clone()
    }

    pub fn instance_of(&self, id: &str) -> Result<Instance> {
        self.get(id)?.into_instance()
    }

    /// Singleton of the component `T`
    pub fn resolve<T: Component>(&self) -> Result<Arc<T>> {
        let instance = self.instance_of(T::identifier())?;
        instance.downcast::<T>().ok_or_else(|| {
            WireError::data_type(format!(
                "Service {} is not a {}",
                instance.identifier(),
                std::any::type_name::<T>()
            ))
        })
    }

    /// The implementation of `I` an interface-typed parameter would receive
    pub fn resolve_interface<I: ?Sized + Interface + Send + Sync>(&self) -> Result<Arc<I>> {
        let tag = TagBuilder::interface_name(I::NAME);
        let query = TagBuilder::new().query(&tag, &[TagOption::ServiceTargeted]);
        let candidates = self.get(&query)?.into_descriptors()?;
        let service = Instanciator::pick_candidate(&candidates, &tag)?
            .ok_or_else(|| WireError::class_not_found(I::NAME))?;

        let instance = self.inner.instanciator.instanciate(service)?;
        cast::<I>(&instance)
    }

    /// Every instance tagged `tag`, viewed as `I`
    pub fn tagged<I: ?Sized + Interface + Send + Sync>(&self, tag: &str) -> Result<Vec<Arc<I>>> {
        let query = TagBuilder::new().query(tag, &[]);
        self.get(&query)?
            .into_instances()?
            .iter()
            .map(cast::<I>)
            .collect()
    }

    /// Every instance carrying all of `tags`, viewed as `I`
    pub fn tagged_all<I: ?Sized + Interface + Send + Sync>(
        &self,
        tags: &[&str],
    ) -> Result<Vec<Arc<I>>> {
        self.get_by_tags(tags, false)?
            .into_instances()?
            .iter()
            .map(cast::<I>)
            .collect()
    }

    /// Every implementor of `I`, by priority
    pub fn all<I: ?Sized + Interface + Send + Sync>(&self) -> Result<Vec<Arc<I>>> {
        self.tagged::<I>(&TagBuilder::interface_name(I::NAME))
    }

    pub fn len(&self) -> usize {
        self.inner.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.services.is_empty()
    }
}

fn cast<I: ?Sized + Interface + Send + Sync>(instance: &Instance) -> Result<Arc<I>> {
    instance.cast::<I>().ok_or_else(|| {
        WireError::data_type(format!(
            "Service {} does not implement {}",
            instance.identifier(),
            I::NAME
        ))
    })
}

impl ServiceLocator for Container {
    fn get(&self, id: &str) -> Result<Entry> {
        Container::get(self, id)
    }

    fn has(&self, id: &str) -> bool {
        Container::has(self, id)
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("services", &self.identifiers())
            .field("environment", &self.inner.env.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{Arguments, Dependency, ServiceTag};
    use serde_json::json;

    trait Handler: Send + Sync {
        fn name(&self) -> &'static str;
    }
    crate::interface!(Handler => "HandlerInterface");

    struct Named(&'static str);

    impl Handler for Named {
        fn name(&self) -> &'static str {
            self.0
        }
    }

    fn handler(container: &Container, id: &'static str, priority: Option<i64>) {
        let tag = match priority {
            Some(priority) => ServiceTag::new("handler").with_priority(priority),
            None => ServiceTag::new("handler"),
        };
        container.register(
            id,
            Service::new(id, move |_: &Arguments| Ok(Named(id)))
                .with_capabilities(vec![crate::capability!(dyn Handler => Named)])
                .with_tag(tag),
        );
    }

    #[test]
    fn tag_queries_follow_priority() {
        let container = Container::new();
        handler(&container, "A", None);
        handler(&container, "B", Some(2));
        handler(&container, "C", Some(0));

        let names: Vec<_> = container
            .all::<dyn Handler>()
            .unwrap()
            .iter()
            .map(|handler| handler.name())
            .collect();
        assert_eq!(names, ["B", "A", "C"]);

        let descriptors = container
            .get("@service_of_#handler")
            .unwrap()
            .into_descriptors()
            .unwrap();
        assert_eq!(descriptors.len(), 3);
        assert!(descriptors.iter().all(|service| service.is_materialized()));
    }

    trait Audited: Send + Sync {}
    crate::interface!(Audited);

    impl Audited for Named {}

    fn audited(container: &Container, id: &'static str, priority: i64) {
        container.register(
            id,
            Service::new(id, move |_: &Arguments| Ok(Named(id)))
                .with_capabilities(vec![
                    crate::capability!(dyn Handler => Named),
                    crate::capability!(dyn Audited => Named),
                ])
                .with_tag(ServiceTag::new("handler").with_priority(priority))
                .with_tag(ServiceTag::new("audited")),
        );
    }

    #[test]
    fn multi_tag_lookups_intersect() {
        let container = Container::new();
        handler(&container, "Plain", Some(9));
        audited(&container, "Low", 0);
        audited(&container, "High", 4);

        let names: Vec<_> = container
            .tagged_all::<dyn Handler>(&["handler", "audited"])
            .unwrap()
            .iter()
            .map(|handler| handler.name())
            .collect();
        assert_eq!(names, ["High", "Low"]);

        let descriptors = container
            .get_by_tags(&["audited"], true)
            .unwrap()
            .into_descriptors()
            .unwrap();
        assert_eq!(descriptors.len(), 2);
        assert!(descriptors.iter().all(|service| !service.is_materialized()));
        assert!(container
            .get_by_tags(&["audited", "missing"], false)
            .unwrap()
            .into_instances()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn multi_interface_lookups_intersect() {
        let container = Container::new();
        handler(&container, "Plain", Some(9));
        audited(&container, "Low", 0);
        audited(&container, "High", 4);

        let descriptors = container
            .get_by_interfaces(&["HandlerInterface", "Audited"], true)
            .unwrap()
            .into_descriptors()
            .unwrap();
        let ids: Vec<_> = descriptors.iter().map(|service| service.identifier()).collect();
        assert_eq!(ids, ["High", "Low"]);

        let handlers = container
            .get_by_interfaces(&["HandlerInterface"], false)
            .unwrap()
            .into_instances()
            .unwrap();
        let ids: Vec<_> = handlers.iter().map(|instance| instance.identifier()).collect();
        assert_eq!(ids, ["Plain", "High", "Low"]);
    }

    #[test]
    fn targeted_lookups_do_not_build() {
        let container = Container::new();
        handler(&container, "A", None);

        let descriptor = container.get("@service_of_A").unwrap().into_descriptor().unwrap();
        assert!(!descriptor.is_materialized());

        container.get("A").unwrap().into_instance().unwrap();
        assert!(descriptor.is_materialized());
    }

    #[test]
    fn unknown_tag_is_empty_and_unknown_id_is_an_error() {
        let container = Container::new();
        assert!(container.get("#missing").unwrap().into_instances().unwrap().is_empty());
        assert!(container.get("missing").unwrap_err().is_missing("missing"));
        assert!(!container.has("missing"));
    }

    #[test]
    fn replacing_keeps_the_registration_position() {
        let container = Container::new();
        container.register("A", Service::from_instance("A", 1_u8));
        container.register("B", Service::from_instance("B", 2_u8));
        container.register("A", Service::from_instance("A", 3_u8));

        assert_eq!(container.identifiers(), ["A", "B"]);
        assert_eq!(container.len(), 2);
        let a = container.instance_of("A").unwrap();
        assert_eq!(*a.downcast::<u8>().unwrap(), 3);
    }

    #[test]
    fn environment_lookups() {
        let container = Container::new();
        container.set_env("@_TIMEOUT", 30).unwrap();
        assert!(matches!(
            container.set_env("TIMEOUT", 30),
            Err(WireError::DataType { .. })
        ));

        assert_eq!(container.get("@_TIMEOUT").unwrap().into_env().unwrap(), Some(json!(30)));
        assert_eq!(container.get("@_MISSING").unwrap().into_env().unwrap(), None);
        let all = container.get("@all_env").unwrap().into_environments().unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn interface_resolution_uses_the_interface_tag() {
        let container = Container::new();
        container.register(
            "Named",
            Service::new("Named", |_: &Arguments| Ok(Named("default")))
                .with_capabilities(vec![crate::capability!(dyn Handler => Named)])
                .with_tag(ServiceTag::new("handler")),
        );

        let handler = container.resolve_interface::<dyn Handler>().unwrap();
        assert_eq!(handler.name(), "default");
    }

    #[test]
    fn missing_interface_is_class_not_found() {
        let container = Container::new();
        assert!(matches!(
            container.resolve_interface::<dyn Handler>(),
            Err(WireError::ClassNotFound { .. })
        ));
    }

    #[test]
    fn container_parameters_receive_the_container() {
        let container = Container::new();
        container.register(
            "Holder",
            Service::new("Holder", |args: &Arguments| args.container("container"))
                .with_dependencies(vec![Dependency::container("container")]),
        );

        let holder = container.instance_of("Holder").unwrap();
        let inner = holder.downcast::<Container>().unwrap();
        assert!(inner.has("Holder"));
    }
}
