use crate::di::container::Registry;
use crate::di::factory::SUBSCRIBER_TAG;
use crate::di::guard::{BuildClaim, BuildWait, ResolutionGuard};
use crate::di::lookup::priority_of;
use crate::di::{Container, Entry, ServiceStack, TagBuilder};
use crate::error::{Result, WireError};
use crate::service::{
    Argument, Arguments, DeclaredType, Dependency, DependencyKind, Instance, Service, TagOption,
};
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock, Weak};

/// Builds service instances, resolving their constructor arguments recursively
///
/// Bound to a container through a weak handle so the container can own it.
pub struct Instanciator {
    tags: TagBuilder,
    container: RwLock<Weak<Registry>>,
}

impl Instanciator {
    pub fn new(tags: TagBuilder) -> Self {
        Self {
            tags,
            container: RwLock::new(Weak::new()),
        }
    }

    pub(crate) fn bound(tags: TagBuilder, registry: Weak<Registry>) -> Self {
        Self {
            tags,
            container: RwLock::new(registry),
        }
    }

    /// Bind to `container`; fails when already bound to another live container
    pub fn set_container(&self, container: &Container) -> Result<()> {
        self.bind(container.registry())
    }

    pub(crate) fn bind(&self, registry: &Arc<Registry>) -> Result<()> {
        let mut slot = self
            .container
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = slot.upgrade() {
            if !Arc::ptr_eq(&current, registry) {
                return Err(WireError::AlreadyBound);
            }
        }
        *slot = Arc::downgrade(registry);
        Ok(())
    }

    pub fn tag_builder(&self) -> &TagBuilder {
        &self.tags
    }

    fn container(&self) -> Result<Container> {
        self.container
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .upgrade()
            .map(Container::from_registry)
            .ok_or(WireError::MissingContainer)
    }

    /// Singleton instance of `service`, built on first call
    pub fn instanciate(&self, service: &Arc<Service>) -> Result<Instance> {
        if let Some(instance) = service.instance() {
            return Ok(instance.clone());
        }

        let key = Arc::as_ptr(service) as usize;
        let _guard = ResolutionGuard::enter(key, service.identifier())?;
        let container = self.container()?;

        let _wait = BuildWait::enter(key, service.identifier())?;
        service.materialize(|| {
            let _claim = BuildClaim::enter(key, service.identifier());
            tracing::debug!("Instantiating service: {}", service.identifier());
            self.load_args(&container, service)
        })
    }

    fn load_args(&self, container: &Container, service: &Arc<Service>) -> Result<Arguments> {
        let mut args = Arguments::new(service.identifier());
        let subscriber = service.has_tag(SUBSCRIBER_TAG);

        for dependency in service.dependencies() {
            let argument = if dependency.is_container() {
                if subscriber {
                    self.load_service_stack(container, service, dependency)?
                } else {
                    Argument::Container(container.clone())
                }
            } else {
                match dependency.kind() {
                    DependencyKind::TypeReference => {
                        self.load_service_dependency(container, service, dependency)?
                    }
                    DependencyKind::Environment => self.load_env_variable(container, dependency)?,
                    DependencyKind::Scalar => Self::load_argument(service, dependency)?,
                }
            };

            tracing::trace!(
                "Resolved argument {} of {}: {:?}",
                dependency.name(),
                service.identifier(),
                argument
            );
            args.push(dependency.name(), argument);
        }

        Ok(args)
    }

    fn load_argument(service: &Service, dependency: &Dependency) -> Result<Argument> {
        if let Some(value) = service.given_arg(dependency.name()) {
            return Ok(Argument::Value(value.clone()));
        }

        dependency
            .fallback()
            .map(Argument::Value)
            .ok_or_else(|| WireError::argument_not_found(dependency.name(), service.identifier()))
    }

    fn load_env_variable(&self, container: &Container, dependency: &Dependency) -> Result<Argument> {
        let value = container
            .get(&dependency.environment_key())?
            .into_env()?
            .filter(|value| !value.is_null());

        value
            .or_else(|| dependency.fallback())
            .map(Argument::Value)
            .ok_or_else(|| WireError::environment_not_found(dependency.name()))
    }

    fn load_service_dependency(
        &self,
        container: &Container,
        service: &Service,
        dependency: &Dependency,
    ) -> Result<Argument> {
        match dependency.declared_type() {
            DeclaredType::Interface(interface) => {
                self.guess_service_from_interface(container, service, dependency, interface)
            }
            DeclaredType::Service(identifier) => match container.get(identifier) {
                Ok(entry) => entry.into_instance().map(Argument::Service),
                Err(e) if e.is_missing(identifier) => {
                    dependency.fallback().map(Argument::Value).ok_or(e)
                }
                Err(e) => Err(e),
            },
            DeclaredType::Scalar(_) | DeclaredType::Container => Self::load_argument(service, dependency),
        }
    }

    fn guess_service_from_interface(
        &self,
        container: &Container,
        service: &Service,
        dependency: &Dependency,
        interface: &str,
    ) -> Result<Argument> {
        if let Some(Value::String(identifier)) = service.given_arg(dependency.name()) {
            let instance = container.get(identifier)?.into_instance()?;
            if !instance.implements(interface) {
                return Err(WireError::data_type(format!(
                    "Container does not return the wanted object, {} does not implement {}",
                    instance.identifier(),
                    interface
                )));
            }
            return Ok(Argument::Service(instance));
        }

        let tag = TagBuilder::interface_name(interface);
        let query = self.tags.query(&tag, &[TagOption::ServiceTargeted]);
        let candidates = container.get(&query)?.into_descriptors()?;

        match Self::pick_candidate(&candidates, &tag)? {
            Some(candidate) => self.instanciate(candidate).map(Argument::Service),
            None => dependency
                .fallback()
                .map(Argument::Value)
                .ok_or_else(|| WireError::class_not_found(interface)),
        }
    }

    /// First candidate of the highest priority, preferring one that is already built
    pub(crate) fn pick_candidate<'c>(
        candidates: &'c [Arc<Service>],
        tag: &str,
    ) -> Result<Option<&'c Arc<Service>>> {
        let Some(first) = candidates.first() else {
            return Ok(None);
        };

        let top = priority_of(first, tag)?;
        for candidate in candidates {
            if priority_of(candidate, tag)? != top {
                break;
            }
            if candidate.is_materialized() {
                return Ok(Some(candidate));
            }
        }
        Ok(Some(first))
    }

    fn load_service_stack(
        &self,
        container: &Container,
        service: &Service,
        dependency: &Dependency,
    ) -> Result<Argument> {
        let mut services: Vec<Arc<Service>> = Vec::new();

        for query in service.subscribed_services(&self.tags) {
            let found = match container.get(&query) {
                Ok(Entry::Descriptor(descriptor)) => vec![descriptor],
                Ok(Entry::Descriptors(descriptors)) => descriptors,
                Ok(Entry::Instance(instance)) => container
                    .descriptor(instance.identifier())
                    .into_iter()
                    .collect(),
                Ok(Entry::Instances(instances)) => instances
                    .iter()
                    .filter_map(|instance| container.descriptor(instance.identifier()))
                    .collect(),
                Ok(_) => Vec::new(),
                Err(WireError::ServiceNotFound { .. }) => Vec::new(),
                Err(e) => return Err(e),
            };

            for candidate in found {
                if !services
                    .iter()
                    .any(|known| known.identifier() == candidate.identifier())
                {
                    services.push(candidate);
                }
            }
        }

        tracing::debug!(
            "Built service stack of {} with {} services",
            service.identifier(),
            services.len()
        );

        if services.is_empty() {
            if let Some(value) = dependency.fallback() {
                return Ok(Argument::Value(value));
            }
        }

        Ok(Argument::Stack(ServiceStack::new(
            container.instanciator(),
            services,
        )))
    }
}

impl std::fmt::Debug for Instanciator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bound = self
            .container
            .read()
            .map(|weak| weak.strong_count() > 0)
            .unwrap_or(false);
        f.debug_struct("Instanciator").field("bound", &bound).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ServiceTag;

    #[test]
    fn unbound_instanciator_reports_missing_container() {
        let instanciator = Instanciator::new(TagBuilder::new());
        let service = Arc::new(Service::new("Clock", |_: &Arguments| Ok(())));
        assert!(matches!(
            instanciator.instanciate(&service),
            Err(WireError::MissingContainer)
        ));
    }

    #[test]
    fn dropped_container_reports_missing_container() {
        let container = Container::new();
        let instanciator = container.instanciator();
        drop(container);

        let service = Arc::new(Service::new("Clock", |_: &Arguments| Ok(())));
        assert!(matches!(
            instanciator.instanciate(&service),
            Err(WireError::MissingContainer)
        ));
    }

    #[test]
    fn bound_instanciator_serves_a_single_container() {
        let instanciator = Arc::new(Instanciator::new(TagBuilder::new()));
        let first = Container::with_instanciator(instanciator.clone()).unwrap();
        first.register("Clock", Service::new("Clock", |_: &Arguments| Ok(7u8)));

        assert!(matches!(
            Container::with_instanciator(instanciator.clone()),
            Err(WireError::AlreadyBound)
        ));
        assert!(matches!(
            instanciator.set_container(&Container::new()),
            Err(WireError::AlreadyBound)
        ));
        assert!(instanciator.set_container(&first).is_ok());
        let clock = first.instance_of("Clock").unwrap();
        assert_eq!(*clock.downcast::<u8>().unwrap(), 7);

        drop(first);
        assert!(Container::with_instanciator(instanciator).is_ok());
    }

    fn candidate(id: &str, priority: i64, built: bool) -> Arc<Service> {
        let tag = ServiceTag::new("logger").with_priority(priority);
        let service = if built {
            Service::from_instance(id, ())
        } else {
            Service::new(id, |_: &Arguments| Ok(()))
        };
        Arc::new(service.with_tag(tag))
    }

    #[test]
    fn pick_prefers_built_candidates_of_the_top_priority() {
        let candidates = [
            candidate("A", 1, false),
            candidate("B", 1, true),
            candidate("C", 0, true),
        ];
        let picked = Instanciator::pick_candidate(&candidates, "logger").unwrap();
        assert_eq!(picked.unwrap().identifier(), "B");
    }

    #[test]
    fn pick_never_crosses_priorities() {
        let candidates = [candidate("A", 1, false), candidate("C", 0, true)];
        let picked = Instanciator::pick_candidate(&candidates, "logger").unwrap();
        assert_eq!(picked.unwrap().identifier(), "A");
        assert!(Instanciator::pick_candidate(&[], "logger").unwrap().is_none());
    }
}
