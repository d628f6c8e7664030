use crate::component::{Capability, Component};
use crate::di::TagBuilder;
use crate::error::Result;
use crate::service::{Arguments, Dependency, Instance, ServiceTag, instance};
use once_cell::sync::OnceCell;
use serde_json::{Map, Value, json};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

type SignatureFn = Arc<dyn Fn() -> Vec<Dependency> + Send + Sync>;
type ConstructorFn = Arc<dyn Fn(&Arguments) -> Result<Arc<dyn Any + Send + Sync>> + Send + Sync>;
type SubscriptionFn = Arc<dyn Fn(&TagBuilder) -> Vec<String> + Send + Sync>;

/// Descriptor of a registered service
///
/// Holds everything needed to build the service: its constructor signature,
/// given arguments and tags. The instance and the arguments used to build it
/// are cached once the service is materialized; both cells are written at
/// most once.
pub struct Service {
    identifier: String,
    type_name: &'static str,
    signature: SignatureFn,
    dependencies: OnceCell<Vec<Dependency>>,
    constructor: ConstructorFn,
    given_args: Map<String, Value>,
    tags: Vec<ServiceTag>,
    capabilities: Arc<[Capability]>,
    ancestors: Vec<String>,
    default_for: Option<Vec<String>>,
    subscriptions: Option<SubscriptionFn>,
    args: OnceCell<Arguments>,
    instance: OnceCell<Instance>,
}

impl Service {
    fn from_parts(identifier: String, type_name: &'static str, constructor: ConstructorFn) -> Self {
        Self {
            identifier,
            type_name,
            signature: Arc::new(Vec::<Dependency>::new),
            dependencies: OnceCell::new(),
            constructor,
            given_args: Map::new(),
            tags: Vec::new(),
            capabilities: Arc::from(Vec::<Capability>::new()),
            ancestors: Vec::new(),
            default_for: None,
            subscriptions: None,
            args: OnceCell::new(),
            instance: OnceCell::new(),
        }
    }

    /// Descriptor of a [`Component`], using everything it declares
    pub fn of<T: Component>() -> Self {
        let constructor: ConstructorFn = Arc::new(|args: &Arguments| {
            T::construct(args).map(|value| Arc::new(value) as Arc<dyn Any + Send + Sync>)
        });

        let mut service = Self::from_parts(
            T::identifier().to_string(),
            std::any::type_name::<T>(),
            constructor,
        );
        service.signature = Arc::new(T::dependencies);
        service.capabilities = Arc::from(T::capabilities());
        service.ancestors = T::ancestors().into_iter().map(String::from).collect();
        service.default_for = T::default_for()
            .map(|tags| tags.into_iter().map(String::from).collect());
        if T::subscribed_services(&TagBuilder::new()).is_some() {
            service.subscriptions = Some(Arc::new(|tags: &TagBuilder| {
                T::subscribed_services(tags).unwrap_or_default()
            }));
        }
        service
    }

    /// Descriptor built from a closure rather than a [`Component`] impl
    pub fn new<T, F>(identifier: impl Into<String>, constructor: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Arguments) -> Result<T> + Send + Sync + 'static,
    {
        let constructor: ConstructorFn = Arc::new(move |args: &Arguments| {
            constructor(args).map(|value| Arc::new(value) as Arc<dyn Any + Send + Sync>)
        });
        Self::from_parts(identifier.into(), std::any::type_name::<T>(), constructor)
    }

    /// Descriptor wrapping an already built value
    pub fn from_instance<T: Any + Send + Sync>(identifier: impl Into<String>, value: T) -> Self {
        let identifier = identifier.into();
        let value: Arc<dyn Any + Send + Sync> = Arc::new(value);
        let stored = value.clone();
        let service = Self::from_parts(
            identifier,
            std::any::type_name::<T>(),
            Arc::new(move |_: &Arguments| Ok(stored.clone())),
        );
        let _ = service
            .args
            .set(Arguments::new(service.identifier.clone()));
        let _ = service.instance.set(Instance::new(
            &service.identifier,
            value,
            service.capabilities.clone(),
        ));
        service
    }

    pub fn with_dependencies(mut self, dependencies: Vec<Dependency>) -> Self {
        self.signature = Arc::new(move || dependencies.clone());
        self.dependencies = OnceCell::new();
        self
    }

    pub fn with_given_args(mut self, given_args: Map<String, Value>) -> Self {
        self.given_args = given_args;
        self
    }

    pub fn with_given_arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.given_args.insert(name.into(), value.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<ServiceTag>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_tag(mut self, tag: ServiceTag) -> Self {
        self.tags.push(tag);
        self
    }

    /// Replace the declared interfaces, including those of a pre-built instance
    pub fn with_capabilities(mut self, capabilities: Vec<Capability>) -> Self {
        self.capabilities = Arc::from(capabilities);
        if let Some(instance) = self.instance.take() {
            let _ = self.instance.set(Instance::new(
                &self.identifier,
                instance.value(),
                self.capabilities.clone(),
            ));
        }
        self
    }

    pub fn with_ancestors<S: Into<String>>(mut self, ancestors: impl IntoIterator<Item = S>) -> Self {
        self.ancestors = ancestors.into_iter().map(Into::into).collect();
        self
    }

    /// Mark this service as the default for `tags`; an empty list means every tag it carries
    pub fn with_default_for<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.default_for = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Turn this descriptor into a subscriber over the queries returned by `subscriptions`
    pub fn with_subscriptions<F>(mut self, subscriptions: F) -> Self
    where
        F: Fn(&TagBuilder) -> Vec<String> + Send + Sync + 'static,
    {
        self.subscriptions = Some(Arc::new(subscriptions));
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Rust type produced by the constructor
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Constructor parameters, computed on first use
    pub fn dependencies(&self) -> &[Dependency] {
        self.dependencies.get_or_init(|| (self.signature)())
    }

    pub fn given_args(&self) -> &Map<String, Value> {
        &self.given_args
    }

    /// A given argument, ignoring explicit nulls
    pub fn given_arg(&self, name: &str) -> Option<&Value> {
        self.given_args.get(name).filter(|value| !value.is_null())
    }

    pub fn tags(&self) -> &[ServiceTag] {
        &self.tags
    }

    /// Whether a tag with this bare name is attached
    pub fn has_tag(&self, name: &str) -> bool {
        self.find_tag(name).is_some()
    }

    pub fn find_tag(&self, name: &str) -> Option<&ServiceTag> {
        self.tags.iter().find(|tag| tag.name() == name)
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    pub fn implements(&self, interface: &str) -> bool {
        instance::implements(&self.capabilities, interface)
    }

    pub fn ancestors(&self) -> &[String] {
        &self.ancestors
    }

    pub fn default_for(&self) -> Option<&[String]> {
        self.default_for.as_deref()
    }

    pub fn is_subscriber(&self) -> bool {
        self.subscriptions.is_some()
    }

    /// Queries this subscriber depends on; empty for regular services
    pub fn subscribed_services(&self, tags: &TagBuilder) -> Vec<String> {
        self.subscriptions
            .as_ref()
            .map(|subscriptions| subscriptions(tags))
            .unwrap_or_default()
    }

    pub fn instance(&self) -> Option<&Instance> {
        self.instance.get()
    }

    pub fn is_materialized(&self) -> bool {
        self.instance.get().is_some()
    }

    /// Arguments the instance was built with
    pub fn args(&self) -> Option<&Arguments> {
        self.args.get()
    }

    /// Build the singleton, or return the cached one.
    ///
    /// `resolve` is only called when no instance exists yet. A failure leaves
    /// the descriptor unmaterialized so a later call can retry.
    pub(crate) fn materialize<F>(&self, resolve: F) -> Result<Instance>
    where
        F: FnOnce() -> Result<Arguments>,
    {
        self.instance
            .get_or_try_init(|| {
                let args = resolve()?;
                let value = (self.constructor)(&args)?;
                let _ = self.args.set(args);
                Ok(Instance::new(
                    &self.identifier,
                    value,
                    self.capabilities.clone(),
                ))
            })
            .cloned()
    }

    /// Diagnostic summary of the descriptor
    pub fn to_json(&self) -> Value {
        json!({
            "identifier": self.identifier,
            "type": self.type_name,
            "dependencies": self.dependencies(),
            "arguments": self.given_args,
            "tags": self.tags,
            "interfaces": self.capabilities.iter().map(Capability::name).collect::<Vec<_>>(),
            "ancestors": self.ancestors,
            "default_for": self.default_for,
            "subscriber": self.is_subscriber(),
            "materialized": self.is_materialized(),
        })
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("identifier", &self.identifier)
            .field("type_name", &self.type_name)
            .field("tags", &self.tags)
            .field("capabilities", &self.capabilities)
            .field("materialized", &self.is_materialized())
            .finish()
    }
}
