use crate::component::Capability;
use crate::config::ServiceConfig;
use crate::di::TagBuilder;
use crate::service::{Service, ServiceTag, TagOption};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Tag carried by every subscriber, used to hand them a service stack
pub const SUBSCRIBER_TAG: &str = "service-subscriber";

/// Finishes descriptors before registration: derives their tags and applies
/// their configuration
#[derive(Debug, Clone, Default)]
pub struct ServiceFactory {
    tags: TagBuilder,
    configs: HashMap<String, ServiceConfig>,
}

impl ServiceFactory {
    pub fn new(tags: TagBuilder, configs: HashMap<String, ServiceConfig>) -> Self {
        Self { tags, configs }
    }

    pub fn config(&self, id: &str) -> Option<&ServiceConfig> {
        self.configs.get(id)
    }

    /// Tag `service` and apply its configuration.
    ///
    /// Derived tags come first (interfaces, ancestors, subscriber), then tags
    /// already on the descriptor, then configured ones. The list is reversed
    /// and deduplicated so the latest declaration of a tag wins.
    pub fn create(&self, service: Service) -> Service {
        let subjects: Option<Vec<String>> = service
            .default_for()
            .map(|subjects| subjects.iter().map(|s| TagBuilder::subject(s)).collect());
        let prioritize = |tag: ServiceTag, parameters: Map<String, Value>| {
            with_default_priority(tag.with_parameters(parameters), subjects.as_deref())
        };

        let mut tags: Vec<ServiceTag> = Vec::new();

        let interfaces = service.capabilities().iter().map(Capability::name);
        for tag in self.tags.from_interfaces(interfaces, &[]) {
            tags.push(prioritize(tag, Map::new()));
        }

        for ancestor in service.ancestors() {
            let tag = self.tags.from_interface(ancestor, &[TagOption::FromClass]);
            tags.push(prioritize(tag, Map::new()));
        }

        if service.is_subscriber() {
            tags.push(self.tags.tag(SUBSCRIBER_TAG, &[]));
        }

        for tag in service.tags() {
            let parameters = tag.parameters().clone();
            tags.push(prioritize(tag.clone(), parameters));
        }

        let mut given_args = service.given_args().clone();
        if let Some(config) = self.configs.get(service.identifier()) {
            for tag in &config.tags {
                tags.push(prioritize(self.tags.tag(tag.name(), &[]), tag.parameters()));
            }
            for (name, value) in &config.arguments {
                given_args.insert(name.clone(), value.clone());
            }
        }

        tags.reverse();
        let mut unique: Vec<ServiceTag> = Vec::with_capacity(tags.len());
        for tag in tags {
            if !unique.iter().any(|known| known.full_name() == tag.full_name()) {
                unique.push(tag);
            }
        }

        tracing::debug!(
            "Created service {} with tags [{}]",
            service.identifier(),
            unique
                .iter()
                .map(ServiceTag::full_name)
                .collect::<Vec<_>>()
                .join(", ")
        );

        service.with_tags(unique).with_given_args(given_args)
    }
}

/// Priority 1 for tags without one when the service is their default implementation
fn with_default_priority(tag: ServiceTag, subjects: Option<&[String]>) -> ServiceTag {
    match subjects {
        Some(subjects)
            if !tag.has_priority()
                && (subjects.is_empty() || subjects.iter().any(|s| s == tag.name())) =>
        {
            tag.with_priority(1)
        }
        _ => tag,
    }
}
