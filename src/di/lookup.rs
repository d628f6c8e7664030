use crate::error::Result;
use crate::service::{Marker, Service};
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A parsed lookup identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Query<'a> {
    /// `@_NAME`, kept whole since it is the key in the environment namespace
    Environment(&'a str),
    AllServices,
    AllEnvironment,
    /// `#name`, `@from_class_name` or `@from_class_#name`
    Tag { name: &'a str, targeted: bool },
    Identifier { id: &'a str, targeted: bool },
}

impl<'a> Query<'a> {
    pub(crate) fn parse(id: &'a str) -> Self {
        if id.starts_with(Marker::Environment.as_str()) {
            return Self::Environment(id);
        }
        if id == Marker::AllServices.as_str() {
            return Self::AllServices;
        }
        if id == Marker::AllEnvironment.as_str() {
            return Self::AllEnvironment;
        }

        let (targeted, rest) = match Marker::ServiceTargeted.strip(id) {
            Some(rest) => (true, rest),
            None => (false, id),
        };

        if let Some(rest) = Marker::FromClass.strip(rest) {
            let name = Marker::Tag.strip(rest).unwrap_or(rest);
            return Self::Tag { name, targeted };
        }

        match Marker::Tag.strip(rest) {
            Some(name) => Self::Tag { name, targeted },
            None => Self::Identifier { id: rest, targeted },
        }
    }
}

/// Descriptors tagged `name`, highest priority first, registration order kept
/// within a priority
pub(crate) fn select_tagged<'s>(
    services: impl IntoIterator<Item = &'s Arc<Service>>,
    name: &str,
) -> Result<Vec<Arc<Service>>> {
    select_tagged_all(services, &[name])
}

/// Descriptors carrying every tag of `names`, ordered by the priority of the
/// first one
pub(crate) fn select_tagged_all<'s>(
    services: impl IntoIterator<Item = &'s Arc<Service>>,
    names: &[&str],
) -> Result<Vec<Arc<Service>>> {
    let mut buckets: BTreeMap<Reverse<i64>, Vec<Arc<Service>>> = BTreeMap::new();
    for service in services {
        if !names.iter().all(|name| service.has_tag(name)) {
            continue;
        }
        let priority = match names.first() {
            Some(name) => priority_of(service, name)?,
            None => 0,
        };
        buckets
            .entry(Reverse(priority))
            .or_default()
            .push(service.clone());
    }

    Ok(buckets.into_values().flatten().collect())
}

/// Priority of the tag `name` on `service`, 0 when the tag is absent
pub(crate) fn priority_of(service: &Service, name: &str) -> Result<i64> {
    service.find_tag(name).map_or(Ok(0), |tag| tag.priority())
}
