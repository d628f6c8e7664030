//! Service configuration and the environment namespace

use crate::service::Marker;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Per-service configuration, keyed by service identifier in the builder
///
/// Deserializes from the usual services file shape:
///
/// ```
/// use meshwire::config::ServiceConfig;
///
/// let config: ServiceConfig = meshwire::serde_json::from_value(meshwire::serde_json::json!({
///     "environment": ["prod"],
///     "arguments": { "host": "smtp.local" },
///     "tags": ["mailer", { "tag": "transport", "priority": 3 }],
/// }))
/// .unwrap();
/// assert!(config.accepts(Some("prod")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Environments the service is registered in; empty means all of them
    pub environment: Vec<String>,
    /// Given arguments, by parameter name
    pub arguments: Map<String, Value>,
    pub tags: Vec<TagConfig>,
}

impl ServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment.push(environment.into());
        self
    }

    pub fn with_argument(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<TagConfig>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Fold `other` into this config. Values already present win.
    pub fn merge(&mut self, other: ServiceConfig) {
        for (name, value) in other.arguments {
            self.arguments.entry(name).or_insert(value);
        }
        if self.environment.is_empty() {
            self.environment = other.environment;
        }
        if self.tags.is_empty() {
            self.tags = other.tags;
        }
    }

    /// Whether the service is registered when `active` is the current environment
    pub fn accepts(&self, active: Option<&str>) -> bool {
        self.environment.is_empty()
            || active.is_some_and(|active| self.environment.iter().any(|env| env == active))
    }
}

/// An explicit tag: a bare name, or a name with parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagConfig {
    Name(String),
    Detailed {
        tag: String,
        #[serde(flatten)]
        parameters: Map<String, Value>,
    },
}

impl TagConfig {
    pub fn with_priority(name: impl Into<String>, priority: i64) -> Self {
        let mut parameters = Map::new();
        parameters.insert("priority".to_string(), Value::from(priority));
        Self::Detailed {
            tag: name.into(),
            parameters,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Detailed { tag, .. } => tag,
        }
    }

    pub fn parameters(&self) -> Map<String, Value> {
        match self {
            Self::Name(_) => Map::new(),
            Self::Detailed { parameters, .. } => parameters.clone(),
        }
    }
}

impl From<&str> for TagConfig {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for TagConfig {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// Environment namespace: `@_`-prefixed names mapped to values
///
/// Shared between clones. Kept apart from the service registry and filled by
/// [`ContainerBuilder`](crate::ContainerBuilder) only; read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    values: Arc<DashMap<String, Value>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Namespaced key of a variable: `TIMEOUT` becomes `@_TIMEOUT`
    pub fn key(name: &str) -> String {
        if name.starts_with(Marker::Environment.as_str()) {
            name.to_string()
        } else {
            format!("{}{}", Marker::Environment, name)
        }
    }

    /// Value of a variable, by bare or namespaced name
    pub fn get(&self, name: &str) -> Option<Value> {
        self.values.get(&Self::key(name)).map(|v| v.clone())
    }

    pub(crate) fn set(&self, name: &str, value: impl Into<Value>) {
        self.values.insert(Self::key(name), value.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(&Self::key(name))
    }

    /// Copy of every variable, by namespaced key
    pub fn snapshot(&self) -> Map<String, Value> {
        self.values
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
