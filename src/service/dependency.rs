use crate::component::Interface;
use crate::service::Marker;
use serde::Serialize;
use serde_json::Value;

/// Declared type of a constructor parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum DeclaredType {
    /// Primitive or untyped value; the name is informative only (empty if untyped)
    Scalar(String),
    /// Concrete component, by identifier
    Service(String),
    /// Trait object, by interface name
    Interface(String),
    /// Container-shaped parameter: the container itself or a subscriber view
    Container,
}

impl DeclaredType {
    pub fn name(&self) -> &str {
        match self {
            Self::Scalar(name) | Self::Service(name) | Self::Interface(name) => name,
            Self::Container => "container",
        }
    }
}

/// How a dependency gets its value. Every dependency falls in exactly one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    TypeReference,
    Environment,
    Scalar,
}

/// One constructor parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dependency {
    name: String,
    #[serde(rename = "type")]
    declared: DeclaredType,
    nullable: bool,
    default: Option<Value>,
}

impl Dependency {
    fn new(name: impl Into<String>, declared: DeclaredType) -> Self {
        Self {
            name: name.into(),
            declared,
            nullable: false,
            default: None,
        }
    }

    /// Untyped value parameter; an environment reference when `name` starts with `_`
    pub fn scalar(name: impl Into<String>) -> Self {
        Self::new(name, DeclaredType::Scalar(String::new()))
    }

    pub fn typed_scalar(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(name, DeclaredType::Scalar(type_name.into()))
    }

    pub fn service(name: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::new(name, DeclaredType::Service(identifier.into()))
    }

    pub fn interface<I: ?Sized + Interface>(name: impl Into<String>) -> Self {
        Self::interface_named(name, I::NAME)
    }

    pub fn interface_named(name: impl Into<String>, interface: impl Into<String>) -> Self {
        Self::new(name, DeclaredType::Interface(interface.into()))
    }

    pub fn container(name: impl Into<String>) -> Self {
        Self::new(name, DeclaredType::Container)
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_type(&self) -> &DeclaredType {
        &self.declared
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn is_type_reference(&self) -> bool {
        !matches!(self.declared, DeclaredType::Scalar(_))
    }

    pub fn is_environment_reference(&self) -> bool {
        !self.is_type_reference() && self.name.starts_with('_')
    }

    pub fn is_plain_scalar(&self) -> bool {
        !self.is_type_reference() && !self.is_environment_reference()
    }

    pub fn is_container(&self) -> bool {
        self.declared == DeclaredType::Container
    }

    pub fn kind(&self) -> DependencyKind {
        if self.is_type_reference() {
            DependencyKind::TypeReference
        } else if self.is_environment_reference() {
            DependencyKind::Environment
        } else {
            DependencyKind::Scalar
        }
    }

    /// Key of this parameter in the environment namespace: `_timeout` reads `@_TIMEOUT`
    pub fn environment_key(&self) -> String {
        let bare = self.name.strip_prefix('_').unwrap_or(&self.name);
        format!("{}{}", Marker::Environment, bare.to_uppercase())
    }

    /// Value substituted when nothing else resolves: the default, else null when nullable
    pub fn fallback(&self) -> Option<Value> {
        match &self.default {
            Some(value) if !value.is_null() => Some(value.clone()),
            _ if self.nullable => Some(Value::Null),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classes_partition_every_dependency() {
        let dependencies = [
            Dependency::scalar("name"),
            Dependency::scalar("_timeout"),
            Dependency::typed_scalar("_port", "u16"),
            Dependency::service("_logger", "Logger"),
            Dependency::interface_named("mailer", "MailerInterface"),
            Dependency::container("stack"),
        ];

        for dependency in &dependencies {
            let classes = [
                dependency.is_type_reference(),
                dependency.is_environment_reference(),
                dependency.is_plain_scalar(),
            ];
            assert_eq!(classes.iter().filter(|c| **c).count(), 1, "{dependency:?}");
        }

        assert_eq!(dependencies[0].kind(), DependencyKind::Scalar);
        assert_eq!(dependencies[1].kind(), DependencyKind::Environment);
        assert_eq!(dependencies[2].kind(), DependencyKind::Environment);
        // A type reference wins over the underscore convention.
        assert_eq!(dependencies[3].kind(), DependencyKind::TypeReference);
    }

    #[test]
    fn environment_key_is_upper_cased() {
        assert_eq!(Dependency::scalar("_timeout").environment_key(), "@_TIMEOUT");
        assert_eq!(Dependency::scalar("_db_url").environment_key(), "@_DB_URL");
    }

    #[test]
    fn fallback_prefers_default_then_null() {
        assert_eq!(Dependency::scalar("a").fallback(), None);
        assert_eq!(Dependency::scalar("a").nullable().fallback(), Some(Value::Null));
        assert_eq!(
            Dependency::scalar("a").with_default(30).fallback(),
            Some(json!(30))
        );
        assert_eq!(
            Dependency::scalar("a").nullable().with_default("x").fallback(),
            Some(json!("x"))
        );
        assert_eq!(Dependency::scalar("a").with_default(Value::Null).fallback(), None);
    }

    #[test]
    fn serializes_for_diagnostics() {
        let dependency = Dependency::service("logger", "Logger").nullable();
        assert_eq!(
            serde_json::to_value(&dependency).unwrap(),
            json!({
                "name": "logger",
                "type": { "kind": "service", "name": "Logger" },
                "nullable": true,
                "default": null,
            })
        );
    }
}
