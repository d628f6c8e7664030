use crate::error::{Result, WireError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use strum::{Display, IntoStaticStr};

/// Prefixes and sentinels of the lookup grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum Marker {
    #[strum(serialize = "@_")]
    Environment,
    #[strum(serialize = "@all_services")]
    AllServices,
    #[strum(serialize = "@all_env")]
    AllEnvironment,
    #[strum(serialize = "@service_of_")]
    ServiceTargeted,
    #[strum(serialize = "@from_class_")]
    FromClass,
    #[strum(serialize = "#")]
    Tag,
}

impl Marker {
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// The rest of `id` when it starts with this marker
    pub fn strip(self, id: &str) -> Option<&str> {
        id.strip_prefix(self.as_str())
    }
}

/// Options applied when building a tag
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, Serialize, Deserialize,
)]
pub enum TagOption {
    /// The requester wants descriptors rather than instances
    #[strum(serialize = "service_target")]
    #[serde(rename = "service_target")]
    ServiceTargeted,
    /// The tag was derived from an abstract ancestor
    #[strum(serialize = "from_class")]
    #[serde(rename = "from_class")]
    FromClass,
}

/// A named label attached to a descriptor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceTag {
    name: String,
    parameters: Map<String, Value>,
    service_targeted: bool,
    from_class: bool,
}

impl ServiceTag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Map::new(),
            service_targeted: false,
            from_class: false,
        }
    }

    pub fn with_options(mut self, options: &[TagOption]) -> Self {
        for option in options {
            match option {
                TagOption::ServiceTargeted => self.service_targeted = true,
                TagOption::FromClass => self.from_class = true,
            }
        }
        self
    }

    pub fn with_parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_priority(self, priority: i64) -> Self {
        self.with_parameter("priority", priority)
    }

    /// Bare tag name, without any prefix
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Query form of the tag, e.g. `@service_of_#logger`
    pub fn full_name(&self) -> String {
        format!(
            "{}{}{}{}",
            if self.service_targeted {
                Marker::ServiceTargeted.as_str()
            } else {
                ""
            },
            if self.from_class {
                Marker::FromClass.as_str()
            } else {
                ""
            },
            Marker::Tag,
            self.name
        )
    }

    pub fn parameters(&self) -> &Map<String, Value> {
        &self.parameters
    }

    pub fn has_priority(&self) -> bool {
        self.parameters.contains_key("priority")
    }

    /// Priority among descriptors sharing this tag; 0 when unset
    pub fn priority(&self) -> Result<i64> {
        match self.parameters.get("priority") {
            None => Ok(0),
            Some(value) => value
                .as_i64()
                .ok_or_else(|| WireError::data_type("Priority must be an integer")),
        }
    }

    pub fn is_service_targeted(&self) -> bool {
        self.service_targeted
    }

    pub fn is_from_class(&self) -> bool {
        self.from_class
    }
}

impl fmt::Display for ServiceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}
