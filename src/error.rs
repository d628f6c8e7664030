use thiserror::Error;

pub type Result<T> = std::result::Result<T, WireError>;

/// Errors raised while registering or resolving services
#[derive(Debug, Error)]
pub enum WireError {
    /// No descriptor is registered under the identifier
    #[error("Service {id} not found")]
    ServiceNotFound { id: String },

    /// No registered component implements the interface
    #[error("Missing class implementing {interface} interface")]
    ClassNotFound { interface: String },

    /// A scalar parameter has no given value, no default and is not nullable
    #[error("Missing argument {argument} for {service} class")]
    ArgumentNotFound { argument: String, service: String },

    #[error("Missing environment variable {name}")]
    EnvironmentVariableNotFound { name: String },

    /// A value does not have the expected shape
    #[error("Data type error: {message}")]
    DataType { message: String },

    /// The instanciator was used before being bound to a container
    #[error("Container not set")]
    MissingContainer,

    /// The instanciator already serves another live container
    #[error("Instanciator is already bound to another container")]
    AlreadyBound,

    #[error("Circular dependency detected: {chain}")]
    CircularDependency { chain: String },

    /// The component constructor itself failed
    #[error("Failed to construct {service}: {source}")]
    Construction {
        service: String,
        #[source]
        source: anyhow::Error,
    },
}

impl WireError {
    pub fn service_not_found(id: impl Into<String>) -> Self {
        Self::ServiceNotFound { id: id.into() }
    }

    pub fn class_not_found(interface: impl Into<String>) -> Self {
        Self::ClassNotFound {
            interface: interface.into(),
        }
    }

    pub fn argument_not_found(argument: impl Into<String>, service: impl Into<String>) -> Self {
        Self::ArgumentNotFound {
            argument: argument.into(),
            service: service.into(),
        }
    }

    pub fn environment_not_found(name: impl Into<String>) -> Self {
        Self::EnvironmentVariableNotFound { name: name.into() }
    }

    pub fn data_type(message: impl Into<String>) -> Self {
        Self::DataType {
            message: message.into(),
        }
    }

    /// Wrap a foreign error raised by a component constructor
    pub fn construction(service: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Construction {
            service: service.into(),
            source: source.into(),
        }
    }

    /// Whether this error reports that exactly `id` is missing from the registry
    pub fn is_missing(&self, id: &str) -> bool {
        matches!(self, Self::ServiceNotFound { id: missing } if missing == id)
    }
}
