//! Error taxonomy for the container
//!
//! Every misconfiguration is reported synchronously as a typed failure. Nothing
//! here is transient, so nothing is retried.

use thiserror::Error;

/// Result alias used across the crate
pub type ContainerResult<T> = std::result::Result<T, ContainerError>;

/// Free-form result alias, convenient in factories and binaries
pub use anyhow::Result;

#[derive(Debug, Error)]
pub enum ContainerError {
    /// Two definitions share a name
    #[error("bean '{0}' is already registered")]
    DuplicateName(String),

    /// No definition is registered under the name
    #[error("no bean named '{0}' is registered")]
    UnknownBean(String),

    /// Type-based lookup matched more than one definition
    #[error(
        "expected a single bean of type '{type_name}' but found {}: {}",
        .candidates.len(),
        .candidates.join(", ")
    )]
    AmbiguousType {
        type_name: String,
        candidates: Vec<String>,
    },

    /// Type-based lookup matched nothing
    #[error("no bean of type '{0}' is registered")]
    NoBeanOfType(String),

    /// Resolution revisited a bean that is still being created on the same path
    #[error("circular dependency detected: {}", .chain.join(" -> "))]
    CircularDependency { chain: Vec<String> },

    /// The bean exists but is not of the requested type
    #[error("bean '{name}' is not of type '{expected}'")]
    TypeMismatch { name: String, expected: String },

    /// The factory, a setter or the init callback failed
    #[error("failed to create bean '{name}': {source}")]
    BeanCreationFailed {
        name: String,
        #[source]
        source: Box<ContainerError>,
    },

    /// A definition names a custom scope that nobody registered
    #[error("bean '{bean}' uses scope '{scope}' which is not registered")]
    UnknownScope { bean: String, scope: String },

    /// Resolution was attempted after `shutdown`
    #[error("container is closed")]
    Closed,

    /// Configuration loading or logging initialisation failed
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ContainerError {
    /// Whether this error belongs to the container's own taxonomy, as opposed
    /// to a free-form failure raised by user code.
    ///
    /// Taxonomy errors travel up through nested resolution untouched; only
    /// free-form ones get wrapped with the name of the bean being built.
    pub fn is_resolution_error(&self) -> bool {
        !matches!(self, ContainerError::Other(_) | ContainerError::Config(_))
    }

    /// Wraps a free-form failure with the bean it happened in
    pub(crate) fn creating(name: &str, err: ContainerError) -> ContainerError {
        if err.is_resolution_error() {
            err
        } else {
            ContainerError::BeanCreationFailed {
                name: name.to_string(),
                source: Box::new(err),
            }
        }
    }

    /// Strips `BeanCreationFailed` wrappers and returns the innermost error
    pub fn root_cause(&self) -> &ContainerError {
        match self {
            ContainerError::BeanCreationFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
