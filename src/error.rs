// Error taxonomy for registry construction and resource loads.

use thiserror::Error;

/// Outcome error for a resource load.
///
/// Cloneable so that a single outcome can be handed to every waiter joined on
/// the same in-flight load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The identifier has no registered descriptor.
    #[error("unknown resource: {0}")]
    UnknownResource(String),

    /// A fetch location could not be retrieved or injected.
    #[error("fetch failed for {resource} at {location}: {reason}")]
    FetchFailed {
        resource: String,
        location: String,
        reason: String,
    },

    /// Every location loaded but the expected runtime symbol never appeared.
    #[error("resource {resource} loaded but symbol `{symbol}` is not defined")]
    SymbolNotFound { resource: String, symbol: String },

    /// A prerequisite failed. Logged only; the dependent still loads.
    #[error("dependency {dependency} of {resource} failed: {reason}")]
    DependencyFailed {
        resource: String,
        dependency: String,
        reason: String,
    },

    /// The load task ended without publishing an outcome.
    #[error("load of {0} ended without an outcome")]
    Abandoned(String),

    /// `request` was called outside a Tokio runtime.
    #[error("cannot load {0}: no Tokio runtime is running")]
    NoRuntime(String),
}

impl LoadError {
    /// Identifier of the resource this error is about.
    pub fn resource(&self) -> &str {
        match self {
            LoadError::UnknownResource(id)
            | LoadError::Abandoned(id)
            | LoadError::NoRuntime(id) => id,
            LoadError::FetchFailed { resource, .. }
            | LoadError::SymbolNotFound { resource, .. }
            | LoadError::DependencyFailed { resource, .. } => resource,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("resource {0} is registered twice")]
    DuplicateId(String),

    #[error("resource {0} declares no fetch locations")]
    NoLocations(String),

    #[error("resource {resource} depends on unregistered {dependency}")]
    UnknownDependency { resource: String, dependency: String },

    #[error("dependency cycle through {0}")]
    DependencyCycle(String),
}
