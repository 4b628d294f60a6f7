//! Error types for module loading, registration and callback invocation.

use std::fmt;

use thiserror::Error;

use crate::module::ModuleId;

/// A module rejected its raw configuration block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    /// Dotted path of the offending field inside the module's config block,
    /// when the normalizer knows it.
    pub field: Option<String>,
    /// Human-readable reason.
    pub reason: String,
}

impl ConfigError {
    /// Reject the configuration as a whole.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            field: None,
            reason: reason.into(),
        }
    }

    /// Attach the offending field.
    #[must_use]
    pub fn at(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{field}: {}", self.reason),
            None => f.write_str(&self.reason),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(e.to_string())
    }
}

/// Registering a web resource failed.
///
/// Returned to the registering module, never to the host's startup flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// The path lies in the namespace reserved for the core protocol.
    #[error("path {path} is inside the reserved namespace {prefix}")]
    ReservedNamespace {
        /// Rejected path.
        path: String,
        /// The reserved prefix.
        prefix: String,
    },

    /// Another module already owns the path.
    #[error("path {path} is already registered by {owner}")]
    PathTaken {
        /// Rejected path.
        path: String,
        /// Module that registered the path first.
        owner: ModuleId,
    },

    /// The path is not absolute.
    #[error("path {path} must start with '/'")]
    InvalidPath {
        /// Rejected path.
        path: String,
    },
}

/// A module constructor failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    /// The module reported a failure.
    #[error("{reason}")]
    Failed {
        /// Why the module could not start.
        reason: String,
    },

    /// The module gave up after a rejected registration.
    #[error("registration rejected: {0}")]
    Registration(#[from] RegistrationError),

    /// The constructor panicked.
    #[error("constructor panicked: {0}")]
    Panicked(String),
}

impl ConstructionError {
    /// Report a constructor failure.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }
}

/// A callback failed while a hook was being dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackError {
    /// The callback returned an error.
    #[error("callback failed: {0}")]
    Failed(String),

    /// The callback panicked.
    #[error("callback panicked: {0}")]
    Panicked(String),
}

impl CallbackError {
    /// Report a callback failure.
    #[must_use]
    pub fn failed(reason: impl std::fmt::Display) -> Self {
        Self::Failed(reason.to_string())
    }
}

/// Startup was aborted.
#[derive(Debug, Error)]
pub enum StartupError {
    /// No factory is registered under the module's load reference.
    #[error("unknown module {module}")]
    UnknownModule {
        /// The module that could not be resolved.
        module: ModuleId,
    },

    /// The module's configuration was rejected.
    #[error("invalid configuration for {module}: {source}")]
    Config {
        /// The misconfigured module.
        module: ModuleId,
        /// Why the configuration was rejected.
        source: ConfigError,
    },

    /// The module's constructor failed.
    #[error("failed to construct {module}: {source}")]
    Construction {
        /// The failing module.
        module: ModuleId,
        /// Why construction failed.
        source: ConstructionError,
    },
}

impl StartupError {
    /// The module startup failed on.
    #[must_use]
    pub fn module(&self) -> &ModuleId {
        match self {
            Self::UnknownModule { module }
            | Self::Config { module, .. }
            | Self::Construction { module, .. } => module,
        }
    }
}

/// Result of a callback invocation.
pub type CallbackResult<T> = Result<T, CallbackError>;

/// Result of startup.
pub type StartupResult<T> = Result<T, StartupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RegistrationError::PathTaken {
            path: "/x".to_string(),
            owner: ModuleId::new(0, "a.B"),
        };
        assert_eq!(err.to_string(), "path /x is already registered by a.B[0]");

        let err = ConfigError::new("must not be empty").at("keywords");
        assert_eq!(err.to_string(), "keywords: must not be empty");
        assert_eq!(ConfigError::new("bad").to_string(), "bad");
    }

    #[test]
    fn test_construction_error_from_registration() {
        fn register() -> Result<(), RegistrationError> {
            Err(RegistrationError::InvalidPath {
                path: "x".to_string(),
            })
        }
        fn construct() -> Result<(), ConstructionError> {
            register()?;
            Ok(())
        }
        assert!(matches!(
            construct(),
            Err(ConstructionError::Registration(RegistrationError::InvalidPath { .. }))
        ));
    }

    #[test]
    fn test_startup_error_module() {
        let err = StartupError::Config {
            module: ModuleId::new(2, "a.B"),
            source: ConfigError::new("bad"),
        };
        assert_eq!(err.module().index(), 2);
        assert_eq!(err.to_string(), "invalid configuration for a.B[2]: bad");
    }
}
