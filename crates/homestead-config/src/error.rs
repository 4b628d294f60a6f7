use thiserror::Error;

/// Errors raised while loading the host configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    ReadError {
        /// Path of the file.
        path: String,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The file is not valid TOML.
    #[error("failed to parse {path}: {source}")]
    TomlError {
        /// Path of the file.
        path: String,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// The file is not valid YAML.
    #[error("failed to parse {path}: {source}")]
    YamlError {
        /// Path of the file.
        path: String,
        /// Underlying YAML error.
        source: serde_yaml::Error,
    },

    /// The file extension is neither TOML nor YAML.
    #[error("unsupported config format for {path}; expected .toml, .yaml or .yml")]
    UnsupportedFormat {
        /// Path of the file.
        path: String,
    },

    /// A value is present but invalid.
    #[error("invalid value for {field}: {message}")]
    ValidationError {
        /// Dotted path of the offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },
}

impl ConfigError {
    /// Build a [`ConfigError::ValidationError`].
    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
