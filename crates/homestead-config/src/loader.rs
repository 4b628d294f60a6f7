//! Config file loading.
//!
//! Both formats are first parsed into a `serde_json::Value` tree. The module
//! list is then validated by hand so that errors can point at the exact item
//! (`modules.<item 2>.config`), and the remaining sections are deserialized
//! with serde defaults.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::types::{DispatchSection, HostConfig, LoggingSection};
use crate::validate;

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Top-level keys this crate understands.
const KNOWN_SECTIONS: [&str; 3] = ["modules", "dispatch", "logging"];

/// Serialization format of a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// TOML (`.toml`).
    Toml,
    /// YAML (`.yaml`, `.yml`).
    Yaml,
}

impl FileFormat {
    /// Pick the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Sections {
    dispatch: DispatchSection,
    logging: LoggingSection,
}

/// Load a config from a specific file path.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, is too large, has an
/// unknown extension, cannot be parsed, or fails validation.
pub fn load_file(path: &Path) -> ConfigResult<HostConfig> {
    let format = FileFormat::from_path(path).ok_or_else(|| ConfigError::UnsupportedFormat {
        path: path.display().to_string(),
    })?;

    // Check file size before reading to prevent OOM.
    let metadata = std::fs::metadata(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    if metadata.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::invalid(
            path.display().to_string(),
            format!(
                "config file is {} bytes, exceeding the {} byte limit",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        ));
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    let config = parse(&content, format, &path.display().to_string())?;
    debug!(
        path = %path.display(),
        modules = config.modules.len(),
        "loaded host config"
    );
    Ok(config)
}

/// Parse configuration text.
///
/// `origin` names the source in error messages.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the text is malformed or fails validation.
pub fn parse(content: &str, format: FileFormat, origin: &str) -> ConfigResult<HostConfig> {
    if content.trim().is_empty() {
        return Ok(HostConfig::default());
    }

    let tree: serde_json::Value = match format {
        FileFormat::Toml => toml::from_str(content).map_err(|e| ConfigError::TomlError {
            path: origin.to_owned(),
            source: e,
        })?,
        FileFormat::Yaml => serde_yaml::from_str(content).map_err(|e| ConfigError::YamlError {
            path: origin.to_owned(),
            source: e,
        })?,
    };

    let mut root = match tree {
        serde_json::Value::Object(map) => map,
        // A YAML document holding only comments parses as null.
        serde_json::Value::Null => serde_json::Map::new(),
        _ => {
            return Err(ConfigError::invalid(
                "<root>",
                "expected a mapping at the top level",
            ));
        },
    };

    for key in root.keys() {
        if !KNOWN_SECTIONS.contains(&key.as_str()) {
            warn!(key = %key, origin, "ignoring unknown config section");
        }
    }

    let modules = validate::module_list(root.remove("modules").as_ref())?;

    let sections: Sections = serde_json::from_value(serde_json::Value::Object(root))
        .map_err(|e| ConfigError::invalid("<root>", e.to_string()))?;

    let config = HostConfig {
        modules,
        dispatch: sections.dispatch,
        logging: sections.logging,
    };
    validate::validate(&config)?;
    Ok(config)
}
