//! Configuration validation.
//!
//! The module list is checked item by item before deserialization so that a
//! malformed entry is reported with its position in the list.

use serde_json::Value;

use crate::error::{ConfigError, ConfigResult};
use crate::types::{HostConfig, ModuleEntry, RawModuleConfig};

/// Validate and convert the raw `modules` value.
///
/// A missing or null value means no modules.
///
/// # Errors
///
/// Returns a [`ConfigError::ValidationError`] naming the first offending item.
pub fn module_list(value: Option<&Value>) -> ConfigResult<Vec<ModuleEntry>> {
    let items = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(ConfigError::invalid("modules", "expected a list")),
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| module_entry(i, item))
        .collect()
}

fn module_entry(index: usize, item: &Value) -> ConfigResult<ModuleEntry> {
    let path = format!("modules.<item {index}>");

    let Value::Object(fields) = item else {
        return Err(ConfigError::invalid(path, "expected a mapping"));
    };

    let module = match fields.get("module") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_owned(),
        Some(Value::String(_)) => {
            return Err(ConfigError::invalid(
                format!("{path}.module"),
                "module reference must not be empty",
            ));
        },
        Some(_) => {
            return Err(ConfigError::invalid(
                format!("{path}.module"),
                "expected a string",
            ));
        },
        None => {
            return Err(ConfigError::invalid(
                format!("{path}.module"),
                "missing module reference",
            ));
        },
    };

    let config = match fields.get("config") {
        None | Some(Value::Null) => RawModuleConfig::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(_) => {
            return Err(ConfigError::invalid(
                format!("{path}.config"),
                "expected a mapping",
            ));
        },
    };

    if let Some(extra) = fields.keys().find(|k| !matches!(k.as_str(), "module" | "config")) {
        return Err(ConfigError::invalid(
            format!("{path}.{extra}"),
            "unknown key; module options belong under `config`",
        ));
    }

    Ok(ModuleEntry { module, config })
}

/// Validate a fully-assembled configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &HostConfig) -> ConfigResult<()> {
    validate_logging(config)?;
    Ok(())
}

fn validate_logging(config: &HostConfig) -> ConfigResult<()> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.as_str()) {
        return Err(ConfigError::invalid(
            "logging.level",
            format!(
                "unsupported log level '{}'; expected one of: {}",
                config.logging.level,
                valid_levels.join(", ")
            ),
        ));
    }

    let valid_formats = ["pretty", "compact", "json"];
    if !valid_formats.contains(&config.logging.format.as_str()) {
        return Err(ConfigError::invalid(
            "logging.format",
            format!(
                "unsupported log format '{}'; expected one of: {}",
                config.logging.format,
                valid_formats.join(", ")
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field_of(err: ConfigError) -> String {
        match err {
            ConfigError::ValidationError { field, .. } => field,
            other => panic!("expected ValidationError, got {other:?}"),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&HostConfig::default()).is_ok());
    }

    #[test]
    fn test_missing_module_list_is_empty() {
        assert!(module_list(None).unwrap().is_empty());
        assert!(module_list(Some(&Value::Null)).unwrap().is_empty());
    }

    #[test]
    fn test_module_list_must_be_a_list() {
        let err = module_list(Some(&json!({ "module": "a.B" }))).unwrap_err();
        assert_eq!(field_of(err), "modules");
    }

    #[test]
    fn test_item_must_be_a_mapping() {
        let err = module_list(Some(&json!([{ "module": "a.B" }, "c.D"]))).unwrap_err();
        assert_eq!(field_of(err), "modules.<item 1>");
    }

    #[test]
    fn test_module_reference_required() {
        let err = module_list(Some(&json!([{ "config": {} }]))).unwrap_err();
        assert_eq!(field_of(err), "modules.<item 0>.module");

        let err = module_list(Some(&json!([{ "module": "  " }]))).unwrap_err();
        assert_eq!(field_of(err), "modules.<item 0>.module");
    }

    #[test]
    fn test_config_must_be_a_mapping() {
        let err = module_list(Some(&json!([{ "module": "a.B", "config": [1] }]))).unwrap_err();
        assert_eq!(field_of(err), "modules.<item 0>.config");
    }

    #[test]
    fn test_stray_keys_rejected() {
        let err =
            module_list(Some(&json!([{ "module": "a.B", "keywords": ["x"] }]))).unwrap_err();
        assert_eq!(field_of(err), "modules.<item 0>.keywords");
    }

    #[test]
    fn test_valid_entries() {
        let entries = module_list(Some(&json!([
            { "module": "a.B", "config": { "k": 1 } },
            { "module": "c.D", "config": null },
        ])))
        .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].config.get("k"), Some(&json!(1)));
        assert!(entries[1].config.is_empty());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = HostConfig::default();
        config.logging.level = "loud".to_owned();
        assert_eq!(field_of(validate(&config).unwrap_err()), "logging.level");
    }

    #[test]
    fn test_invalid_log_format() {
        let mut config = HostConfig::default();
        config.logging.format = "xml".to_owned();
        assert_eq!(field_of(validate(&config).unwrap_err()), "logging.format");
    }
}
