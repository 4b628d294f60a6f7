use serde::{Deserialize, Serialize};

/// Untyped configuration block handed to a module's config parser.
pub type RawModuleConfig = serde_json::Map<String, serde_json::Value>;

/// Root configuration of the module host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Modules to load. Order is authoritative for hook registration order.
    pub modules: Vec<ModuleEntry>,
    /// How the dispatch engine treats misbehaving modules.
    pub dispatch: DispatchSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// ModuleEntry
// ---------------------------------------------------------------------------

/// One `{ module, config }` entry of the module list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleEntry {
    /// Load reference resolved through the host's factory registry,
    /// e.g. `homestead.stock.KeywordSpamChecker`.
    pub module: String,
    /// The module's own configuration block.
    #[serde(default)]
    pub config: RawModuleConfig,
}

impl ModuleEntry {
    /// Create an entry with an empty configuration block.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            config: RawModuleConfig::new(),
        }
    }

    /// Set the configuration block from a JSON object.
    ///
    /// Non-object values are ignored and leave the block empty.
    #[must_use]
    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        if let serde_json::Value::Object(map) = config {
            self.config = map;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// DispatchSection
// ---------------------------------------------------------------------------

/// Dispatch policy knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSection {
    /// What an authorization hook concludes when a callback fails.
    pub on_callback_failure: CallbackFailurePolicy,
    /// What startup does when a module constructor fails.
    pub on_construction_failure: ConstructionFailurePolicy,
}

/// Outcome of a failed authorization callback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackFailurePolicy {
    /// Treat the failure as an objection (fail closed).
    #[default]
    Deny,
    /// Treat the failure as no objection (fail open).
    Allow,
}

/// Outcome of a failed module constructor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstructionFailurePolicy {
    /// Refuse to start.
    #[default]
    Abort,
    /// Drop the failing module and everything it registered, keep going.
    Skip,
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"` or `"json"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["homestead_modules=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HostConfig::default();
        assert!(config.modules.is_empty());
        assert_eq!(
            config.dispatch.on_callback_failure,
            CallbackFailurePolicy::Deny
        );
        assert_eq!(
            config.dispatch.on_construction_failure,
            ConstructionFailurePolicy::Abort
        );
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_module_entry_with_config() {
        let entry = ModuleEntry::new("a.B").with_config(serde_json::json!({ "x": 1 }));
        assert_eq!(entry.config.get("x"), Some(&serde_json::json!(1)));

        let ignored = ModuleEntry::new("a.B").with_config(serde_json::json!([1, 2]));
        assert!(ignored.config.is_empty());
    }
}
