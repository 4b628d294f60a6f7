//! Keyword spam checker.
//!
//! ```toml
//! [[modules]]
//! module = "homestead.stock.KeywordSpamChecker"
//! [modules.config]
//! keywords = ["buy now", "free crypto"]
//! reason = "Looks like spam"
//! check_display_names = true
//! ```

use std::future::ready;
use std::sync::Arc;

use homestead_core::{EventPayload, SpamCheck, UserProfile};
use homestead_modules::{
    ConfigError, ConstructionError, Module, ModuleApi, RawConfig, SpamCheckerCallbacks,
    parse_typed,
};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawKeywordConfig {
    keywords: Vec<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default = "default_true")]
    check_display_names: bool,
}

fn default_true() -> bool {
    true
}

/// Normalized [`KeywordSpamChecker`] configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordConfig {
    /// Lowercased keywords.
    pub keywords: Vec<String>,
    /// Rejection reason returned with a match.
    pub reason: Option<String>,
    /// Whether display names are checked too.
    pub check_display_names: bool,
}

impl KeywordConfig {
    /// The first keyword contained in `text`, ignoring case.
    #[must_use]
    pub fn matching_keyword(&self, text: &str) -> Option<&str> {
        let text = text.to_lowercase();
        self.keywords
            .iter()
            .find(|k| text.contains(k.as_str()))
            .map(String::as_str)
    }

    fn classify(&self, event: &EventPayload) -> SpamCheck {
        let Some(keyword) = event.body().and_then(|body| self.matching_keyword(body)) else {
            return SpamCheck::NotSpam;
        };
        debug!(event_id = %event.event_id, keyword, "Event matched spam keyword");
        match &self.reason {
            Some(reason) => SpamCheck::SpamWithReason(reason.clone()),
            None => SpamCheck::Spam,
        }
    }

    fn hides(&self, profile: &UserProfile) -> bool {
        profile
            .display_name
            .as_deref()
            .and_then(|name| self.matching_keyword(name))
            .is_some()
    }
}

/// Flags events and display names containing configured keywords.
#[derive(Debug)]
pub struct KeywordSpamChecker {
    config: Arc<KeywordConfig>,
}

impl KeywordSpamChecker {
    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &KeywordConfig {
        &self.config
    }
}

impl Module for KeywordSpamChecker {
    type Config = KeywordConfig;

    fn parse_config(raw: &RawConfig) -> Result<KeywordConfig, ConfigError> {
        let raw: RawKeywordConfig = parse_typed(raw)?;
        if raw.keywords.is_empty() {
            return Err(ConfigError::new("at least one keyword is required").at("keywords"));
        }
        let mut keywords = Vec::with_capacity(raw.keywords.len());
        for (i, keyword) in raw.keywords.iter().enumerate() {
            let keyword = keyword.trim();
            if keyword.is_empty() {
                return Err(ConfigError::new("keyword must not be blank").at(format!("keywords[{i}]")));
            }
            keywords.push(keyword.to_lowercase());
        }
        Ok(KeywordConfig {
            keywords,
            reason: raw.reason,
            check_display_names: raw.check_display_names,
        })
    }

    fn new(config: Arc<KeywordConfig>, api: &mut ModuleApi<'_>) -> Result<Self, ConstructionError> {
        let events = Arc::clone(&config);
        let mut callbacks = SpamCheckerCallbacks::new()
            .check_event_for_spam(move |event| ready(Ok(events.classify(&event))));

        if config.check_display_names {
            let profiles = Arc::clone(&config);
            callbacks =
                callbacks.check_username_for_spam(move |profile| ready(Ok(profiles.hides(&profile))));
        }

        api.register_spam_checker_callbacks(callbacks);
        Ok(Self { config })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{KEYWORD_SPAM_CHECKER, stock_registry};
    use homestead_modules::{ModuleLoader, SearchVisibility};
    use homestead_test::prelude::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Result<KeywordConfig, ConfigError> {
        KeywordSpamChecker::parse_config(&raw_config(value))
    }

    #[test]
    fn test_parse_lowercases_keywords() {
        let config = parse(json!({ "keywords": ["Buy NOW"] })).unwrap();
        assert_eq!(config.keywords, ["buy now"]);
        assert!(config.check_display_names);
        assert_eq!(config.matching_keyword("please BUY now!"), Some("buy now"));
    }

    #[test]
    fn test_parse_rejects_empty_keywords() {
        let err = parse(json!({ "keywords": [] })).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("keywords"));

        let err = parse(json!({ "keywords": ["ok", "  "] })).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("keywords[1]"));
    }

    #[test]
    fn test_parse_rejects_unknown_field() {
        assert!(parse(json!({ "keywords": ["x"], "colour": "red" })).is_err());
    }

    #[tokio::test]
    async fn test_flags_events_and_profiles() {
        let host = ModuleLoader::new(stock_registry())
            .load([descriptor(
                KEYWORD_SPAM_CHECKER,
                json!({ "keywords": ["free crypto"], "reason": "no thanks" }),
            )])
            .unwrap();
        let dispatcher = host.dispatcher();

        assert_eq!(
            dispatcher
                .check_event_for_spam(&test_event("bob", "Get FREE crypto here"))
                .await,
            SpamCheck::SpamWithReason("no thanks".to_string())
        );
        assert_eq!(
            dispatcher.check_event_for_spam(&test_event("bob", "hello")).await,
            SpamCheck::NotSpam
        );
        assert_eq!(
            dispatcher
                .check_username_for_spam(&test_profile("bob", "Free Crypto Bot"))
                .await,
            SearchVisibility::Excluded
        );
    }

    #[tokio::test]
    async fn test_display_names_can_be_skipped() {
        let host = ModuleLoader::new(stock_registry())
            .load([descriptor(
                KEYWORD_SPAM_CHECKER,
                json!({ "keywords": ["spam"], "check_display_names": false }),
            )])
            .unwrap();

        assert_eq!(
            host.dispatcher()
                .check_username_for_spam(&test_profile("bob", "spam"))
                .await,
            SearchVisibility::Visible
        );
        assert_eq!(
            host.dispatcher()
                .check_event_for_spam(&test_event("bob", "spam"))
                .await,
            SpamCheck::Spam
        );
    }
}
