//! Registration guard.
//!
//! Denies registrations from listed email domains or SSO providers and
//! shadow-bans registrations whose user agent matches a pattern. Denial rules
//! are checked before shadow-ban rules.

use std::collections::BTreeSet;
use std::future::ready;
use std::sync::Arc;

use homestead_core::{RegistrationBehaviour, RegistrationRequest};
use homestead_modules::{
    ConfigError, ConstructionError, Module, ModuleApi, RawConfig, SpamCheckerCallbacks,
    parse_typed,
};
use regex::{Regex, RegexSet};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGuardConfig {
    #[serde(default)]
    denied_email_domains: Vec<String>,
    #[serde(default)]
    shadow_ban_user_agents: Vec<String>,
    #[serde(default)]
    denied_auth_providers: Vec<String>,
}

/// Normalized [`RegistrationGuard`] configuration.
#[derive(Debug)]
pub struct GuardConfig {
    /// Lowercased email domains to deny.
    pub denied_email_domains: BTreeSet<String>,
    /// User agent patterns that lead to a shadow-ban.
    pub shadow_ban_user_agents: RegexSet,
    /// SSO provider ids to deny.
    pub denied_auth_providers: BTreeSet<String>,
}

impl GuardConfig {
    /// Classify a registration attempt.
    #[must_use]
    pub fn classify(&self, request: &RegistrationRequest) -> RegistrationBehaviour {
        let domain_denied = request
            .email
            .as_deref()
            .and_then(|email| email.rsplit_once('@'))
            .is_some_and(|(_, domain)| self.denied_email_domains.contains(&domain.to_lowercase()));
        let provider_denied = request
            .auth_provider_id
            .as_ref()
            .is_some_and(|provider| self.denied_auth_providers.contains(provider));
        if domain_denied || provider_denied {
            return RegistrationBehaviour::Deny;
        }

        if request
            .request_info
            .iter()
            .any(|info| self.shadow_ban_user_agents.is_match(&info.user_agent))
        {
            return RegistrationBehaviour::ShadowBan;
        }

        RegistrationBehaviour::Allow
    }
}

/// Denies or shadow-bans registrations.
#[derive(Debug)]
pub struct RegistrationGuard {
    config: Arc<GuardConfig>,
}

impl RegistrationGuard {
    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }
}

impl Module for RegistrationGuard {
    type Config = GuardConfig;

    fn parse_config(raw: &RawConfig) -> Result<GuardConfig, ConfigError> {
        let raw: RawGuardConfig = parse_typed(raw)?;

        // Compile one by one so the error names the bad pattern.
        for (i, pattern) in raw.shadow_ban_user_agents.iter().enumerate() {
            Regex::new(pattern).map_err(|e| {
                ConfigError::new(e.to_string()).at(format!("shadow_ban_user_agents[{i}]"))
            })?;
        }
        let shadow_ban_user_agents = RegexSet::new(&raw.shadow_ban_user_agents)
            .map_err(|e| ConfigError::new(e.to_string()).at("shadow_ban_user_agents"))?;

        let denied_email_domains = raw
            .denied_email_domains
            .iter()
            .map(|d| d.trim_start_matches('@').to_lowercase())
            .collect();

        Ok(GuardConfig {
            denied_email_domains,
            shadow_ban_user_agents,
            denied_auth_providers: raw.denied_auth_providers.into_iter().collect(),
        })
    }

    fn new(config: Arc<GuardConfig>, api: &mut ModuleApi<'_>) -> Result<Self, ConstructionError> {
        let guard = Arc::clone(&config);
        api.register_spam_checker_callbacks(SpamCheckerCallbacks::new().check_registration_for_spam(
            move |request| {
                let behaviour = guard.classify(&request);
                if behaviour != RegistrationBehaviour::Allow {
                    info!(
                        username = request.username.as_deref().unwrap_or_default(),
                        ?behaviour,
                        "Registration flagged"
                    );
                }
                ready(Ok(behaviour))
            },
        ));
        Ok(Self { config })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{REGISTRATION_GUARD, stock_registry};
    use homestead_modules::ModuleLoader;
    use homestead_test::prelude::*;
    use serde_json::json;

    fn guard() -> GuardConfig {
        RegistrationGuard::parse_config(&raw_config(json!({
            "denied_email_domains": ["@Spam.Example"],
            "shadow_ban_user_agents": ["(?i)curl/"],
            "denied_auth_providers": ["sketchy-sso"],
        })))
        .unwrap()
    }

    #[test]
    fn test_classify() {
        let guard = guard();
        assert_eq!(
            guard.classify(&test_registration("a", Some("a@spam.example"), "Firefox")),
            RegistrationBehaviour::Deny
        );
        assert_eq!(
            guard.classify(&test_registration("b", None, "curl/8.0")),
            RegistrationBehaviour::ShadowBan
        );
        assert_eq!(
            guard.classify(&test_registration("c", Some("c@good.example"), "Firefox")),
            RegistrationBehaviour::Allow
        );

        let mut sso = test_registration("d", None, "Firefox");
        sso.auth_provider_id = Some("sketchy-sso".to_string());
        assert_eq!(guard.classify(&sso), RegistrationBehaviour::Deny);
    }

    #[test]
    fn test_deny_beats_shadow_ban() {
        assert_eq!(
            guard().classify(&test_registration("e", Some("e@spam.example"), "curl/8.0")),
            RegistrationBehaviour::Deny
        );
    }

    #[test]
    fn test_bad_pattern_names_the_item() {
        let err = RegistrationGuard::parse_config(&raw_config(json!({
            "shadow_ban_user_agents": ["ok", "[", "fine"],
        })))
        .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("shadow_ban_user_agents[1]"));
    }

    #[tokio::test]
    async fn test_dispatch() {
        let host = ModuleLoader::new(stock_registry())
            .load([descriptor(
                REGISTRATION_GUARD,
                json!({ "shadow_ban_user_agents": ["bot"] }),
            )])
            .unwrap();
        assert_eq!(
            host.dispatcher()
                .check_registration_for_spam(&test_registration("x", None, "spambot 1.0"))
                .await,
            RegistrationBehaviour::ShadowBan
        );
    }
}
