//! Fixed account expiry list.

use std::collections::{HashSet, VecDeque};
use std::future::ready;
use std::sync::{Arc, Mutex};

use homestead_core::UserId;
use homestead_modules::{
    AccountValidityCallbacks, CallbackError, ConfigError, ConstructionError, Module, ModuleApi,
    RawConfig, parse_typed,
};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawExpiryConfig {
    #[serde(default)]
    expired_users: Vec<UserId>,
    #[serde(default = "default_roster_size")]
    roster_size: usize,
}

/// Recent registrations kept when `roster_size` is not configured.
pub const DEFAULT_ROSTER_SIZE: usize = 256;

fn default_roster_size() -> usize {
    DEFAULT_ROSTER_SIZE
}

/// Normalized [`ExpiryList`] configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiryConfig {
    /// Accounts reported as expired.
    pub expired_users: HashSet<UserId>,
    /// How many recent registrations the roster keeps.
    pub roster_size: usize,
}

#[derive(Debug)]
struct Roster {
    total: u64,
    recent: VecDeque<UserId>,
    capacity: usize,
}

impl Roster {
    fn new(capacity: usize) -> Self {
        Self {
            total: 0,
            recent: VecDeque::new(),
            capacity,
        }
    }

    fn record(&mut self, user_id: UserId) {
        self.total = self.total.saturating_add(1);
        if self.recent.len() == self.capacity {
            self.recent.pop_front();
        }
        self.recent.push_back(user_id);
    }
}

/// Answers `is_user_expired` for listed users and defers for everyone else.
///
/// Also counts the registrations it was told about and keeps the most
/// recent `roster_size` of them.
#[derive(Debug)]
pub struct ExpiryList {
    config: Arc<ExpiryConfig>,
    roster: Arc<Mutex<Roster>>,
}

impl ExpiryList {
    /// The most recent registrations, oldest first.
    #[must_use]
    pub fn registered(&self) -> Vec<UserId> {
        self.roster
            .lock()
            .map(|roster| roster.recent.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Registrations seen since the module started.
    #[must_use]
    pub fn registration_count(&self) -> u64 {
        self.roster.lock().map(|roster| roster.total).unwrap_or_default()
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &ExpiryConfig {
        &self.config
    }
}

impl Module for ExpiryList {
    type Config = ExpiryConfig;

    fn parse_config(raw: &RawConfig) -> Result<ExpiryConfig, ConfigError> {
        let raw: RawExpiryConfig = parse_typed(raw)?;
        if raw.roster_size == 0 {
            return Err(ConfigError::new("must be greater than zero").at("roster_size"));
        }
        Ok(ExpiryConfig {
            expired_users: raw.expired_users.into_iter().collect(),
            roster_size: raw.roster_size,
        })
    }

    fn new(config: Arc<ExpiryConfig>, api: &mut ModuleApi<'_>) -> Result<Self, ConstructionError> {
        let shared = Arc::new(Mutex::new(Roster::new(config.roster_size)));

        let expired = Arc::clone(&config);
        let roster = Arc::clone(&shared);
        api.register_account_validity_callbacks(
            AccountValidityCallbacks::new()
                .is_user_expired(move |user_id| {
                    ready(Ok(expired.expired_users.contains(&user_id).then_some(true)))
                })
                .on_user_registration(move |user_id: UserId| {
                    let result = roster
                        .lock()
                        .map(|mut roster| {
                            debug!(user_id = %user_id, "Recorded registration");
                            roster.record(user_id);
                        })
                        .map_err(|_| CallbackError::failed("registration roster lock poisoned"));
                    ready(result)
                }),
        );

        Ok(Self {
            config,
            roster: shared,
        })
    }
}
