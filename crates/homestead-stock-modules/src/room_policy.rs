//! Room policy: who may create rooms and aliases, publish, invite and upload.
//!
//! Only the checks that are configured get bound. The first instance also
//! serves a status resource at [`STATUS_PATH`]; later instances run without one.

use std::collections::BTreeSet;
use std::future::ready;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use globset::{Glob, GlobSet, GlobSetBuilder};
use homestead_core::{HookCategory, MediaUpload};
use homestead_modules::{
    ConfigError, ConstructionError, Module, ModuleApi, RawConfig, RegistrationError,
    ResourceHandler, ResourceRequest, ResourceResponse, SpamCheckerCallbacks, parse_typed,
};
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

/// Path of the policy status resource.
pub const STATUS_PATH: &str = "/_homestead/room_policy/status";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRoomPolicyConfig {
    #[serde(default)]
    room_creators: Vec<String>,
    #[serde(default)]
    alias_patterns: Vec<String>,
    #[serde(default = "default_true")]
    allow_publishing: bool,
    #[serde(default)]
    max_upload_bytes: Option<u64>,
    #[serde(default)]
    invite_blocklist: Vec<String>,
}

fn default_true() -> bool {
    true
}

/// Normalized [`RoomPolicy`] configuration.
#[derive(Debug)]
pub struct RoomPolicyConfig {
    /// Patterns a user id must fully match to create rooms. Empty allows everyone.
    pub room_creators: Vec<Regex>,
    /// Globs an alias localpart must match. Empty allows any.
    pub alias_patterns: Vec<String>,
    alias_set: GlobSet,
    /// Whether rooms may be published to the directory.
    pub allow_publishing: bool,
    /// Upper bound on uploaded file size.
    pub max_upload_bytes: Option<u64>,
    /// Servers whose users may not be invited.
    pub invite_blocklist: BTreeSet<String>,
}

impl RoomPolicyConfig {
    fn may_create_room(&self, user_id: &str) -> bool {
        self.room_creators.is_empty() || self.room_creators.iter().any(|re| re.is_match(user_id))
    }

    fn may_use_alias(&self, localpart: &str) -> bool {
        self.alias_patterns.is_empty() || self.alias_set.is_match(localpart)
    }

    fn may_invite_from(&self, server_name: &str) -> bool {
        !self.invite_blocklist.contains(server_name)
    }

    fn may_store(&self, upload: &MediaUpload) -> bool {
        let len = u64::try_from(upload.content.len()).unwrap_or(u64::MAX);
        self.max_upload_bytes.is_none_or(|max| len <= max)
    }
}

#[derive(Debug, Default)]
struct PolicyStats {
    denials: AtomicU64,
}

impl PolicyStats {
    fn record(&self, category: HookCategory, subject: &str, allowed: bool) -> bool {
        if !allowed {
            self.denials.fetch_add(1, Ordering::Relaxed);
            debug!(%category, subject, "Room policy denied request");
        }
        allowed
    }
}

/// Gates room creation, aliases, publishing, invites and uploads.
#[derive(Debug)]
pub struct RoomPolicy {
    config: Arc<RoomPolicyConfig>,
    stats: Arc<PolicyStats>,
    serves_status: bool,
}

impl RoomPolicy {
    /// Requests denied so far.
    #[must_use]
    pub fn denials(&self) -> u64 {
        self.stats.denials.load(Ordering::Relaxed)
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &RoomPolicyConfig {
        &self.config
    }

    /// Whether this instance owns the status resource.
    #[must_use]
    pub fn serves_status(&self) -> bool {
        self.serves_status
    }
}

impl Module for RoomPolicy {
    type Config = RoomPolicyConfig;

    fn parse_config(raw: &RawConfig) -> Result<RoomPolicyConfig, ConfigError> {
        let raw: RawRoomPolicyConfig = parse_typed(raw)?;

        let room_creators = raw
            .room_creators
            .iter()
            .enumerate()
            .map(|(i, pattern)| {
                Regex::new(&format!("^(?:{pattern})$"))
                    .map_err(|e| ConfigError::new(e.to_string()).at(format!("room_creators[{i}]")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut builder = GlobSetBuilder::new();
        for (i, pattern) in raw.alias_patterns.iter().enumerate() {
            let glob = Glob::new(pattern)
                .map_err(|e| ConfigError::new(e.to_string()).at(format!("alias_patterns[{i}]")))?;
            builder.add(glob);
        }
        let alias_set = builder
            .build()
            .map_err(|e| ConfigError::new(e.to_string()).at("alias_patterns"))?;

        if raw.max_upload_bytes == Some(0) {
            return Err(ConfigError::new("must be greater than zero").at("max_upload_bytes"));
        }

        Ok(RoomPolicyConfig {
            room_creators,
            alias_patterns: raw.alias_patterns,
            alias_set,
            allow_publishing: raw.allow_publishing,
            max_upload_bytes: raw.max_upload_bytes,
            invite_blocklist: raw.invite_blocklist.into_iter().collect(),
        })
    }

    fn new(config: Arc<RoomPolicyConfig>, api: &mut ModuleApi<'_>) -> Result<Self, ConstructionError> {
        let stats = Arc::new(PolicyStats::default());
        let mut callbacks = SpamCheckerCallbacks::new();

        if !config.room_creators.is_empty() {
            let (config, stats) = (Arc::clone(&config), Arc::clone(&stats));
            callbacks = callbacks.user_may_create_room(move |user_id| {
                let allowed = config.may_create_room(user_id.as_str());
                ready(Ok(stats.record(HookCategory::UserMayCreateRoom, user_id.as_str(), allowed)))
            });
        }
        if !config.alias_patterns.is_empty() {
            let (config, stats) = (Arc::clone(&config), Arc::clone(&stats));
            callbacks = callbacks.user_may_create_room_alias(move |request| {
                let allowed = config.may_use_alias(request.alias.localpart());
                ready(Ok(stats.record(
                    HookCategory::UserMayCreateRoomAlias,
                    request.alias.as_str(),
                    allowed,
                )))
            });
        }
        if !config.allow_publishing {
            let stats = Arc::clone(&stats);
            callbacks = callbacks.user_may_publish_room(move |request| {
                ready(Ok(stats.record(
                    HookCategory::UserMayPublishRoom,
                    request.room_id.as_str(),
                    false,
                )))
            });
        }
        if !config.invite_blocklist.is_empty() {
            let (config, stats) = (Arc::clone(&config), Arc::clone(&stats));
            callbacks = callbacks.user_may_invite(move |request| {
                let allowed = config.may_invite_from(request.invitee.server_name());
                ready(Ok(stats.record(
                    HookCategory::UserMayInvite,
                    request.invitee.as_str(),
                    allowed,
                )))
            });
        }
        if config.max_upload_bytes.is_some() {
            let (config, stats) = (Arc::clone(&config), Arc::clone(&stats));
            callbacks = callbacks.check_media_file_for_spam(move |upload| {
                let allowed = config.may_store(&upload);
                ready(Ok(stats.record(
                    HookCategory::CheckMediaFileForSpam,
                    &upload.info.media_id,
                    allowed,
                )))
            });
        }

        api.register_spam_checker_callbacks(callbacks);
        let status = StatusResource {
            config: Arc::clone(&config),
            stats: Arc::clone(&stats),
        };
        let serves_status = match api.register_web_resource(STATUS_PATH, status) {
            Ok(()) => true,
            Err(RegistrationError::PathTaken { owner, .. }) => {
                warn!(
                    module = %api.module_id(),
                    %owner,
                    path = STATUS_PATH,
                    "Status resource already served, running without one"
                );
                false
            },
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            config,
            stats,
            serves_status,
        })
    }
}

struct StatusResource {
    config: Arc<RoomPolicyConfig>,
    stats: Arc<PolicyStats>,
}

#[async_trait]
impl ResourceHandler for StatusResource {
    async fn handle(&self, request: ResourceRequest) -> ResourceResponse {
        if request.method != "GET" {
            return ResourceResponse::method_not_allowed();
        }
        ResourceResponse::ok(json!({
            "room_creators": self.config.room_creators.iter().map(Regex::as_str).collect::<Vec<_>>(),
            "alias_patterns": self.config.alias_patterns,
            "allow_publishing": self.config.allow_publishing,
            "max_upload_bytes": self.config.max_upload_bytes,
            "invite_blocklist": self.config.invite_blocklist,
            "denials": self.stats.denials.load(Ordering::Relaxed),
        }))
    }
}
