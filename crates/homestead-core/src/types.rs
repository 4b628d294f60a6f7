//! Payloads passed to module callbacks and the classifications they return.
//!
//! Every payload is an owned, `Clone` value. The dispatch engine hands each
//! callback its own copy, so nothing a callback does to its argument is
//! visible to the host or to the next callback.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ids::{RoomAlias, RoomId, UserId};

/// Public profile of a user, as shown in the user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// The user the profile belongs to.
    pub user_id: UserId,
    /// Display name, if set.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Avatar content URI, if set.
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl UserProfile {
    /// Create a profile with no display name or avatar.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            display_name: None,
            avatar_url: None,
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Set the avatar URL.
    #[must_use]
    pub fn with_avatar_url(mut self, avatar_url: impl Into<String>) -> Self {
        self.avatar_url = Some(avatar_url.into());
        self
    }
}

/// A room event submitted for spam classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPayload {
    /// Event identifier.
    pub event_id: String,
    /// Room the event was sent to.
    pub room_id: RoomId,
    /// Sender of the event.
    pub sender: UserId,
    /// Event type, e.g. `m.room.message`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event content.
    #[serde(default)]
    pub content: serde_json::Value,
}

impl EventPayload {
    /// Create an `m.room.message` event with a text body.
    #[must_use]
    pub fn message(
        event_id: impl Into<String>,
        room_id: RoomId,
        sender: UserId,
        body: impl Into<String>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            room_id,
            sender,
            event_type: "m.room.message".to_string(),
            content: serde_json::json!({ "msgtype": "m.text", "body": body.into() }),
        }
    }

    /// The `body` field of the content, if it is a string.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.content.get("body").and_then(serde_json::Value::as_str)
    }
}

/// Arguments of `user_may_invite`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteRequest {
    /// User sending the invite.
    pub inviter: UserId,
    /// User being invited.
    pub invitee: UserId,
    /// Room the invite is for.
    pub room_id: RoomId,
}

/// Arguments of `user_may_create_room_alias`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRequest {
    /// User creating the alias.
    pub user_id: UserId,
    /// The alias being created.
    pub alias: RoomAlias,
}

/// Arguments of `user_may_publish_room`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    /// User publishing the room.
    pub user_id: UserId,
    /// Room being added to the public directory.
    pub room_id: RoomId,
}

/// One `(user agent, ip)` pair seen during a registration attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestInfo {
    /// User agent header value.
    pub user_agent: String,
    /// Client IP address.
    pub ip: String,
}

impl RequestInfo {
    /// Create a request info pair.
    #[must_use]
    pub fn new(user_agent: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            ip: ip.into(),
        }
    }
}

/// Arguments of `check_registration_for_spam`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    /// Email threepid used to register, if any.
    #[serde(default)]
    pub email: Option<String>,
    /// Requested username, if any.
    #[serde(default)]
    pub username: Option<String>,
    /// Every `(user agent, ip)` pair seen during the registration flow.
    #[serde(default)]
    pub request_info: BTreeSet<RequestInfo>,
    /// Identifier of the SSO provider, if registration went through one.
    #[serde(default)]
    pub auth_provider_id: Option<String>,
}

/// Immutable bytes of an uploaded media file.
///
/// Cloning shares the buffer; the bytes can never be mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaContent(Arc<[u8]>);

impl MediaContent {
    /// Wrap uploaded bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    /// The file contents.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Metadata of an uploaded media file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Media identifier assigned by the server.
    pub media_id: String,
    /// Server that owns the media.
    pub server_name: String,
    /// Original file name supplied by the uploader.
    #[serde(default)]
    pub upload_name: Option<String>,
    /// Declared content type.
    #[serde(default)]
    pub media_type: Option<String>,
    /// Length in bytes.
    pub media_length: u64,
    /// Whether the file is a generated thumbnail.
    #[serde(default)]
    pub thumbnail: bool,
}

/// Arguments of `check_media_file_for_spam`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUpload {
    /// File contents.
    pub content: MediaContent,
    /// File metadata.
    pub info: FileInfo,
}

/// Answer of a `check_event_for_spam` callback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "result", content = "reason")]
pub enum SpamCheck {
    /// Not spam, or no opinion. Defers to the next module.
    #[default]
    NotSpam,
    /// Spam; reject with the server's default message.
    Spam,
    /// Spam; reject with the given message.
    SpamWithReason(String),
}

impl SpamCheck {
    /// Whether the event should be rejected.
    #[must_use]
    pub fn is_spam(&self) -> bool {
        !matches!(self, Self::NotSpam)
    }

    /// The rejection reason, if one was given.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::SpamWithReason(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Answer of a `check_registration_for_spam` callback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationBehaviour {
    /// Allow the registration, or no opinion. Defers to the next module.
    #[default]
    Allow,
    /// Allow the registration but shadow-ban the new account.
    ShadowBan,
    /// Deny the registration.
    Deny,
}
