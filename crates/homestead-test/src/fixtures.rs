//! Test fixtures for common types.
//!
//! Every identifier lives on the `test.local` server.

use std::collections::BTreeSet;

use homestead_core::{
    EventPayload, FileInfo, MediaContent, MediaUpload, RegistrationRequest, RequestInfo,
    RoomAlias, RoomId, UserId, UserProfile,
};
use homestead_modules::{ModuleDescriptor, RawConfig};

/// Server name of every fixture identifier.
pub const TEST_SERVER: &str = "test.local";

/// Create a user id `@{localpart}:test.local`.
///
/// # Panics
///
/// Panics if `localpart` is not a valid localpart.
#[must_use]
pub fn test_user(localpart: &str) -> UserId {
    UserId::new(format!("@{localpart}:{TEST_SERVER}")).expect("valid test user id")
}

/// Create a user id on another server.
///
/// # Panics
///
/// Panics if the parts do not form a valid user id.
#[must_use]
pub fn test_remote_user(localpart: &str, server: &str) -> UserId {
    UserId::new(format!("@{localpart}:{server}")).expect("valid remote user id")
}

/// Create a room id `!{localpart}:test.local`.
///
/// # Panics
///
/// Panics if `localpart` is not a valid localpart.
#[must_use]
pub fn test_room(localpart: &str) -> RoomId {
    RoomId::new(format!("!{localpart}:{TEST_SERVER}")).expect("valid test room id")
}

/// Create a room alias `#{localpart}:test.local`.
///
/// # Panics
///
/// Panics if `localpart` is not a valid localpart.
#[must_use]
pub fn test_alias(localpart: &str) -> RoomAlias {
    RoomAlias::new(format!("#{localpart}:{TEST_SERVER}")).expect("valid test alias")
}

/// Create a profile with a display name.
#[must_use]
pub fn test_profile(localpart: &str, display_name: &str) -> UserProfile {
    UserProfile::new(test_user(localpart)).with_display_name(display_name)
}

/// Create an `m.room.message` event from `sender` in `!room:test.local`.
#[must_use]
pub fn test_event(sender: &str, body: &str) -> EventPayload {
    EventPayload::message("$event:test.local", test_room("room"), test_user(sender), body)
}

/// Create an upload of `len` zero bytes.
#[must_use]
pub fn test_media(len: usize, media_type: &str) -> MediaUpload {
    MediaUpload {
        content: MediaContent::new(vec![0_u8; len]),
        info: FileInfo {
            media_id: "media0".to_string(),
            server_name: TEST_SERVER.to_string(),
            upload_name: Some("upload.bin".to_string()),
            media_type: Some(media_type.to_string()),
            media_length: u64::try_from(len).unwrap_or(u64::MAX),
            thumbnail: false,
        },
    }
}

/// Create a registration request.
#[must_use]
pub fn test_registration(
    username: &str,
    email: Option<&str>,
    user_agent: &str,
) -> RegistrationRequest {
    RegistrationRequest {
        email: email.map(str::to_string),
        username: Some(username.to_string()),
        request_info: BTreeSet::from([RequestInfo::new(user_agent, "203.0.113.7")]),
        auth_provider_id: None,
    }
}

/// Convert a JSON object into a raw module config.
///
/// Non-object values give an empty config.
#[must_use]
pub fn raw_config(value: serde_json::Value) -> RawConfig {
    match value {
        serde_json::Value::Object(map) => map,
        _ => RawConfig::new(),
    }
}

/// Create a module descriptor.
#[must_use]
pub fn descriptor(reference: &str, config: serde_json::Value) -> ModuleDescriptor {
    ModuleDescriptor::new(reference).with_config(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_ids() {
        assert_eq!(test_user("alice").as_str(), "@alice:test.local");
        assert_eq!(test_room("r").server_name(), "test.local");
        assert_eq!(test_alias("lobby").localpart(), "lobby");
        assert_eq!(test_remote_user("bob", "evil.example").server_name(), "evil.example");
    }

    #[test]
    fn test_media_fixture() {
        let upload = test_media(16, "image/png");
        assert_eq!(upload.content.len(), 16);
        assert_eq!(upload.info.media_length, 16);
    }

    #[test]
    fn test_raw_config() {
        assert!(raw_config(serde_json::json!([1])).is_empty());
        assert_eq!(raw_config(serde_json::json!({ "a": 1 })).len(), 1);
    }
}
