//! Hook categories shared across crates.
//!
//! `HookCategory` lives in `homestead-core` so that configuration, the
//! dispatch engine and the CLI can all name categories without depending
//! on one another.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::IdError;

/// Extension points a module can bind callbacks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookCategory {
    /// Classify a room event as spam.
    CheckEventForSpam,
    /// May a user invite another user to a room.
    UserMayInvite,
    /// May a user create a room.
    UserMayCreateRoom,
    /// May a user create a room alias.
    UserMayCreateRoomAlias,
    /// May a user publish a room to the public directory.
    UserMayPublishRoom,
    /// Should a profile be hidden from user directory search.
    CheckUsernameForSpam,
    /// Classify a registration attempt.
    CheckRegistrationForSpam,
    /// May an uploaded media file be stored.
    CheckMediaFileForSpam,
    /// Has a user account expired.
    IsUserExpired,
    /// A user has just registered.
    OnUserRegistration,
}

impl HookCategory {
    /// Every category, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::CheckEventForSpam,
        Self::UserMayInvite,
        Self::UserMayCreateRoom,
        Self::UserMayCreateRoomAlias,
        Self::UserMayPublishRoom,
        Self::CheckUsernameForSpam,
        Self::CheckRegistrationForSpam,
        Self::CheckMediaFileForSpam,
        Self::IsUserExpired,
        Self::OnUserRegistration,
    ];

    /// The snake_case name used in logs and on the command line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CheckEventForSpam => "check_event_for_spam",
            Self::UserMayInvite => "user_may_invite",
            Self::UserMayCreateRoom => "user_may_create_room",
            Self::UserMayCreateRoomAlias => "user_may_create_room_alias",
            Self::UserMayPublishRoom => "user_may_publish_room",
            Self::CheckUsernameForSpam => "check_username_for_spam",
            Self::CheckRegistrationForSpam => "check_registration_for_spam",
            Self::CheckMediaFileForSpam => "check_media_file_for_spam",
            Self::IsUserExpired => "is_user_expired",
            Self::OnUserRegistration => "on_user_registration",
        }
    }

    /// The callback family this category is registered through.
    #[must_use]
    pub fn family(self) -> HookFamily {
        match self {
            Self::IsUserExpired | Self::OnUserRegistration => HookFamily::AccountValidity,
            _ => HookFamily::SpamChecker,
        }
    }
}

impl fmt::Display for HookCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookCategory {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| IdError::UnknownCategory {
                value: s.to_string(),
            })
    }
}

/// Groups of categories registered together by a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookFamily {
    /// Spam checking and authorization callbacks.
    SpamChecker,
    /// Account validity callbacks.
    AccountValidity,
}

impl fmt::Display for HookFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpamChecker => write!(f, "spam_checker"),
            Self::AccountValidity => write!(f, "account_validity"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_category_display() {
        assert_eq!(HookCategory::UserMayInvite.to_string(), "user_may_invite");
        assert_eq!(
            HookCategory::CheckRegistrationForSpam.to_string(),
            "check_registration_for_spam"
        );
    }

    #[test]
    fn test_display_matches_serde() {
        for category in HookCategory::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{category}\""));
        }
    }

    #[test]
    fn test_from_str_accepts_dashes() {
        assert_eq!(
            "user-may-create-room".parse::<HookCategory>(),
            Ok(HookCategory::UserMayCreateRoom)
        );
        assert_eq!(
            "nope".parse::<HookCategory>(),
            Err(IdError::UnknownCategory {
                value: "nope".to_string()
            })
        );
    }

    #[test]
    fn test_family() {
        assert_eq!(HookCategory::IsUserExpired.family(), HookFamily::AccountValidity);
        assert_eq!(HookCategory::CheckEventForSpam.family(), HookFamily::SpamChecker);
    }
}
