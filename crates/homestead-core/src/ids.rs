//! Validated identifiers for users, rooms and room aliases.
//!
//! All three share the `<sigil><localpart>:<server_name>` grammar. Parsing
//! only checks that shape; server names are not resolved.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{IdError, IdResult};

/// Check the shape of `value` and return the byte offset of its `:` separator.
fn parse_parts(kind: &'static str, sigil: char, value: &str) -> IdResult<usize> {
    let Some(rest) = value.strip_prefix(sigil) else {
        return Err(IdError::MissingSigil {
            kind,
            sigil,
            value: value.to_string(),
        });
    };

    let Some((localpart, server)) = rest.split_once(':') else {
        return Err(IdError::MissingServerName {
            kind,
            value: value.to_string(),
        });
    };

    if server.is_empty() {
        return Err(IdError::MissingServerName {
            kind,
            value: value.to_string(),
        });
    }

    if localpart.is_empty() || localpart.chars().any(char::is_whitespace) {
        return Err(IdError::InvalidLocalpart {
            kind,
            value: value.to_string(),
        });
    }

    // The sigil is ASCII, so it adds exactly one byte.
    Ok(localpart.len().saturating_add(1))
}

macro_rules! sigil_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal, $sigil:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name {
            value: String,
            #[serde(skip)]
            colon: usize,
        }

        impl $name {
            /// Parse and validate an identifier.
            ///
            /// # Errors
            ///
            /// Returns an [`IdError`] if the sigil, local part or server name is
            /// missing or malformed.
            pub fn new(value: impl Into<String>) -> IdResult<Self> {
                let value = value.into();
                let colon = parse_parts($kind, $sigil, &value)?;
                Ok(Self { value, colon })
            }

            /// The full identifier string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.value
            }

            /// The part between the sigil and the first `:`.
            #[must_use]
            pub fn localpart(&self) -> &str {
                self.value.get(1..self.colon).unwrap_or_default()
            }

            /// The part after the first `:`.
            #[must_use]
            pub fn server_name(&self) -> &str {
                self.value
                    .get(self.colon.saturating_add(1)..)
                    .unwrap_or_default()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.value
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::new(s).map_err(serde::de::Error::custom)
            }
        }
    };
}

sigil_id!(
    /// A user identifier, e.g. `@alice:example.org`.
    UserId,
    "user id",
    '@'
);

sigil_id!(
    /// A room identifier, e.g. `!abcdef:example.org`.
    RoomId,
    "room id",
    '!'
);

sigil_id!(
    /// A room alias, e.g. `#lobby:example.org`.
    RoomAlias,
    "room alias",
    '#'
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_parts() {
        let id = UserId::new("@alice:example.org").unwrap();
        assert_eq!(id.localpart(), "alice");
        assert_eq!(id.server_name(), "example.org");
        assert_eq!(id.to_string(), "@alice:example.org");
    }

    #[test]
    fn test_server_name_keeps_port() {
        let alias = RoomAlias::new("#lobby:example.org:8448").unwrap();
        assert_eq!(alias.localpart(), "lobby");
        assert_eq!(alias.server_name(), "example.org:8448");
    }

    #[test]
    fn test_wrong_sigil_rejected() {
        let err = RoomId::new("@alice:example.org").unwrap_err();
        assert!(matches!(err, IdError::MissingSigil { sigil: '!', .. }));
    }

    #[test]
    fn test_missing_server_rejected() {
        assert!(matches!(
            UserId::new("@alice"),
            Err(IdError::MissingServerName { .. })
        ));
        assert!(matches!(
            UserId::new("@alice:"),
            Err(IdError::MissingServerName { .. })
        ));
    }

    #[test]
    fn test_empty_localpart_rejected() {
        assert!(matches!(
            UserId::new("@:example.org"),
            Err(IdError::InvalidLocalpart { .. })
        ));
        assert!(matches!(
            UserId::new("@al ice:example.org"),
            Err(IdError::InvalidLocalpart { .. })
        ));
    }

    #[test]
    fn test_serde_roundtrip_validates() {
        let id: UserId = serde_json::from_str("\"@bob:example.org\"").unwrap();
        assert_eq!(id.localpart(), "bob");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"@bob:example.org\"");

        let bad: Result<UserId, _> = serde_json::from_str("\"bob\"");
        assert!(bad.is_err());
    }
}
