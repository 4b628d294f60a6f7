//! Identifier and hook category parsing errors.

use thiserror::Error;

/// Errors raised when parsing a user, room or alias identifier, or a hook
/// category name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// The identifier does not start with the expected sigil.
    #[error("{kind} must start with '{sigil}': {value}")]
    MissingSigil {
        /// Identifier kind (e.g. "user id").
        kind: &'static str,
        /// The expected sigil.
        sigil: char,
        /// The rejected value.
        value: String,
    },

    /// The identifier has no `:server_name` part.
    #[error("{kind} must contain a server name: {value}")]
    MissingServerName {
        /// Identifier kind.
        kind: &'static str,
        /// The rejected value.
        value: String,
    },

    /// The local part is empty or contains whitespace.
    #[error("{kind} has an invalid local part: {value}")]
    InvalidLocalpart {
        /// Identifier kind.
        kind: &'static str,
        /// The rejected value.
        value: String,
    },

    /// The name matches no hook category.
    #[error("unknown hook category: {value}")]
    UnknownCategory {
        /// The rejected value.
        value: String,
    },
}

/// Result type for identifier parsing.
pub type IdResult<T> = Result<T, IdError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IdError::MissingSigil {
            kind: "user id",
            sigil: '@',
            value: "alice:example.org".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "user id must start with '@': alice:example.org"
        );
    }
}
