//! Prelude module - commonly used types for convenient import.
//!
//! Use `use homestead_core::prelude::*;` to import all essential types.

// Errors
pub use crate::{IdError, IdResult};

// Identifiers
pub use crate::{RoomAlias, RoomId, UserId};

// Hook categories
pub use crate::{HookCategory, HookFamily};

// Callback payloads and outputs
pub use crate::{
    AliasRequest, EventPayload, FileInfo, InviteRequest, MediaContent, MediaUpload,
    PublishRequest, RegistrationBehaviour, RegistrationRequest, RequestInfo, SpamCheck,
    UserProfile,
};
