//! Homestead Core - Foundation types shared by the Homestead module host.
//!
//! This crate provides:
//! - Validated identifiers for users, rooms and room aliases
//! - The payloads handed to module callbacks (profiles, events, media, registrations)
//! - The closed set of hook categories modules can bind to
//!
//! It has no dependencies on other internal crates so that module authors
//! can depend on it without pulling in the dispatch engine.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod error;
pub mod hook_category;
pub mod ids;
pub mod types;

pub use error::{IdError, IdResult};
pub use hook_category::{HookCategory, HookFamily};
pub use ids::{RoomAlias, RoomId, UserId};
pub use types::{
    AliasRequest, EventPayload, FileInfo, InviteRequest, MediaContent, MediaUpload,
    PublishRequest, RegistrationBehaviour, RegistrationRequest, RequestInfo, SpamCheck,
    UserProfile,
};
