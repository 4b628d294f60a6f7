//! Homestead Stock Modules - Modules shipped with the host.
//!
//! - [`KeywordSpamChecker`] flags events and display names containing keywords
//! - [`RoomPolicy`] gates room creation, aliases, publishing, invites and uploads
//! - [`RegistrationGuard`] denies or shadow-bans registrations
//! - [`ExpiryList`] answers account validity queries from a fixed list
//!
//! Call [`register_stock_modules`] to make them loadable by reference.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod expiry;
pub mod keyword;
pub mod registration_guard;
pub mod room_policy;

pub use expiry::ExpiryList;
pub use keyword::KeywordSpamChecker;
pub use registration_guard::RegistrationGuard;
pub use room_policy::RoomPolicy;

use homestead_modules::ModuleFactoryRegistry;

/// Load reference of [`KeywordSpamChecker`].
pub const KEYWORD_SPAM_CHECKER: &str = "homestead.stock.KeywordSpamChecker";
/// Load reference of [`RoomPolicy`].
pub const ROOM_POLICY: &str = "homestead.stock.RoomPolicy";
/// Load reference of [`RegistrationGuard`].
pub const REGISTRATION_GUARD: &str = "homestead.stock.RegistrationGuard";
/// Load reference of [`ExpiryList`].
pub const EXPIRY_LIST: &str = "homestead.stock.ExpiryList";

/// Register every stock module under its load reference.
pub fn register_stock_modules(registry: &mut ModuleFactoryRegistry) -> &mut ModuleFactoryRegistry {
    registry
        .register::<KeywordSpamChecker>(KEYWORD_SPAM_CHECKER)
        .register::<RoomPolicy>(ROOM_POLICY)
        .register::<RegistrationGuard>(REGISTRATION_GUARD)
        .register::<ExpiryList>(EXPIRY_LIST)
}

/// A factory registry holding only the stock modules.
#[must_use]
pub fn stock_registry() -> ModuleFactoryRegistry {
    let mut registry = ModuleFactoryRegistry::new();
    register_stock_modules(&mut registry);
    registry
}
