//! Homestead Modules - Module host, hook registry and dispatch engine.
//!
//! This crate provides:
//! - The module contract ([`Module`], [`ModuleFactory`]) and factory registry
//! - The startup instantiator ([`ModuleLoader`]) producing a [`ModuleHost`]
//! - The capability handle modules register through ([`ModuleApi`])
//! - The web resource registry
//! - Per-category callback bindings and the decision-aggregating
//!   [`Dispatcher`]
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use homestead_modules::prelude::*;
//!
//! struct DenyEveryone;
//!
//! impl Module for DenyEveryone {
//!     type Config = ();
//!
//!     fn parse_config(_raw: &RawConfig) -> Result<(), ConfigError> {
//!         Ok(())
//!     }
//!
//!     fn new(_config: Arc<()>, api: &mut ModuleApi<'_>) -> Result<Self, ConstructionError> {
//!         api.register_spam_checker_callbacks(
//!             SpamCheckerCallbacks::new().user_may_create_room(|_| async { Ok(false) }),
//!         );
//!         Ok(Self)
//!     }
//! }
//!
//! let mut factories = ModuleFactoryRegistry::new();
//! factories.register::<DenyEveryone>("example.DenyEveryone");
//!
//! let host = ModuleLoader::new(factories)
//!     .load([ModuleDescriptor::new("example.DenyEveryone")])
//!     .unwrap();
//! assert_eq!(host.modules().len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod api;
pub mod dispatch;
pub mod error;
pub mod hooks;
pub mod loader;
pub mod module;
pub mod observability;
pub mod resource;

pub use api::ModuleApi;
pub use dispatch::Dispatcher;
pub use error::{
    CallbackError, CallbackResult, ConfigError, ConstructionError, RegistrationError,
    StartupError, StartupResult,
};
pub use hooks::{
    AccountValidityCallbacks, AggregationPolicy, BindingInfo, Callback, Decision, FailureMode,
    HookRegistry, HookSpec, SearchVisibility, SpamCheckerCallbacks,
};
pub use loader::{
    ConstructionFailure, LoaderOptions, ModuleHost, ModuleInstance, ModuleLoader, SkippedModule,
};
pub use module::{
    Module, ModuleConfig, ModuleDescriptor, ModuleFactory, ModuleFactoryRegistry, ModuleId,
    ModuleType, RawConfig, parse_typed,
};
pub use observability::{CallbackFailure, FailureReporter, TracingReporter};
pub use resource::{
    RESERVED_PREFIX, ResourceHandler, ResourceRegistry, ResourceRequest, ResourceResponse,
};
