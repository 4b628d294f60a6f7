//! Prelude module - commonly used types for convenient import.
//!
//! Use `use homestead_modules::prelude::*;` to import all essential types.
//! Module authors usually need nothing else besides `homestead_core`.

// Errors
pub use crate::{
    CallbackError, CallbackResult, ConfigError, ConstructionError, RegistrationError,
    StartupError, StartupResult,
};

// Module contract
pub use crate::{
    Module, ModuleApi, ModuleConfig, ModuleDescriptor, ModuleFactory, ModuleFactoryRegistry,
    ModuleId, ModuleType, RawConfig, parse_typed,
};

// Hooks
pub use crate::hooks::{callback, sync_callback};
pub use crate::{
    AccountValidityCallbacks, AggregationPolicy, BindingInfo, Callback, Decision, FailureMode,
    HookSpec, SearchVisibility, SpamCheckerCallbacks,
};

// Resources
pub use crate::{ResourceHandler, ResourceRequest, ResourceResponse};

// Host
pub use crate::{
    CallbackFailure, ConstructionFailure, Dispatcher, FailureReporter, LoaderOptions, ModuleHost,
    ModuleLoader,
};
