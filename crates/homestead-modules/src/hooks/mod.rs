//! Hook categories, callbacks and their registry.

mod callback;
mod families;
mod registry;
mod spec;

pub use callback::{Callback, CallbackFuture, callback, sync_callback};
pub use families::{AccountValidityCallbacks, SpamCheckerCallbacks};
pub use registry::{BindingInfo, HookBinding, HookRegistry};
pub use spec::{
    AggregationPolicy, CheckEventForSpam, CheckMediaFileForSpam, CheckRegistrationForSpam,
    CheckUsernameForSpam, Decision, FailureMode, HookSpec, IsUserExpired, OnUserRegistration,
    SearchVisibility, Step, UserMayCreateRoom, UserMayCreateRoomAlias, UserMayInvite,
    UserMayPublishRoom, policy_of,
};
