//! Decision aggregation.
//!
//! A dispatch walks the callbacks bound to one category in registration
//! order, one at a time. Each callback gets its own clone of the arguments.
//! Its answer is folded with the category's policy, and the walk stops at
//! the first decisive answer. A callback that errors or panics is reported
//! and folded as the category's conservative outcome; dispatch itself never
//! fails.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use homestead_core::{
    AliasRequest, EventPayload, InviteRequest, MediaUpload, PublishRequest, RegistrationBehaviour,
    RegistrationRequest, RoomAlias, RoomId, SpamCheck, UserId, UserProfile,
};
use tracing::{Instrument, debug, debug_span};
use uuid::Uuid;

use crate::error::{CallbackError, CallbackResult};
use crate::hooks::{
    CheckEventForSpam, CheckMediaFileForSpam, CheckRegistrationForSpam, CheckUsernameForSpam,
    Decision, FailureMode, HookBinding, HookRegistry, HookSpec, IsUserExpired,
    OnUserRegistration, SearchVisibility, Step, UserMayCreateRoom, UserMayCreateRoomAlias,
    UserMayInvite, UserMayPublishRoom,
};
use crate::observability::{CallbackFailure, FailureReporter, TracingReporter};

/// Runs hook dispatches against a frozen [`HookRegistry`].
///
/// Cheap to clone; clones share the registry and the reporter.
#[derive(Clone)]
pub struct Dispatcher {
    hooks: Arc<HookRegistry>,
    reporter: Arc<dyn FailureReporter>,
    failure_mode: FailureMode,
}

impl Dispatcher {
    /// Create a dispatcher reporting faults through `tracing`.
    #[must_use]
    pub fn new(hooks: Arc<HookRegistry>) -> Self {
        Self {
            hooks,
            reporter: Arc::new(TracingReporter),
            failure_mode: FailureMode::default(),
        }
    }

    /// Report callback faults to `reporter` instead.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn FailureReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Set how authorization hooks treat a failed callback.
    #[must_use]
    pub fn with_failure_mode(mut self, mode: FailureMode) -> Self {
        self.failure_mode = mode;
        self
    }

    /// How authorization hooks treat a failed callback.
    #[must_use]
    pub fn failure_mode(&self) -> FailureMode {
        self.failure_mode
    }

    /// The registry this dispatcher reads.
    #[must_use]
    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    /// Dispatch category `H` and return the aggregated verdict.
    pub async fn dispatch<H: HookSpec>(&self, args: H::Args) -> H::Verdict {
        let bindings = self.hooks.bindings::<H>();
        if bindings.is_empty() {
            return H::default_verdict();
        }

        let span = debug_span!(
            "dispatch",
            category = %H::CATEGORY,
            dispatch_id = %Uuid::new_v4(),
            callbacks = bindings.len(),
        );
        self.run(bindings, args).instrument(span).await
    }

    async fn run<H: HookSpec>(&self, bindings: &[HookBinding<H>], args: H::Args) -> H::Verdict {
        for binding in bindings {
            let step = match invoke(binding, args.clone()).await {
                Ok(output) => H::fold(output),
                Err(error) => {
                    self.report::<H>(binding, error);
                    H::on_failure(self.failure_mode)
                },
            };

            if let Step::Decide(verdict) = step {
                debug!(
                    module = %binding.owner(),
                    sequence = binding.sequence(),
                    policy = %H::POLICY,
                    "callback decided"
                );
                return verdict;
            }
        }

        debug!(policy = %H::POLICY, "no callback decided, using default");
        H::default_verdict()
    }

    fn report<H: HookSpec>(&self, binding: &HookBinding<H>, error: CallbackError) {
        let failure = CallbackFailure::new(binding.owner().clone(), H::CATEGORY, error);
        self.reporter.callback_failed(&failure);
    }

    /// Is an event spam.
    pub async fn check_event_for_spam(&self, event: &EventPayload) -> SpamCheck {
        self.dispatch::<CheckEventForSpam>(event.clone()).await
    }

    /// May `inviter` invite `invitee` to `room_id`.
    pub async fn user_may_invite(
        &self,
        inviter: &UserId,
        invitee: &UserId,
        room_id: &RoomId,
    ) -> Decision {
        self.dispatch::<UserMayInvite>(InviteRequest {
            inviter: inviter.clone(),
            invitee: invitee.clone(),
            room_id: room_id.clone(),
        })
        .await
    }

    /// May `user_id` create a room.
    pub async fn user_may_create_room(&self, user_id: &UserId) -> Decision {
        self.dispatch::<UserMayCreateRoom>(user_id.clone()).await
    }

    /// May `user_id` create `alias`.
    pub async fn user_may_create_room_alias(&self, user_id: &UserId, alias: &RoomAlias) -> Decision {
        self.dispatch::<UserMayCreateRoomAlias>(AliasRequest {
            user_id: user_id.clone(),
            alias: alias.clone(),
        })
        .await
    }

    /// May `user_id` publish `room_id` to the room directory.
    pub async fn user_may_publish_room(&self, user_id: &UserId, room_id: &RoomId) -> Decision {
        self.dispatch::<UserMayPublishRoom>(PublishRequest {
            user_id: user_id.clone(),
            room_id: room_id.clone(),
        })
        .await
    }

    /// Should a profile be hidden from user directory search.
    pub async fn check_username_for_spam(&self, profile: &UserProfile) -> SearchVisibility {
        self.dispatch::<CheckUsernameForSpam>(profile.clone()).await
    }

    /// How to treat a registration attempt.
    pub async fn check_registration_for_spam(
        &self,
        request: &RegistrationRequest,
    ) -> RegistrationBehaviour {
        self.dispatch::<CheckRegistrationForSpam>(request.clone())
            .await
    }

    /// May an uploaded file be stored.
    pub async fn check_media_file_for_spam(&self, upload: &MediaUpload) -> Decision {
        self.dispatch::<CheckMediaFileForSpam>(upload.clone()).await
    }

    /// Has `user_id`'s account expired.
    pub async fn is_user_expired(&self, user_id: &UserId) -> bool {
        self.dispatch::<IsUserExpired>(user_id.clone()).await
    }

    /// Tell every module that `user_id` has registered.
    pub async fn on_user_registration(&self, user_id: &UserId) {
        self.dispatch::<OnUserRegistration>(user_id.clone()).await;
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("hooks", &self.hooks)
            .field("failure_mode", &self.failure_mode)
            .finish_non_exhaustive()
    }
}

/// Call one callback with panics caught both when it is called and while
/// its future is polled.
async fn invoke<H: HookSpec>(
    binding: &HookBinding<H>,
    args: H::Args,
) -> CallbackResult<H::Output> {
    let callback = binding.callback();
    let future = match std::panic::catch_unwind(AssertUnwindSafe(|| callback.call(args))) {
        Ok(future) => future,
        Err(payload) => return Err(CallbackError::Panicked(panic_message(payload.as_ref()))),
    };

    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(CallbackError::Panicked(panic_message(payload.as_ref()))),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::hooks::{Callback, sync_callback};
    use crate::module::ModuleId;

    #[derive(Default)]
    struct Collect(Mutex<Vec<CallbackFailure>>);

    impl FailureReporter for Collect {
        fn callback_failed(&self, failure: &CallbackFailure) {
            self.0.lock().unwrap().push(failure.clone());
        }
    }

    fn alice() -> UserId {
        UserId::new("@alice:example.org").unwrap()
    }

    fn module(index: usize) -> ModuleId {
        ModuleId::new(index, format!("test.M{index}"))
    }

    fn calls() -> Arc<Mutex<Vec<usize>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn veto(
        index: usize,
        answer: bool,
        log: &Arc<Mutex<Vec<usize>>>,
    ) -> Callback<UserMayCreateRoom> {
        let log = Arc::clone(log);
        sync_callback::<UserMayCreateRoom, _>(move |_| {
            log.lock().unwrap().push(index);
            Ok(answer)
        })
    }

    #[tokio::test]
    async fn test_no_bindings_default_verdict() {
        let dispatcher = Dispatcher::new(Arc::new(HookRegistry::new()));
        assert_eq!(dispatcher.user_may_create_room(&alice()).await, Decision::Allow);
        assert_eq!(
            dispatcher
                .check_registration_for_spam(&RegistrationRequest::default())
                .await,
            RegistrationBehaviour::Allow
        );
        assert!(!dispatcher.is_user_expired(&alice()).await);
    }

    #[tokio::test]
    async fn test_veto_short_circuits() {
        let log = calls();
        let mut hooks = HookRegistry::new();
        hooks.bind(module(0), veto(0, true, &log));
        hooks.bind(module(1), veto(1, false, &log));
        hooks.bind(module(2), veto(2, true, &log));

        let dispatcher = Dispatcher::new(Arc::new(hooks));
        assert_eq!(dispatcher.user_may_create_room(&alice()).await, Decision::Deny);
        assert_eq!(*log.lock().unwrap(), [0, 1]);
    }

    #[tokio::test]
    async fn test_all_allow_runs_everything() {
        let log = calls();
        let mut hooks = HookRegistry::new();
        for i in 0..3 {
            hooks.bind(module(i), veto(i, true, &log));
        }

        let dispatcher = Dispatcher::new(Arc::new(hooks));
        assert_eq!(dispatcher.user_may_create_room(&alice()).await, Decision::Allow);
        assert_eq!(*log.lock().unwrap(), [0, 1, 2]);
    }

    #[tokio::test]
    async fn test_error_fails_closed_and_reports() {
        let log = calls();
        let reporter = Arc::new(Collect::default());
        let mut hooks = HookRegistry::new();
        hooks.bind(
            module(0),
            sync_callback::<UserMayCreateRoom, _>(|_| Err(CallbackError::failed("db down"))),
        );
        hooks.bind(module(1), veto(1, true, &log));

        let dispatcher = Dispatcher::new(Arc::new(hooks)).with_reporter(reporter.clone());
        assert_eq!(dispatcher.user_may_create_room(&alice()).await, Decision::Deny);
        assert!(log.lock().unwrap().is_empty());

        let failures = reporter.0.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].module, module(0));
        assert_eq!(failures[0].category, homestead_core::HookCategory::UserMayCreateRoom);
    }

    #[tokio::test]
    async fn test_fail_open_continues() {
        let log = calls();
        let mut hooks = HookRegistry::new();
        hooks.bind(
            module(0),
            sync_callback::<UserMayCreateRoom, _>(|_| Err(CallbackError::failed("db down"))),
        );
        hooks.bind(module(1), veto(1, true, &log));

        let dispatcher = Dispatcher::new(Arc::new(hooks))
            .with_reporter(Arc::new(Collect::default()))
            .with_failure_mode(FailureMode::FailOpen);
        assert_eq!(dispatcher.user_may_create_room(&alice()).await, Decision::Allow);
        assert_eq!(*log.lock().unwrap(), [1]);
    }

    #[tokio::test]
    async fn test_sync_panic_is_isolated() {
        let reporter = Arc::new(Collect::default());
        let mut hooks = HookRegistry::new();
        hooks.bind(
            module(0),
            sync_callback::<CheckEventForSpam, _>(|_| panic!("kaboom")),
        );
        hooks.bind(
            module(1),
            sync_callback::<CheckEventForSpam, _>(|_| Ok(SpamCheck::Spam)),
        );

        let dispatcher = Dispatcher::new(Arc::new(hooks)).with_reporter(reporter.clone());
        let event = EventPayload::message(
            "$1",
            RoomId::new("!r:example.org").unwrap(),
            alice(),
            "hi",
        );
        assert_eq!(dispatcher.check_event_for_spam(&event).await, SpamCheck::Spam);

        let failures = reporter.0.lock().unwrap();
        assert_eq!(
            failures[0].error,
            CallbackError::Panicked("kaboom".to_string())
        );
    }

    #[tokio::test]
    async fn test_async_panic_is_isolated() {
        let reporter = Arc::new(Collect::default());
        let mut hooks = HookRegistry::new();
        hooks.bind(
            module(0),
            Callback::<IsUserExpired>::new(|user: UserId| async move {
                tokio::task::yield_now().await;
                if user.localpart() == "alice" {
                    panic!("no expiry data for {user}");
                }
                Ok(None)
            }),
        );
        hooks.bind(
            module(1),
            sync_callback::<IsUserExpired, _>(|_| Ok(Some(true))),
        );

        let dispatcher = Dispatcher::new(Arc::new(hooks)).with_reporter(reporter.clone());
        assert!(dispatcher.is_user_expired(&alice()).await);

        let failures = reporter.0.lock().unwrap();
        assert!(matches!(
            &failures[0].error,
            CallbackError::Panicked(msg) if msg.contains("no expiry data")
        ));
    }

    #[tokio::test]
    async fn test_broadcast_reaches_everyone_despite_failure() {
        let log = calls();
        let mut hooks = HookRegistry::new();
        for i in 0..3 {
            let log = Arc::clone(&log);
            hooks.bind(
                module(i),
                sync_callback::<OnUserRegistration, _>(move |_| {
                    log.lock().unwrap().push(i);
                    if i == 1 {
                        Err(CallbackError::failed("mail server down"))
                    } else {
                        Ok(())
                    }
                }),
            );
        }

        let dispatcher = Dispatcher::new(Arc::new(hooks)).with_reporter(Arc::new(Collect::default()));
        dispatcher.on_user_registration(&alice()).await;
        assert_eq!(*log.lock().unwrap(), [0, 1, 2]);
    }

    #[tokio::test]
    async fn test_callbacks_get_their_own_copy() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = HookRegistry::new();
        hooks.bind(
            module(0),
            sync_callback::<CheckUsernameForSpam, _>(|mut profile: UserProfile| {
                profile.display_name = Some("mutated".to_string());
                Ok(false)
            }),
        );
        let seen_by_second = Arc::clone(&seen);
        hooks.bind(
            module(1),
            sync_callback::<CheckUsernameForSpam, _>(move |profile: UserProfile| {
                seen_by_second.lock().unwrap().push(profile.display_name);
                Ok(false)
            }),
        );

        let dispatcher = Dispatcher::new(Arc::new(hooks));
        let profile = UserProfile::new(alice()).with_display_name("Alice");
        assert_eq!(
            dispatcher.check_username_for_spam(&profile).await,
            SearchVisibility::Visible
        );
        assert_eq!(*seen.lock().unwrap(), [Some("Alice".to_string())]);
        assert_eq!(profile.display_name.as_deref(), Some("Alice"));
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
