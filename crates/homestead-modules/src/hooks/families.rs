//! Callback families a module registers in one call.
//!
//! Every field is optional. Registration binds the present callbacks in
//! field declaration order.

use std::future::Future;

use homestead_core::{
    AliasRequest, EventPayload, InviteRequest, MediaUpload, PublishRequest, RegistrationBehaviour,
    RegistrationRequest, SpamCheck, UserId, UserProfile,
};

use super::callback::Callback;
use super::registry::{BindingInfo, HookRegistry};
use super::spec::{
    CheckEventForSpam, CheckMediaFileForSpam, CheckRegistrationForSpam, CheckUsernameForSpam,
    IsUserExpired, OnUserRegistration, UserMayCreateRoom, UserMayCreateRoomAlias,
    UserMayInvite, UserMayPublishRoom,
};
use crate::error::CallbackResult;
use crate::module::ModuleId;

macro_rules! family_setter {
    ($(#[$meta:meta])* $field:ident, $hook:ty, $args:ty, $output:ty) => {
        $(#[$meta])*
        #[must_use]
        pub fn $field<F, Fut>(mut self, f: F) -> Self
        where
            F: Fn($args) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = CallbackResult<$output>> + Send + 'static,
        {
            self.$field = Some(Callback::<$hook>::new(f));
            self
        }
    };
}

/// Spam-checker callbacks.
#[derive(Debug, Clone, Default)]
pub struct SpamCheckerCallbacks {
    /// Classify a room event.
    pub check_event_for_spam: Option<Callback<CheckEventForSpam>>,
    /// Authorize an invite.
    pub user_may_invite: Option<Callback<UserMayInvite>>,
    /// Authorize room creation.
    pub user_may_create_room: Option<Callback<UserMayCreateRoom>>,
    /// Authorize alias creation.
    pub user_may_create_room_alias: Option<Callback<UserMayCreateRoomAlias>>,
    /// Authorize publishing a room.
    pub user_may_publish_room: Option<Callback<UserMayPublishRoom>>,
    /// Hide a profile from directory search.
    pub check_username_for_spam: Option<Callback<CheckUsernameForSpam>>,
    /// Classify a registration attempt.
    pub check_registration_for_spam: Option<Callback<CheckRegistrationForSpam>>,
    /// Authorize storing an uploaded file.
    pub check_media_file_for_spam: Option<Callback<CheckMediaFileForSpam>>,
}

impl SpamCheckerCallbacks {
    /// No callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    family_setter!(
        /// Set the `check_event_for_spam` callback.
        check_event_for_spam, CheckEventForSpam, EventPayload, SpamCheck
    );
    family_setter!(
        /// Set the `user_may_invite` callback.
        user_may_invite, UserMayInvite, InviteRequest, bool
    );
    family_setter!(
        /// Set the `user_may_create_room` callback.
        user_may_create_room, UserMayCreateRoom, UserId, bool
    );
    family_setter!(
        /// Set the `user_may_create_room_alias` callback.
        user_may_create_room_alias, UserMayCreateRoomAlias, AliasRequest, bool
    );
    family_setter!(
        /// Set the `user_may_publish_room` callback.
        user_may_publish_room, UserMayPublishRoom, PublishRequest, bool
    );
    family_setter!(
        /// Set the `check_username_for_spam` callback.
        check_username_for_spam, CheckUsernameForSpam, UserProfile, bool
    );
    family_setter!(
        /// Set the `check_registration_for_spam` callback.
        check_registration_for_spam, CheckRegistrationForSpam, RegistrationRequest,
        RegistrationBehaviour
    );
    family_setter!(
        /// Set the `check_media_file_for_spam` callback.
        check_media_file_for_spam, CheckMediaFileForSpam, MediaUpload, bool
    );

    /// Whether no callback is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.check_event_for_spam.is_none()
            && self.user_may_invite.is_none()
            && self.user_may_create_room.is_none()
            && self.user_may_create_room_alias.is_none()
            && self.user_may_publish_room.is_none()
            && self.check_username_for_spam.is_none()
            && self.check_registration_for_spam.is_none()
            && self.check_media_file_for_spam.is_none()
    }

    pub(crate) fn bind_into(self, hooks: &mut HookRegistry, owner: &ModuleId) -> Vec<BindingInfo> {
        let mut bound = Vec::new();
        if let Some(cb) = self.check_event_for_spam {
            bound.push(hooks.bind(owner.clone(), cb));
        }
        if let Some(cb) = self.user_may_invite {
            bound.push(hooks.bind(owner.clone(), cb));
        }
        if let Some(cb) = self.user_may_create_room {
            bound.push(hooks.bind(owner.clone(), cb));
        }
        if let Some(cb) = self.user_may_create_room_alias {
            bound.push(hooks.bind(owner.clone(), cb));
        }
        if let Some(cb) = self.user_may_publish_room {
            bound.push(hooks.bind(owner.clone(), cb));
        }
        if let Some(cb) = self.check_username_for_spam {
            bound.push(hooks.bind(owner.clone(), cb));
        }
        if let Some(cb) = self.check_registration_for_spam {
            bound.push(hooks.bind(owner.clone(), cb));
        }
        if let Some(cb) = self.check_media_file_for_spam {
            bound.push(hooks.bind(owner.clone(), cb));
        }
        bound
    }
}

/// Account-validity callbacks.
#[derive(Debug, Clone, Default)]
pub struct AccountValidityCallbacks {
    /// Decide whether an account has expired; `None` defers.
    pub is_user_expired: Option<Callback<IsUserExpired>>,
    /// Observe a new registration.
    pub on_user_registration: Option<Callback<OnUserRegistration>>,
}

impl AccountValidityCallbacks {
    /// No callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    family_setter!(
        /// Set the `is_user_expired` callback.
        is_user_expired, IsUserExpired, UserId, Option<bool>
    );
    family_setter!(
        /// Set the `on_user_registration` callback.
        on_user_registration, OnUserRegistration, UserId, ()
    );

    /// Whether no callback is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.is_user_expired.is_none() && self.on_user_registration.is_none()
    }

    pub(crate) fn bind_into(self, hooks: &mut HookRegistry, owner: &ModuleId) -> Vec<BindingInfo> {
        let mut bound = Vec::new();
        if let Some(cb) = self.is_user_expired {
            bound.push(hooks.bind(owner.clone(), cb));
        }
        if let Some(cb) = self.on_user_registration {
            bound.push(hooks.bind(owner.clone(), cb));
        }
        bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use homestead_core::HookCategory;

    #[test]
    fn test_bind_in_declaration_order() {
        // Setters called out of order; binding follows field order.
        let callbacks = SpamCheckerCallbacks::new()
            .check_media_file_for_spam(|_| async { Ok(true) })
            .user_may_create_room(|_| async { Ok(true) })
            .check_event_for_spam(|_| async { Ok(SpamCheck::NotSpam) });
        assert!(!callbacks.is_empty());

        let mut hooks = HookRegistry::new();
        let bound = callbacks.bind_into(&mut hooks, &ModuleId::new(0, "a.B"));
        let categories: Vec<HookCategory> = bound.iter().map(|b| b.category).collect();
        assert_eq!(
            categories,
            [
                HookCategory::CheckEventForSpam,
                HookCategory::UserMayCreateRoom,
                HookCategory::CheckMediaFileForSpam,
            ]
        );
    }

    #[test]
    fn test_account_validity_family() {
        let callbacks = AccountValidityCallbacks::new()
            .on_user_registration(|_| async { Ok(()) })
            .is_user_expired(|_| async { Ok(None) });

        let mut hooks = HookRegistry::new();
        let bound = callbacks.bind_into(&mut hooks, &ModuleId::new(0, "a.B"));
        assert_eq!(bound.len(), 2);
        assert_eq!(bound[0].category, HookCategory::IsUserExpired);
        assert!(AccountValidityCallbacks::new().is_empty());
    }
}
