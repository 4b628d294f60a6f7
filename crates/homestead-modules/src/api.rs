//! The capability handle given to a module while it is constructed.

use std::sync::Arc;

use tracing::debug;

use crate::error::RegistrationError;
use crate::hooks::{
    AccountValidityCallbacks, BindingInfo, Callback, HookRegistry, HookSpec,
    SpamCheckerCallbacks,
};
use crate::module::ModuleId;
use crate::resource::{ResourceHandler, ResourceRegistry};

/// What a module may do to the host during construction.
///
/// Every registration is recorded under the module's own id. If the
/// constructor fails and the host skips the module, the loader discards
/// whatever was registered through this handle.
pub struct ModuleApi<'a> {
    module: ModuleId,
    hooks: &'a mut HookRegistry,
    resources: &'a mut ResourceRegistry,
}

impl<'a> ModuleApi<'a> {
    /// Create a handle for `module` over the host's registries.
    #[must_use]
    pub fn new(
        module: ModuleId,
        hooks: &'a mut HookRegistry,
        resources: &'a mut ResourceRegistry,
    ) -> Self {
        Self {
            module,
            hooks,
            resources,
        }
    }

    /// The id of the module being constructed.
    #[must_use]
    pub fn module_id(&self) -> &ModuleId {
        &self.module
    }

    /// Serve `handler` at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistrationError`] if the path is relative, reserved, or
    /// already registered. The module decides whether that is fatal.
    pub fn register_web_resource(
        &mut self,
        path: impl Into<String>,
        handler: impl ResourceHandler + 'static,
    ) -> Result<(), RegistrationError> {
        self.resources
            .register(path, Arc::new(handler), self.module.clone())
    }

    /// Bind one callback to category `H`.
    pub fn register_callback<H: HookSpec>(&mut self, callback: Callback<H>) -> BindingInfo {
        self.hooks.bind(self.module.clone(), callback)
    }

    /// Bind the spam-checker callbacks that are set.
    pub fn register_spam_checker_callbacks(
        &mut self,
        callbacks: SpamCheckerCallbacks,
    ) -> Vec<BindingInfo> {
        let bound = callbacks.bind_into(self.hooks, &self.module);
        debug!(module = %self.module, count = bound.len(), "spam checker callbacks registered");
        bound
    }

    /// Bind the account-validity callbacks that are set.
    pub fn register_account_validity_callbacks(
        &mut self,
        callbacks: AccountValidityCallbacks,
    ) -> Vec<BindingInfo> {
        let bound = callbacks.bind_into(self.hooks, &self.module);
        debug!(module = %self.module, count = bound.len(), "account validity callbacks registered");
        bound
    }
}

impl std::fmt::Debug for ModuleApi<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleApi")
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{UserMayCreateRoom, sync_callback};
    use crate::resource::{ResourceRequest, ResourceResponse};
    use async_trait::async_trait;
    use homestead_core::HookCategory;

    struct Status;

    #[async_trait]
    impl ResourceHandler for Status {
        async fn handle(&self, _request: ResourceRequest) -> ResourceResponse {
            ResourceResponse::ok(serde_json::json!({ "ok": true }))
        }
    }

    #[test]
    fn test_registrations_are_owned_by_module() {
        let mut hooks = HookRegistry::new();
        let mut resources = ResourceRegistry::new();
        let id = ModuleId::new(4, "acme.Policy");

        {
            let mut api = ModuleApi::new(id.clone(), &mut hooks, &mut resources);
            assert_eq!(api.module_id(), &id);
            api.register_web_resource("/_acme/status", Status).unwrap();
            api.register_callback(sync_callback::<UserMayCreateRoom, _>(|_| Ok(true)));
            let bound = api.register_spam_checker_callbacks(
                SpamCheckerCallbacks::new().user_may_invite(|_| async { Ok(true) }),
            );
            assert_eq!(bound.len(), 1);
            let bound = api.register_account_validity_callbacks(AccountValidityCallbacks::new());
            assert!(bound.is_empty());
        }

        assert_eq!(resources.owner_of("/_acme/status"), Some(&id));
        let infos = hooks.infos(HookCategory::UserMayCreateRoom);
        assert_eq!(infos[0].owner, id);
        assert_eq!(hooks.len(), 2);
    }

    #[test]
    fn test_reserved_path_error_returned_to_module() {
        let mut hooks = HookRegistry::new();
        let mut resources = ResourceRegistry::new();
        let mut api = ModuleApi::new(ModuleId::new(0, "a.B"), &mut hooks, &mut resources);

        let err = api
            .register_web_resource("/_matrix/client/x", Status)
            .unwrap_err();
        assert!(matches!(err, RegistrationError::ReservedNamespace { .. }));
    }
}
