//! A module factory whose behaviour is scripted by its raw config.
//!
//! Every callback named in the config is registered and answers as scripted:
//! a plain value, `"error"` to fail, or `"panic"` to panic. Each invocation
//! is recorded as `"{label}:{category}"` in the shared [`CallRecorder`].
//!
//! ```json
//! {
//!   "label": "a",
//!   "user_may_create_room": false,
//!   "check_registration_for_spam": "shadow_ban",
//!   "check_event_for_spam": "panic",
//!   "resources": ["/_test/a"]
//! }
//! ```

use std::any::Any;
use std::convert::identity;
use std::sync::Arc;

use homestead_core::{HookCategory, RegistrationBehaviour, SpamCheck, UserProfile};
use homestead_modules::hooks::{
    CheckEventForSpam, CheckMediaFileForSpam, CheckRegistrationForSpam, CheckUsernameForSpam,
    IsUserExpired, OnUserRegistration, UserMayCreateRoom, UserMayCreateRoomAlias,
    UserMayInvite, UserMayPublishRoom,
};
use homestead_modules::{
    AccountValidityCallbacks, Callback, CallbackError, CallbackResult, ConfigError,
    ConstructionError, HookSpec, ModuleApi, ModuleConfig, ModuleDescriptor, ModuleFactory,
    ModuleFactoryRegistry, ModuleLoader, RawConfig, SpamCheckerCallbacks, parse_typed,
};
use serde::Deserialize;
use tokio::sync::Notify;

use crate::mocks::{CallRecorder, StaticResource};

/// Load reference of the scripted module.
pub const SCRIPTED: &str = "homestead.test.Scripted";

/// How a scripted callback answers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Script<T> {
    /// Return this value.
    Answer(T),
    /// Misbehave.
    Fault(Fault),
}

/// Scripted misbehaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fault {
    /// Return a `CallbackError`.
    Error,
    /// Panic.
    Panic,
}

/// Configuration of one scripted module.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptConfig {
    /// Name used in recorded calls.
    pub label: String,
    /// `check_event_for_spam` answer.
    pub check_event_for_spam: Option<Script<SpamCheck>>,
    /// `user_may_invite` answer.
    pub user_may_invite: Option<Script<bool>>,
    /// `user_may_create_room` answer.
    pub user_may_create_room: Option<Script<bool>>,
    /// `user_may_create_room_alias` answer.
    pub user_may_create_room_alias: Option<Script<bool>>,
    /// `user_may_publish_room` answer.
    pub user_may_publish_room: Option<Script<bool>>,
    /// `check_username_for_spam` answer.
    pub check_username_for_spam: Option<Script<bool>>,
    /// `check_registration_for_spam` answer.
    pub check_registration_for_spam: Option<Script<RegistrationBehaviour>>,
    /// `check_media_file_for_spam` answer.
    pub check_media_file_for_spam: Option<Script<bool>>,
    /// `is_user_expired` answer; a value is always definitive.
    pub is_user_expired: Option<Script<bool>>,
    /// `on_user_registration` behaviour; the value itself is ignored.
    pub on_user_registration: Option<Script<bool>>,
    /// `user_may_create_room` waits on the factory's gate before answering.
    #[serde(default)]
    pub wait_for_gate: bool,
    /// `check_username_for_spam` records `"{label}:saw={display name}"` and
    /// then overwrites the display name of its copy.
    #[serde(default)]
    pub mutate_arguments: bool,
    /// Paths to register a [`StaticResource`] at.
    #[serde(default)]
    pub resources: Vec<String>,
    /// Turn a rejected resource registration into a construction failure.
    /// Otherwise the rejection is recorded as `"{label}:rejected:{path}"`.
    #[serde(default)]
    pub strict_resources: bool,
    /// Fail construction with this reason, after registering everything.
    #[serde(default)]
    pub fail_construction: Option<String>,
    /// Panic in the constructor, after registering everything.
    #[serde(default)]
    pub panic_in_constructor: bool,
    /// Reject the configuration with this reason.
    #[serde(default)]
    pub reject_config: Option<String>,
}

/// The module instance the scripted factory builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedModule {
    /// Label from the config.
    pub label: String,
}

/// Factory for [`ScriptedModule`].
#[derive(Debug, Clone)]
pub struct ScriptedModuleFactory {
    recorder: CallRecorder,
    gate: Arc<Notify>,
}

impl ScriptedModuleFactory {
    /// Create a factory recording into `recorder`.
    #[must_use]
    pub fn new(recorder: CallRecorder) -> Self {
        Self {
            recorder,
            gate: Arc::new(Notify::new()),
        }
    }

    /// Use `gate` for modules configured with `wait_for_gate`.
    #[must_use]
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = gate;
        self
    }

    /// The gate waited on by `wait_for_gate` modules.
    #[must_use]
    pub fn gate(&self) -> Arc<Notify> {
        Arc::clone(&self.gate)
    }

    /// A factory registry holding this factory under [`SCRIPTED`].
    #[must_use]
    pub fn into_registry(self) -> ModuleFactoryRegistry {
        let mut registry = ModuleFactoryRegistry::new();
        registry.register_factory(SCRIPTED, Arc::new(self));
        registry
    }

    fn register_callbacks(&self, script: &ScriptConfig, api: &mut ModuleApi<'_>) {
        let label: Arc<str> = Arc::from(script.label.as_str());
        let rec = &self.recorder;

        let mut spam = SpamCheckerCallbacks::new();
        spam.check_event_for_spam = script
            .check_event_for_spam
            .clone()
            .map(|s| scripted_callback::<CheckEventForSpam, _>(&label, rec, s, identity));
        spam.user_may_invite = script
            .user_may_invite
            .clone()
            .map(|s| scripted_callback::<UserMayInvite, _>(&label, rec, s, identity));
        spam.user_may_create_room = script.user_may_create_room.clone().map(|s| {
            if script.wait_for_gate {
                gated_callback(&label, rec, &self.gate, s)
            } else {
                scripted_callback::<UserMayCreateRoom, _>(&label, rec, s, identity)
            }
        });
        spam.user_may_create_room_alias = script
            .user_may_create_room_alias
            .clone()
            .map(|s| scripted_callback::<UserMayCreateRoomAlias, _>(&label, rec, s, identity));
        spam.user_may_publish_room = script
            .user_may_publish_room
            .clone()
            .map(|s| scripted_callback::<UserMayPublishRoom, _>(&label, rec, s, identity));
        spam.check_username_for_spam = if script.mutate_arguments {
            let s = script
                .check_username_for_spam
                .clone()
                .unwrap_or(Script::Answer(false));
            Some(mutating_callback(&label, rec, s))
        } else {
            script
                .check_username_for_spam
                .clone()
                .map(|s| scripted_callback::<CheckUsernameForSpam, _>(&label, rec, s, identity))
        };
        spam.check_registration_for_spam = script
            .check_registration_for_spam
            .clone()
            .map(|s| scripted_callback::<CheckRegistrationForSpam, _>(&label, rec, s, identity));
        spam.check_media_file_for_spam = script
            .check_media_file_for_spam
            .clone()
            .map(|s| scripted_callback::<CheckMediaFileForSpam, _>(&label, rec, s, identity));

        if !spam.is_empty() {
            api.register_spam_checker_callbacks(spam);
        }

        let mut validity = AccountValidityCallbacks::new();
        validity.is_user_expired = script
            .is_user_expired
            .clone()
            .map(|s| scripted_callback::<IsUserExpired, _>(&label, rec, s, Some));
        validity.on_user_registration = script
            .on_user_registration
            .clone()
            .map(|s| scripted_callback::<OnUserRegistration, _>(&label, rec, s, |_| ()));

        if !validity.is_empty() {
            api.register_account_validity_callbacks(validity);
        }
    }
}

impl ModuleFactory for ScriptedModuleFactory {
    fn parse_config(&self, raw: &RawConfig) -> Result<ModuleConfig, ConfigError> {
        let config: ScriptConfig = parse_typed(raw)?;
        if let Some(reason) = &config.reject_config {
            return Err(ConfigError::new(reason.clone()).at("reject_config"));
        }
        Ok(ModuleConfig::new(config))
    }

    fn construct(
        &self,
        config: ModuleConfig,
        api: &mut ModuleApi<'_>,
    ) -> Result<Box<dyn Any + Send + Sync>, ConstructionError> {
        let script = config
            .downcast::<ScriptConfig>()
            .ok_or_else(|| ConstructionError::failed("not a scripted module config"))?;

        self.register_callbacks(&script, api);

        for path in &script.resources {
            match api.register_web_resource(path.clone(), StaticResource::new(&script.label)) {
                Ok(()) => {},
                Err(e) if script.strict_resources => return Err(e.into()),
                Err(_) => self
                    .recorder
                    .record(format!("{}:rejected:{path}", script.label)),
            }
        }

        assert!(
            !script.panic_in_constructor,
            "{} panicked while constructing",
            script.label
        );
        if let Some(reason) = &script.fail_construction {
            return Err(ConstructionError::failed(reason.clone()));
        }

        Ok(Box::new(ScriptedModule {
            label: script.label.clone(),
        }))
    }
}

fn answer<T: Clone>(script: &Script<T>, label: &str, category: HookCategory) -> CallbackResult<T> {
    match script {
        Script::Answer(value) => Ok(value.clone()),
        Script::Fault(Fault::Error) => Err(CallbackError::failed(format!(
            "{label} failed {category} on purpose"
        ))),
        Script::Fault(Fault::Panic) => panic!("{label} panicked in {category}"),
    }
}

fn scripted_callback<H, T>(
    label: &Arc<str>,
    recorder: &CallRecorder,
    script: Script<T>,
    convert: fn(T) -> H::Output,
) -> Callback<H>
where
    H: HookSpec,
    T: Clone + Send + Sync + 'static,
{
    let label = Arc::clone(label);
    let recorder = recorder.clone();
    Callback::from_sync(move |_args: H::Args| {
        recorder.record(format!("{label}:{}", H::CATEGORY));
        answer(&script, &label, H::CATEGORY).map(convert)
    })
}

fn gated_callback(
    label: &Arc<str>,
    recorder: &CallRecorder,
    gate: &Arc<Notify>,
    script: Script<bool>,
) -> Callback<UserMayCreateRoom> {
    let label = Arc::clone(label);
    let recorder = recorder.clone();
    let gate = Arc::clone(gate);
    Callback::<UserMayCreateRoom>::new(move |_user| {
        let label = Arc::clone(&label);
        let recorder = recorder.clone();
        let gate = Arc::clone(&gate);
        let script = script.clone();
        async move {
            recorder.record(format!("{label}:{}", HookCategory::UserMayCreateRoom));
            gate.notified().await;
            answer(&script, &label, HookCategory::UserMayCreateRoom)
        }
    })
}

fn mutating_callback(
    label: &Arc<str>,
    recorder: &CallRecorder,
    script: Script<bool>,
) -> Callback<CheckUsernameForSpam> {
    let label = Arc::clone(label);
    let recorder = recorder.clone();
    Callback::from_sync(move |mut profile: UserProfile| {
        let seen = profile.display_name.clone().unwrap_or_default();
        recorder.record(format!("{label}:saw={seen}"));
        recorder.record(format!("{label}:{}", HookCategory::CheckUsernameForSpam));
        profile.display_name = Some(format!("mutated by {label}"));
        answer(&script, &label, HookCategory::CheckUsernameForSpam)
    })
}

/// A descriptor for a scripted module labelled `label`.
///
/// `script` is a JSON object of further [`ScriptConfig`] fields.
#[must_use]
pub fn scripted(label: &str, script: serde_json::Value) -> ModuleDescriptor {
    let mut config = match script {
        serde_json::Value::Object(map) => map,
        _ => RawConfig::new(),
    };
    config.insert("label".to_string(), serde_json::Value::from(label));
    ModuleDescriptor {
        reference: SCRIPTED.to_string(),
        raw_config: config,
    }
}

/// A loader that knows only the scripted module, recording into `recorder`.
#[must_use]
pub fn scripted_loader(recorder: &CallRecorder) -> ModuleLoader {
    ModuleLoader::new(ScriptedModuleFactory::new(recorder.clone()).into_registry())
}
