//! Probe command: dispatch one hook category against the configured modules.

use anyhow::{Context, Result, ensure};
use clap::Args;
use homestead_config::HostConfig;
use homestead_core::{
    EventPayload, FileInfo, HookCategory, MediaContent, MediaUpload, RegistrationBehaviour,
    RegistrationRequest, RequestInfo, RoomAlias, RoomId, SpamCheck, UserId, UserProfile,
};
use homestead_modules::{Dispatcher, SearchVisibility};
use tracing::debug;

use super::build_host;
use crate::theme::Theme;

/// Largest upload `--size` the probe will allocate (64 MiB).
pub(crate) const MAX_PROBE_UPLOAD_BYTES: usize = 67_108_864;

/// Arguments of `homestead probe`.
#[derive(Debug, Args)]
pub(crate) struct ProbeArgs {
    /// Hook category, e.g. `user_may_create_room`
    pub(crate) category: HookCategory,

    /// Acting user (sender, inviter, creator, registrant)
    #[arg(long)]
    pub(crate) user: Option<UserId>,

    /// Invited user
    #[arg(long)]
    pub(crate) invitee: Option<UserId>,

    /// Room id
    #[arg(long)]
    pub(crate) room: Option<RoomId>,

    /// Room alias
    #[arg(long)]
    pub(crate) alias: Option<RoomAlias>,

    /// Message body
    #[arg(long)]
    pub(crate) body: Option<String>,

    /// Display name
    #[arg(long)]
    pub(crate) display_name: Option<String>,

    /// Registration email
    #[arg(long)]
    pub(crate) email: Option<String>,

    /// Registration username
    #[arg(long)]
    pub(crate) username: Option<String>,

    /// Registration user agent
    #[arg(long)]
    pub(crate) user_agent: Option<String>,

    /// Registration SSO provider id
    #[arg(long)]
    pub(crate) auth_provider: Option<String>,

    /// Upload size in bytes
    #[arg(long, default_value_t = 0)]
    pub(crate) size: usize,

    /// Upload content type
    #[arg(long)]
    pub(crate) media_type: Option<String>,
}

/// An aggregated verdict, rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Outcome {
    pub(crate) verdict: String,
    /// Whether the verdict lets the action through.
    pub(crate) permits: bool,
}

impl Outcome {
    fn new(verdict: impl Into<String>, permits: bool) -> Self {
        Self {
            verdict: verdict.into(),
            permits,
        }
    }
}

fn required<'a, T>(value: Option<&'a T>, flag: &str, category: HookCategory) -> Result<&'a T> {
    value.with_context(|| format!("{category} needs --{flag}"))
}

/// Build the category's arguments from flags and dispatch them.
pub(crate) async fn dispatch(dispatcher: &Dispatcher, args: &ProbeArgs) -> Result<Outcome> {
    let category = args.category;
    let user = || required(args.user.as_ref(), "user", category);
    let room = || required(args.room.as_ref(), "room", category);
    debug!(%category, "Probing");

    let outcome = match category {
        HookCategory::CheckEventForSpam => {
            let body = required(args.body.as_ref(), "body", category)?;
            let event = EventPayload::message("$probe", room()?.clone(), user()?.clone(), body);
            match dispatcher.check_event_for_spam(&event).await {
                SpamCheck::NotSpam => Outcome::new("not_spam", true),
                SpamCheck::Spam => Outcome::new("spam", false),
                SpamCheck::SpamWithReason(reason) => Outcome::new(format!("spam: {reason}"), false),
            }
        },
        HookCategory::UserMayInvite => {
            let invitee = required(args.invitee.as_ref(), "invitee", category)?;
            let decision = dispatcher.user_may_invite(user()?, invitee, room()?).await;
            Outcome::new(decision.to_string(), decision.is_allowed())
        },
        HookCategory::UserMayCreateRoom => {
            let decision = dispatcher.user_may_create_room(user()?).await;
            Outcome::new(decision.to_string(), decision.is_allowed())
        },
        HookCategory::UserMayCreateRoomAlias => {
            let alias = required(args.alias.as_ref(), "alias", category)?;
            let decision = dispatcher.user_may_create_room_alias(user()?, alias).await;
            Outcome::new(decision.to_string(), decision.is_allowed())
        },
        HookCategory::UserMayPublishRoom => {
            let decision = dispatcher.user_may_publish_room(user()?, room()?).await;
            Outcome::new(decision.to_string(), decision.is_allowed())
        },
        HookCategory::CheckUsernameForSpam => {
            let profile = UserProfile {
                user_id: user()?.clone(),
                display_name: args.display_name.clone(),
                avatar_url: None,
            };
            let visibility = dispatcher.check_username_for_spam(&profile).await;
            Outcome::new(
                visibility.to_string(),
                visibility == SearchVisibility::Visible,
            )
        },
        HookCategory::CheckRegistrationForSpam => {
            let request = RegistrationRequest {
                email: args.email.clone(),
                username: args.username.clone(),
                request_info: args
                    .user_agent
                    .iter()
                    .map(|ua| RequestInfo::new(ua.as_str(), "127.0.0.1"))
                    .collect(),
                auth_provider_id: args.auth_provider.clone(),
            };
            match dispatcher.check_registration_for_spam(&request).await {
                RegistrationBehaviour::Allow => Outcome::new("allow", true),
                RegistrationBehaviour::ShadowBan => Outcome::new("shadow_ban", false),
                RegistrationBehaviour::Deny => Outcome::new("deny", false),
            }
        },
        HookCategory::CheckMediaFileForSpam => {
            ensure!(
                args.size <= MAX_PROBE_UPLOAD_BYTES,
                "--size {} exceeds the probe limit of {MAX_PROBE_UPLOAD_BYTES} bytes",
                args.size
            );
            let upload = MediaUpload {
                content: MediaContent::new(vec![0_u8; args.size]),
                info: FileInfo {
                    media_id: "probe".to_string(),
                    server_name: args
                        .user
                        .as_ref()
                        .map_or("localhost", UserId::server_name)
                        .to_string(),
                    upload_name: None,
                    media_type: args.media_type.clone(),
                    media_length: u64::try_from(args.size).unwrap_or(u64::MAX),
                    thumbnail: false,
                },
            };
            let decision = dispatcher.check_media_file_for_spam(&upload).await;
            Outcome::new(decision.to_string(), decision.is_allowed())
        },
        HookCategory::IsUserExpired => {
            if dispatcher.is_user_expired(user()?).await {
                Outcome::new("expired", false)
            } else {
                Outcome::new("active", true)
            }
        },
        HookCategory::OnUserRegistration => {
            dispatcher.on_user_registration(user()?).await;
            Outcome::new("delivered", true)
        },
    };
    Ok(outcome)
}

/// Load the configured modules, dispatch once and print the verdict.
pub(crate) async fn run_probe(config: &HostConfig, args: &ProbeArgs) -> Result<()> {
    let host = build_host(config).context("module host failed to start")?;
    let outcome = dispatch(host.dispatcher(), args).await?;
    println!(
        "{} {}",
        Theme::header(args.category.as_str()),
        Theme::verdict(&outcome.verdict, outcome.permits)
    );
    Ok(())
}
