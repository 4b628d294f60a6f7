//! Compile-time description of every hook category.
//!
//! Each category is a zero-sized marker type implementing [`HookSpec`]. The
//! marker fixes what a callback receives, what it returns, what the
//! aggregated verdict looks like and how answers are combined.

use std::fmt;

use homestead_core::{
    AliasRequest, EventPayload, HookCategory, InviteRequest, MediaUpload, PublishRequest,
    RegistrationBehaviour, RegistrationRequest, SpamCheck, UserId, UserProfile,
};
use serde::{Deserialize, Serialize};

mod sealed {
    pub trait Sealed {}
}

/// How the answers of several callbacks are combined into one verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregationPolicy {
    /// Allowed unless some callback objects; the first objection wins.
    VetoOnFirstDeny,
    /// Not flagged unless some callback flags; the first flag wins.
    FlagOnFirstPositive,
    /// Neutral unless some callback answers otherwise; the first
    /// non-neutral answer wins.
    FirstNonDefaultWins,
    /// Every callback runs; there is nothing to decide.
    Broadcast,
}

impl fmt::Display for AggregationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VetoOnFirstDeny => write!(f, "veto_on_first_deny"),
            Self::FlagOnFirstPositive => write!(f, "flag_on_first_positive"),
            Self::FirstNonDefaultWins => write!(f, "first_non_default_wins"),
            Self::Broadcast => write!(f, "broadcast"),
        }
    }
}

/// What the dispatcher does after folding one callback's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<V> {
    /// No decision yet; ask the next callback.
    Continue,
    /// Stop and return this verdict.
    Decide(V),
}

/// How an authorization hook treats a failed callback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FailureMode {
    /// A failure counts as an objection.
    #[default]
    FailClosed,
    /// A failure counts as no objection.
    FailOpen,
}

impl From<homestead_config::CallbackFailurePolicy> for FailureMode {
    fn from(policy: homestead_config::CallbackFailurePolicy) -> Self {
        match policy {
            homestead_config::CallbackFailurePolicy::Deny => Self::FailClosed,
            homestead_config::CallbackFailurePolicy::Allow => Self::FailOpen,
        }
    }
}

/// Verdict of an authorization hook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// The operation may proceed.
    #[default]
    Allow,
    /// The operation is refused.
    Deny,
}

impl Decision {
    /// Whether the operation may proceed.
    #[must_use]
    pub fn is_allowed(self) -> bool {
        self == Self::Allow
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "allow"),
            Self::Deny => write!(f, "deny"),
        }
    }
}

/// Verdict of `check_username_for_spam`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchVisibility {
    /// The profile may appear in user directory results.
    #[default]
    Visible,
    /// The profile is hidden from user directory results.
    Excluded,
}

impl fmt::Display for SearchVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Visible => write!(f, "visible"),
            Self::Excluded => write!(f, "excluded"),
        }
    }
}

/// Static description of a hook category.
///
/// Sealed: the set of categories is closed.
pub trait HookSpec: sealed::Sealed + Send + Sync + 'static {
    /// The runtime name of the category.
    const CATEGORY: HookCategory;
    /// How answers are combined.
    const POLICY: AggregationPolicy;

    /// What each callback receives. Every callback gets its own clone.
    type Args: Clone + Send + Sync + 'static;
    /// What a callback answers.
    type Output: Send + 'static;
    /// The aggregated answer handed back to the host.
    type Verdict: Send + 'static;

    /// Fold one callback's answer.
    fn fold(output: Self::Output) -> Step<Self::Verdict>;

    /// Fold a failed callback.
    fn on_failure(mode: FailureMode) -> Step<Self::Verdict>;

    /// The verdict when no callback decided.
    fn default_verdict() -> Self::Verdict;
}

fn veto(allowed: bool) -> Step<Decision> {
    if allowed {
        Step::Continue
    } else {
        Step::Decide(Decision::Deny)
    }
}

fn veto_on_failure(mode: FailureMode) -> Step<Decision> {
    match mode {
        FailureMode::FailClosed => Step::Decide(Decision::Deny),
        FailureMode::FailOpen => Step::Continue,
    }
}

macro_rules! veto_hook {
    ($(#[$meta:meta])* $name:ident, $args:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl sealed::Sealed for $name {}

        impl HookSpec for $name {
            const CATEGORY: HookCategory = HookCategory::$name;
            const POLICY: AggregationPolicy = AggregationPolicy::VetoOnFirstDeny;

            type Args = $args;
            type Output = bool;
            type Verdict = Decision;

            fn fold(output: bool) -> Step<Decision> {
                veto(output)
            }

            fn on_failure(mode: FailureMode) -> Step<Decision> {
                veto_on_failure(mode)
            }

            fn default_verdict() -> Decision {
                Decision::Allow
            }
        }
    };
}

veto_hook!(
    /// May a user invite another user to a room. `false` vetoes.
    UserMayInvite,
    InviteRequest
);
veto_hook!(
    /// May a user create a room. `false` vetoes.
    UserMayCreateRoom,
    UserId
);
veto_hook!(
    /// May a user create a room alias. `false` vetoes.
    UserMayCreateRoomAlias,
    AliasRequest
);
veto_hook!(
    /// May a user publish a room to the directory. `false` vetoes.
    UserMayPublishRoom,
    PublishRequest
);
veto_hook!(
    /// May an uploaded file be stored. `false` vetoes.
    CheckMediaFileForSpam,
    MediaUpload
);

/// Classify an event. The first answer other than `NotSpam` wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckEventForSpam;

impl sealed::Sealed for CheckEventForSpam {}

impl HookSpec for CheckEventForSpam {
    const CATEGORY: HookCategory = HookCategory::CheckEventForSpam;
    const POLICY: AggregationPolicy = AggregationPolicy::FirstNonDefaultWins;

    type Args = EventPayload;
    type Output = SpamCheck;
    type Verdict = SpamCheck;

    fn fold(output: SpamCheck) -> Step<SpamCheck> {
        if output.is_spam() {
            Step::Decide(output)
        } else {
            Step::Continue
        }
    }

    fn on_failure(_mode: FailureMode) -> Step<SpamCheck> {
        Step::Continue
    }

    fn default_verdict() -> SpamCheck {
        SpamCheck::NotSpam
    }
}

/// Should a profile be hidden from directory search. `true` excludes it.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckUsernameForSpam;

impl sealed::Sealed for CheckUsernameForSpam {}

impl HookSpec for CheckUsernameForSpam {
    const CATEGORY: HookCategory = HookCategory::CheckUsernameForSpam;
    const POLICY: AggregationPolicy = AggregationPolicy::FlagOnFirstPositive;

    type Args = UserProfile;
    type Output = bool;
    type Verdict = SearchVisibility;

    fn fold(output: bool) -> Step<SearchVisibility> {
        if output {
            Step::Decide(SearchVisibility::Excluded)
        } else {
            Step::Continue
        }
    }

    fn on_failure(_mode: FailureMode) -> Step<SearchVisibility> {
        Step::Continue
    }

    fn default_verdict() -> SearchVisibility {
        SearchVisibility::Visible
    }
}

/// Classify a registration attempt. The first answer other than `Allow` wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckRegistrationForSpam;

impl sealed::Sealed for CheckRegistrationForSpam {}

impl HookSpec for CheckRegistrationForSpam {
    const CATEGORY: HookCategory = HookCategory::CheckRegistrationForSpam;
    const POLICY: AggregationPolicy = AggregationPolicy::FirstNonDefaultWins;

    type Args = RegistrationRequest;
    type Output = RegistrationBehaviour;
    type Verdict = RegistrationBehaviour;

    fn fold(output: RegistrationBehaviour) -> Step<RegistrationBehaviour> {
        if output == RegistrationBehaviour::Allow {
            Step::Continue
        } else {
            Step::Decide(output)
        }
    }

    fn on_failure(_mode: FailureMode) -> Step<RegistrationBehaviour> {
        Step::Continue
    }

    fn default_verdict() -> RegistrationBehaviour {
        RegistrationBehaviour::Allow
    }
}

/// Has an account expired. The first `Some(_)` wins; `None` defers.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsUserExpired;

impl sealed::Sealed for IsUserExpired {}

impl HookSpec for IsUserExpired {
    const CATEGORY: HookCategory = HookCategory::IsUserExpired;
    const POLICY: AggregationPolicy = AggregationPolicy::FirstNonDefaultWins;

    type Args = UserId;
    type Output = Option<bool>;
    type Verdict = bool;

    fn fold(output: Option<bool>) -> Step<bool> {
        output.map_or(Step::Continue, Step::Decide)
    }

    fn on_failure(_mode: FailureMode) -> Step<bool> {
        Step::Continue
    }

    fn default_verdict() -> bool {
        false
    }
}

/// A user has registered. Every callback is told.
#[derive(Debug, Clone, Copy, Default)]
pub struct OnUserRegistration;

impl sealed::Sealed for OnUserRegistration {}

impl HookSpec for OnUserRegistration {
    const CATEGORY: HookCategory = HookCategory::OnUserRegistration;
    const POLICY: AggregationPolicy = AggregationPolicy::Broadcast;

    type Args = UserId;
    type Output = ();
    type Verdict = ();

    fn fold((): ()) -> Step<()> {
        Step::Continue
    }

    fn on_failure(_mode: FailureMode) -> Step<()> {
        Step::Continue
    }

    fn default_verdict() {}
}

/// The aggregation policy of a runtime category.
#[must_use]
pub fn policy_of(category: HookCategory) -> AggregationPolicy {
    match category {
        HookCategory::CheckEventForSpam => CheckEventForSpam::POLICY,
        HookCategory::UserMayInvite => UserMayInvite::POLICY,
        HookCategory::UserMayCreateRoom => UserMayCreateRoom::POLICY,
        HookCategory::UserMayCreateRoomAlias => UserMayCreateRoomAlias::POLICY,
        HookCategory::UserMayPublishRoom => UserMayPublishRoom::POLICY,
        HookCategory::CheckUsernameForSpam => CheckUsernameForSpam::POLICY,
        HookCategory::CheckRegistrationForSpam => CheckRegistrationForSpam::POLICY,
        HookCategory::CheckMediaFileForSpam => CheckMediaFileForSpam::POLICY,
        HookCategory::IsUserExpired => IsUserExpired::POLICY,
        HookCategory::OnUserRegistration => OnUserRegistration::POLICY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_veto_fold() {
        assert_eq!(UserMayCreateRoom::fold(true), Step::Continue);
        assert_eq!(UserMayCreateRoom::fold(false), Step::Decide(Decision::Deny));
        assert_eq!(UserMayCreateRoom::default_verdict(), Decision::Allow);
    }

    #[test]
    fn test_veto_failure_mode() {
        assert_eq!(
            UserMayInvite::on_failure(FailureMode::FailClosed),
            Step::Decide(Decision::Deny)
        );
        assert_eq!(UserMayInvite::on_failure(FailureMode::FailOpen), Step::Continue);
    }

    #[test]
    fn test_classification_failures_are_neutral() {
        for mode in [FailureMode::FailClosed, FailureMode::FailOpen] {
            assert_eq!(CheckEventForSpam::on_failure(mode), Step::Continue);
            assert_eq!(CheckUsernameForSpam::on_failure(mode), Step::Continue);
            assert_eq!(CheckRegistrationForSpam::on_failure(mode), Step::Continue);
            assert_eq!(IsUserExpired::on_failure(mode), Step::Continue);
        }
    }

    #[test]
    fn test_first_non_default_fold() {
        assert_eq!(CheckEventForSpam::fold(SpamCheck::NotSpam), Step::Continue);
        assert_eq!(
            CheckEventForSpam::fold(SpamCheck::SpamWithReason("ads".into())),
            Step::Decide(SpamCheck::SpamWithReason("ads".into()))
        );
        assert_eq!(
            CheckRegistrationForSpam::fold(RegistrationBehaviour::ShadowBan),
            Step::Decide(RegistrationBehaviour::ShadowBan)
        );
        assert_eq!(
            CheckRegistrationForSpam::fold(RegistrationBehaviour::Allow),
            Step::Continue
        );
        assert_eq!(IsUserExpired::fold(None), Step::Continue);
        assert_eq!(IsUserExpired::fold(Some(false)), Step::Decide(false));
    }

    #[test]
    fn test_flag_fold() {
        assert_eq!(
            CheckUsernameForSpam::fold(true),
            Step::Decide(SearchVisibility::Excluded)
        );
        assert_eq!(CheckUsernameForSpam::fold(false), Step::Continue);
    }

    #[test]
    fn test_policy_table() {
        assert_eq!(
            policy_of(HookCategory::UserMayPublishRoom),
            AggregationPolicy::VetoOnFirstDeny
        );
        assert_eq!(
            policy_of(HookCategory::CheckMediaFileForSpam),
            AggregationPolicy::VetoOnFirstDeny
        );
        assert_eq!(
            policy_of(HookCategory::OnUserRegistration),
            AggregationPolicy::Broadcast
        );
        assert_eq!(
            policy_of(HookCategory::CheckUsernameForSpam),
            AggregationPolicy::FlagOnFirstPositive
        );
    }

    #[test]
    fn test_failure_mode_from_config() {
        use homestead_config::CallbackFailurePolicy;
        assert_eq!(FailureMode::from(CallbackFailurePolicy::Deny), FailureMode::FailClosed);
        assert_eq!(FailureMode::from(CallbackFailurePolicy::Allow), FailureMode::FailOpen);
    }
}
