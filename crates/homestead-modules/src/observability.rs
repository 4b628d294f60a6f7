//! Where callback faults are reported.

use chrono::{DateTime, Utc};
use homestead_core::HookCategory;
use tracing::error;

use crate::error::CallbackError;
use crate::module::ModuleId;

/// A callback fault isolated by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackFailure {
    /// Module whose callback failed.
    pub module: ModuleId,
    /// Category being dispatched.
    pub category: HookCategory,
    /// What went wrong.
    pub error: CallbackError,
    /// When the fault was observed.
    pub occurred_at: DateTime<Utc>,
}

impl CallbackFailure {
    /// Record a fault observed now.
    #[must_use]
    pub fn new(module: ModuleId, category: HookCategory, error: CallbackError) -> Self {
        Self {
            module,
            category,
            error,
            occurred_at: Utc::now(),
        }
    }
}

/// Receives every callback fault the dispatcher isolates.
///
/// Called inline on the dispatching task; implementations must not block.
pub trait FailureReporter: Send + Sync {
    /// A callback failed or panicked.
    fn callback_failed(&self, failure: &CallbackFailure);
}

/// Reports faults as `tracing` error events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl FailureReporter for TracingReporter {
    fn callback_failed(&self, failure: &CallbackFailure) {
        error!(
            module = %failure.module,
            category = %failure.category,
            occurred_at = %failure.occurred_at.to_rfc3339(),
            error = %failure.error,
            "module callback failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_timestamp() {
        let before = Utc::now();
        let failure = CallbackFailure::new(
            ModuleId::new(0, "a.B"),
            HookCategory::UserMayInvite,
            CallbackError::Panicked("boom".into()),
        );
        assert!(failure.occurred_at >= before);
        assert_eq!(failure.category, HookCategory::UserMayInvite);
    }

    #[test]
    fn test_tracing_reporter_does_not_panic() {
        let failure = CallbackFailure::new(
            ModuleId::new(1, "a.B"),
            HookCategory::CheckEventForSpam,
            CallbackError::failed("db down"),
        );
        TracingReporter.callback_failed(&failure);
    }
}
