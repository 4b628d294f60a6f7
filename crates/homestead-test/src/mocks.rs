//! Mock collaborators.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use homestead_core::HookCategory;
use homestead_modules::{
    CallbackFailure, FailureReporter, ModuleId, ResourceHandler, ResourceRequest,
    ResourceResponse,
};

/// Records callback invocations, in order, across every module sharing it.
#[derive(Debug, Clone, Default)]
pub struct CallRecorder {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallRecorder {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn record(&self, entry: impl Into<String>) {
        if let Ok(mut guard) = self.calls.lock() {
            guard.push(entry.into());
        }
    }

    /// Every entry so far.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Entries ending with `:{suffix}`, with the suffix stripped.
    ///
    /// `calls_for("user_may_create_room")` gives the labels of the modules
    /// whose `user_may_create_room` callback ran.
    #[must_use]
    pub fn calls_for(&self, suffix: &str) -> Vec<String> {
        let suffix = format!(":{suffix}");
        self.calls()
            .into_iter()
            .filter_map(|c| c.strip_suffix(&suffix).map(str::to_string))
            .collect()
    }

    /// Forget every entry.
    pub fn clear(&self) {
        if let Ok(mut guard) = self.calls.lock() {
            guard.clear();
        }
    }
}

/// Failure reporter that keeps every failure for later assertions.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    failures: Mutex<Vec<CallbackFailure>>,
}

impl RecordingReporter {
    /// Create a shared reporter.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every failure reported so far.
    #[must_use]
    pub fn failures(&self) -> Vec<CallbackFailure> {
        self.failures.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Number of failures reported so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.failures.lock().map(|g| g.len()).unwrap_or_default()
    }

    /// `(module, category)` of every failure, in order.
    #[must_use]
    pub fn sources(&self) -> Vec<(ModuleId, HookCategory)> {
        self.failures()
            .into_iter()
            .map(|f| (f.module, f.category))
            .collect()
    }
}

impl FailureReporter for RecordingReporter {
    fn callback_failed(&self, failure: &CallbackFailure) {
        if let Ok(mut guard) = self.failures.lock() {
            guard.push(failure.clone());
        }
    }
}

/// Resource answering every request with a fixed label.
#[derive(Debug, Clone)]
pub struct StaticResource {
    label: String,
}

impl StaticResource {
    /// Create a resource answering `{"served_by": label}`.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

#[async_trait]
impl ResourceHandler for StaticResource {
    async fn handle(&self, request: ResourceRequest) -> ResourceResponse {
        ResourceResponse::ok(serde_json::json!({
            "served_by": self.label,
            "path": request.path,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use homestead_modules::CallbackError;

    #[test]
    fn test_call_recorder() {
        let recorder = CallRecorder::new();
        let shared = recorder.clone();
        recorder.record("a:user_may_create_room");
        shared.record("b:user_may_invite");
        recorder.record("c:user_may_create_room");

        assert_eq!(recorder.calls().len(), 3);
        assert_eq!(recorder.calls_for("user_may_create_room"), ["a", "c"]);

        recorder.clear();
        assert!(shared.calls().is_empty());
    }

    #[test]
    fn test_recording_reporter() {
        let reporter = RecordingReporter::new();
        reporter.callback_failed(&CallbackFailure::new(
            ModuleId::new(0, "a.B"),
            HookCategory::UserMayInvite,
            CallbackError::failed("x"),
        ));
        assert_eq!(reporter.count(), 1);
        assert_eq!(
            reporter.sources(),
            [(ModuleId::new(0, "a.B"), HookCategory::UserMayInvite)]
        );
    }

    #[tokio::test]
    async fn test_static_resource() {
        let response = StaticResource::new("x")
            .handle(ResourceRequest::get("/p"))
            .await;
        assert_eq!(response.body["served_by"], "x");
    }
}
