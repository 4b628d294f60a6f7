//! Prelude module - commonly used test utilities.
//!
//! Use `use homestead_test::prelude::*;` in test modules.

pub use crate::fixtures::*;
pub use crate::mocks::{CallRecorder, RecordingReporter, StaticResource};
pub use crate::scripted::{SCRIPTED, ScriptedModule, ScriptedModuleFactory, scripted, scripted_loader};
