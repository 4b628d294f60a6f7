//! Homestead Test - Shared test utilities for the Homestead module host.
//!
//! This crate provides fixtures, a recording failure reporter and a scripted
//! module factory that can be used across Homestead crates as a
//! dev-dependency.
//!
//! # Usage
//!
//! ```rust,ignore
//! use homestead_test::{CallRecorder, scripted, scripted_loader, test_user};
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_second_module_vetoes() {
//!     let recorder = CallRecorder::new();
//!     let host = scripted_loader(&recorder)
//!         .load([
//!             scripted("a", json!({ "user_may_create_room": true })),
//!             scripted("b", json!({ "user_may_create_room": false })),
//!         ])
//!         .unwrap();
//!
//!     let verdict = host.dispatcher().user_may_create_room(&test_user("alice")).await;
//!     assert!(!verdict.is_allowed());
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod mocks;
pub mod scripted;

pub use fixtures::*;
pub use mocks::*;
pub use scripted::*;
