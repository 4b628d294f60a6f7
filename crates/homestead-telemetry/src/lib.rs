//! Homestead Telemetry - Logging setup for the Homestead module host.
//!
//! This crate provides:
//! - Configurable logging setup with multiple formats
//! - A bridge from the `[logging]` section of the host configuration
//!
//! # Example
//!
//! ```rust,no_run
//! use homestead_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), homestead_telemetry::TelemetryError> {
//! let config = LogConfig::new("debug")
//!     .with_format(LogFormat::Pretty)
//!     .with_directive("homestead_modules=trace");
//!
//! setup_logging(&config)?;
//! tracing::info!("modules loading");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
