//! Logging setup on top of `tracing-subscriber`.

use std::fmt;
use std::str::FromStr;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::error::{TelemetryError, TelemetryResult};

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human friendly.
    Pretty,
    /// One line per event.
    #[default]
    Compact,
    /// Newline-delimited JSON.
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Compact => write!(f, "compact"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(TelemetryError::ConfigError(format!(
                "unknown log format: {other}"
            ))),
        }
    }
}

/// Where log lines are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogTarget {
    /// Standard output.
    Stdout,
    /// Standard error.
    #[default]
    Stderr,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Base level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Output format.
    pub format: LogFormat,
    /// Output target.
    pub target: LogTarget,
    /// Extra `EnvFilter` directives, e.g. `homestead_modules=debug`.
    pub directives: Vec<String>,
    /// Let `RUST_LOG` override the level and directives when it is set.
    pub respect_env: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new("info")
    }
}

impl LogConfig {
    /// Create a configuration with the given base level.
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            format: LogFormat::default(),
            target: LogTarget::default(),
            directives: Vec::new(),
            respect_env: true,
        }
    }

    /// Set the output format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the output target.
    #[must_use]
    pub fn with_target(mut self, target: LogTarget) -> Self {
        self.target = target;
        self
    }

    /// Add a filter directive.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Ignore `RUST_LOG`.
    #[must_use]
    pub fn ignore_env(mut self) -> Self {
        self.respect_env = false;
        self
    }

    /// Build the `EnvFilter` this configuration describes.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::ConfigError`] if a directive does not parse.
    pub fn env_filter(&self) -> TelemetryResult<EnvFilter> {
        if self.respect_env
            && let Ok(filter) = EnvFilter::try_from_default_env()
        {
            return Ok(filter);
        }

        let mut spec = self.level.clone();
        for directive in &self.directives {
            spec.push(',');
            spec.push_str(directive);
        }
        EnvFilter::try_new(&spec)
            .map_err(|e| TelemetryError::ConfigError(format!("invalid filter '{spec}': {e}")))
    }
}

#[cfg(feature = "config")]
impl TryFrom<&homestead_config::LoggingSection> for LogConfig {
    type Error = TelemetryError;

    fn try_from(section: &homestead_config::LoggingSection) -> Result<Self, Self::Error> {
        let mut config = Self::new(section.level.clone()).with_format(section.format.parse()?);
        config.directives.clone_from(&section.directives);
        Ok(config)
    }
}

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Returns [`TelemetryError::ConfigError`] for a bad filter and
/// [`TelemetryError::InitError`] if a global subscriber is already set.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = config.env_filter()?;
    let writer = match config.target {
        LogTarget::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogTarget::Stderr => BoxMakeWriter::new(std::io::stderr),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(true);

    let result = match config.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    result.map_err(|e| TelemetryError::InitError(e.to_string()))
}

/// Install a compact `info` subscriber on stderr.
///
/// # Errors
///
/// Returns [`TelemetryError::InitError`] if a global subscriber is already set.
pub fn setup_default_logging() -> TelemetryResult<()> {
    setup_logging(&LogConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::Pretty.to_string(), "pretty");
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_builder() {
        let config = LogConfig::new("debug")
            .with_format(LogFormat::Json)
            .with_target(LogTarget::Stdout)
            .with_directive("homestead_modules=trace");
        assert_eq!(config.level, "debug");
        assert_eq!(config.directives, ["homestead_modules=trace"]);
        assert!(config.respect_env);
    }

    #[test]
    fn test_env_filter_from_directives() {
        let config = LogConfig::new("warn")
            .with_directive("homestead_modules=debug")
            .ignore_env();
        let filter = config.env_filter().unwrap();
        assert!(filter.to_string().contains("homestead_modules=debug"));
    }

    #[test]
    fn test_bad_directive_rejected() {
        let config = LogConfig::new("info")
            .with_directive("homestead_modules=loudest")
            .ignore_env();
        assert!(matches!(
            config.env_filter(),
            Err(TelemetryError::ConfigError(_))
        ));
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_from_logging_section() {
        let section = homestead_config::LoggingSection {
            level: "debug".to_owned(),
            format: "pretty".to_owned(),
            directives: vec!["tokio=warn".to_owned()],
        };
        let config = LogConfig::try_from(&section).unwrap();
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.directives, ["tokio=warn"]);
    }

    #[test]
    fn test_second_init_fails_without_panicking() {
        let config = LogConfig::new("error").ignore_env();
        let _ = setup_logging(&config);
        let second = setup_logging(&config);
        assert!(matches!(second, Err(TelemetryError::InitError(_))));
    }
}
