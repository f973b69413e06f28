//! Process-wide logging setup driven by [`Settings`].

use std::fmt;
use std::str::FromStr;

use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

use crate::config::Settings;

/// Target of the per-request access trace, kept at WARN to avoid log noise.
pub const ACCESS_LOG_TARGET: &str = "tower_http";

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("failed to install global subscriber: {0}")]
    Install(#[from] TryInitError),
}

/// Log severity as configured through `LOG_LEVEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// Parses a level name case-insensitively, falling back to `Info`.
    pub fn parse_or_default(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }

    /// Maps onto `tracing`, which has no level above ERROR.
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error | LogLevel::Critical => LevelFilter::ERROR,
        }
    }

    fn directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARNING" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            "CRITICAL" => Ok(LogLevel::Critical),
            _ => Err(()),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        };
        f.write_str(name)
    }
}

/// Logging context for the process.
///
/// Built once in `main` from the settings and installed with [`Logging::init`].
/// The context remembers whether it already installed its subscriber, so
/// repeated calls never stack a second set of output layers.
#[derive(Debug, Default)]
pub struct Logging {
    level: LogLevel,
    installed: OnceCell<()>,
}

impl Logging {
    pub fn new(settings: &Settings) -> Self {
        Self {
            level: LogLevel::parse_or_default(&settings.log_level),
            installed: OnceCell::new(),
        }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Filter directives: the configured level globally, WARN for access logs.
    pub fn directives(&self) -> String {
        format!("{},{ACCESS_LOG_TARGET}=warn", self.level.directive())
    }

    /// Builds the subscriber writing to `writer` without installing it.
    pub fn subscriber<W>(
        &self,
        writer: W,
    ) -> Result<impl tracing::Subscriber + Send + Sync + use<W>, LoggingError>
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let filter = EnvFilter::try_new(self.directives())?;

        Ok(tracing_subscriber::registry().with(filter).with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(writer),
        ))
    }

    /// Installs the global subscriber writing to stderr.
    ///
    /// Returns `Ok(true)` when this call installed it and `Ok(false)` when the
    /// context was already initialised.
    pub fn init(&self) -> Result<bool, LoggingError> {
        self.init_with_writer(std::io::stderr)
    }

    pub fn init_with_writer<W>(&self, writer: W) -> Result<bool, LoggingError>
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let mut installed_now = false;
        self.installed.get_or_try_init(|| {
            self.subscriber(writer)?.try_init()?;
            installed_now = true;
            Ok::<_, LoggingError>(())
        })?;

        if installed_now {
            tracing::debug!(level = %self.level, "logging configured");
        }
        Ok(installed_now)
    }
}
