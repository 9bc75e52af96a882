//! Structured logging on stderr via `tracing`.
//!
//! Level comes from `XORSHARE_LOG` (EnvFilter syntax) when set, otherwise from
//! the verbosity flags. Format is `text` or `json`, from `--log-format` or
//! `XORSHARE_LOG_FORMAT`.

use crate::error::{Result, XorshareError};
use std::io::IsTerminal;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

pub const LOG_ENV: &str = "XORSHARE_LOG";
pub const LOG_FORMAT_ENV: &str = "XORSHARE_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = XorshareError;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(XorshareError::Config(format!(
                "Invalid log format: {} (must be 'json' or 'text')",
                s
            ))),
        }
    }
}

/// Logging configuration taken from the command line
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    /// Number of `-v` flags
    pub verbosity: u8,
    /// Turn logging off entirely
    pub quiet: bool,
    /// Explicit format, overriding the environment
    pub format: Option<LogFormat>,
}

impl LoggingConfig {
    /// Level directive for the verbosity flags
    pub fn level(&self) -> &'static str {
        if self.quiet {
            return "off";
        }
        match self.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = build_env_filter(config);
    let format = determine_format(config)?;
    let registry = Registry::default().with(filter);

    let result = match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(std::io::stderr().is_terminal())
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    result.map_err(|e| XorshareError::Config(format!("Failed to initialize logging: {}", e)))
}

fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    if config.quiet {
        return EnvFilter::new("off");
    }
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(config.level()))
}

fn determine_format(config: &LoggingConfig) -> Result<LogFormat> {
    if let Some(format) = config.format {
        return Ok(format);
    }
    match std::env::var(LOG_FORMAT_ENV) {
        Ok(value) if !value.is_empty() => value.parse(),
        _ => Ok(LogFormat::default()),
    }
}
