//! Tracing subscriber setup for the binary.
//!
//! The level comes from `RUST_LOG` (default `info`); `LOG_FORMAT=json`
//! switches to one JSON object per event.

use std::str::FromStr;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Error, Result};

const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(Error::Config {
                key: "LOG_FORMAT".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// `EnvFilter` directives, e.g. `emergency_router=debug`.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: DEFAULT_FILTER.to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(format) = lookup("LOG_FORMAT") {
            config.format = format.parse()?;
        }
        if let Some(filter) = lookup("RUST_LOG").filter(|f| !f.trim().is_empty()) {
            parse_filter(&filter)?;
            config.filter = filter;
        }
        Ok(config)
    }
}

fn parse_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives).map_err(|_| Error::Config {
        key: "RUST_LOG".to_string(),
        value: directives.to_string(),
    })
}

/// Installs the global subscriber.
///
/// Fails on malformed filter directives or when a subscriber is already
/// installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = parse_filter(&config.filter)?;

    match config.format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_target(true)
                .with_thread_names(true)
                .flatten_event(true)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry().with(filter).with(layer).try_init()?;
        }
        LogFormat::Text => {
            let layer = fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry().with(filter).with(layer).try_init()?;
        }
    }
    Ok(())
}
