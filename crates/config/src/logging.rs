//! Logging configuration
//!
//! Read by the `beacon` binary when it installs its subscriber. The
//! write-path crates only emit `tracing` events; they never pick a level.
//!
//! ```toml
//! [log]
//! level = "warn"
//! format = "json"
//!
//! [log.targets]
//! beacon_pipeline = "debug"   # upload cycles and flushes
//! beacon_storage = "info"     # batch recovery, preference writes
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// How log lines are rendered on stderr
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Plain lines for a terminal
    #[default]
    Console,
    /// One JSON object per line, for log shippers
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level for everything without a target override
    pub level: LogLevel,
    pub format: LogFormat,
    /// Per-crate overrides, keyed by tracing target (`beacon_storage`, ...)
    pub targets: BTreeMap<String, LogLevel>,
}

impl LogConfig {
    /// `EnvFilter` directive for this configuration, with `level` replacing
    /// the base level when given
    pub fn filter_directive(&self, level: Option<&str>) -> String {
        let mut directive = level.unwrap_or(self.level.as_str()).to_string();
        for (target, level) in &self.targets {
            directive.push(',');
            directive.push_str(target);
            directive.push('=');
            directive.push_str(level.as_str());
        }
        directive
    }
}
