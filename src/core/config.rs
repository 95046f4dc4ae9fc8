//! Configuration file format
//!
//! A configuration names its sinks once and refers to them by name from the
//! routing rules, so a sink can be shared by several prefixes:
//!
//! ```json
//! {
//!   "categories": ["neo4j.index.lucene"],
//!   "sinks": {
//!     "console": { "type": "console", "target": "split" },
//!     "messages": { "type": "file", "path": "data/log/messages.log" },
//!     "diagnostics": { "type": "ring_buffer", "capacity": 1000 }
//!   },
//!   "root": { "threshold": "WARN", "sinks": ["console", "messages"] },
//!   "rules": [
//!     { "prefix": "neo4j.txmanager", "threshold": "DEBUG", "sinks": ["messages"] },
//!     { "prefix": "neo4j.diagnostics", "threshold": "INFO", "sinks": ["diagnostics"] }
//!   ]
//! }
//! ```
//!
//! Applying a configuration never stops at the first problem: each bad entry
//! is reported in a [`ConfigReport`] and the rest still applies.

use super::error::{LoggingError, Result};
use super::log_level::LogLevel;
use super::sink::SharedSink;
use super::timestamp::TimestampFormat;
use crate::sinks::file::{DEFAULT_BUFFER_CAPACITY, DEFAULT_FLUSH_INTERVAL};
use crate::sinks::{ConsoleSink, ConsoleTarget, FileSink, RingBufferSink};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Extra categories to register before rules are applied
    #[serde(default)]
    pub categories: Vec<String>,

    #[serde(default)]
    pub sinks: BTreeMap<String, SinkSpec>,

    /// Replaces the default root rule when present
    #[serde(default)]
    pub root: Option<RootConfig>,

    /// Applied in order; a later rule for the same prefix wins
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootConfig {
    pub threshold: LogLevel,
    #[serde(default)]
    pub sinks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub prefix: String,
    pub threshold: LogLevel,
    #[serde(default)]
    pub sinks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkSpec {
    Console {
        #[serde(default)]
        target: ConsoleTarget,
        #[serde(default = "default_colors")]
        colors: bool,
        #[serde(default)]
        timestamp_format: TimestampFormat,
    },
    File {
        path: PathBuf,
        /// Zero disables the background flusher
        #[serde(default = "default_flush_interval_ms")]
        flush_interval_ms: u64,
        #[serde(default = "default_buffer_capacity")]
        buffer_capacity: usize,
        #[serde(default)]
        timestamp_format: TimestampFormat,
    },
    RingBuffer {
        capacity: usize,
    },
}

fn default_colors() -> bool {
    true
}

fn default_flush_interval_ms() -> u64 {
    DEFAULT_FLUSH_INTERVAL.as_millis() as u64
}

fn default_buffer_capacity() -> usize {
    DEFAULT_BUFFER_CAPACITY
}

/// A sink built from a [`SinkSpec`]
pub enum BuiltSink {
    Shared(SharedSink),
    /// Kept typed so the service can hand it out for diagnostics
    RingBuffer(Arc<RingBufferSink>),
}

impl SinkSpec {
    pub fn build(&self, name: &str) -> Result<BuiltSink> {
        match self {
            SinkSpec::Console {
                target,
                colors,
                timestamp_format,
            } => {
                timestamp_format
                    .validate()
                    .map_err(|message| LoggingError::config(format!("sink '{}'", name), message))?;
                Ok(BuiltSink::Shared(Arc::new(
                    ConsoleSink::new()
                        .with_name(name)
                        .with_target(*target)
                        .with_colors(*colors)
                        .with_timestamp_format(timestamp_format.clone()),
                )))
            }
            SinkSpec::File {
                path,
                flush_interval_ms,
                buffer_capacity,
                timestamp_format,
            } => {
                if path.as_os_str().is_empty() {
                    return Err(LoggingError::config(
                        format!("sink '{}'", name),
                        "file path is empty",
                    ));
                }
                timestamp_format
                    .validate()
                    .map_err(|message| LoggingError::config(format!("sink '{}'", name), message))?;
                Ok(BuiltSink::Shared(Arc::new(
                    FileSink::new(path)
                        .with_name(name)
                        .with_flush_interval(Some(Duration::from_millis(*flush_interval_ms)))
                        .with_buffer_capacity(*buffer_capacity)
                        .with_timestamp_format(timestamp_format.clone()),
                )))
            }
            SinkSpec::RingBuffer { capacity } => RingBufferSink::new(*capacity)
                .map(|sink| BuiltSink::RingBuffer(Arc::new(sink.with_name(name))))
                .map_err(|_| {
                    LoggingError::config(
                        format!("sink '{}'", name),
                        "ring buffer capacity must be greater than zero",
                    )
                }),
        }
    }
}

impl LoggingConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Result of applying a configuration
#[derive(Debug, Default)]
pub struct ConfigReport {
    /// Entries (categories, sinks, rules) applied successfully
    pub applied: usize,
    pub errors: Vec<LoggingError>,
}

impl ConfigReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn record(&mut self, result: Result<()>) {
        match result {
            Ok(()) => self.applied += 1,
            Err(e) => self.errors.push(e),
        }
    }
}
