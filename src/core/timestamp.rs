//! Timestamp formatting for sink output

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Timestamp format used by text sinks
///
/// # Examples
///
/// ```
/// use kernel_logging::core::TimestampFormat;
/// use chrono::Utc;
///
/// let format = TimestampFormat::Iso8601;
/// let timestamp = format.format(&Utc::now());
/// assert!(timestamp.ends_with('Z'));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampFormat {
    /// ISO 8601 with milliseconds: `2025-01-08T10:30:45.123Z`
    #[default]
    Iso8601,

    /// ISO 8601 with microseconds: `2025-01-08T10:30:45.123456Z`
    ///
    /// Useful for ordering records from concurrent emitters.
    Iso8601Micros,

    /// RFC 3339 format: `2025-01-08T10:30:45.123456+00:00`
    Rfc3339,

    /// Unix timestamp in milliseconds: `1736332245123`
    UnixMillis,

    /// Custom strftime format
    Custom(String),
}

impl TimestampFormat {
    #[must_use]
    pub fn format(&self, datetime: &DateTime<Utc>) -> String {
        match self {
            TimestampFormat::Iso8601 => datetime.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            TimestampFormat::Iso8601Micros => datetime.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string(),
            TimestampFormat::Rfc3339 => datetime.to_rfc3339(),
            TimestampFormat::UnixMillis => datetime.timestamp_millis().to_string(),
            TimestampFormat::Custom(format_str) => {
                let mut output = String::new();
                if write!(output, "{}", datetime.format(format_str)).is_err() {
                    // Unvalidated pattern; never let a bad format drop the record
                    return TimestampFormat::Iso8601.format(datetime);
                }
                output
            }
        }
    }

    /// Check that a custom pattern parses and renders on a single column.
    ///
    /// Tabs, newlines and carriage returns are rejected, whether literal or
    /// produced by `%t` / `%n`.
    pub fn validate(&self) -> Result<(), String> {
        let TimestampFormat::Custom(format_str) = self else {
            return Ok(());
        };

        for item in StrftimeItems::new(format_str) {
            let text = match item {
                Item::Error => {
                    return Err(format!("invalid timestamp pattern '{}'", format_str));
                }
                Item::Literal(text) | Item::Space(text) => text,
                Item::OwnedLiteral(ref text) | Item::OwnedSpace(ref text) => &**text,
                _ => continue,
            };
            if text.contains(['\t', '\n', '\r']) {
                return Err(format!(
                    "timestamp pattern '{}' produces a tab or line break",
                    format_str.escape_default()
                ));
            }
        }
        Ok(())
    }
}
