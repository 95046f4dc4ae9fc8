//! Text rendering of log records
//!
//! Two layouts are provided:
//! - the persisted line layout used by the file sink: tab-delimited columns
//!   `timestamp, level, category, message`, followed by one `key=value`
//!   column per structured field and an optional `error=` column
//! - the human-readable console layout
//!
//! Messages are sanitized when the record is built and field values are
//! sanitized here, so a tab always separates columns and a newline always
//! ends a record.

use super::log_record::{sanitize, LogRecord};
use super::timestamp::TimestampFormat;

/// Column delimiter of the persisted line layout
pub const FIELD_DELIMITER: char = '\t';

/// Render a record as one tab-delimited line, without the trailing newline
pub fn format_line(record: &LogRecord, timestamp_format: &TimestampFormat) -> String {
    let mut line = String::with_capacity(64 + record.message.len());

    line.push_str(&sanitize(&timestamp_format.format(&record.timestamp)));
    line.push(FIELD_DELIMITER);
    line.push_str(record.level.to_str());
    line.push(FIELD_DELIMITER);
    line.push_str(record.category.as_str());
    line.push(FIELD_DELIMITER);
    line.push_str(&record.message);

    if let Some(ref fields) = record.fields {
        for (key, value) in fields.fields() {
            line.push(FIELD_DELIMITER);
            line.push_str(&sanitize(key));
            line.push('=');
            line.push_str(&sanitize(&value.to_string()));
        }
    }

    if let Some(ref error) = record.error {
        line.push(FIELD_DELIMITER);
        line.push_str("error=");
        line.push_str(error);
    }

    line
}

/// Render a record for a terminal: `[ts] [LEVEL] [thread] category - message`
///
/// `level` is passed in pre-rendered so the console sink can colorize it.
pub fn format_console(record: &LogRecord, level: &str, timestamp_format: &TimestampFormat) -> String {
    let mut output = format!(
        "[{}] [{}] [{}] {} - {}",
        timestamp_format.format(&record.timestamp),
        level,
        record.thread_label(),
        record.category,
        record.message
    );

    if let Some(ref fields) = record.fields {
        output.push(' ');
        output.push_str(&sanitize(&fields.format_fields()));
    }

    if let Some(ref error) = record.error {
        output.push_str(" | error: ");
        output.push_str(error);
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CategoryRegistry, LogContext, LogLevel};

    fn record(level: LogLevel, message: &str) -> LogRecord {
        let category = CategoryRegistry::new().get_or_register("neo4j.index").unwrap();
        LogRecord::new(level, category, message)
    }

    #[test]
    fn test_line_columns() {
        let line = format_line(&record(LogLevel::Info, "index online"), &TimestampFormat::UnixMillis);
        let columns: Vec<&str> = line.split(FIELD_DELIMITER).collect();

        assert_eq!(columns.len(), 4);
        assert!(columns[0].parse::<i64>().is_ok());
        assert_eq!(columns[1], "INFO");
        assert_eq!(columns[2], "neo4j.index");
        assert_eq!(columns[3], "index online");
    }

    #[test]
    fn test_line_with_fields_and_error() {
        let fields = LogContext::new()
            .with_field("index", "person_name")
            .with_field("note", "has\ttab");
        let io = std::io::Error::other("segment missing");
        let record = record(LogLevel::Error, "population failed")
            .with_fields(fields)
            .with_error(&io);

        let line = format_line(&record, &TimestampFormat::Iso8601);
        let columns: Vec<&str> = line.split(FIELD_DELIMITER).collect();

        assert_eq!(
            &columns[3..],
            &[
                "population failed",
                "index=person_name",
                "note=has\\ttab",
                "error=segment missing"
            ]
        );
    }

    #[test]
    fn test_line_is_single_line() {
        let line = format_line(
            &record(LogLevel::Warn, "first\nERROR forged entry"),
            &TimestampFormat::Iso8601,
        );
        assert_eq!(line.lines().count(), 1);
    }

    #[test]
    fn test_timestamp_cannot_split_columns() {
        let format = TimestampFormat::Custom("%Y%n%H%t%M".to_string());
        let line = format_line(&record(LogLevel::Info, "one record"), &format);

        assert_eq!(line.lines().count(), 1);
        assert_eq!(line.split(FIELD_DELIMITER).count(), 4);
    }

    #[test]
    fn test_console_layout() {
        let fields = LogContext::new().with_field("tx_id", 7);
        let record = record(LogLevel::Warn, "lock wait").with_fields(fields);
        let output = format_console(&record, "WARN ", &TimestampFormat::Iso8601);

        assert!(output.contains("[WARN ]"));
        assert!(output.contains("neo4j.index - lock wait tx_id=7"));
    }
}
