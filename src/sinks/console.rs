//! Console sink implementation

use crate::core::line_format::format_console;
use crate::core::{LogRecord, Sink, SinkError, SinkResult, SinkState, TimestampFormat};
#[cfg(feature = "console")]
use colored::Colorize;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// Stream a console sink writes to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleTarget {
    Stdout,
    Stderr,
    /// ERROR and FATAL to stderr, everything else to stdout
    #[default]
    Split,
}

struct ConsoleInner {
    state: SinkState,
    /// Replaces the standard streams when set
    capture: Option<Box<dyn Write + Send>>,
}

/// Synchronous, unbuffered terminal output
pub struct ConsoleSink {
    name: String,
    use_colors: bool,
    target: ConsoleTarget,
    timestamp_format: TimestampFormat,
    inner: Mutex<ConsoleInner>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            name: "console".to_string(),
            use_colors: cfg!(feature = "console"),
            target: ConsoleTarget::default(),
            timestamp_format: TimestampFormat::default(),
            inner: Mutex::new(ConsoleInner {
                state: SinkState::Unopened,
                capture: None,
            }),
        }
    }

    /// Write into `writer` instead of the standard streams, without colors
    pub fn with_writer(writer: impl Write + Send + 'static) -> Self {
        let sink = Self::new().with_colors(false);
        sink.inner.lock().capture = Some(Box::new(writer));
        sink
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Colors only take effect when the `console` feature is enabled
    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    #[must_use]
    pub fn with_target(mut self, target: ConsoleTarget) -> Self {
        self.target = target;
        self
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    fn render_level(&self, record: &LogRecord) -> String {
        let level = format!("{:5}", record.level.to_str());
        #[cfg(feature = "console")]
        if self.use_colors {
            return level.color(record.level.color_code()).to_string();
        }
        level
    }

    fn to_stderr(&self, record: &LogRecord) -> bool {
        match self.target {
            ConsoleTarget::Stdout => false,
            ConsoleTarget::Stderr => true,
            ConsoleTarget::Split => record.level.is_severe(),
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for ConsoleSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, record: &LogRecord) -> SinkResult<()> {
        let output = format_console(record, &self.render_level(record), &self.timestamp_format);

        let mut inner = self.inner.lock();
        inner.state.ensure_usable(&self.name)?;
        inner.state = SinkState::Open;

        let result = if let Some(ref mut capture) = inner.capture {
            writeln!(capture, "{}", output).and_then(|_| capture.flush())
        } else if self.to_stderr(record) {
            let mut stderr = io::stderr().lock();
            writeln!(stderr, "{}", output).and_then(|_| stderr.flush())
        } else {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", output).and_then(|_| stdout.flush())
        };

        result.map_err(|e| SinkError::io(&self.name, "writing to console", e))
    }

    fn flush(&self) -> SinkResult<()> {
        let mut inner = self.inner.lock();
        inner.state.ensure_usable(&self.name)?;

        let result = match inner.capture {
            Some(ref mut capture) => capture.flush(),
            // Flush both stdout and stderr since we write to both
            None => io::stdout().flush().and_then(|_| io::stderr().flush()),
        };
        result.map_err(|e| SinkError::io(&self.name, "flushing console", e))
    }

    fn open(&self) -> SinkResult<()> {
        let mut inner = self.inner.lock();
        inner.state.ensure_usable(&self.name)?;
        inner.state = SinkState::Open;
        Ok(())
    }

    fn close(&self) -> SinkResult<()> {
        let mut inner = self.inner.lock();
        if inner.state == SinkState::Closed {
            return Ok(());
        }
        inner.state = SinkState::Closed;

        let result = match inner.capture.take() {
            Some(mut capture) => capture.flush(),
            None => io::stdout().flush().and_then(|_| io::stderr().flush()),
        };
        result.map_err(|e| SinkError::io(&self.name, "flushing console", e))
    }

    fn state(&self) -> SinkState {
        self.inner.lock().state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CategoryRegistry, LogLevel};
    use std::sync::Arc;

    /// Cloneable in-memory writer
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().clone()).unwrap()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn record(level: LogLevel, message: &str) -> LogRecord {
        let category = CategoryRegistry::new().get_or_register("neo4j.config").unwrap();
        LogRecord::new(level, category, message)
    }

    #[test]
    fn test_captured_output() {
        let buffer = SharedBuffer::default();
        let sink = ConsoleSink::with_writer(buffer.clone());
        assert_eq!(sink.state(), SinkState::Unopened);

        sink.write(&record(LogLevel::Info, "setting loaded")).unwrap();
        sink.write(&record(LogLevel::Error, "setting rejected")).unwrap();

        assert_eq!(sink.state(), SinkState::Open);
        let contents = buffer.contents();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.contains("[INFO ]"));
        assert!(contents.contains("neo4j.config - setting rejected"));
    }

    #[test]
    fn test_write_after_close_fails() {
        let sink = ConsoleSink::with_writer(SharedBuffer::default());
        sink.close().unwrap();
        sink.close().unwrap();

        let err = sink.write(&record(LogLevel::Warn, "late")).unwrap_err();
        assert!(err.is_closed());
        assert!(sink.open().is_err());
        assert!(sink.flush().is_err());
    }

    #[test]
    fn test_split_target() {
        let sink = ConsoleSink::new();
        assert!(!sink.to_stderr(&record(LogLevel::Warn, "m")));
        assert!(sink.to_stderr(&record(LogLevel::Fatal, "m")));

        let sink = ConsoleSink::new().with_target(ConsoleTarget::Stderr);
        assert!(sink.to_stderr(&record(LogLevel::Info, "m")));
    }
}
