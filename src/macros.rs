//! Logging macros with `format!` arguments.
//!
//! The message is only formatted when the logger's current rule lets the
//! level through.
//!
//! # Examples
//!
//! ```
//! use kernel_logging::prelude::*;
//! use kernel_logging::{info, warn};
//!
//! let service = LoggingService::new();
//! let logger = service.get_logger(names::NEOSTORE).unwrap();
//!
//! // Below the default WARN threshold: not formatted
//! info!(logger, "Mapped {} store files", 12);
//!
//! let path = "neostore.nodestore.db";
//! warn!(logger, "Store file {} was not cleanly shut down", path);
//! # service.shutdown();
//! ```

/// Log a formatted message at the given level.
///
/// Evaluates to `Option<EmitOutcome>`, `None` when the level is filtered.
///
/// # Examples
///
/// ```
/// # use kernel_logging::prelude::*;
/// # let service = LoggingService::new();
/// # let logger = service.get_logger(names::CONFIG).unwrap();
/// use kernel_logging::log;
/// log!(logger, LogLevel::Warn, "Unknown setting");
/// log!(logger, LogLevel::Error, "Invalid value for {}: {}", "cache_type", "huge");
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {{
        let logger = &$logger;
        let level = $level;
        if logger.is_enabled(level) {
            Some(logger.log(level, format!($($arg)+)))
        } else {
            None
        }
    }};
}

/// Log a trace-level message.
#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Trace, $($arg)+)
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
///
/// # Examples
///
/// ```
/// # use kernel_logging::prelude::*;
/// # let service = LoggingService::new();
/// # let logger = service.get_logger(names::EXTENSION).unwrap();
/// use kernel_logging::info;
/// info!(logger, "Loaded {} kernel extensions", 3);
/// ```
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warn, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log a fatal-level message.
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Fatal, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{names, LogLevel, LoggingService};
    use crate::sinks::RingBufferSink;
    use std::cell::Cell;
    use std::fmt;
    use std::sync::Arc;

    struct CountingDisplay<'a>(&'a Cell<usize>);

    impl fmt::Display for CountingDisplay<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            self.0.set(self.0.get() + 1);
            write!(f, "counted")
        }
    }

    fn service(threshold: LogLevel) -> (LoggingService, Arc<RingBufferSink>) {
        let ring = Arc::new(RingBufferSink::new(32).unwrap());
        let service = LoggingService::builder()
            .root_threshold(threshold)
            .root_ring_buffer("recent", Arc::clone(&ring))
            .build();
        (service, ring)
    }

    #[test]
    fn test_log_macro() {
        let (service, ring) = service(LogLevel::Info);
        let logger = service.get_logger(names::TXMANAGER).unwrap();

        assert!(log!(logger, LogLevel::Info, "Test message").is_some());
        log!(logger, LogLevel::Info, "Formatted: {}", 42);

        let messages: Vec<String> = ring.snapshot().into_iter().map(|r| r.message).collect();
        assert_eq!(messages, vec!["Test message", "Formatted: 42"]);
    }

    #[test]
    fn test_filtered_arguments_not_formatted() {
        let (service, ring) = service(LogLevel::Warn);
        let logger = service.get_logger(names::INDEX).unwrap();
        let count = Cell::new(0);

        assert!(debug!(logger, "{}", CountingDisplay(&count)).is_none());
        assert_eq!(count.get(), 0);

        warn!(logger, "{}", CountingDisplay(&count));
        assert_eq!(count.get(), 1);
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn test_level_macros() {
        let (service, ring) = service(LogLevel::Trace);
        let logger = service.get_logger(names::CYPHER).unwrap();

        trace!(logger, "Trace message");
        debug!(logger, "Count: {}", 5);
        info!(logger, "Items: {}", 100);
        warn!(logger, "Retry {} of {}", 1, 3);
        error!(logger, "Code: {}", 500);
        fatal!(logger, "Critical failure: {}", "system");

        let levels: Vec<LogLevel> = ring.snapshot().into_iter().map(|r| r.level).collect();
        assert_eq!(levels, LogLevel::ALL.to_vec());
    }
}
