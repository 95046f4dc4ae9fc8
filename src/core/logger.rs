//! Per-category logger handles
//!
//! A [`Logger`] is obtained once per category from the
//! [`LoggingService`](super::service::LoggingService) and shared by every
//! caller logging under that category. Routing is resolved on every call, so
//! reconfiguration applies to handles that already exist.

use super::{
    category::Category,
    error::SinkError,
    log_context::LogContext,
    log_level::LogLevel,
    log_record::LogRecord,
    metrics::LoggingMetrics,
    reporter::{DeliveryFailure, FailureReporter},
    router::{Router, RoutingDecision},
};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// What happened to one emit call.
///
/// Informational only: sink failures have already been handed to the
/// failure reporter by the time this is returned.
#[derive(Debug)]
pub enum EmitOutcome {
    /// Below the threshold of the resolved rule
    Filtered,
    /// Written to every routed sink
    Delivered { sinks: usize },
    /// At least one sink failed; the others still received the record
    Failed {
        delivered: usize,
        failure: DeliveryFailure,
    },
}

impl EmitOutcome {
    pub fn is_filtered(&self) -> bool {
        matches!(self, EmitOutcome::Filtered)
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, EmitOutcome::Delivered { .. })
    }

    /// Sinks that received the record
    pub fn delivered(&self) -> usize {
        match self {
            EmitOutcome::Filtered => 0,
            EmitOutcome::Delivered { sinks } => *sinks,
            EmitOutcome::Failed { delivered, .. } => *delivered,
        }
    }
}

pub struct Logger {
    category: Category,
    router: Arc<Router>,
    metrics: Arc<LoggingMetrics>,
    reporter: Arc<FailureReporter>,
}

impl Logger {
    pub(crate) fn new(
        category: Category,
        router: Arc<Router>,
        metrics: Arc<LoggingMetrics>,
        reporter: Arc<FailureReporter>,
    ) -> Self {
        Self {
            category,
            router,
            metrics,
            reporter,
        }
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    /// The routing decision currently in effect for this category
    pub fn decision(&self) -> RoutingDecision {
        self.router.resolve(&self.category)
    }

    pub fn threshold(&self) -> LogLevel {
        self.decision().threshold()
    }

    pub fn is_enabled(&self, level: LogLevel) -> bool {
        self.decision().allows(level)
    }

    /// Emit a record with optional structured fields.
    ///
    /// Calls below the threshold return before the record is built.
    pub fn emit(&self, level: LogLevel, message: &str, fields: Option<LogContext>) -> EmitOutcome {
        let decision = self.router.resolve(&self.category);
        if !decision.allows(level) {
            self.metrics.record_filtered();
            return EmitOutcome::Filtered;
        }

        let mut record = LogRecord::new(level, self.category.clone(), message);
        if let Some(fields) = fields {
            record = record.with_fields(fields);
        }
        self.deliver(&decision, &record)
    }

    pub fn log(&self, level: LogLevel, message: impl AsRef<str>) -> EmitOutcome {
        self.emit(level, message.as_ref(), None)
    }

    /// Log with structured context fields
    pub fn log_with_context(
        &self,
        level: LogLevel,
        message: impl AsRef<str>,
        context: LogContext,
    ) -> EmitOutcome {
        self.emit(level, message.as_ref(), Some(context))
    }

    /// Log at ERROR with the error and its source chain as payload
    pub fn error_with_cause(
        &self,
        message: impl AsRef<str>,
        cause: &(dyn std::error::Error + 'static),
    ) -> EmitOutcome {
        let decision = self.router.resolve(&self.category);
        if !decision.allows(LogLevel::Error) {
            self.metrics.record_filtered();
            return EmitOutcome::Filtered;
        }

        let record =
            LogRecord::new(LogLevel::Error, self.category.clone(), message.as_ref()).with_error(cause);
        self.deliver(&decision, &record)
    }

    #[inline]
    pub fn trace(&self, message: impl AsRef<str>) -> EmitOutcome {
        self.log(LogLevel::Trace, message)
    }

    #[inline]
    pub fn debug(&self, message: impl AsRef<str>) -> EmitOutcome {
        self.log(LogLevel::Debug, message)
    }

    #[inline]
    pub fn info(&self, message: impl AsRef<str>) -> EmitOutcome {
        self.log(LogLevel::Info, message)
    }

    #[inline]
    pub fn warn(&self, message: impl AsRef<str>) -> EmitOutcome {
        self.log(LogLevel::Warn, message)
    }

    #[inline]
    pub fn error(&self, message: impl AsRef<str>) -> EmitOutcome {
        self.log(LogLevel::Error, message)
    }

    #[inline]
    pub fn fatal(&self, message: impl AsRef<str>) -> EmitOutcome {
        self.log(LogLevel::Fatal, message)
    }

    /// Write `record` to every sink of `decision` in order.
    ///
    /// Each sink is isolated: an error or a panic in one sink does not keep
    /// the record from the sinks after it. Failures are collected and
    /// reported once, after the fan-out.
    fn deliver(&self, decision: &RoutingDecision, record: &LogRecord) -> EmitOutcome {
        self.metrics.record_emitted();

        let sinks = decision.sinks();
        let mut failures = Vec::new();

        for sink in sinks {
            let result = catch_unwind(AssertUnwindSafe(|| sink.write(record)));
            match result {
                Ok(Ok(())) => {
                    self.metrics.record_delivered();
                }
                Ok(Err(e)) => {
                    self.metrics.record_sink_failure();
                    failures.push(e);
                }
                Err(panic_info) => {
                    let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                        s.to_string()
                    } else if let Some(s) = panic_info.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "Unknown panic".to_string()
                    };
                    self.metrics.record_sink_failure();
                    failures.push(SinkError::panicked(sink.name(), panic_msg));
                }
            }
        }

        if failures.is_empty() {
            return EmitOutcome::Delivered { sinks: sinks.len() };
        }

        let failure = DeliveryFailure {
            category: self.category.clone(),
            level: record.level,
            attempted: sinks.len(),
            failures,
        };
        self.reporter.report(&failure);

        EmitOutcome::Failed {
            delivered: failure.delivered(),
            failure,
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("category", &self.category)
            .field("decision", &self.decision())
            .finish()
    }
}
