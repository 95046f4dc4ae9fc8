//! Fallback reporting of emit-time sink failures
//!
//! Logging must never crash or block the subsystem that logs, so sink
//! failures are not returned to the emitter. They are aggregated per emit
//! into a [`DeliveryFailure`] and handed to a [`FailureReporter`], which
//! writes a rate-limited summary to stderr.

use super::category::Category;
use super::error::SinkError;
use super::log_level::LogLevel;
use super::metrics::LoggingMetrics;
use parking_lot::Mutex;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default minimum time between two stderr summaries
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Callback invoked for every delivery failure, rate limited or not
pub type FailureCallback = Arc<dyn Fn(&DeliveryFailure) + Send + Sync>;

/// All sink failures of one emit call
#[derive(Debug)]
pub struct DeliveryFailure {
    pub category: Category,
    pub level: LogLevel,
    /// Number of sinks the record was routed to
    pub attempted: usize,
    pub failures: Vec<SinkError>,
}

impl DeliveryFailure {
    /// Sinks that did receive the record
    pub fn delivered(&self) -> usize {
        self.attempted - self.failures.len()
    }

    pub fn failed_sinks(&self) -> Vec<&str> {
        self.failures.iter().map(SinkError::sink).collect()
    }
}

impl fmt::Display for DeliveryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} sinks failed for {} record from '{}'",
            self.failures.len(),
            self.attempted,
            self.level,
            self.category
        )?;
        for failure in &self.failures {
            write!(f, "; {}", failure)?;
        }
        Ok(())
    }
}

/// Rate-limited stderr reporter for delivery failures
pub struct FailureReporter {
    interval: Duration,
    last_report: Mutex<Option<Instant>>,
    suppressed: AtomicU64,
    callback: Option<FailureCallback>,
    metrics: Arc<LoggingMetrics>,
}

impl FailureReporter {
    pub fn new(metrics: Arc<LoggingMetrics>) -> Self {
        Self {
            interval: DEFAULT_REPORT_INTERVAL,
            last_report: Mutex::new(None),
            suppressed: AtomicU64::new(0),
            callback: None,
            metrics,
        }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub fn with_callback(mut self, callback: FailureCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Report one failure. Returns true if a summary was written to stderr.
    pub fn report(&self, failure: &DeliveryFailure) -> bool {
        if let Some(ref callback) = self.callback {
            if catch_unwind(AssertUnwindSafe(|| callback(failure))).is_err() {
                eprintln!("[LOGGER ERROR] Failure callback panicked while handling: {}", failure);
            }
        }

        let now = Instant::now();
        let due = {
            let mut last = self.last_report.lock();
            let due = match *last {
                Some(at) => now.duration_since(at) >= self.interval,
                None => true,
            };
            if due {
                *last = Some(now);
            }
            due
        };

        if !due {
            self.suppressed.fetch_add(1, Ordering::Relaxed);
            self.metrics.record_suppressed_report();
            return false;
        }

        let suppressed = self.suppressed.swap(0, Ordering::Relaxed);
        if suppressed > 0 {
            eprintln!(
                "[LOGGER ERROR] {} ({} similar reports suppressed)",
                failure, suppressed
            );
        } else {
            eprintln!("[LOGGER ERROR] {}", failure);
        }
        self.metrics.record_failure_report();
        true
    }

    /// Reports held back since the last summary
    pub fn pending_suppressed(&self) -> u64 {
        self.suppressed.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for FailureReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureReporter")
            .field("interval", &self.interval)
            .field("suppressed", &self.pending_suppressed())
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}
