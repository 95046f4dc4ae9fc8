//! Logging metrics for observability
//!
//! Counters shared by every logger handle of a service: how many records
//! were emitted, filtered by threshold, delivered, and how many sink writes
//! failed.

use std::sync::atomic::{AtomicU64, Ordering};

/// # Example
///
/// ```
/// use kernel_logging::LoggingMetrics;
///
/// let metrics = LoggingMetrics::new();
///
/// metrics.record_emitted();
/// metrics.record_sink_failure();
///
/// assert_eq!(metrics.emitted(), 1);
/// assert_eq!(metrics.sink_failures(), 1);
/// ```
#[derive(Debug)]
pub struct LoggingMetrics {
    /// Records that passed the threshold
    emitted: AtomicU64,

    /// Calls dropped by threshold filtering
    filtered: AtomicU64,

    /// Successful sink writes
    delivered: AtomicU64,

    /// Failed sink writes
    sink_failures: AtomicU64,

    /// Failure summaries written to stderr
    failure_reports: AtomicU64,

    /// Failure summaries held back by rate limiting
    suppressed_reports: AtomicU64,
}

impl LoggingMetrics {
    pub const fn new() -> Self {
        Self {
            emitted: AtomicU64::new(0),
            filtered: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
            failure_reports: AtomicU64::new(0),
            suppressed_reports: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn filtered(&self) -> u64 {
        self.filtered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sink_failures(&self) -> u64 {
        self.sink_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn failure_reports(&self) -> u64 {
        self.failure_reports.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn suppressed_reports(&self) -> u64 {
        self.suppressed_reports.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_emitted(&self) -> u64 {
        self.emitted.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_filtered(&self) -> u64 {
        self.filtered.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_delivered(&self) -> u64 {
        self.delivered.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_sink_failure(&self) -> u64 {
        self.sink_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_failure_report(&self) -> u64 {
        self.failure_reports.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_suppressed_report(&self) -> u64 {
        self.suppressed_reports.fetch_add(1, Ordering::Relaxed)
    }

    /// Failed sink writes as a percentage of all sink writes (0.0 - 100.0)
    ///
    /// Returns 0.0 if nothing has been written.
    pub fn failure_rate(&self) -> f64 {
        let failures = self.sink_failures();
        let total = failures + self.delivered();
        if total == 0 {
            return 0.0;
        }
        (failures as f64 / total as f64) * 100.0
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        self.emitted.store(0, Ordering::Relaxed);
        self.filtered.store(0, Ordering::Relaxed);
        self.delivered.store(0, Ordering::Relaxed);
        self.sink_failures.store(0, Ordering::Relaxed);
        self.failure_reports.store(0, Ordering::Relaxed);
        self.suppressed_reports.store(0, Ordering::Relaxed);
    }
}

impl Default for LoggingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_counters() {
        let metrics = LoggingMetrics::new();
        metrics.record_emitted();
        metrics.record_filtered();
        metrics.record_filtered();
        metrics.record_delivered();

        assert_eq!(metrics.emitted(), 1);
        assert_eq!(metrics.filtered(), 2);
        assert_eq!(metrics.delivered(), 1);
        assert_eq!(metrics.sink_failures(), 0);
    }

    #[test]
    fn test_failure_rate() {
        let metrics = LoggingMetrics::new();
        assert_eq!(metrics.failure_rate(), 0.0);

        for _ in 0..3 {
            metrics.record_delivered();
        }
        metrics.record_sink_failure();

        assert!((metrics.failure_rate() - 25.0).abs() < 0.01);
    }

    #[test]
    fn test_reset() {
        let metrics = LoggingMetrics::new();
        metrics.record_emitted();
        metrics.record_suppressed_report();
        metrics.reset();

        assert_eq!(metrics.emitted(), 0);
        assert_eq!(metrics.suppressed_reports(), 0);
    }

    #[test]
    fn test_concurrent_updates() {
        let metrics = Arc::new(LoggingMetrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        metrics.record_delivered();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.delivered(), 4000);
    }
}
