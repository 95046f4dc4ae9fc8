//! In-memory ring buffer sink for diagnostics retrieval

use crate::core::{LogRecord, LoggingError, Result, Sink, SinkResult, SinkState};
use parking_lot::Mutex;
use std::collections::VecDeque;

struct RingInner {
    state: SinkState,
    records: VecDeque<LogRecord>,
    evicted: u64,
}

/// Keeps the most recent `capacity` records, evicting the oldest when full.
///
/// Writes never fail while the sink is usable. Snapshots stay readable after
/// the sink is closed, so diagnostics can be collected during shutdown.
pub struct RingBufferSink {
    name: String,
    capacity: usize,
    inner: Mutex<RingInner>,
}

impl RingBufferSink {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(LoggingError::config(
                "RingBufferSink",
                "capacity must be greater than zero",
            ));
        }

        Ok(Self {
            name: "ring_buffer".to_string(),
            capacity,
            inner: Mutex::new(RingInner {
                state: SinkState::Unopened,
                records: VecDeque::with_capacity(capacity),
                evicted: 0,
            }),
        })
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().records.is_empty()
    }

    /// Number of records overwritten since creation
    pub fn evicted(&self) -> u64 {
        self.inner.lock().evicted
    }

    /// Copy of the retained records, oldest first
    pub fn snapshot(&self) -> Vec<LogRecord> {
        self.inner.lock().records.iter().cloned().collect()
    }

    /// The `n` most recent records, oldest first
    pub fn recent(&self, n: usize) -> Vec<LogRecord> {
        let inner = self.inner.lock();
        let skip = inner.records.len().saturating_sub(n);
        inner.records.iter().skip(skip).cloned().collect()
    }
}

impl Sink for RingBufferSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, record: &LogRecord) -> SinkResult<()> {
        let mut inner = self.inner.lock();
        inner.state.ensure_usable(&self.name)?;
        inner.state = SinkState::Open;

        if inner.records.len() == self.capacity {
            inner.records.pop_front();
            inner.evicted += 1;
        }
        inner.records.push_back(record.clone());
        Ok(())
    }

    fn flush(&self) -> SinkResult<()> {
        self.inner.lock().state.ensure_usable(&self.name)
    }

    fn open(&self) -> SinkResult<()> {
        let mut inner = self.inner.lock();
        inner.state.ensure_usable(&self.name)?;
        inner.state = SinkState::Open;
        Ok(())
    }

    fn close(&self) -> SinkResult<()> {
        self.inner.lock().state = SinkState::Closed;
        Ok(())
    }

    fn state(&self) -> SinkState {
        self.inner.lock().state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CategoryRegistry, LogLevel};

    fn record(message: &str) -> LogRecord {
        let category = CategoryRegistry::new().get_or_register("neo4j.diagnostics").unwrap();
        LogRecord::new(LogLevel::Info, category, message)
    }

    fn messages(records: &[LogRecord]) -> Vec<&str> {
        records.iter().map(|r| r.message.as_str()).collect()
    }

    #[test]
    fn test_evicts_oldest() {
        let sink = RingBufferSink::new(3).unwrap();
        for i in 0..4 {
            sink.write(&record(&format!("record {}", i))).unwrap();
        }

        let snapshot = sink.snapshot();
        assert_eq!(messages(&snapshot), vec!["record 1", "record 2", "record 3"]);
        assert_eq!(sink.evicted(), 1);
        assert_eq!(sink.len(), 3);
    }

    #[test]
    fn test_snapshot_does_not_mutate() {
        let sink = RingBufferSink::new(2).unwrap();
        sink.write(&record("a")).unwrap();

        assert_eq!(sink.snapshot().len(), 1);
        assert_eq!(sink.snapshot().len(), 1);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_recent() {
        let sink = RingBufferSink::new(5).unwrap();
        for i in 0..5 {
            sink.write(&record(&i.to_string())).unwrap();
        }

        assert_eq!(messages(&sink.recent(2)), vec!["3", "4"]);
        assert_eq!(sink.recent(10).len(), 5);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            RingBufferSink::new(0),
            Err(LoggingError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_closed_keeps_snapshot() {
        let sink = RingBufferSink::new(2).unwrap();
        sink.write(&record("kept")).unwrap();
        sink.close().unwrap();

        assert!(sink.write(&record("rejected")).unwrap_err().is_closed());
        assert_eq!(messages(&sink.snapshot()), vec!["kept"]);
    }
}
