//! Named sinks owned by a logging service

use super::error::{LoggingError, Result, SinkError};
use super::router::same_sink;
use super::sink::{SharedSink, SinkState};
use crate::sinks::RingBufferSink;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Entries {
    sinks: BTreeMap<String, SharedSink>,
    ring_buffers: BTreeMap<String, Arc<RingBufferSink>>,
}

/// Sinks by name, plus typed access to ring buffers for diagnostics.
///
/// Shutdown closes every sink exactly once; later calls do nothing.
#[derive(Default)]
pub struct SinkSet {
    entries: RwLock<Entries>,
    shut_down: AtomicBool,
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: impl Into<String>, sink: SharedSink) -> Result<()> {
        let name = name.into();
        let mut entries = self.entries.write();
        if entries.sinks.contains_key(&name) {
            return Err(LoggingError::config(
                "SinkSet",
                format!("sink '{}' is already registered", name),
            ));
        }
        entries.sinks.insert(name, sink);
        Ok(())
    }

    /// Register a ring buffer under `name`, keeping its concrete type
    pub fn insert_ring_buffer(&self, name: impl Into<String>, sink: Arc<RingBufferSink>) -> Result<()> {
        let name = name.into();
        let shared: SharedSink = sink.clone();
        self.insert(name.clone(), shared)?;
        self.entries.write().ring_buffers.insert(name, sink);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<SharedSink> {
        self.entries.read().sinks.get(name).cloned()
    }

    pub fn ring_buffer(&self, name: &str) -> Option<Arc<RingBufferSink>> {
        self.entries.read().ring_buffers.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.read().sinks.keys().cloned().collect()
    }

    pub fn all(&self) -> Vec<SharedSink> {
        self.entries.read().sinks.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().sinks.is_empty()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Flush and close every registered sink and every sink in `routed`.
    ///
    /// Sinks referenced more than once are closed once. Returns the errors
    /// encountered; an empty vector also results from a repeated call.
    pub fn shutdown(&self, routed: &[SharedSink]) -> Vec<SinkError> {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return Vec::new();
        }

        let mut targets = self.all();
        for sink in routed {
            if !targets.iter().any(|known| same_sink(known, sink)) {
                targets.push(Arc::clone(sink));
            }
        }

        let mut errors = Vec::new();
        for sink in targets {
            if sink.state() == SinkState::Open {
                if let Err(e) = sink.flush() {
                    errors.push(e);
                }
            }
            if let Err(e) = sink.close() {
                errors.push(e);
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CategoryRegistry, LogLevel, LogRecord, Sink};

    fn ring(name: &str) -> Arc<RingBufferSink> {
        Arc::new(RingBufferSink::new(4).unwrap().with_name(name))
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let set = SinkSet::new();
        set.insert("diag", ring("diag")).unwrap();
        assert!(set.insert("diag", ring("diag")).is_err());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_typed_ring_buffer_access() {
        let set = SinkSet::new();
        set.insert_ring_buffer("diag", ring("diag")).unwrap();

        assert!(set.get("diag").is_some());
        assert_eq!(set.ring_buffer("diag").unwrap().capacity(), 4);
        assert!(set.ring_buffer("console").is_none());
    }

    #[test]
    fn test_shutdown_closes_once() {
        let set = SinkSet::new();
        let registered = ring("registered");
        let routed_only = ring("routed");
        set.insert_ring_buffer("registered", registered.clone()).unwrap();

        let category = CategoryRegistry::new().get_or_register("neo4j").unwrap();
        registered
            .write(&LogRecord::new(LogLevel::Info, category, "m"))
            .unwrap();

        let shared: SharedSink = routed_only.clone();
        let also_registered: SharedSink = registered.clone();
        assert!(set.shutdown(&[shared, also_registered]).is_empty());

        assert!(set.is_shut_down());
        assert_eq!(registered.state(), SinkState::Closed);
        assert_eq!(routed_only.state(), SinkState::Closed);

        // A second shutdown is a no-op
        assert!(set.shutdown(&[]).is_empty());
    }
}
