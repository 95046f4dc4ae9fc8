//! Sink trait for log output destinations

use super::{error::SinkError, log_record::LogRecord};
use std::fmt;
use std::sync::Arc;

pub type SinkResult<T> = std::result::Result<T, SinkError>;

/// A sink shared between routing rules
pub type SharedSink = Arc<dyn Sink>;

/// Lifecycle of a sink.
///
/// `Unopened -> Open` happens on the first write or an explicit `open`.
/// `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    Unopened,
    Open,
    Closed,
}

impl SinkState {
    /// Fail with [`SinkError::Closed`] once the sink has been closed
    pub fn ensure_usable(self, sink: &str) -> SinkResult<()> {
        match self {
            SinkState::Closed => Err(SinkError::closed(sink)),
            SinkState::Unopened | SinkState::Open => Ok(()),
        }
    }
}

impl fmt::Display for SinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkState::Unopened => write!(f, "unopened"),
            SinkState::Open => write!(f, "open"),
            SinkState::Closed => write!(f, "closed"),
        }
    }
}

/// An output destination for log records.
///
/// Sinks are shared by every category routed to them and may be called from
/// many threads at once, so implementations serialize their own writes: a
/// record is written completely before the next one starts.
pub trait Sink: Send + Sync {
    fn name(&self) -> &str;

    fn write(&self, record: &LogRecord) -> SinkResult<()>;

    fn flush(&self) -> SinkResult<()>;

    /// Acquire underlying resources ahead of the first write
    fn open(&self) -> SinkResult<()>;

    /// Flush and release resources. Closing twice is a no-op.
    fn close(&self) -> SinkResult<()>;

    fn state(&self) -> SinkState;
}

impl fmt::Debug for dyn Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("name", &self.name())
            .field("state", &self.state())
            .finish()
    }
}
