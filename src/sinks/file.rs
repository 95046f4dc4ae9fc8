//! File sink implementation
//!
//! Records are appended as tab-delimited lines (see
//! [`format_line`](crate::core::line_format::format_line)) through a
//! `BufWriter`. The file is opened lazily and, with the `file` feature,
//! locked exclusively so two writers never share one log file. An optional
//! background thread flushes the buffer periodically.

use crate::core::line_format::format_line;
use crate::core::{LogRecord, Sink, SinkError, SinkResult, SinkState, TimestampFormat};
use crossbeam_channel::{bounded, select, tick, Sender};
#[cfg(feature = "file")]
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Default interval of the background flusher
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Default capacity of the write buffer
pub const DEFAULT_BUFFER_CAPACITY: usize = 8 * 1024;

struct FileInner {
    state: SinkState,
    writer: Option<BufWriter<File>>,
}

struct Flusher {
    stop: Sender<()>,
    handle: thread::JoinHandle<()>,
}

pub struct FileSink {
    name: String,
    path: PathBuf,
    timestamp_format: TimestampFormat,
    buffer_capacity: usize,
    flush_interval: Option<Duration>,
    inner: Arc<Mutex<FileInner>>,
    flusher: Mutex<Option<Flusher>>,
}

impl FileSink {
    /// Create a sink for `path`. Nothing is opened until the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            name: "file".to_string(),
            path: path.into(),
            timestamp_format: TimestampFormat::default(),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            flush_interval: Some(DEFAULT_FLUSH_INTERVAL),
            inner: Arc::new(Mutex::new(FileInner {
                state: SinkState::Unopened,
                writer: None,
            })),
            flusher: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the timestamp format for this sink
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use kernel_logging::sinks::FileSink;
    /// use kernel_logging::TimestampFormat;
    ///
    /// let sink = FileSink::new("/var/log/neo4j/messages.log")
    ///     .with_timestamp_format(TimestampFormat::Rfc3339);
    /// ```
    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    #[must_use]
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity.max(1);
        self
    }

    /// `None` disables the background flusher; records then reach the disk
    /// when the buffer fills, on `flush` or on `close`.
    #[must_use]
    pub fn with_flush_interval(mut self, interval: Option<Duration>) -> Self {
        self.flush_interval = interval.filter(|d| !d.is_zero());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_locked(&self, inner: &mut FileInner) -> SinkResult<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| SinkError::io(&self.name, format!("opening {}", self.path.display()), e))?;

        #[cfg(feature = "file")]
        file.try_lock_exclusive()
            .map_err(|e| SinkError::io(&self.name, format!("locking {}", self.path.display()), e))?;

        if let Some(interval) = self.flush_interval {
            let flusher = self.spawn_flusher(interval)?;
            *self.flusher.lock() = Some(flusher);
        }

        inner.writer = Some(BufWriter::with_capacity(self.buffer_capacity, file));
        inner.state = SinkState::Open;
        Ok(())
    }

    fn spawn_flusher(&self, interval: Duration) -> SinkResult<Flusher> {
        let (stop, stopped) = bounded::<()>(1);
        let ticker = tick(interval);
        let inner = Arc::clone(&self.inner);
        let name = self.name.clone();

        let handle = thread::Builder::new()
            .name(format!("log-flush-{}", self.name))
            .spawn(move || loop {
                select! {
                    // A message or a dropped sender both mean stop
                    recv(stopped) -> _ => break,
                    recv(ticker) -> _ => {
                        let mut inner = inner.lock();
                        if let Some(ref mut writer) = inner.writer {
                            if let Err(e) = writer.flush() {
                                eprintln!("[LOGGER ERROR] Periodic flush of sink '{}' failed: {}", name, e);
                            }
                        }
                    }
                }
            })
            .map_err(|e| SinkError::io(&self.name, "starting flusher thread", e))?;

        Ok(Flusher { stop, handle })
    }

    fn stop_flusher(&self) {
        let flusher = self.flusher.lock().take();
        if let Some(flusher) = flusher {
            let _ = flusher.stop.send(());
            if flusher.handle.join().is_err() {
                eprintln!("[LOGGER ERROR] Flusher thread of sink '{}' panicked", self.name);
            }
        }
    }
}

impl Sink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, record: &LogRecord) -> SinkResult<()> {
        let mut line = format_line(record, &self.timestamp_format);
        line.push('\n');

        let mut inner = self.inner.lock();
        inner.state.ensure_usable(&self.name)?;
        if inner.state == SinkState::Unopened {
            self.open_locked(&mut inner)?;
        }

        let writer = inner
            .writer
            .as_mut()
            .ok_or_else(|| SinkError::closed(&self.name))?;
        writer
            .write_all(line.as_bytes())
            .map_err(|e| SinkError::io(&self.name, "writing record", e))
    }

    fn flush(&self) -> SinkResult<()> {
        let mut inner = self.inner.lock();
        inner.state.ensure_usable(&self.name)?;

        if let Some(ref mut writer) = inner.writer {
            writer
                .flush()
                .map_err(|e| SinkError::io(&self.name, "flushing", e))?;
        }
        Ok(())
    }

    fn open(&self) -> SinkResult<()> {
        let mut inner = self.inner.lock();
        inner.state.ensure_usable(&self.name)?;
        if inner.state == SinkState::Unopened {
            self.open_locked(&mut inner)?;
        }
        Ok(())
    }

    fn close(&self) -> SinkResult<()> {
        let writer = {
            let mut inner = self.inner.lock();
            if inner.state == SinkState::Closed {
                return Ok(());
            }
            inner.state = SinkState::Closed;
            inner.writer.take()
        };

        // The flusher takes the inner lock, so it is joined after release
        self.stop_flusher();

        if let Some(mut writer) = writer {
            writer
                .flush()
                .map_err(|e| SinkError::io(&self.name, "flushing on close", e))?;

            #[cfg(feature = "file")]
            if let Err(e) = FileExt::unlock(writer.get_ref()) {
                eprintln!(
                    "[LOGGER WARNING] Failed to unlock {}: {}",
                    self.path.display(),
                    e
                );
            }
        }
        Ok(())
    }

    fn state(&self) -> SinkState {
        self.inner.lock().state
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        // Ensure all buffered data is flushed to disk
        if let Err(e) = self.close() {
            eprintln!("[LOGGER ERROR] Closing sink '{}' failed: {}", self.name, e);
        }
    }
}
