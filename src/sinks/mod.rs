//! Sink implementations

pub mod console;
pub mod file;
pub mod ring_buffer;

pub use console::{ConsoleSink, ConsoleTarget};
pub use file::FileSink;
pub use ring_buffer::RingBufferSink;

pub use crate::core::Sink;
