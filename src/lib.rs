//! # Kernel Logging
//!
//! Category registry and router for a database kernel's logging.
//!
//! Subsystems log through named, dot-separated categories such as
//! `neo4j.txmanager`. A [`Router`] maps category prefixes to rules; the most
//! specific configured prefix wins and the root rule covers everything else.
//! Each rule carries a threshold and the sinks records fan out to.
//!
//! ## Features
//!
//! - **Well-known categories**: the kernel subsystem names in [`names`]
//! - **Longest-prefix routing**: reconfigure any subtree at runtime
//! - **Sinks**: console, buffered file and in-memory ring buffer
//! - **Failure isolation**: a failing sink never stops the others
//!
//! ## Example
//!
//! ```
//! use kernel_logging::prelude::*;
//! use kernel_logging::sinks::RingBufferSink;
//! use std::sync::Arc;
//!
//! let recent = Arc::new(RingBufferSink::new(16).unwrap());
//! let service = LoggingService::builder()
//!     .root_ring_buffer("recent", recent.clone())
//!     .build();
//!
//! // Debug output for the transaction manager subtree only
//! let sink: SharedSink = recent.clone();
//! service
//!     .configure(names::TXMANAGER, RoutingRule::new(LogLevel::Debug, vec![sink]))
//!     .unwrap();
//!
//! let tx = service.get_logger(names::TXMANAGER).unwrap();
//! tx.debug("begin tx 42");
//! service.get_logger(names::INDEX).unwrap().debug("dropped, root is WARN");
//!
//! assert_eq!(recent.len(), 1);
//! ```

pub mod core;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        names, Category, CategoryRegistry, EmitOutcome, FieldValue, LogContext, LogLevel,
        LogRecord, Logger, LoggingConfig, LoggingError, LoggingService, LoggingServiceBuilder,
        Result, RoutingRule, SharedSink, Sink, SinkError,
    };
}

pub use crate::core::{
    get_logger, global, names, Category, CategoryRegistry, ConfigReport, DeliveryFailure,
    EmitOutcome, FieldValue, LogContext, LogLevel, LogRecord, Logger, LoggingConfig,
    LoggingError, LoggingMetrics, LoggingService, LoggingServiceBuilder, Result, Router,
    RoutingDecision, RoutingRule, SharedSink, Sink, SinkError, SinkState, TimestampFormat,
};
pub use sinks::{ConsoleSink, FileSink, RingBufferSink};
