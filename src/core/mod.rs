//! Core logging types: categories, routing, logger handles and the sink
//! contract

pub mod category;
pub mod config;
pub mod error;
pub mod line_format;
pub mod log_context;
pub mod log_level;
pub mod log_record;
pub mod logger;
pub mod metrics;
pub mod reporter;
pub mod router;
pub mod service;
pub mod sink;
pub mod sink_set;
pub mod timestamp;

pub use category::{names, Category, CategoryRegistry};
pub use config::{ConfigReport, LoggingConfig, RootConfig, RuleConfig, SinkSpec};
pub use error::{LoggingError, Result, SinkError};
pub use log_context::{FieldValue, LogContext};
pub use log_level::LogLevel;
pub use log_record::LogRecord;
pub use logger::{EmitOutcome, Logger};
pub use metrics::LoggingMetrics;
pub use reporter::{DeliveryFailure, FailureCallback, FailureReporter};
pub use router::{Router, RoutingDecision, RoutingRule};
pub use service::{get_logger, global, LoggingService, LoggingServiceBuilder};
pub use sink::{SharedSink, Sink, SinkResult, SinkState};
pub use timestamp::TimestampFormat;
