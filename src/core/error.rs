//! Error types for the logging subsystem

pub type Result<T> = std::result::Result<T, LoggingError>;

/// Registration and configuration errors.
///
/// These are surfaced synchronously to whoever registers a category or
/// changes routing. Emit-time failures never show up here; they travel as
/// [`SinkError`]s inside a [`DeliveryFailure`](super::reporter::DeliveryFailure).
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// Malformed category name
    #[error("Invalid category '{name}': {reason}")]
    InvalidCategory { name: String, reason: String },

    /// Routing change for a prefix that was never registered
    #[error("Unknown category prefix '{prefix}'")]
    UnknownCategoryPrefix { prefix: String },

    /// Threshold change for a registered prefix that carries no rule
    #[error("No routing rule configured for prefix '{prefix}'")]
    NoRuleForPrefix { prefix: String },

    /// Attempt to remove the root rule
    #[error("The root rule for '{root}' cannot be removed")]
    RootRuleRequired { root: String },

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Sink failure outside of the emit path (open, flush, shutdown)
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// JSON configuration error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoggingError {
    /// Create an invalid category error
    pub fn invalid_category(name: impl Into<String>, reason: impl Into<String>) -> Self {
        LoggingError::InvalidCategory {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an unknown prefix error
    pub fn unknown_prefix(prefix: impl Into<String>) -> Self {
        LoggingError::UnknownCategoryPrefix {
            prefix: prefix.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggingError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Failure of a single sink operation.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// IO error with context
    #[error("Sink '{sink}' IO error while {operation}: {source}")]
    Io {
        sink: String,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// Operation on a sink that has been closed
    #[error("Sink '{sink}' is closed")]
    Closed { sink: String },

    /// The sink panicked while handling a record
    #[error("Sink '{sink}' panicked: {message}")]
    Panicked { sink: String, message: String },
}

impl SinkError {
    pub fn io(sink: impl Into<String>, operation: impl Into<String>, source: std::io::Error) -> Self {
        SinkError::Io {
            sink: sink.into(),
            operation: operation.into(),
            source,
        }
    }

    pub fn closed(sink: impl Into<String>) -> Self {
        SinkError::Closed { sink: sink.into() }
    }

    pub fn panicked(sink: impl Into<String>, message: impl Into<String>) -> Self {
        SinkError::Panicked {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Name of the sink that failed
    pub fn sink(&self) -> &str {
        match self {
            SinkError::Io { sink, .. }
            | SinkError::Closed { sink }
            | SinkError::Panicked { sink, .. } => sink,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, SinkError::Closed { .. })
    }
}
