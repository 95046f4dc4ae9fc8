//! Log record structure

use super::category::Category;
use super::log_context::LogContext;
use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::cell::RefCell;

// Thread-local caches for thread information to avoid repeated allocations
thread_local! {
    static THREAD_ID_CACHE: RefCell<Option<String>> = const { RefCell::new(None) };
    static THREAD_NAME_CACHE: RefCell<Option<Option<String>>> = const { RefCell::new(None) };
}

fn current_thread_id() -> String {
    THREAD_ID_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| format!("{:?}", std::thread::current().id()))
            .clone()
    })
}

fn current_thread_name() -> Option<String> {
    THREAD_NAME_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| std::thread::current().name().map(String::from))
            .clone()
    })
}

/// Replace newlines, carriage returns and tabs with escape sequences.
///
/// Keeps one record on one line and the tab delimiter of the file format
/// unambiguous.
pub fn sanitize(text: &str) -> String {
    text.replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

/// One emitted message, tagged with the category that produced it
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    #[serde(serialize_with = "serialize_category")]
    pub category: Category,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<LogContext>,
    /// Rendered error and its source chain
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub thread_id: String,
    pub thread_name: Option<String>,
}

fn serialize_category<S: Serializer>(category: &Category, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(category.as_str())
}

impl LogRecord {
    pub fn new(level: LogLevel, category: Category, message: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            category,
            message: sanitize(message),
            fields: None,
            error: None,
            thread_id: current_thread_id(),
            thread_name: current_thread_name(),
        }
    }

    pub fn with_fields(mut self, fields: LogContext) -> Self {
        if !fields.is_empty() {
            self.fields = Some(fields);
        }
        self
    }

    /// Attach an error payload, rendering the whole `source()` chain
    pub fn with_error(mut self, error: &(dyn std::error::Error + 'static)) -> Self {
        let mut rendered = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            rendered.push_str(": ");
            rendered.push_str(&cause.to_string());
            source = cause.source();
        }
        self.error = Some(sanitize(&rendered));
        self
    }

    /// Thread name if the thread has one, its id otherwise
    pub fn thread_label(&self) -> &str {
        self.thread_name.as_deref().unwrap_or(&self.thread_id)
    }
}
