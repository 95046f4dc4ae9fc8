//! The logging service: one registry, one router, the sinks, and the cache
//! of logger handles
//!
//! # Example
//!
//! ```
//! use kernel_logging::prelude::*;
//! use kernel_logging::sinks::RingBufferSink;
//! use std::sync::Arc;
//!
//! let diagnostics = Arc::new(RingBufferSink::new(100).unwrap());
//! let service = LoggingService::builder()
//!     .root_threshold(LogLevel::Info)
//!     .root_ring_buffer("diagnostics", diagnostics.clone())
//!     .build();
//!
//! let logger = service.get_logger(names::TXMANAGER).unwrap();
//! logger.info("transaction manager started");
//! logger.debug("filtered out");
//!
//! assert_eq!(diagnostics.snapshot().len(), 1);
//! service.shutdown();
//! ```

use super::{
    category::{Category, CategoryRegistry},
    config::{BuiltSink, ConfigReport, LoggingConfig},
    error::{LoggingError, Result},
    log_level::LogLevel,
    logger::Logger,
    metrics::LoggingMetrics,
    reporter::{FailureCallback, FailureReporter, DEFAULT_REPORT_INTERVAL},
    router::{Router, RoutingRule},
    sink::SharedSink,
    sink_set::SinkSet,
};
use crate::sinks::{ConsoleSink, RingBufferSink};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

pub struct LoggingService {
    registry: Arc<CategoryRegistry>,
    router: Arc<Router>,
    sinks: SinkSet,
    loggers: RwLock<HashMap<Category, Arc<Logger>>>,
    metrics: Arc<LoggingMetrics>,
    reporter: Arc<FailureReporter>,
}

impl LoggingService {
    /// Service with the standard categories and a WARN console root rule
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    #[must_use]
    pub fn builder() -> LoggingServiceBuilder {
        LoggingServiceBuilder::new()
    }

    /// Build a default service and apply `config` to it
    pub fn from_config(config: &LoggingConfig) -> (Self, ConfigReport) {
        let service = Self::new();
        let report = service.apply_config(config);
        (service, report)
    }

    /// Return the shared handle for `name`, registering the category on
    /// first use
    pub fn get_logger(&self, name: &str) -> Result<Arc<Logger>> {
        let category = self.registry.get_or_register(name)?;

        if let Some(logger) = self.loggers.read().get(&category) {
            return Ok(Arc::clone(logger));
        }

        let mut loggers = self.loggers.write();
        let logger = loggers.entry(category.clone()).or_insert_with(|| {
            Arc::new(Logger::new(
                category,
                Arc::clone(&self.router),
                Arc::clone(&self.metrics),
                Arc::clone(&self.reporter),
            ))
        });
        Ok(Arc::clone(logger))
    }

    pub fn registry(&self) -> &Arc<CategoryRegistry> {
        &self.registry
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn metrics(&self) -> &LoggingMetrics {
        &self.metrics
    }

    /// Insert or replace the routing rule at a registered prefix
    pub fn configure(&self, prefix: &str, rule: RoutingRule) -> Result<()> {
        self.router.configure(prefix, rule)
    }

    pub fn set_threshold(&self, prefix: &str, threshold: LogLevel) -> Result<()> {
        self.router.set_threshold(prefix, threshold)
    }

    /// Make a sink available by name to configuration and shutdown
    pub fn register_sink(&self, name: &str, sink: SharedSink) -> Result<()> {
        self.sinks.insert(name, sink)
    }

    pub fn register_ring_buffer(&self, name: &str, sink: Arc<RingBufferSink>) -> Result<()> {
        self.sinks.insert_ring_buffer(name, sink)
    }

    pub fn sink(&self, name: &str) -> Option<SharedSink> {
        self.sinks.get(name)
    }

    /// Typed access to a ring buffer for diagnostics retrieval
    pub fn ring_buffer(&self, name: &str) -> Option<Arc<RingBufferSink>> {
        self.sinks.ring_buffer(name)
    }

    pub fn sink_names(&self) -> Vec<String> {
        self.sinks.names()
    }

    /// Apply a configuration on top of the current state.
    ///
    /// Categories are registered first, then sinks are built, then the root
    /// rule and the ordered rules are installed. A bad entry is recorded in
    /// the report and skipped.
    ///
    /// Sinks are never replaced. A sink whose name is already registered is
    /// reported as an error and not built, and rules naming it route to the
    /// sink registered first. Changing a sink's settings needs a new name or
    /// a new service.
    pub fn apply_config(&self, config: &LoggingConfig) -> ConfigReport {
        let mut report = ConfigReport::default();

        for name in &config.categories {
            report.record(self.registry.get_or_register(name).map(|_| ()));
        }

        for (name, spec) in &config.sinks {
            let result = spec.build(name).and_then(|built| match built {
                BuiltSink::Shared(sink) => self.sinks.insert(name.clone(), sink),
                BuiltSink::RingBuffer(ring) => self.sinks.insert_ring_buffer(name.clone(), ring),
            });
            report.record(result);
        }

        if let Some(ref root) = config.root {
            let result = self.lookup_sinks(&root.sinks).and_then(|sinks| {
                self.router.configure(
                    self.registry.root().as_str(),
                    RoutingRule::new(root.threshold, sinks),
                )
            });
            report.record(result);
        }

        for rule in &config.rules {
            let result = self.lookup_sinks(&rule.sinks).and_then(|sinks| {
                self.router
                    .configure(&rule.prefix, RoutingRule::new(rule.threshold, sinks))
            });
            report.record(result);
        }

        report
    }

    fn lookup_sinks(&self, names: &[String]) -> Result<Vec<SharedSink>> {
        names
            .iter()
            .map(|name| {
                self.sinks.get(name).ok_or_else(|| {
                    LoggingError::config("rule", format!("unknown sink '{}'", name))
                })
            })
            .collect()
    }

    /// Flush every registered and routed sink that is open.
    ///
    /// All sinks are attempted; the first error is returned.
    pub fn flush(&self) -> Result<()> {
        let mut first_error = None;
        for sink in self.known_sinks() {
            if sink.state() != super::sink::SinkState::Open {
                continue;
            }
            if let Err(e) = sink.flush() {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Flush and close every sink exactly once.
    ///
    /// Returns true if this call performed the shutdown, false if it had
    /// already happened.
    pub fn shutdown(&self) -> bool {
        if self.sinks.is_shut_down() {
            return false;
        }

        let errors = self.sinks.shutdown(&self.router.sinks());
        for error in &errors {
            eprintln!("[LOGGER ERROR] Shutdown failed: {}", error);
        }
        true
    }

    pub fn is_shut_down(&self) -> bool {
        self.sinks.is_shut_down()
    }

    fn known_sinks(&self) -> Vec<SharedSink> {
        let mut sinks = self.sinks.all();
        for sink in self.router.sinks() {
            if !sinks.iter().any(|known| super::router::same_sink(known, &sink)) {
                sinks.push(sink);
            }
        }
        sinks
    }
}

impl Default for LoggingService {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LoggingService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for LoggingService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingService")
            .field("registry", &self.registry)
            .field("router", &self.router)
            .field("sinks", &self.sinks.names())
            .field("loggers", &self.loggers.read().len())
            .finish()
    }
}

/// The process-wide service, created with defaults on first use.
///
/// Statics are never dropped, so call [`LoggingService::shutdown`] on it
/// before the process exits to flush file sinks.
pub fn global() -> &'static LoggingService {
    static GLOBAL: OnceLock<LoggingService> = OnceLock::new();
    GLOBAL.get_or_init(LoggingService::new)
}

/// Shorthand for `global().get_logger(name)`
pub fn get_logger(name: &str) -> Result<Arc<Logger>> {
    global().get_logger(name)
}

/// Builder for [`LoggingService`]
///
/// # Example
///
/// ```
/// use kernel_logging::prelude::*;
/// use kernel_logging::sinks::ConsoleSink;
/// use std::sync::Arc;
///
/// let service = LoggingService::builder()
///     .root_threshold(LogLevel::Info)
///     .root_sink("console", Arc::new(ConsoleSink::new()))
///     .build();
/// ```
pub struct LoggingServiceBuilder {
    registry: Option<Arc<CategoryRegistry>>,
    categories: Vec<String>,
    root_threshold: LogLevel,
    root_sinks: Vec<(String, SharedSink)>,
    root_ring_buffers: Vec<(String, Arc<RingBufferSink>)>,
    report_interval: Duration,
    on_failure: Option<FailureCallback>,
}

impl LoggingServiceBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: None,
            categories: Vec::new(),
            root_threshold: LogLevel::Warn,
            root_sinks: Vec::new(),
            root_ring_buffers: Vec::new(),
            report_interval: DEFAULT_REPORT_INTERVAL,
            on_failure: None,
        }
    }

    /// Use an existing registry, e.g. one with a different root
    #[must_use = "builder methods return a new value"]
    pub fn registry(mut self, registry: Arc<CategoryRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Register extra categories when the service is built. Invalid names
    /// are skipped with a warning on stderr.
    #[must_use = "builder methods return a new value"]
    pub fn categories<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories.extend(names.into_iter().map(Into::into));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn root_threshold(mut self, level: LogLevel) -> Self {
        self.root_threshold = level;
        self
    }

    /// Add a named sink to the root rule. Without any root sink the root
    /// rule writes to a console sink named `console`.
    #[must_use = "builder methods return a new value"]
    pub fn root_sink(mut self, name: impl Into<String>, sink: SharedSink) -> Self {
        self.root_sinks.push((name.into(), sink));
        self
    }

    /// Add a ring buffer to the root rule, retrievable by name afterwards
    #[must_use = "builder methods return a new value"]
    pub fn root_ring_buffer(mut self, name: impl Into<String>, sink: Arc<RingBufferSink>) -> Self {
        self.root_ring_buffers.push((name.into(), sink));
        self
    }

    /// Minimum time between two stderr failure summaries
    #[must_use = "builder methods return a new value"]
    pub fn report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    /// Callback for every emit-time delivery failure
    #[must_use = "builder methods return a new value"]
    pub fn on_failure(mut self, callback: FailureCallback) -> Self {
        self.on_failure = Some(callback);
        self
    }

    pub fn build(self) -> LoggingService {
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(CategoryRegistry::new()));
        for name in &self.categories {
            if let Err(e) = registry.get_or_register(name) {
                eprintln!("[LOGGER WARNING] {}", e);
            }
        }

        let sinks = SinkSet::new();
        let mut root_sinks: Vec<SharedSink> = Vec::new();

        for (name, sink) in self.root_sinks {
            if let Err(e) = sinks.insert(name, Arc::clone(&sink)) {
                eprintln!("[LOGGER WARNING] {}", e);
            }
            root_sinks.push(sink);
        }
        for (name, ring) in self.root_ring_buffers {
            if let Err(e) = sinks.insert_ring_buffer(name, Arc::clone(&ring)) {
                eprintln!("[LOGGER WARNING] {}", e);
            }
            root_sinks.push(ring);
        }
        if root_sinks.is_empty() {
            let console: SharedSink = Arc::new(ConsoleSink::new());
            // The set is empty, so the name is free
            let _ = sinks.insert("console", Arc::clone(&console));
            root_sinks.push(console);
        }

        let router = Arc::new(Router::with_root_rule(
            Arc::clone(&registry),
            RoutingRule::new(self.root_threshold, root_sinks),
        ));

        let metrics = Arc::new(LoggingMetrics::new());
        let mut reporter =
            FailureReporter::new(Arc::clone(&metrics)).with_interval(self.report_interval);
        if let Some(callback) = self.on_failure {
            reporter = reporter.with_callback(callback);
        }

        LoggingService {
            registry,
            router,
            sinks,
            loggers: RwLock::new(HashMap::new()),
            metrics,
            reporter: Arc::new(reporter),
        }
    }
}

impl Default for LoggingServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::category::names;
    use crate::core::config::{RuleConfig, SinkSpec};
    use crate::core::reporter::DeliveryFailure;
    use crate::core::sink::{Sink, SinkState};
    use std::collections::BTreeMap;

    fn diagnostics_service(threshold: LogLevel) -> (LoggingService, Arc<RingBufferSink>) {
        let ring = Arc::new(RingBufferSink::new(64).unwrap());
        let service = LoggingService::builder()
            .root_threshold(threshold)
            .root_ring_buffer("diagnostics", Arc::clone(&ring))
            .build();
        (service, ring)
    }

    #[test]
    fn test_handle_cached_per_category() {
        let service = LoggingService::new();
        let first = service.get_logger(names::INDEX).unwrap();
        let second = service.get_logger("neo4j.index").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(Category::same_identity(first.category(), second.category()));
    }

    #[test]
    fn test_get_logger_validates_name() {
        let service = LoggingService::new();
        assert!(matches!(
            service.get_logger("neo4j/index"),
            Err(LoggingError::InvalidCategory { .. })
        ));
    }

    #[test]
    fn test_default_root_rule() {
        let service = LoggingService::new();
        let decision = service.router().resolve_name(names::CONFIG);

        assert_eq!(decision.threshold(), LogLevel::Warn);
        assert_eq!(decision.sinks().len(), 1);
        assert_eq!(decision.sinks()[0].name(), "console");
        assert_eq!(service.sink_names(), vec!["console"]);
    }

    #[test]
    fn test_ring_buffer_retrieval() {
        let (service, ring) = diagnostics_service(LogLevel::Info);
        let logger = service.get_logger(names::DIAGNOSTICS).unwrap();

        logger.info("kernel version 2.1");
        logger.info("jvm heap 4g");

        let retrieved = service.ring_buffer("diagnostics").unwrap();
        assert!(Arc::ptr_eq(&retrieved, &ring));
        let messages: Vec<String> = retrieved.snapshot().into_iter().map(|r| r.message).collect();
        assert_eq!(messages, vec!["kernel version 2.1", "jvm heap 4g"]);
    }

    #[test]
    fn test_apply_config_reports_bad_entries() {
        let (service, _ring) = diagnostics_service(LogLevel::Warn);

        let mut sinks = BTreeMap::new();
        sinks.insert("recent".to_string(), SinkSpec::RingBuffer { capacity: 4 });
        sinks.insert("broken".to_string(), SinkSpec::RingBuffer { capacity: 0 });

        let config = LoggingConfig {
            categories: vec!["neo4j.index.lucene".to_string(), "bad name".to_string()],
            sinks,
            root: None,
            rules: vec![
                RuleConfig {
                    prefix: "neo4j.index.lucene".to_string(),
                    threshold: LogLevel::Debug,
                    sinks: vec!["recent".to_string()],
                },
                RuleConfig {
                    prefix: "neo4j.unregistered".to_string(),
                    threshold: LogLevel::Debug,
                    sinks: vec!["recent".to_string()],
                },
                RuleConfig {
                    prefix: names::CYPHER.to_string(),
                    threshold: LogLevel::Debug,
                    sinks: vec!["missing".to_string()],
                },
            ],
        };

        let report = service.apply_config(&config);
        assert_eq!(report.applied, 3);
        assert_eq!(report.errors.len(), 4);
        assert!(report
            .errors
            .iter()
            .any(|e| matches!(e, LoggingError::UnknownCategoryPrefix { .. })));

        let logger = service.get_logger("neo4j.index.lucene").unwrap();
        logger.debug("segment merged");
        assert_eq!(service.ring_buffer("recent").unwrap().len(), 1);

        // The cypher rule was skipped, the root rule still applies
        let decision = service.router().resolve_name(names::CYPHER);
        assert_eq!(decision.matched().as_str(), names::NEO4J);
    }

    #[test]
    fn test_reapplied_sink_name_keeps_original() {
        let (service, _ring) = diagnostics_service(LogLevel::Warn);

        let config = |capacity| {
            let mut sinks = BTreeMap::new();
            sinks.insert("recent".to_string(), SinkSpec::RingBuffer { capacity });
            LoggingConfig {
                sinks,
                rules: vec![RuleConfig {
                    prefix: names::INDEX.to_string(),
                    threshold: LogLevel::Info,
                    sinks: vec!["recent".to_string()],
                }],
                ..LoggingConfig::default()
            }
        };

        assert!(service.apply_config(&config(2)).is_clean());
        let report = service.apply_config(&config(8));
        assert_eq!(report.applied, 1);
        assert!(matches!(
            report.errors[..],
            [LoggingError::InvalidConfiguration { .. }]
        ));

        let original = service.ring_buffer("recent").unwrap();
        assert_eq!(original.capacity(), 2);
        service.get_logger(names::INDEX).unwrap().info("online");
        assert_eq!(original.len(), 1);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let (service, ring) = diagnostics_service(LogLevel::Info);
        service.get_logger(names::NEOSTORE).unwrap().info("store closing");

        assert!(service.shutdown());
        assert!(!service.shutdown());
        assert!(service.is_shut_down());
        assert_eq!(ring.state(), SinkState::Closed);
        assert_eq!(ring.snapshot().len(), 1);
    }

    #[test]
    fn test_emit_after_shutdown_is_reported_not_raised() {
        let seen = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        let ring = Arc::new(RingBufferSink::new(4).unwrap());
        let service = LoggingService::builder()
            .root_threshold(LogLevel::Info)
            .root_ring_buffer("diagnostics", ring)
            .on_failure(Arc::new(move |failure: &DeliveryFailure| {
                assert!(failure.failures[0].is_closed());
                seen_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }))
            .build();

        let logger = service.get_logger(names::CONFIG).unwrap();
        service.shutdown();

        let outcome = logger.warn("too late");
        assert_eq!(outcome.delivered(), 0);
        assert_eq!(seen.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(service.metrics().sink_failures(), 1);
    }

    #[test]
    fn test_panicking_callback_does_not_reach_emitter() {
        let ring = Arc::new(RingBufferSink::new(4).unwrap());
        let service = LoggingService::builder()
            .root_threshold(LogLevel::Info)
            .root_ring_buffer("diagnostics", ring)
            .on_failure(Arc::new(|_: &DeliveryFailure| panic!("callback bug")))
            .build();

        let logger = service.get_logger(names::TXMANAGER).unwrap();
        service.shutdown();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| logger.warn("late")));
        assert_eq!(result.expect("emit must not panic").delivered(), 0);
    }

    #[test]
    fn test_isolated_registry() {
        let registry = Arc::new(CategoryRegistry::with_root("kernel").unwrap());
        let ring = Arc::new(RingBufferSink::new(4).unwrap());
        let service = LoggingService::builder()
            .registry(registry)
            .root_threshold(LogLevel::Trace)
            .root_ring_buffer("diagnostics", Arc::clone(&ring))
            .build();

        assert!(service.get_logger(names::INDEX).is_err());
        service.get_logger("kernel.locks").unwrap().trace("lock acquired");
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn test_builder_registers_categories() {
        let service = LoggingService::builder()
            .categories(["neo4j.index.lucene", "not valid", "other.root"])
            .build();

        assert!(service.registry().contains("neo4j.index.lucene"));
        assert!(service.registry().contains(names::INDEX));
        assert!(!service.registry().contains("other.root"));
        service.set_threshold(names::NEO4J, LogLevel::Info).unwrap();
        service
            .configure("neo4j.index.lucene", RoutingRule::new(LogLevel::Debug, Vec::new()))
            .unwrap();
    }

    #[test]
    fn test_global_service() {
        let first = get_logger(names::CYPHER).unwrap();
        let second = global().get_logger(names::CYPHER).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
