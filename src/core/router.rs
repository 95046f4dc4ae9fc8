//! Category-prefix routing
//!
//! Rules live in a trie keyed on dot-segments. Resolution walks from the root
//! toward the category and keeps the deepest rule it passes, which gives
//! longest-prefix-wins in O(depth). The root always carries a rule, so every
//! name resolves.
//!
//! The trie is an immutable snapshot behind an `ArcSwap`. Readers load it
//! without locking; writers serialize on a mutex, modify a copy and swap it
//! in. A resolution therefore sees either the old or the new rule set, never
//! a mix.

use super::category::{Category, CategoryRegistry};
use super::error::{LoggingError, Result};
use super::log_level::LogLevel;
use super::sink::SharedSink;
use crate::sinks::ConsoleSink;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Threshold and ordered sinks for one category prefix
#[derive(Clone)]
pub struct RoutingRule {
    threshold: LogLevel,
    sinks: Vec<SharedSink>,
}

impl RoutingRule {
    pub fn new(threshold: LogLevel, sinks: Vec<SharedSink>) -> Self {
        Self { threshold, sinks }
    }

    #[must_use]
    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sinks.push(sink);
        self
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: LogLevel) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> LogLevel {
        self.threshold
    }

    pub fn sinks(&self) -> &[SharedSink] {
        &self.sinks
    }

    pub fn allows(&self, level: LogLevel) -> bool {
        level >= self.threshold
    }
}

impl fmt::Debug for RoutingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.sinks.iter().map(|s| s.name()).collect();
        f.debug_struct("RoutingRule")
            .field("threshold", &self.threshold)
            .field("sinks", &names)
            .finish()
    }
}

/// Outcome of resolving a category: the rule that applies and the prefix
/// it was configured at
#[derive(Clone, Debug)]
pub struct RoutingDecision {
    matched: Category,
    rule: Arc<RoutingRule>,
}

impl RoutingDecision {
    /// Prefix whose rule applies
    pub fn matched(&self) -> &Category {
        &self.matched
    }

    pub fn rule(&self) -> &Arc<RoutingRule> {
        &self.rule
    }

    pub fn threshold(&self) -> LogLevel {
        self.rule.threshold
    }

    pub fn sinks(&self) -> &[SharedSink] {
        &self.rule.sinks
    }

    pub fn allows(&self, level: LogLevel) -> bool {
        self.rule.allows(level)
    }
}

#[derive(Clone, Default)]
struct RuleNode {
    rule: Option<(Category, Arc<RoutingRule>)>,
    children: HashMap<String, RuleNode>,
}

impl RuleNode {
    fn collect(&self, out: &mut Vec<(Category, Arc<RoutingRule>)>) {
        if let Some((ref category, ref rule)) = self.rule {
            out.push((category.clone(), Arc::clone(rule)));
        }
        for child in self.children.values() {
            child.collect(out);
        }
    }
}

#[derive(Clone)]
struct RoutingTable {
    root_category: Category,
    root_rule: Arc<RoutingRule>,
    /// Rules below the root, keyed by the segments after it
    tree: RuleNode,
    generation: u64,
}

impl RoutingTable {
    fn new(root_category: Category, root_rule: Arc<RoutingRule>) -> Self {
        Self {
            root_category,
            root_rule,
            tree: RuleNode::default(),
            generation: 0,
        }
    }

    fn resolve(&self, name: &str) -> RoutingDecision {
        let mut matched = &self.root_category;
        let mut rule = &self.root_rule;

        let mut segments = name.split(super::category::SEPARATOR);
        if segments.next() == Some(self.root_category.as_str()) {
            let mut node = &self.tree;
            for segment in segments {
                match node.children.get(segment) {
                    Some(child) => {
                        node = child;
                        if let Some((ref category, ref child_rule)) = child.rule {
                            matched = category;
                            rule = child_rule;
                        }
                    }
                    None => break,
                }
            }
        }

        RoutingDecision {
            matched: matched.clone(),
            rule: Arc::clone(rule),
        }
    }

    fn insert(&mut self, category: Category, rule: Arc<RoutingRule>) {
        if category.is_root() {
            self.root_rule = rule;
            return;
        }

        let mut node = &mut self.tree;
        for segment in category.segments().skip(1) {
            node = node.children.entry(segment.to_string()).or_default();
        }
        node.rule = Some((category, rule));
    }

    fn rule_mut(&mut self, category: &Category) -> Option<&mut Arc<RoutingRule>> {
        if category.is_root() {
            return Some(&mut self.root_rule);
        }

        let mut node = &mut self.tree;
        for segment in category.segments().skip(1) {
            node = node.children.get_mut(segment)?;
        }
        node.rule.as_mut().map(|(_, rule)| rule)
    }

    fn take(&mut self, category: &Category) -> Option<Arc<RoutingRule>> {
        let mut node = &mut self.tree;
        for segment in category.segments().skip(1) {
            node = node.children.get_mut(segment)?;
        }
        node.rule.take().map(|(_, rule)| rule)
    }

    fn rules(&self) -> Vec<(Category, Arc<RoutingRule>)> {
        let mut rules = vec![(self.root_category.clone(), Arc::clone(&self.root_rule))];
        self.tree.collect(&mut rules);
        rules.sort_by(|a, b| a.0.cmp(&b.0));
        rules
    }
}

/// Resolves categories to routing decisions and applies reconfiguration
pub struct Router {
    registry: Arc<CategoryRegistry>,
    table: ArcSwap<RoutingTable>,
    write_lock: Mutex<()>,
}

impl Router {
    /// Router whose root rule sends WARN and above to a console sink
    pub fn new(registry: Arc<CategoryRegistry>) -> Self {
        let console: SharedSink = Arc::new(ConsoleSink::new());
        Self::with_root_rule(registry, RoutingRule::new(LogLevel::Warn, vec![console]))
    }

    pub fn with_root_rule(registry: Arc<CategoryRegistry>, rule: RoutingRule) -> Self {
        let root = registry.root().clone();
        Self {
            registry,
            table: ArcSwap::from_pointee(RoutingTable::new(root, Arc::new(rule))),
            write_lock: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &Arc<CategoryRegistry> {
        &self.registry
    }

    pub fn resolve(&self, category: &Category) -> RoutingDecision {
        self.table.load().resolve(category.as_str())
    }

    /// Resolve any dotted name, registered or not. Names outside the root
    /// resolve to the root rule.
    pub fn resolve_name(&self, name: &str) -> RoutingDecision {
        self.table.load().resolve(name)
    }

    /// Insert or replace the rule for a registered prefix
    pub fn configure(&self, prefix: &str, rule: RoutingRule) -> Result<()> {
        let category = self.registered(prefix)?;
        self.update(|table| {
            table.insert(category, Arc::new(rule));
            Ok(true)
        })
        .map(|_| ())
    }

    /// Change only the threshold of an existing rule
    pub fn set_threshold(&self, prefix: &str, threshold: LogLevel) -> Result<()> {
        let category = self.registered(prefix)?;
        self.update(|table| {
            let rule = table
                .rule_mut(&category)
                .ok_or_else(|| LoggingError::NoRuleForPrefix {
                    prefix: category.to_string(),
                })?;
            *rule = Arc::new(rule.as_ref().clone().with_threshold(threshold));
            Ok(true)
        })
        .map(|_| ())
    }

    /// Remove the rule at `prefix`. Returns whether a rule was present.
    pub fn remove(&self, prefix: &str) -> Result<bool> {
        let category = self.registered(prefix)?;
        if category.is_root() {
            return Err(LoggingError::RootRuleRequired {
                root: category.to_string(),
            });
        }

        self.update(|table| Ok(table.take(&category).is_some()))
    }

    /// Configured rules in prefix order
    pub fn rules(&self) -> Vec<(Category, Arc<RoutingRule>)> {
        self.table.load().rules()
    }

    /// Every distinct sink referenced by the current rules
    pub fn sinks(&self) -> Vec<SharedSink> {
        let mut sinks: Vec<SharedSink> = Vec::new();
        for (_, rule) in self.rules() {
            for sink in rule.sinks() {
                if !sinks.iter().any(|known| same_sink(known, sink)) {
                    sinks.push(Arc::clone(sink));
                }
            }
        }
        sinks
    }

    /// Number of changes applied since construction
    pub fn generation(&self) -> u64 {
        self.table.load().generation
    }

    fn registered(&self, prefix: &str) -> Result<Category> {
        self.registry
            .lookup(prefix)
            .ok_or_else(|| LoggingError::unknown_prefix(prefix))
    }

    /// Apply `change` to a copy of the table and publish it. The change
    /// returns false when it left the table untouched; nothing is published
    /// then.
    fn update<F>(&self, change: F) -> Result<bool>
    where
        F: FnOnce(&mut RoutingTable) -> Result<bool>,
    {
        let _guard = self.write_lock.lock();
        let mut next = RoutingTable::clone(&self.table.load());
        if !change(&mut next)? {
            return Ok(false);
        }
        next.generation += 1;
        self.table.store(Arc::new(next));
        Ok(true)
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("root", self.registry.root())
            .field("rules", &self.rules())
            .field("generation", &self.generation())
            .finish()
    }
}

/// Identity comparison that ignores vtable pointers
pub(crate) fn same_sink(a: &SharedSink, b: &SharedSink) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}
