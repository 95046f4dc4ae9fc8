//! Logger categories and the registry that hands them out
//!
//! A category is a dot-delimited name such as `neo4j.txmanager`. Every
//! category other than the root is nested under the parent formed by
//! dropping its last segment. The registry guarantees one shared identity per
//! name, so `get_or_register` can be called from any subsystem without
//! coordination.

use super::error::{LoggingError, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Names of the standard kernel loggers
pub mod names {
    pub const NEO4J: &str = "neo4j";
    pub const CONFIG: &str = "neo4j.config";
    pub const DATASOURCE: &str = "neo4j.datasource";
    pub const DIAGNOSTICS: &str = "neo4j.diagnostics";
    pub const TXMANAGER: &str = "neo4j.txmanager";
    pub const XAFACTORY: &str = "neo4j.xafactory";
    pub const NEOSTORE: &str = "neo4j.neostore";
    pub const EXTENSION: &str = "neo4j.extension";
    pub const INDEX: &str = "neo4j.index";
    pub const CYPHER: &str = "neo4j.cypher";

    /// Every standard name, root first
    pub const WELL_KNOWN: [&str; 10] = [
        NEO4J,
        CONFIG,
        DATASOURCE,
        DIAGNOSTICS,
        TXMANAGER,
        XAFACTORY,
        NEOSTORE,
        EXTENSION,
        INDEX,
        CYPHER,
    ];
}

pub const SEPARATOR: char = '.';

/// An immutable, registered category name.
///
/// Cloning is cheap and clones share the registry's allocation.
/// Equality compares names; [`Category::same_identity`] compares identity.
#[derive(Clone)]
pub struct Category {
    name: Arc<str>,
}

impl Category {
    fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// The root category is the only one without a separator
    pub fn is_root(&self) -> bool {
        !self.name.contains(SEPARATOR)
    }

    /// Name of the parent category, `None` for the root
    pub fn parent_name(&self) -> Option<&str> {
        self.name.rfind(SEPARATOR).map(|idx| &self.name[..idx])
    }

    /// Last segment of the name (`txmanager` for `neo4j.txmanager`)
    pub fn leaf(&self) -> &str {
        match self.name.rfind(SEPARATOR) {
            Some(idx) => &self.name[idx + 1..],
            None => &self.name,
        }
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.name.split(SEPARATOR)
    }

    /// Number of segments; the root has depth 1
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// True if `self` is a strict ancestor of `other`
    pub fn is_ancestor_of(&self, other: &Category) -> bool {
        is_prefix_of(&self.name, &other.name) && self.name.len() < other.name.len()
    }

    /// True if both categories were handed out by the same registry entry
    pub fn same_identity(a: &Category, b: &Category) -> bool {
        Arc::ptr_eq(&a.name, &b.name)
    }
}

/// `prefix` matches `name` at a segment boundary
pub(crate) fn is_prefix_of(prefix: &str, name: &str) -> bool {
    name.starts_with(prefix)
        && (name.len() == prefix.len() || name[prefix.len()..].starts_with(SEPARATOR))
}

impl PartialEq for Category {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Category {}

impl std::hash::Hash for Category {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl PartialOrd for Category {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Category {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name.cmp(&other.name)
    }
}

impl AsRef<str> for Category {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Debug for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Category({})", self.name)
    }
}

/// Registry of every category known to one logging service.
///
/// Thread-safe. Registering a name also registers all of its ancestors, so
/// the set is always closed under [`Category::parent_name`].
pub struct CategoryRegistry {
    root: Category,
    categories: RwLock<HashMap<Arc<str>, Category>>,
}

impl CategoryRegistry {
    /// Registry rooted at `neo4j` with the standard names pre-registered
    pub fn new() -> Self {
        let registry = Self::bare(Category::new(names::NEO4J));
        for name in names::WELL_KNOWN {
            registry.insert_with_ancestors(name);
        }
        registry
    }

    /// Isolated registry under a different root segment.
    ///
    /// Only the root itself is registered.
    pub fn with_root(root: &str) -> Result<Self> {
        if root.contains(SEPARATOR) {
            return Err(LoggingError::invalid_category(
                root,
                "root must be a single segment",
            ));
        }
        validate_characters(root)?;
        Ok(Self::bare(Category::new(root)))
    }

    fn bare(root: Category) -> Self {
        let mut categories = HashMap::new();
        categories.insert(Arc::clone(&root.name), root.clone());
        Self {
            root,
            categories: RwLock::new(categories),
        }
    }

    pub fn root(&self) -> &Category {
        &self.root
    }

    /// Return the category for `name`, registering it and its ancestors on
    /// first use.
    pub fn get_or_register(&self, name: &str) -> Result<Category> {
        if let Some(category) = self.categories.read().get(name) {
            return Ok(category.clone());
        }

        self.validate(name)?;
        Ok(self.insert_with_ancestors(name))
    }

    /// Look up a category without registering it
    pub fn lookup(&self, name: &str) -> Option<Category> {
        self.categories.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.categories.read().contains_key(name)
    }

    /// All registered categories in name order
    pub fn categories(&self) -> Vec<Category> {
        let mut all: Vec<Category> = self.categories.read().values().cloned().collect();
        all.sort();
        all
    }

    pub fn len(&self) -> usize {
        self.categories.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.read().is_empty()
    }

    /// Check a name without registering it
    pub fn validate(&self, name: &str) -> Result<()> {
        validate_characters(name)?;

        if name.split(SEPARATOR).any(str::is_empty) {
            return Err(LoggingError::invalid_category(name, "empty segment"));
        }

        if !is_prefix_of(self.root.as_str(), name) {
            return Err(LoggingError::invalid_category(
                name,
                format!("not nested under root '{}'", self.root),
            ));
        }

        Ok(())
    }

    fn insert_with_ancestors(&self, name: &str) -> Category {
        let mut categories = self.categories.write();

        // Ancestors first: every '.' marks the end of one
        for (idx, _) in name.match_indices(SEPARATOR) {
            let prefix = &name[..idx];
            if !categories.contains_key(prefix) {
                let category = Category::new(prefix);
                categories.insert(Arc::clone(&category.name), category);
            }
        }

        // Another writer may have won the race since the read lookup
        if let Some(existing) = categories.get(name) {
            return existing.clone();
        }

        let category = Category::new(name);
        categories.insert(Arc::clone(&category.name), category.clone());
        category
    }
}

impl Default for CategoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CategoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CategoryRegistry")
            .field("root", &self.root)
            .field("len", &self.len())
            .finish()
    }
}

fn validate_characters(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(LoggingError::invalid_category(name, "name is empty"));
    }

    if let Some(c) = name
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != SEPARATOR)
    {
        return Err(LoggingError::invalid_category(
            name,
            format!("illegal character '{}'", c),
        ));
    }

    Ok(())
}
