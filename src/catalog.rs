//! Name-keyed catalog of lazily exported items
//!
//! A catalog maps a namespace name (`app.Pipelines`, `iris_classifier`) to an
//! export hook. The hook runs the first time anything in the namespace is
//! looked up and fills an [`Exports`] table; later lookups reuse that table.
//! Registration happens at startup, so every name that can ever be resolved
//! is known to the program that registers it.

use std::fmt;
use std::sync::OnceLock;

use rustc_hash::FxHashMap;

type ExportHook<T> = Box<dyn Fn(&mut Exports<T>) + Send + Sync>;

/// Items exported by one namespace, keyed by case-sensitive name.
pub struct Exports<T> {
    items: FxHashMap<String, T>,
}

impl<T> Exports<T> {
    fn new() -> Self {
        Self {
            items: FxHashMap::default(),
        }
    }

    /// Export `item` under `name`, replacing any previous export.
    pub fn export(&mut self, name: impl Into<String>, item: T) -> &mut Self {
        self.items.insert(name.into(), item);
        self
    }

    /// Look up an export by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&T> {
        self.items.get(name)
    }

    /// Exported names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.items.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of exports.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is exported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

struct Namespace<T> {
    hook: ExportHook<T>,
    loaded: OnceLock<Exports<T>>,
}

impl<T> Namespace<T> {
    fn exports(&self) -> &Exports<T> {
        self.loaded.get_or_init(|| {
            let mut exports = Exports::new();
            (self.hook)(&mut exports);
            exports
        })
    }
}

/// Why a catalog lookup failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Miss {
    /// No namespace registered under this name
    Namespace(String),
    /// Namespace exists but does not export the item
    Item {
        /// Namespace searched
        namespace: String,
        /// Item requested
        item: String,
    },
}

impl fmt::Display for Miss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Namespace(ns) => write!(f, "no module named '{ns}'"),
            Self::Item { namespace, item } => {
                write!(f, "module '{namespace}' has no attribute '{item}'")
            }
        }
    }
}

/// Namespace name → lazily exported items.
pub struct Catalog<T> {
    namespaces: FxHashMap<String, Namespace<T>>,
}

impl<T> Default for Catalog<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Catalog<T> {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self {
            namespaces: FxHashMap::default(),
        }
    }

    /// Register a namespace. Registering the same name again replaces it.
    pub fn register<F>(&mut self, namespace: impl Into<String>, hook: F) -> &mut Self
    where
        F: Fn(&mut Exports<T>) + Send + Sync + 'static,
    {
        self.namespaces.insert(
            namespace.into(),
            Namespace {
                hook: Box::new(hook),
                loaded: OnceLock::new(),
            },
        );
        self
    }

    /// Whether a namespace is registered.
    #[must_use]
    pub fn contains(&self, namespace: &str) -> bool {
        self.namespaces.contains_key(namespace)
    }

    /// Whether the namespace's export hook has already run.
    #[must_use]
    pub fn is_loaded(&self, namespace: &str) -> bool {
        self.namespaces
            .get(namespace)
            .is_some_and(|ns| ns.loaded.get().is_some())
    }

    /// Exports of a namespace, running its hook on first access.
    ///
    /// # Errors
    ///
    /// Returns [`Miss::Namespace`] if no such namespace is registered.
    pub fn exports(&self, namespace: &str) -> Result<&Exports<T>, Miss> {
        self.namespaces
            .get(namespace)
            .map(Namespace::exports)
            .ok_or_else(|| Miss::Namespace(namespace.to_string()))
    }

    /// Look up `item` inside `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`Miss`] describing whether the namespace or the item is absent.
    pub fn lookup(&self, namespace: &str, item: &str) -> Result<&T, Miss> {
        self.exports(namespace)?.get(item).ok_or_else(|| Miss::Item {
            namespace: namespace.to_string(),
            item: item.to_string(),
        })
    }

    /// Registered namespace names, sorted.
    #[must_use]
    pub fn namespaces(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.namespaces.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
