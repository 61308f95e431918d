//! Dotted-path type resolver
//!
//! Turns `"app.Pipelines.LocalDataLoader"` into a freshly constructed
//! instance: everything before the last `.` names a namespace, the trailing
//! segment names a type exported by it. Types are registered at startup with
//! zero-argument constructors, which lets configuration pick an
//! implementation without the calling code naming it.

use std::any::Any;
use std::sync::Arc;

use crate::catalog::{Catalog, Exports};
use crate::container::Service;
use crate::{Error, Result};

/// Zero-argument constructor for a resolvable type.
pub type Constructor = Arc<dyn Fn() -> anyhow::Result<Service> + Send + Sync>;

impl Exports<Constructor> {
    /// Export `T` constructed through [`Default`].
    pub fn export_default<T>(&mut self, name: impl Into<String>) -> &mut Self
    where
        T: Default + Any + Send + Sync,
    {
        let constructor: Constructor = Arc::new(|| Ok(Arc::new(T::default()) as Service));
        self.export(name, constructor)
    }

    /// Export `T` constructed by a fallible function.
    pub fn export_with<T, F>(&mut self, name: impl Into<String>, construct: F) -> &mut Self
    where
        T: Any + Send + Sync,
        F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let constructor: Constructor =
            Arc::new(move || construct().map(|value| Arc::new(value) as Service));
        self.export(name, constructor)
    }
}

/// Registry of namespaces whose exported types can be built by dotted path.
#[derive(Default)]
pub struct TypeResolver {
    catalog: Catalog<Constructor>,
}

impl TypeResolver {
    /// Create a resolver with no namespaces.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a namespace. `hook` runs on the first resolution that touches
    /// the namespace.
    pub fn namespace<F>(&mut self, name: impl Into<String>, hook: F) -> &mut Self
    where
        F: Fn(&mut Exports<Constructor>) + Send + Sync + 'static,
    {
        self.catalog.register(name, hook);
        self
    }

    /// Whether the namespace has been loaded by an earlier resolution.
    #[must_use]
    pub fn is_loaded(&self, namespace: &str) -> bool {
        self.catalog.is_loaded(namespace)
    }

    /// Construct the type named by `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolution`] when the path has no namespace part, the
    /// namespace is not registered, the type is not exported by it, or the
    /// constructor fails.
    pub fn resolve(&self, path: &str) -> Result<Service> {
        let (namespace, type_name) = path
            .rsplit_once('.')
            .filter(|(ns, ty)| !ns.is_empty() && !ty.is_empty())
            .ok_or_else(|| Error::resolution(path, "expected '<namespace>.<Type>'"))?;

        let constructor = self
            .catalog
            .lookup(namespace, type_name)
            .map_err(|miss| Error::resolution(path, miss))?;

        constructor().map_err(|cause| Error::resolution(path, format!("{cause:#}")))
    }

    /// Construct and downcast to `T`.
    ///
    /// # Errors
    ///
    /// As [`TypeResolver::resolve`], plus [`Error::Resolution`] when the
    /// constructed value is not a `T`.
    pub fn resolve_as<T: Any + Send + Sync>(&self, path: &str) -> Result<Arc<T>> {
        self.resolve(path)?.downcast::<T>().map_err(|_| {
            Error::resolution(
                path,
                format!("constructed value is not a {}", std::any::type_name::<T>()),
            )
        })
    }
}
