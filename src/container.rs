//! Service container
//!
//! Holds two kinds of bindings keyed by string:
//!
//! - **singletons**: an instance fixed at bind time
//! - **factories**: a resolver invoked on every [`Container::make`] call
//!
//! A singleton always wins over a factory bound to the same key. The container
//! is an ordinary value owned by the CLI session and passed by reference; there
//! is no process-wide instance.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use taller::container::Container;
//!
//! let container = Container::new();
//! container.singleton("app.name", String::from("iris"));
//! container.bind("seed", || Ok(Arc::new(42_u64)));
//!
//! assert_eq!(*container.make_as::<String>("app.name")?, "iris");
//! assert_eq!(*container.make_as::<u64>("seed")?, 42);
//! # Ok::<(), taller::Error>(())
//! ```

use std::any::{type_name, Any};
use std::sync::Arc;

use dashmap::DashMap;

use crate::{Error, Result};

/// A resolved service instance.
pub type Service = Arc<dyn Any + Send + Sync>;

/// Factory resolver, invoked fresh on every `make`.
pub type Resolver = Arc<dyn Fn() -> Result<Service> + Send + Sync>;

/// Which kind of binding answers a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// Fixed instance
    Singleton,
    /// Resolver called per `make`
    Factory,
}

/// Key → singleton / factory bindings.
#[derive(Default)]
pub struct Container {
    instances: DashMap<String, Service>,
    bindings: DashMap<String, Resolver>,
}

impl Container {
    /// Create an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory. Replaces a previous factory for `key`; a singleton
    /// already bound to `key` keeps precedence.
    pub fn bind<F>(&self, key: impl Into<String>, resolver: F)
    where
        F: Fn() -> Result<Service> + Send + Sync + 'static,
    {
        self.bindings.insert(key.into(), Arc::new(resolver));
    }

    /// Register a fixed instance. Replaces a previous singleton for `key`.
    pub fn singleton<T: Any + Send + Sync>(&self, key: impl Into<String>, instance: T) {
        self.instances.insert(key.into(), Arc::new(instance));
    }

    /// Register an already shared instance.
    pub fn singleton_shared(&self, key: impl Into<String>, instance: Service) {
        self.instances.insert(key.into(), instance);
    }

    /// Resolve `key`: the singleton if one is bound, otherwise a fresh call to
    /// the factory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ServiceNotFound`] when nothing is bound to `key`, or
    /// whatever error the factory returns.
    pub fn make(&self, key: &str) -> Result<Service> {
        if let Some(instance) = self.instances.get(key) {
            return Ok(Arc::clone(instance.value()));
        }

        // Release the map guard before calling out: resolvers may use the container.
        let resolver = self
            .bindings
            .get(key)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::ServiceNotFound(key.to_string()))?;

        resolver()
    }

    /// Resolve `key` and downcast to `T`.
    ///
    /// # Errors
    ///
    /// As [`Container::make`], plus [`Error::ServiceTypeMismatch`] when the
    /// instance is not a `T`.
    pub fn make_as<T: Any + Send + Sync>(&self, key: &str) -> Result<Arc<T>> {
        self.make(key)?
            .downcast::<T>()
            .map_err(|_| Error::ServiceTypeMismatch {
                key: key.to_string(),
                expected: type_name::<T>(),
            })
    }

    /// Remove both the singleton and the factory for `key`. No-op if absent.
    pub fn forget(&self, key: &str) {
        self.instances.remove(key);
        self.bindings.remove(key);
    }

    /// Which binding would answer `make(key)`.
    #[must_use]
    pub fn binding_kind(&self, key: &str) -> Option<BindingKind> {
        if self.instances.contains_key(key) {
            Some(BindingKind::Singleton)
        } else if self.bindings.contains_key(key) {
            Some(BindingKind::Factory)
        } else {
            None
        }
    }

    /// Whether anything is bound to `key`.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.binding_kind(key).is_some()
    }
}
