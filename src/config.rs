//! Configuration store
//!
//! Every `config/<name>.yaml` file becomes the top-level key `<name>`, and
//! values are read back with dot paths: `app.name` reads `name` from
//! `config/app.yaml`. YAML is parsed straight into `serde_json::Value` so the
//! rest of the crate deals with one value type.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::warn;

use crate::{Error, Result};

/// Default config directory, relative to the project root.
pub const CONFIG_DIR: &str = "config";

/// Dot-path queryable configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigStore {
    root: Map<String, Value>,
}

impl ConfigStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.yaml` file in `dir`. A missing directory yields an empty
    /// store; empty files are skipped. A file that cannot be read or parsed
    /// is skipped with a warning and the remaining files still load.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the directory itself cannot be read.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut store = Self::new();
        if !dir.is_dir() {
            return Ok(store);
        }

        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "yaml"))
            .collect();
        files.sort();

        for path in files {
            let Some(key) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            match Self::load_file(&path) {
                Ok(Some(value)) => store.insert(key, value),
                Ok(None) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "skipping config file"),
            }
        }

        Ok(store)
    }

    /// Parse one YAML file. Empty or null documents yield `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the file when it does not parse, or
    /// [`Error::Io`] when it cannot be read.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Option<Value>> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        let value: Value = serde_yaml::from_str(&content).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok((!value.is_null()).then_some(value))
    }

    /// Build a store from a JSON object (tests, embedding).
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(root) => Self { root },
            _ => Self::new(),
        }
    }

    /// Set a top-level key.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.root.insert(key.into(), value);
    }

    /// Look up a dot path. Only objects are descended.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let first = parts.next()?;
        parts.try_fold(self.root.get(first)?, |value, part| {
            value.as_object().and_then(|map| map.get(part))
        })
    }

    /// Look up a dot path, falling back to `default`.
    #[must_use]
    pub fn get_or(&self, path: &str, default: Value) -> Value {
        self.get(path).cloned().unwrap_or(default)
    }

    /// Look up a string value.
    #[must_use]
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Whether nothing was loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}
