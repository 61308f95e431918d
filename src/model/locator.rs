//! Model locator - identifier → model factory

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{ModelCatalog, ModelContext, ModelFactory, Trainable};
use crate::naming::canonicalize;
use crate::{Error, Result};

/// Models directory, relative to the project root.
pub const MODELS_DIR: &str = "app/Models";

/// Model source file extension.
const MODEL_EXT: &str = "rs";

/// Registry module living next to the models; never a model itself.
const REGISTRY_STEM: &str = "mod";

/// Finds the model type for an identifier.
///
/// The model source for `IrisClassifier` is expected at
/// `<root>/app/Models/iris_classifier.rs`. The directory is scanned once when
/// the locator is created; an identifier resolves only if its file was found
/// by that scan *and* the catalog registers a module under the same key
/// exporting a type named exactly like the identifier.
///
/// Two identifiers that canonicalize to the same key share one file; nothing
/// disambiguates them.
pub struct ModelLocator {
    root: PathBuf,
    discovered: BTreeSet<String>,
    catalog: Arc<ModelCatalog>,
}

impl ModelLocator {
    /// Scan `<root>/app/Models` for model files.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelsDirMissing`] if the directory does not exist, or
    /// [`Error::Io`] if it cannot be read.
    pub fn scan(root: impl Into<PathBuf>, catalog: Arc<ModelCatalog>) -> Result<Self> {
        let root = root.into();
        let dir = root.join(MODELS_DIR);
        if !dir.is_dir() {
            return Err(Error::ModelsDirMissing(dir));
        }

        let mut discovered = BTreeSet::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == MODEL_EXT) {
                if let Some(stem) = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .filter(|stem| *stem != REGISTRY_STEM)
                {
                    discovered.insert(stem.to_string());
                }
            }
        }

        Ok(Self {
            root,
            discovered,
            catalog,
        })
    }

    /// Project root the locator was created for.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Canonical keys of the model files found by the scan.
    pub fn discovered(&self) -> impl Iterator<Item = &str> {
        self.discovered.iter().map(String::as_str)
    }

    /// Where the source file for `identifier` is expected.
    #[must_use]
    pub fn expected_path(&self, identifier: &str) -> PathBuf {
        self.root
            .join(MODELS_DIR)
            .join(format!("{}.{MODEL_EXT}", canonicalize(identifier)))
    }

    /// Find the factory for `identifier`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelNotFound`] naming the expected path when the file
    /// is missing, its module is not registered, or the module has no type
    /// named `identifier`.
    pub fn locate(&self, identifier: &str) -> Result<&ModelFactory> {
        let key = canonicalize(identifier);
        let not_found = |reason: String| Error::ModelNotFound {
            identifier: identifier.to_string(),
            expected_path: self.expected_path(identifier),
            reason,
        };

        if !self.discovered.contains(&key) {
            return Err(not_found(format!("no model file for key '{key}'")));
        }

        self.catalog
            .lookup(&key, identifier)
            .map_err(|miss| not_found(miss.to_string()))
    }

    /// Locate `identifier` and construct it with `ctx`.
    ///
    /// # Errors
    ///
    /// As [`ModelLocator::locate`], plus [`Error::Instantiation`] when the
    /// constructor rejects the config.
    pub fn instantiate(&self, identifier: &str, ctx: ModelContext) -> Result<Box<dyn Trainable>> {
        let factory = self.locate(identifier)?;
        factory(ctx).map_err(|cause| Error::Instantiation {
            identifier: identifier.to_string(),
            cause: format!("{cause:#}"),
        })
    }
}
