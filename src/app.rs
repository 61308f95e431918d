//! Application session
//!
//! One [`Application`] per CLI invocation: it owns the loaded config, the
//! service container, the type resolver and the model catalog, and wires them
//! together at startup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{ConfigStore, CONFIG_DIR};
use crate::container::Container;
use crate::model::{ModelCatalog, ModelContext, ModelLocator, RunConfig, Trainable, DATA_LOADER_KEY};
use crate::pipeline::{PipelineExecutor, ProgressSink, Summary};
use crate::resolver::TypeResolver;
use crate::{Error, Result};

/// Config path selecting the data loader implementation.
pub const DATA_LOADER_CONFIG: &str = "data.loader";

/// Container key the loaded [`ConfigStore`] is registered under.
pub const CONFIG_KEY: &str = "config";

/// Builder for [`Application`].
#[derive(Default)]
pub struct ApplicationBuilder {
    root: PathBuf,
    config: Option<ConfigStore>,
    resolver: TypeResolver,
    models: ModelCatalog,
}

impl ApplicationBuilder {
    /// Use an already loaded config instead of reading `<root>/config`.
    #[must_use]
    pub fn config(mut self, config: ConfigStore) -> Self {
        self.config = Some(config);
        self
    }

    /// Types resolvable by dotted path (data loaders and friends).
    #[must_use]
    pub fn resolver(mut self, resolver: TypeResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Models trainable by identifier.
    #[must_use]
    pub fn models(mut self, models: ModelCatalog) -> Self {
        self.models = models;
        self
    }

    /// Load config and populate container bindings.
    ///
    /// When `data.loader` names a type, `data_loader` is bound as a factory
    /// that resolves it on every `make`; resolution errors surface at that
    /// point, not here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the `config/` directory cannot be read.
    pub fn build(self) -> Result<Application> {
        let config = match self.config {
            Some(config) => config,
            None => ConfigStore::load_dir(self.root.join(CONFIG_DIR))?,
        };
        let config = Arc::new(config);
        let resolver = Arc::new(self.resolver);
        let container = Arc::new(Container::new());

        container.singleton_shared(CONFIG_KEY, config.clone());

        if let Some(path) = config.get_str(DATA_LOADER_CONFIG) {
            debug!(loader = path, "binding {DATA_LOADER_KEY}");
            let path = path.to_string();
            let resolver = Arc::clone(&resolver);
            container.bind(DATA_LOADER_KEY, move || resolver.resolve(&path));
        }

        Ok(Application {
            root: self.root,
            config,
            container,
            models: Arc::new(self.models),
        })
    }
}

/// A bootstrapped session.
pub struct Application {
    root: PathBuf,
    config: Arc<ConfigStore>,
    container: Arc<Container>,
    models: Arc<ModelCatalog>,
}

impl Application {
    /// Start building a session rooted at `root` (the project directory).
    #[must_use]
    pub fn builder(root: impl Into<PathBuf>) -> ApplicationBuilder {
        ApplicationBuilder {
            root: root.into(),
            ..ApplicationBuilder::default()
        }
    }

    /// Project root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Loaded configuration.
    #[must_use]
    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    /// Session container.
    #[must_use]
    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    /// `ml.models.<identifier>`, or an empty config when absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Instantiation`] when the entry exists but is not a
    /// mapping.
    pub fn run_config(&self, identifier: &str) -> Result<RunConfig> {
        match self.config.get(&format!("ml.models.{identifier}")) {
            None | Some(serde_json::Value::Null) => Ok(RunConfig::new()),
            Some(serde_json::Value::Object(map)) => Ok(map.clone()),
            Some(other) => Err(Error::Instantiation {
                identifier: identifier.to_string(),
                cause: format!("ml.models.{identifier} must be a mapping, got {other}"),
            }),
        }
    }

    /// Scan `app/Models` and return a locator over the registered models.
    ///
    /// # Errors
    ///
    /// As [`ModelLocator::scan`].
    pub fn locator(&self) -> Result<ModelLocator> {
        ModelLocator::scan(&self.root, Arc::clone(&self.models))
    }

    /// Locate `identifier` and construct it with its run config.
    ///
    /// # Errors
    ///
    /// [`Error::ModelsDirMissing`], [`Error::ModelNotFound`] or
    /// [`Error::Instantiation`].
    pub fn prepare(&self, identifier: &str) -> Result<(Box<dyn Trainable>, RunConfig)> {
        let config = self.run_config(identifier)?;
        let ctx = ModelContext {
            config: config.clone(),
            container: Arc::clone(&self.container),
        };
        let unit = self.locator()?.instantiate(identifier, ctx)?;
        info!(model = identifier, keys = config.len(), "model instantiated");
        Ok((unit, config))
    }

    /// Prepare and run the full pipeline on the calling thread.
    ///
    /// # Errors
    ///
    /// Any error from [`Application::prepare`], or [`Error::Stage`].
    pub fn train(&self, identifier: &str, sink: Arc<dyn ProgressSink>) -> Result<Summary> {
        let (unit, _) = self.prepare(identifier)?;
        let summary = PipelineExecutor::new(identifier).run(unit, sink)?;
        info!(model = identifier, events = summary.events().len(), "training completed");
        Ok(summary)
    }
}
