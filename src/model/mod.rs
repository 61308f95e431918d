//! Trainable models
//!
//! A model is any type implementing [`Trainable`]. Models are registered in a
//! [`ModelCatalog`] under the canonical key of their source file
//! (`app/Models/iris_classifier.rs` → `iris_classifier`) and the exact type
//! name, and are found again by [`ModelLocator`].

mod locator;

pub use locator::{ModelLocator, MODELS_DIR};

use std::sync::Arc;

use crate::catalog::{Catalog, Exports};
use crate::container::Container;
use crate::pipeline::ProgressSink;
use crate::resolver::Constructor;
use crate::{Error, Result};

/// Container key of the configured data loader (`data.loader`).
pub const DATA_LOADER_KEY: &str = "data_loader";

/// Stage input/output payload.
pub type Payload = serde_json::Value;

/// Per-model constructor arguments from `ml.models.<Identifier>`.
pub type RunConfig = serde_json::Map<String, serde_json::Value>;

/// The four-stage training contract.
///
/// `build()`'s return value is discarded by the executor; implementations
/// keep the built architecture themselves for `fit()`.
pub trait Trainable: Send {
    /// Receive the sink for voluntary progress reports during `fit`.
    ///
    /// Called once, before `load_data`. The default ignores it.
    fn set_tracker(&mut self, _tracker: Arc<dyn ProgressSink>) {}

    /// Load raw data from its source.
    ///
    /// # Errors
    ///
    /// Any error aborts the run in the `Loading` stage.
    fn load_data(&mut self) -> anyhow::Result<Payload>;

    /// Turn raw data into model-ready data.
    ///
    /// # Errors
    ///
    /// Any error aborts the run in the `Transforming` stage.
    fn transform(&mut self, data: Payload) -> anyhow::Result<Payload>;

    /// Build the model architecture.
    ///
    /// # Errors
    ///
    /// Any error aborts the run in the `Building` stage.
    fn build(&mut self) -> anyhow::Result<Payload>;

    /// Train on the transformed data and return final metrics.
    ///
    /// # Errors
    ///
    /// Any error aborts the run in the `Fitting` stage.
    fn fit(&mut self, data: Payload) -> anyhow::Result<Payload>;
}

impl<T: Trainable + ?Sized> Trainable for Box<T> {
    fn set_tracker(&mut self, tracker: Arc<dyn ProgressSink>) {
        (**self).set_tracker(tracker);
    }

    fn load_data(&mut self) -> anyhow::Result<Payload> {
        (**self).load_data()
    }

    fn transform(&mut self, data: Payload) -> anyhow::Result<Payload> {
        (**self).transform(data)
    }

    fn build(&mut self) -> anyhow::Result<Payload> {
        (**self).build()
    }

    fn fit(&mut self, data: Payload) -> anyhow::Result<Payload> {
        (**self).fit(data)
    }
}

/// Pluggable data source, selected by `data.loader` in config.
pub trait DataLoader: Send + Sync {
    /// Produce the raw dataset.
    ///
    /// # Errors
    ///
    /// Returns whatever prevented the data from being read.
    fn load(&self) -> anyhow::Result<Payload>;
}

/// Data loader as stored in the container.
pub type BoxedLoader = Box<dyn DataLoader>;

impl Exports<Constructor> {
    /// Export a [`DataLoader`] implementation constructed through [`Default`].
    pub fn export_loader<T>(&mut self, name: impl Into<String>) -> &mut Self
    where
        T: DataLoader + Default + 'static,
    {
        self.export_with(name, || Ok(Box::new(T::default()) as BoxedLoader))
    }
}

/// Resolve the configured data loader from the container.
///
/// # Errors
///
/// Returns [`Error::ServiceNotFound`] when no loader is configured, the
/// resolver's error when the configured path does not resolve, or
/// [`Error::ServiceTypeMismatch`] when it resolves to something that is not a
/// data loader.
pub fn data_loader(container: &Container) -> Result<Arc<BoxedLoader>> {
    container.make_as::<BoxedLoader>(DATA_LOADER_KEY)
}

/// What a model constructor gets to work with.
#[derive(Clone)]
pub struct ModelContext {
    /// `ml.models.<Identifier>`, empty when absent
    pub config: RunConfig,
    /// Session container (data loader and other bindings)
    pub container: Arc<Container>,
}

impl ModelContext {
    /// Context with the given config and an empty container.
    #[must_use]
    pub fn with_config(config: RunConfig) -> Self {
        Self {
            config,
            container: Arc::new(Container::new()),
        }
    }

    /// Resolve the configured data loader, if one is bound.
    ///
    /// # Errors
    ///
    /// As [`data_loader`], except that a missing binding is `Ok(None)`.
    pub fn data_loader(&self) -> Result<Option<Arc<BoxedLoader>>> {
        match data_loader(&self.container) {
            Ok(loader) => Ok(Some(loader)),
            Err(Error::ServiceNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Builds a model from its context.
pub type ModelFactory =
    Arc<dyn Fn(ModelContext) -> anyhow::Result<Box<dyn Trainable>> + Send + Sync>;

/// Module key → exported model types.
pub type ModelCatalog = Catalog<ModelFactory>;

impl Exports<ModelFactory> {
    /// Export a model type under its identifier.
    pub fn model<T, F>(&mut self, identifier: impl Into<String>, construct: F) -> &mut Self
    where
        T: Trainable + 'static,
        F: Fn(ModelContext) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let factory: ModelFactory = Arc::new(move |ctx| {
            construct(ctx).map(|model| Box::new(model) as Box<dyn Trainable>)
        });
        self.export(identifier, factory)
    }

    /// Export a model type deserialized from its run config.
    ///
    /// Unknown config keys are rejected only if `T` says so through serde.
    pub fn model_from_config<T>(&mut self, identifier: impl Into<String>) -> &mut Self
    where
        T: Trainable + serde::de::DeserializeOwned + 'static,
    {
        self.model(identifier, |ctx| {
            Ok(serde_json::from_value::<T>(serde_json::Value::Object(ctx.config))?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Linear {
        #[serde(default = "default_epochs")]
        epochs: u32,
    }

    const fn default_epochs() -> u32 {
        1
    }

    impl Trainable for Linear {
        fn load_data(&mut self) -> anyhow::Result<Payload> {
            Ok(json!([]))
        }

        fn transform(&mut self, data: Payload) -> anyhow::Result<Payload> {
            Ok(data)
        }

        fn build(&mut self) -> anyhow::Result<Payload> {
            Ok(Payload::Null)
        }

        fn fit(&mut self, _data: Payload) -> anyhow::Result<Payload> {
            Ok(json!({"epoch": self.epochs}))
        }
    }

    #[test]
    fn test_model_from_config() {
        let mut catalog = ModelCatalog::new();
        catalog.register("linear", |ns| {
            ns.model_from_config::<Linear>("Linear");
        });

        let factory = catalog.lookup("linear", "Linear").unwrap();
        let mut config = RunConfig::new();
        config.insert("epochs".into(), json!(7));
        let mut model = factory(ModelContext::with_config(config)).unwrap();
        assert_eq!(model.fit(Payload::Null).unwrap(), json!({"epoch": 7}));

        let mut model = factory(ModelContext::with_config(RunConfig::new())).unwrap();
        assert_eq!(model.fit(Payload::Null).unwrap(), json!({"epoch": 1}));
    }

    #[test]
    fn test_model_from_config_rejects_bad_types() {
        let mut catalog = ModelCatalog::new();
        catalog.register("linear", |ns| {
            ns.model_from_config::<Linear>("Linear");
        });

        let factory = catalog.lookup("linear", "Linear").unwrap();
        let mut config = RunConfig::new();
        config.insert("epochs".into(), json!("many"));
        assert!(factory(ModelContext::with_config(config)).is_err());
    }

    #[derive(Default)]
    struct Fixed;

    impl DataLoader for Fixed {
        fn load(&self) -> anyhow::Result<Payload> {
            Ok(json!([[5.1, 3.5]]))
        }
    }

    #[test]
    fn test_context_data_loader() {
        let ctx = ModelContext::with_config(RunConfig::new());
        assert!(ctx.data_loader().unwrap().is_none());

        ctx.container
            .singleton(DATA_LOADER_KEY, Box::new(Fixed) as BoxedLoader);
        let loader = ctx.data_loader().unwrap().unwrap();
        assert_eq!(loader.load().unwrap(), json!([[5.1, 3.5]]));
    }

    #[test]
    fn test_context_data_loader_wrong_type() {
        let ctx = ModelContext::with_config(RunConfig::new());
        ctx.container.singleton(DATA_LOADER_KEY, 3_u8);
        assert!(matches!(
            ctx.data_loader(),
            Err(Error::ServiceTypeMismatch { .. })
        ));
    }
}
