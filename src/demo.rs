//! Built-in demo project types
//!
//! Registered by the `taller` binary so a freshly scaffolded project can run
//! `taller make:model IrisClassifier && taller train IrisClassifier` end to
//! end. The "training" is a synthetic loss schedule.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::model::{BoxedLoader, DataLoader, ModelCatalog, ModelContext, Payload, Trainable};
use crate::pipeline::{metrics_from_json, ProgressSink, StageEvent};
use crate::resolver::TypeResolver;

/// Namespace exporting the demo data loaders.
pub const PIPELINES_NAMESPACE: &str = "app.Pipelines";

const IRIS_SAMPLE: [[f64; 4]; 6] = [
    [5.1, 3.5, 1.4, 0.2],
    [4.9, 3.0, 1.4, 0.2],
    [7.0, 3.2, 4.7, 1.4],
    [6.4, 3.2, 4.5, 1.5],
    [6.3, 3.3, 6.0, 2.5],
    [5.8, 2.7, 5.1, 1.9],
];

/// Serves the bundled iris sample.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalDataLoader;

impl DataLoader for LocalDataLoader {
    fn load(&self) -> anyhow::Result<Payload> {
        Ok(json!(IRIS_SAMPLE))
    }
}

#[derive(Debug, Deserialize)]
struct IrisConfig {
    #[serde(default = "default_epochs")]
    epochs: u32,
    #[serde(default = "default_learning_rate")]
    learning_rate: f64,
}

const fn default_epochs() -> u32 {
    5
}

const fn default_learning_rate() -> f64 {
    0.1
}

/// Demo classifier over the iris sample.
pub struct IrisClassifier {
    config: IrisConfig,
    loader: Option<Arc<BoxedLoader>>,
    tracker: Option<Arc<dyn ProgressSink>>,
    architecture: Option<Value>,
}

impl IrisClassifier {
    /// Build from the model context.
    ///
    /// # Errors
    ///
    /// Fails if the run config has the wrong shape or the configured data
    /// loader cannot be resolved.
    pub fn from_context(ctx: ModelContext) -> anyhow::Result<Self> {
        let loader = ctx.data_loader()?;
        let config: IrisConfig = serde_json::from_value(Value::Object(ctx.config))?;
        Ok(Self {
            config,
            loader,
            tracker: None,
            architecture: None,
        })
    }
}

impl Trainable for IrisClassifier {
    fn set_tracker(&mut self, tracker: Arc<dyn ProgressSink>) {
        self.tracker = Some(tracker);
    }

    fn load_data(&mut self) -> anyhow::Result<Payload> {
        match &self.loader {
            Some(loader) => loader.load(),
            None => LocalDataLoader.load(),
        }
    }

    fn transform(&mut self, data: Payload) -> anyhow::Result<Payload> {
        let rows = data
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("expected a list of rows"))?;
        let features = rows.first().and_then(Value::as_array).map_or(0, Vec::len);
        Ok(json!({"rows": rows.len(), "features": features, "samples": rows}))
    }

    fn build(&mut self) -> anyhow::Result<Payload> {
        let architecture = json!({"layers": [4, 8, 3], "activation": "relu"});
        self.architecture = Some(architecture.clone());
        Ok(architecture)
    }

    fn fit(&mut self, data: Payload) -> anyhow::Result<Payload> {
        if self.architecture.is_none() {
            anyhow::bail!("fit called before build");
        }
        let rows = data["rows"].as_u64().unwrap_or(0);
        if rows == 0 {
            anyhow::bail!("no training rows");
        }

        let mut loss = 1.0;
        let mut accuracy = 0.0;
        for epoch in 1..=self.config.epochs {
            loss *= 1.0 - self.config.learning_rate;
            accuracy = 1.0 - loss / 2.0;
            if let Some(tracker) = &self.tracker {
                let metrics = json!({"epoch": epoch, "loss": loss, "accuracy": accuracy});
                tracker.update(&StageEvent::fitting_metrics(metrics_from_json(&metrics)));
            }
        }

        Ok(json!({"epoch": self.config.epochs, "loss": loss, "accuracy": accuracy}))
    }
}

/// Resolver with the demo data loaders registered.
#[must_use]
pub fn resolver() -> TypeResolver {
    let mut resolver = TypeResolver::new();
    resolver.namespace(PIPELINES_NAMESPACE, |ns| {
        ns.export_loader::<LocalDataLoader>("LocalDataLoader");
    });
    resolver
}

/// Catalog with the demo models registered.
#[must_use]
pub fn models() -> ModelCatalog {
    let mut models = ModelCatalog::new();
    models.register("iris_classifier", |ns| {
        ns.model("IrisClassifier", IrisClassifier::from_context);
    });
    models
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RunConfig;
    use crate::pipeline::{PipelineExecutor, RecordingSink};

    #[test]
    fn test_iris_runs_with_builtin_sample() {
        let mut config = RunConfig::new();
        config.insert("epochs".into(), json!(3));
        let unit = IrisClassifier::from_context(ModelContext::with_config(config)).unwrap();

        let sink = Arc::new(RecordingSink::new());
        let summary = PipelineExecutor::new("IrisClassifier")
            .run(unit, sink)
            .unwrap();

        // 4 lifecycle + 3 epochs + Completed
        assert_eq!(summary.events().len(), 8);
        let final_metrics = summary.final_metrics().unwrap();
        assert_eq!(final_metrics["epoch"].as_f64(), Some(3.0));

        let epochs: Vec<_> = summary
            .events()
            .iter()
            .filter(|e| e.stage() == crate::pipeline::Stage::Fitting && !e.metrics().is_empty())
            .filter_map(|e| e.metric("epoch").and_then(|m| m.as_f64()))
            .collect();
        assert_eq!(epochs, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_bad_config_is_rejected() {
        let mut config = RunConfig::new();
        config.insert("epochs".into(), json!("three"));
        assert!(IrisClassifier::from_context(ModelContext::with_config(config)).is_err());
    }

    #[test]
    fn test_loader_resolves() {
        let loader = resolver()
            .resolve_as::<BoxedLoader>("app.Pipelines.LocalDataLoader")
            .unwrap();
        assert_eq!(loader.load().unwrap().as_array().map(Vec::len), Some(6));
    }
}
