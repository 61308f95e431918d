//! Full sessions: project on disk → config → locator → pipeline

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};
use taller::model::{BoxedLoader, DataLoader, ModelCatalog, ModelContext, Payload, Trainable};
use taller::pipeline::{RecordingSink, Stage};
use taller::resolver::TypeResolver;
use taller::{Application, Error};

fn project(name: &str, models: &[&str], config: &[(&str, &str)]) -> PathBuf {
    let root = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("e2e").join(name);
    let _ = fs::remove_dir_all(&root);
    fs::create_dir_all(root.join("app/Models")).unwrap();
    fs::create_dir_all(root.join("config")).unwrap();
    for model in models {
        fs::write(root.join("app/Models").join(model), "// model\n").unwrap();
    }
    for (file, content) in config {
        fs::write(root.join("config").join(file), content).unwrap();
    }
    root
}

/// Returns `{}` from the first three stages and fixed metrics from fit.
struct Stub;

impl Trainable for Stub {
    fn load_data(&mut self) -> anyhow::Result<Payload> {
        Ok(json!({}))
    }

    fn transform(&mut self, _data: Payload) -> anyhow::Result<Payload> {
        Ok(json!({}))
    }

    fn build(&mut self) -> anyhow::Result<Payload> {
        Ok(json!({}))
    }

    fn fit(&mut self, _data: Payload) -> anyhow::Result<Payload> {
        Ok(json!({"epoch": 1, "loss": 0.1}))
    }
}

fn stub_catalog() -> ModelCatalog {
    let mut models = ModelCatalog::new();
    models.register("iris_classifier", |ns| {
        ns.model("IrisClassifier", |_ctx: ModelContext| Ok(Stub));
    });
    models
}

#[test]
fn test_stub_model_trains_with_five_events() {
    let root = project("stub", &["iris_classifier.rs"], &[]);
    let app = Application::builder(&root)
        .models(stub_catalog())
        .build()
        .unwrap();

    let sink = Arc::new(RecordingSink::new());
    let summary = app.train("IrisClassifier", sink.clone()).unwrap();

    let stages: Vec<Stage> = sink.events().iter().map(|e| e.stage()).collect();
    assert_eq!(
        stages,
        [
            Stage::Loading,
            Stage::Transforming,
            Stage::Building,
            Stage::Fitting,
            Stage::Completed,
        ]
    );
    assert_eq!(summary.status(), Stage::Completed);
    let metrics = summary.final_metrics().unwrap();
    assert_eq!(metrics["epoch"].as_f64(), Some(1.0));
    assert_eq!(metrics["loss"].as_f64(), Some(0.1));
}

#[test]
fn test_missing_model_file_reports_expected_path() {
    let root = project("no-file", &[], &[]);
    let app = Application::builder(&root)
        .models(stub_catalog())
        .build()
        .unwrap();

    let Err(err) = app.prepare("IrisClassifier") else {
        panic!("expected ModelNotFound");
    };
    assert!(matches!(err, Error::ModelNotFound { .. }));
    assert!(err
        .to_string()
        .contains(&root.join("app/Models/iris_classifier.rs").display().to_string()));
}

#[test]
fn test_models_dir_missing_outside_project() {
    let root = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("e2e/empty-dir");
    let _ = fs::remove_dir_all(&root);
    fs::create_dir_all(&root).unwrap();
    let app = Application::builder(&root).build().unwrap();
    assert!(matches!(
        app.prepare("IrisClassifier"),
        Err(Error::ModelsDirMissing(_))
    ));
}

#[test]
fn test_run_config_comes_from_ml_models() {
    let root = project(
        "run-config",
        &["iris_classifier.rs"],
        &[("ml.yaml", "models:\n  IrisClassifier:\n    epochs: 2\n")],
    );
    let app = Application::builder(&root)
        .models(taller::demo::models())
        .build()
        .unwrap();

    let (_, config) = app.prepare("IrisClassifier").unwrap();
    assert_eq!(config.get("epochs"), Some(&json!(2)));

    let summary = app
        .train("IrisClassifier", Arc::new(RecordingSink::new()))
        .unwrap();
    // 4 lifecycle + 2 epochs + Completed
    assert_eq!(summary.events().len(), 7);
}

#[test]
fn test_non_mapping_run_config_is_rejected() {
    let root = project(
        "bad-run-config",
        &["iris_classifier.rs"],
        &[("ml.yaml", "models:\n  IrisClassifier: 12\n")],
    );
    let app = Application::builder(&root)
        .models(stub_catalog())
        .build()
        .unwrap();
    assert!(matches!(
        app.prepare("IrisClassifier"),
        Err(Error::Instantiation { .. })
    ));
}

#[derive(Default)]
struct TwoRows;

impl DataLoader for TwoRows {
    fn load(&self) -> anyhow::Result<Payload> {
        Ok(json!([[1.0, 2.0, 3.0, 4.0], [5.0, 6.0, 7.0, 8.0]]))
    }
}

/// Reports how many rows its loader produced.
struct RowCounter {
    loader: Arc<BoxedLoader>,
}

impl Trainable for RowCounter {
    fn load_data(&mut self) -> anyhow::Result<Payload> {
        self.loader.load()
    }

    fn transform(&mut self, data: Payload) -> anyhow::Result<Payload> {
        Ok(json!(data.as_array().map_or(0, Vec::len)))
    }

    fn build(&mut self) -> anyhow::Result<Payload> {
        Ok(Value::Null)
    }

    fn fit(&mut self, rows: Payload) -> anyhow::Result<Payload> {
        Ok(json!({"rows": rows}))
    }
}

fn loader_session(name: &str, loader: &str) -> Application {
    let root = project(
        name,
        &["row_counter.rs"],
        &[("data.yaml", &format!("loader: {loader}\n"))],
    );
    let mut resolver = TypeResolver::new();
    resolver.namespace("app.Pipelines", |ns| {
        ns.export_loader::<TwoRows>("TwoRows");
    });
    let mut models = ModelCatalog::new();
    models.register("row_counter", |ns| {
        ns.model("RowCounter", |ctx: ModelContext| {
            let loader = taller::model::data_loader(&ctx.container)?;
            Ok(RowCounter { loader })
        });
    });
    Application::builder(root)
        .resolver(resolver)
        .models(models)
        .build()
        .unwrap()
}

#[test]
fn test_configured_loader_is_injected() {
    let app = loader_session("loader", "app.Pipelines.TwoRows");
    assert!(app.container().has("data_loader"));

    let summary = app
        .train("RowCounter", Arc::new(RecordingSink::new()))
        .unwrap();
    assert_eq!(summary.final_metrics().unwrap()["rows"].as_f64(), Some(2.0));
}

#[test]
fn test_unresolvable_loader_fails_instantiation() {
    let app = loader_session("bad-loader", "app.Pipelines.Nope");
    let Err(err) = app.prepare("RowCounter") else {
        panic!("expected instantiation failure");
    };
    assert!(matches!(err, Error::Instantiation { .. }));
    assert!(err.to_string().contains("app.Pipelines.Nope"));
}

#[test]
fn test_config_is_registered_in_container() {
    let root = project("config-service", &[], &[("app.yaml", "name: Demo\n")]);
    let app = Application::builder(&root).build().unwrap();
    let config = app
        .container()
        .make_as::<taller::config::ConfigStore>("config")
        .unwrap();
    assert_eq!(config.get_str("app.name"), Some("Demo"));
    assert_eq!(app.config().get_str("app.name"), Some("Demo"));
}

#[test]
fn test_malformed_config_file_does_not_block_training() {
    let root = project(
        "malformed-notes",
        &["iris_classifier.rs"],
        &[("notes.yaml", "x: [unclosed\n")],
    );
    let app = Application::builder(&root)
        .models(stub_catalog())
        .build()
        .unwrap();
    let summary = app
        .train("IrisClassifier", Arc::new(RecordingSink::new()))
        .unwrap();
    assert_eq!(summary.status(), Stage::Completed);
}
