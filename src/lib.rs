//! # Taller: Convention-Driven ML Projects
//!
//! **Version**: 0.1.0
//!
//! Taller turns a directory layout into a training workflow. A model named
//! `IrisClassifier` lives in `app/Models/iris_classifier.rs`, its constructor
//! arguments live under `ml.models.IrisClassifier` in `config/*.yaml`, and
//! `taller train IrisClassifier` drives it through four stages:
//!
//! ```text
//! load_data() → transform(data) → build() → fit(data)
//!   Loading      Transforming      Building    Fitting   → Completed
//! ```
//!
//! ## Design Principles
//!
//! - **Convention over configuration**: identifiers map to file paths by
//!   [`naming::canonicalize`]
//! - **Explicit context**: one [`container::Container`] per session, no globals
//! - **Failure attribution**: every error names the stage that raised it
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::{json, Value};
//! use taller::model::Trainable;
//! use taller::pipeline::{PipelineExecutor, RecordingSink, Stage};
//!
//! struct Stub;
//!
//! impl Trainable for Stub {
//!     fn load_data(&mut self) -> anyhow::Result<Value> { Ok(json!({})) }
//!     fn transform(&mut self, _: Value) -> anyhow::Result<Value> { Ok(json!({})) }
//!     fn build(&mut self) -> anyhow::Result<Value> { Ok(json!({})) }
//!     fn fit(&mut self, _: Value) -> anyhow::Result<Value> {
//!         Ok(json!({"epoch": 1, "loss": 0.1}))
//!     }
//! }
//!
//! let summary = PipelineExecutor::new("Stub").run(Stub, Arc::new(RecordingSink::new()))?;
//! assert_eq!(summary.status(), Stage::Completed);
//! # Ok::<(), taller::pipeline::StageError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod app;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod container;
pub mod dashboard;
pub mod demo;
pub mod error;
pub mod model;
pub mod naming;
pub mod pipeline;
pub mod resolver;
pub mod scaffold;

pub use app::{Application, ApplicationBuilder};
pub use error::{Error, Result};
