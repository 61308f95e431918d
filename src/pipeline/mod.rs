//! Training pipeline
//!
//! A run is a straight line of four stages driven by [`PipelineExecutor`]:
//!
//! ```text
//! load_data() ──▶ transform(data) ──▶ build() ──▶ fit(data)
//!      │                 │               │            │
//!   Loading         Transforming      Building     Fitting ──▶ Completed
//! ```
//!
//! Every transition is reported to a [`ProgressSink`] as a [`StageEvent`].
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use taller::model::{Payload, Trainable};
//! use taller::pipeline::{PipelineExecutor, RecordingSink, Stage};
//!
//! struct Stub;
//!
//! impl Trainable for Stub {
//!     fn load_data(&mut self) -> anyhow::Result<Payload> { Ok(json!({})) }
//!     fn transform(&mut self, data: Payload) -> anyhow::Result<Payload> { Ok(data) }
//!     fn build(&mut self) -> anyhow::Result<Payload> { Ok(json!({})) }
//!     fn fit(&mut self, _data: Payload) -> anyhow::Result<Payload> {
//!         Ok(json!({"epoch": 1, "loss": 0.1}))
//!     }
//! }
//!
//! let sink = Arc::new(RecordingSink::new());
//! let summary = PipelineExecutor::new("Stub").run(Stub, sink.clone()).unwrap();
//! assert_eq!(summary.status(), Stage::Completed);
//! assert_eq!(summary.events().len(), 5);
//! ```

mod event;
mod executor;
mod sink;

pub use event::{metrics_from_json, MetricValue, Metrics, Stage, StageEvent};
pub use executor::{PipelineExecutor, StageError, Summary};
pub use sink::{ChannelSink, NullSink, ProgressSink, RecordingSink, SinkMessage};
