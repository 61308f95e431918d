//! Pipeline executor - the four-stage training state machine
//!
//! ```text
//! Idle → Loading → Transforming → Building → Fitting → Completed
//!           │           │             │          │
//!           └───────────┴──────┬──────┴──────────┘
//!                              ▼
//!                            Failed
//! ```
//!
//! Stages run strictly in order on the calling thread. There is no retry and
//! no skip: the first stage error (or panic) ends the run and is reported as a
//! [`StageError`] tagged with that stage.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::{metrics_from_json, Metrics, ProgressSink, RecordingSink, Stage, StageEvent};
use crate::model::Trainable;

/// A pipeline stage failed.
#[derive(Error, Debug)]
#[error("Error during {}: {cause:#}", .stage.operation())]
pub struct StageError {
    stage: Stage,
    cause: anyhow::Error,
}

impl StageError {
    /// Wrap a stage failure.
    #[must_use]
    pub const fn new(stage: Stage, cause: anyhow::Error) -> Self {
        Self { stage, cause }
    }

    /// Stage that was in progress.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Error raised by the trainable unit.
    #[must_use]
    pub const fn cause(&self) -> &anyhow::Error {
        &self.cause
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct Summary {
    model: String,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    events: Vec<StageEvent>,
}

impl Summary {
    /// Name of the trained model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Final stage reached. Always [`Stage::Completed`] for a summary.
    #[must_use]
    pub fn status(&self) -> Stage {
        self.events
            .last()
            .map_or(Stage::Completed, StageEvent::stage)
    }

    /// Every event emitted during the run, lifecycle and unit-emitted, in
    /// emission order.
    #[must_use]
    pub fn events(&self) -> &[StageEvent] {
        &self.events
    }

    /// Events that carry metrics.
    pub fn metric_events(&self) -> impl Iterator<Item = &StageEvent> {
        self.events.iter().filter(|e| !e.metrics().is_empty())
    }

    /// Metrics returned by `fit`, as carried by the `Completed` event.
    #[must_use]
    pub fn final_metrics(&self) -> Option<&Metrics> {
        self.events
            .iter()
            .rev()
            .find(|e| e.stage() == Stage::Completed)
            .map(StageEvent::metrics)
    }

    /// Run start time.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Run end time.
    #[must_use]
    pub const fn ended_at(&self) -> DateTime<Utc> {
        self.ended_at
    }
}

/// Drives a [`Trainable`] through load → transform → build → fit.
#[derive(Debug, Clone)]
pub struct PipelineExecutor {
    model: String,
}

impl PipelineExecutor {
    /// Create an executor for the named model.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }

    /// Run all four stages.
    ///
    /// The unit is consumed: it lives exactly as long as the run. Before
    /// `load_data` the unit receives a tracker through
    /// [`Trainable::set_tracker`]; whatever it emits there is forwarded to
    /// `sink` and recorded in the summary alongside the lifecycle events.
    ///
    /// `build()`'s return value is discarded. The unit keeps whatever it
    /// built for `fit()`.
    ///
    /// # Errors
    ///
    /// Returns a [`StageError`] tagged with the first stage that returned an
    /// error or panicked. Later stages are not invoked.
    pub fn run<T: Trainable>(
        &self,
        mut unit: T,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<Summary, StageError> {
        let recorder = Arc::new(RecordingSink::forwarding(sink));
        let started_at = Utc::now();
        unit.set_tracker(recorder.clone());

        let data = run_stage(&recorder, Stage::Loading, "Loading data...", || {
            unit.load_data()
        })?;
        let data = run_stage(&recorder, Stage::Transforming, "Transforming data...", || {
            unit.transform(data)
        })?;
        run_stage(
            &recorder,
            Stage::Building,
            "Building model architecture...",
            || unit.build(),
        )?;
        let status = format!("Training {}...", self.model);
        let fitted = run_stage(&recorder, Stage::Fitting, &status, || unit.fit(data))?;

        drop(unit);
        let ended_at = Utc::now();
        recorder.update(
            &StageEvent::new(Stage::Completed)
                .with_metrics(metrics_from_json(&fitted))
                .with_timestamp(ended_at),
        );
        recorder.set_status("Training completed");

        Ok(Summary {
            model: self.model.clone(),
            started_at,
            ended_at,
            events: recorder.take_events(),
        })
    }
}

fn run_stage<R>(
    sink: &RecordingSink,
    stage: Stage,
    status: &str,
    call: impl FnOnce() -> anyhow::Result<R>,
) -> Result<R, StageError> {
    sink.update(&StageEvent::new(stage));
    sink.set_status(status);

    let outcome = match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result,
        Err(payload) => Err(anyhow::anyhow!("panicked: {}", panic_message(&*payload))),
    };

    outcome.map_err(|cause| {
        let failed = StageEvent::failed(format!("{cause:#}")).with_metric("stage", stage.to_string());
        sink.update(&failed);
        sink.set_status(&format!("Error during {}", stage.operation()));
        StageError::new(stage, cause)
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
