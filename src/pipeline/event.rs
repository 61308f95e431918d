//! Stage events - progress and telemetry records

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pipeline stage an event is tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// `load_data()` in progress
    Loading,
    /// `transform()` in progress
    Transforming,
    /// `build()` in progress
    Building,
    /// `fit()` in progress
    Fitting,
    /// All four stages succeeded
    Completed,
    /// A stage failed; the run stopped
    Failed,
}

impl Stage {
    /// The four working stages in execution order.
    pub const WORKING: [Self; 4] = [
        Self::Loading,
        Self::Transforming,
        Self::Building,
        Self::Fitting,
    ];

    /// Name of the `Trainable` method this stage invokes.
    #[must_use]
    pub const fn operation(self) -> &'static str {
        match self {
            Self::Loading => "load_data",
            Self::Transforming => "transform",
            Self::Building => "build",
            Self::Fitting => "fit",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether the run is over once this stage is reached.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Loading => "Loading",
            Self::Transforming => "Transforming",
            Self::Building => "Building",
            Self::Fitting => "Fitting",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        };
        f.pad(name)
    }
}

/// A single metric value: numeric or free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// Numeric metric (loss, accuracy, epoch, ...)
    Number(f64),
    /// Textual metric (phase names, checkpoint paths, ...)
    Text(String),
}

impl MetricValue {
    /// Numeric view of the value, if it is a number.
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    /// Convert a JSON scalar. Arrays, objects and null have no metric form.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_f64().map(Self::Number),
            serde_json::Value::String(s) => Some(Self::Text(s.clone())),
            serde_json::Value::Bool(b) => Some(Self::Text(b.to_string())),
            _ => None,
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<u32> for MetricValue {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for MetricValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Metric name → value, ordered by name.
pub type Metrics = BTreeMap<String, MetricValue>;

/// Collect the scalar entries of a JSON object into [`Metrics`].
///
/// Non-objects yield an empty map; nested values are skipped.
#[must_use]
pub fn metrics_from_json(value: &serde_json::Value) -> Metrics {
    value
        .as_object()
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| MetricValue::from_json(v).map(|m| (k.clone(), m)))
                .collect()
        })
        .unwrap_or_default()
}

/// Progress/telemetry record tagged with a pipeline stage.
///
/// Produced by the executor at every transition, or by a trainable unit
/// during `fit` (per-epoch metrics).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEvent {
    stage: Stage,
    metrics: Metrics,
    cause: Option<String>,
    timestamp: DateTime<Utc>,
}

impl StageEvent {
    /// Create an event for `stage` with no metrics, stamped now.
    #[must_use]
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            metrics: Metrics::new(),
            cause: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a `Failed` event carrying the error message.
    #[must_use]
    pub fn failed(cause: impl Into<String>) -> Self {
        Self {
            cause: Some(cause.into()),
            ..Self::new(Stage::Failed)
        }
    }

    /// Create a `Fitting` event carrying metrics (the usual per-epoch report).
    #[must_use]
    pub fn fitting_metrics(metrics: Metrics) -> Self {
        Self::new(Stage::Fitting).with_metrics(metrics)
    }

    /// Replace the metrics.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Add one metric.
    #[must_use]
    pub fn with_metric(mut self, key: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        self.metrics.insert(key.into(), value.into());
        self
    }

    /// Set a custom timestamp.
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Stage tag.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Metrics (empty for plain transitions).
    #[must_use]
    pub const fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Single metric by name.
    #[must_use]
    pub fn metric(&self, key: &str) -> Option<&MetricValue> {
        self.metrics.get(key)
    }

    /// Failure cause, set only on `Failed` events.
    #[must_use]
    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }

    /// When the event was produced.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
