//! Console training dashboard
//!
//! Drains a [`ChannelSink`](crate::pipeline::ChannelSink) receiver on its own
//! task and prints status changes and a metrics row per epoch. The pipeline
//! never waits on it.

use std::fmt::Write as _;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::model::RunConfig;
use crate::pipeline::{MetricValue, Metrics, SinkMessage, Stage, StageEvent};

/// Renders training progress as plain console lines.
#[derive(Debug, Clone)]
pub struct Dashboard {
    model: String,
    total_epochs: Option<u64>,
    history: Vec<Metrics>,
}

impl Dashboard {
    /// Create a dashboard for `model`; `epochs` from its run config drives the
    /// progress counter.
    #[must_use]
    pub fn new(model: impl Into<String>, config: &RunConfig) -> Self {
        Self {
            model: model.into(),
            total_epochs: config.get("epochs").and_then(serde_json::Value::as_u64),
            history: Vec::new(),
        }
    }

    /// Header line.
    #[must_use]
    pub fn header(&self, config: &RunConfig) -> String {
        format!(
            "Training {} with config: {}",
            self.model,
            serde_json::Value::Object(config.clone())
        )
    }

    /// Metric rows received so far.
    #[must_use]
    pub fn history(&self) -> &[Metrics] {
        &self.history
    }

    /// Turn one message into the line to print, if any.
    pub fn handle(&mut self, message: &SinkMessage) -> Option<String> {
        match message {
            SinkMessage::Status(text) => Some(format!("» {text}")),
            SinkMessage::Event(event) => self.handle_event(event),
        }
    }

    fn handle_event(&mut self, event: &StageEvent) -> Option<String> {
        match event.stage() {
            Stage::Failed => Some(format!("✗ {}", event.cause().unwrap_or("unknown error"))),
            Stage::Fitting if !event.metrics().is_empty() => {
                self.history.push(event.metrics().clone());
                Some(self.row(self.history.len() - 1))
            }
            _ => None,
        }
    }

    fn row(&self, index: usize) -> String {
        let metrics = &self.history[index];
        let epoch = metrics
            .get("epoch")
            .map_or_else(|| (index + 1).to_string(), ToString::to_string);
        let loss = format_metric(metrics.get("loss"));
        let accuracy = format_metric(metrics.get("accuracy").or_else(|| metrics.get("acc")));

        let mut line = format!("{epoch:>6} │ {loss:>10} │ {accuracy:>10}");
        if let (Some(total), Some(done)) = (
            self.total_epochs,
            metrics.get("epoch").and_then(MetricValue::as_f64),
        ) {
            #[allow(clippy::cast_precision_loss)]
            let pct = done / total.max(1) as f64 * 100.0;
            let _ = write!(line, "   [{done}/{total} {pct:>3.0}%]");
        }
        line
    }

    /// Full metrics table.
    #[must_use]
    pub fn table(&self) -> String {
        let mut out = format!("{:>6} │ {:>10} │ {:>10}\n", "Epoch", "Loss", "Accuracy");
        for index in 0..self.history.len() {
            out.push_str(&self.row(index));
            out.push('\n');
        }
        out
    }

    /// Print every message until all senders are dropped.
    pub async fn run(mut self, mut rx: UnboundedReceiver<SinkMessage>) -> Self {
        while let Some(message) = rx.recv().await {
            if let Some(line) = self.handle(&message) {
                println!("{line}");
            }
        }
        self
    }
}

fn format_metric(value: Option<&MetricValue>) -> String {
    match value {
        Some(MetricValue::Number(n)) => format!("{n:.4}"),
        Some(MetricValue::Text(s)) => s.clone(),
        None => "N/A".to_string(),
    }
}
