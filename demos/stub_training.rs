//! Stub Training: the four-stage pipeline end to end
//!
//! A model whose stages return `{}` and whose `fit` returns
//! `{"epoch": 1, "loss": 0.1}` produces exactly five events:
//! Loading, Transforming, Building, Fitting, Completed.
//!
//! Run with: cargo run --example stub_training

use std::sync::Arc;

use serde_json::json;
use taller::model::{Payload, Trainable};
use taller::pipeline::{PipelineExecutor, RecordingSink};

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

fn main() -> anyhow::Result<()> {
    println!("=== Taller Stub Training ===\n");

    let sink = Arc::new(RecordingSink::new());
    let summary = PipelineExecutor::new("Stub").run(Stub, sink.clone())?;

    println!("Events:");
    for (i, event) in summary.events().iter().enumerate() {
        let metrics: Vec<String> = event
            .metrics()
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        println!("  {}. {:<12} {}", i + 1, event.stage(), metrics.join(" "));
    }

    println!("\nStatus lines:");
    for status in sink.statuses() {
        println!("  {status}");
    }

    println!("\nFinal status: {}", summary.status());
    println!(
        "Elapsed: {} µs",
        (summary.ended_at() - summary.started_at()).num_microseconds().unwrap_or(0)
    );
    Ok(())
}
