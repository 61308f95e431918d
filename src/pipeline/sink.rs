//! Progress sinks - consumers of stage events
//!
//! The executor emits synchronously and expects every call to return
//! promptly. Renderers that need time do their work elsewhere
//! ([`ChannelSink`] hands events to a separate task).

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;

use super::StageEvent;

/// Receiver of stage-transition and metric events.
pub trait ProgressSink: Send + Sync {
    /// Record a stage event.
    fn update(&self, event: &StageEvent);

    /// Replace the human-readable status line.
    fn set_status(&self, text: &str);
}

impl<S: ProgressSink + ?Sized> ProgressSink for Arc<S> {
    fn update(&self, event: &StageEvent) {
        (**self).update(event);
    }

    fn set_status(&self, text: &str) {
        (**self).set_status(text);
    }
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn update(&self, _event: &StageEvent) {}

    fn set_status(&self, _text: &str) {}
}

/// In-memory sink keeping every event and status line in emission order.
///
/// Optionally forwards to an inner sink, which is how the executor builds its
/// run summary while still feeding the caller's renderer.
#[derive(Default)]
pub struct RecordingSink {
    inner: Option<Arc<dyn ProgressSink>>,
    events: Mutex<Vec<StageEvent>>,
    statuses: Mutex<Vec<String>>,
}

impl RecordingSink {
    /// Create a standalone recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a recorder that forwards every call to `inner` after recording.
    #[must_use]
    pub fn forwarding(inner: Arc<dyn ProgressSink>) -> Self {
        Self {
            inner: Some(inner),
            ..Self::default()
        }
    }

    /// Snapshot of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<StageEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drain the recorded events.
    #[must_use]
    pub fn take_events(&self) -> Vec<StageEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Snapshot of the status lines.
    #[must_use]
    pub fn statuses(&self) -> Vec<String> {
        self.statuses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ProgressSink for RecordingSink {
    fn update(&self, event: &StageEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        if let Some(inner) = &self.inner {
            inner.update(event);
        }
    }

    fn set_status(&self, text: &str) {
        self.statuses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_string());
        if let Some(inner) = &self.inner {
            inner.set_status(text);
        }
    }
}

/// Message carried by a [`ChannelSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkMessage {
    /// A stage event
    Event(StageEvent),
    /// A status line
    Status(String),
}

/// Fire-and-forget sink backed by an unbounded channel.
///
/// Sends never block. Once the receiver is dropped, messages are discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SinkMessage>,
}

impl ChannelSink {
    /// Create a sink and the receiver a renderer drains.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SinkMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn update(&self, event: &StageEvent) {
        let _ = self.tx.send(SinkMessage::Event(event.clone()));
    }

    fn set_status(&self, text: &str) {
        let _ = self.tx.send(SinkMessage::Status(text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Stage;

    #[test]
    fn test_recording_sink_keeps_order() {
        let sink = RecordingSink::new();
        sink.update(&StageEvent::new(Stage::Loading));
        sink.set_status("Loading data...");
        sink.update(&StageEvent::new(Stage::Transforming));

        let stages: Vec<_> = sink.events().iter().map(StageEvent::stage).collect();
        assert_eq!(stages, [Stage::Loading, Stage::Transforming]);
        assert_eq!(sink.statuses(), ["Loading data..."]);
    }

    #[test]
    fn test_recording_sink_forwards() {
        let inner = Arc::new(RecordingSink::new());
        let outer = RecordingSink::forwarding(inner.clone());
        outer.update(&StageEvent::new(Stage::Building));
        outer.set_status("Building");

        assert_eq!(inner.events().len(), 1);
        assert_eq!(inner.statuses(), ["Building"]);
    }

    #[test]
    fn test_take_events_drains() {
        let sink = RecordingSink::new();
        sink.update(&StageEvent::new(Stage::Loading));
        assert_eq!(sink.take_events().len(), 1);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelSink::channel();
        sink.set_status("go");
        sink.update(&StageEvent::new(Stage::Loading));

        assert_eq!(rx.try_recv().unwrap(), SinkMessage::Status("go".into()));
        let SinkMessage::Event(event) = rx.try_recv().unwrap() else {
            panic!("expected event");
        };
        assert_eq!(event.stage(), Stage::Loading);
    }

    #[test]
    fn test_channel_sink_ignores_closed_receiver() {
        let (sink, rx) = ChannelSink::channel();
        drop(rx);
        sink.update(&StageEvent::new(Stage::Loading));
        sink.set_status("still fine");
    }
}
