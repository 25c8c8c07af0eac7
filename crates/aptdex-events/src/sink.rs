use std::sync::{
    mpsc::{self, Receiver, Sender},
    Mutex,
};

use tracing::{debug, trace};

use crate::{IndexEvent, IndexStage};

/// Trait for consuming events.
///
/// Each frontend provides its own implementation.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: IndexEvent);
}

/// Channel-based event sink.
///
/// The receiver end can be drained by any consumer (session task, CLI, test).
pub struct ChannelSink {
    sender: Sender<IndexEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, Receiver<IndexEvent>) {
        let (sender, receiver) = mpsc::channel();
        (
            Self {
                sender,
            },
            receiver,
        )
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: IndexEvent) {
        let _ = self.sender.send(event);
    }
}

/// No-op event sink for headless operation.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: IndexEvent) {}
}

/// Sink that turns events into log lines, for frontends without a display.
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: IndexEvent) {
        match event {
            IndexEvent::IndexStarted {
                repository,
            } => debug!(repository = %repository, "indexing"),
            IndexEvent::CandidateAttempt {
                url, ..
            } => trace!(url = %url, "fetching candidate"),
            IndexEvent::CandidateFailed {
                url,
                reason,
                ..
            } => debug!(url = %url, "candidate failed: {reason}"),
            IndexEvent::CandidateSkipped {
                url, ..
            } => trace!(url = %url, "candidate skipped"),
            IndexEvent::DocumentResolved {
                url,
                compressed,
                decoded,
                ..
            } => debug!(url = %url, compressed, decoded, "document resolved"),
            IndexEvent::Progress {
                repository,
                stage: IndexStage::Rejected {
                    reason,
                },
            } => debug!(repository = %repository, "rejected: {reason}"),
            IndexEvent::Progress {
                repository,
                stage,
            } => trace!(repository = %repository, "{stage:?}"),
        }
    }
}

/// Collector sink that stores all events for inspection.
#[derive(Default)]
pub struct CollectorSink {
    events: Mutex<Vec<IndexEvent>>,
}

impl CollectorSink {
    pub fn events(&self) -> Vec<IndexEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for CollectorSink {
    fn emit(&self, event: IndexEvent) {
        self.events.lock().unwrap().push(event);
    }
}
