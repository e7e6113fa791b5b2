//! Progress events streamed to the caller.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, trace, warn};

/// One progress event: `status` is false for failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub status: bool,
    pub message: String,
}

impl ProgressEvent {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: false,
            message: message.into(),
        }
    }
}

/// Sends events to an optional channel and mirrors them to the log.
/// Consecutive identical events are sent once.
pub struct ProgressReporter {
    tx: Option<mpsc::Sender<ProgressEvent>>,
    last: Option<ProgressEvent>,
}

impl ProgressReporter {
    pub fn new(tx: Option<mpsc::Sender<ProgressEvent>>) -> Self {
        Self { tx, last: None }
    }

    /// A run milestone or summary.
    pub async fn step(&mut self, message: impl Into<String>) {
        let event = ProgressEvent::ok(message);
        info!("{}", event.message);
        self.send(event).await;
    }

    /// Per-row progress.
    pub async fn row(&mut self, message: impl Into<String>) {
        let event = ProgressEvent::ok(message);
        trace!("{}", event.message);
        self.send(event).await;
    }

    /// A row failure, retry notice or fatal error.
    pub async fn failure(&mut self, message: impl Into<String>) {
        let event = ProgressEvent::failure(message);
        warn!("{}", event.message);
        self.send(event).await;
    }

    async fn send(&mut self, event: ProgressEvent) {
        if self.last.as_ref() == Some(&event) {
            return;
        }
        if let Some(tx) = &self.tx {
            // A dropped receiver only means nobody is watching.
            let _ = tx.send(event.clone()).await;
        }
        self.last = Some(event);
    }
}
