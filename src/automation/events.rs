use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// Outbound automation notifications. Used for UI feedback only; nothing in
/// the crate branches on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AutomationEvent {
    BackendConnected,
    BackendDisconnected,
    ScreenChanged {
        package_name: String,
        activity_name: String,
    },
    ElementFound {
        selector: String,
        count: usize,
    },
    ActionCompleted {
        action: String,
        success: bool,
    },
    WorkflowFinished {
        success: bool,
        steps_executed: usize,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AutomationEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AutomationEvent> {
        self.tx.subscribe()
    }

    /// Publishes to current subscribers. Having none is not an error.
    pub fn emit(&self, event: AutomationEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Mirrors every event into the log until the bus closes.
pub async fn log_events(mut rx: broadcast::Receiver<AutomationEvent>) {
    loop {
        match rx.recv().await {
            Ok(AutomationEvent::Error { message }) => {
                tracing::warn!(message = %message, "automation error event");
            }
            Ok(event) => tracing::debug!(?event, "automation event"),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event logger lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
