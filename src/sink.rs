//! Delivery of fired alerts to whoever presents them

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, trace, warn};

/// Emitted once per Armed → Alerted transition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvent {
    /// The reading that crossed the threshold
    pub value: f64,

    /// Threshold in effect for that tick
    pub threshold: f64,

    /// Page the reading came from
    pub url: String,

    /// When the reading was evaluated
    pub timestamp: DateTime<Utc>,
}

/// Receiver of alert events
///
/// Called from the monitoring task. Implementations must hand the event off
/// without blocking; marshalling onto another thread is their business.
pub trait AlertSink: Send + Sync {
    fn deliver(&self, event: AlertEvent);
}

impl AlertSink for broadcast::Sender<AlertEvent> {
    fn deliver(&self, event: AlertEvent) {
        match self.send(event) {
            Ok(num_receivers) => trace!("published alert event to {num_receivers} receivers"),
            Err(_) => warn!("no receivers for alert event"),
        }
    }
}

impl AlertSink for mpsc::UnboundedSender<AlertEvent> {
    fn deliver(&self, event: AlertEvent) {
        if self.send(event).is_err() {
            warn!("alert receiver dropped");
        }
    }
}

/// Sink that only writes alerts to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl AlertSink for LogSink {
    fn deliver(&self, event: AlertEvent) {
        info!(
            "voltage alert: {} (threshold {}) at {}",
            event.value, event.threshold, event.url
        );
    }
}
