//! Message and status types for the monitor

use std::fmt;

use tokio::sync::oneshot;

use crate::error::{ExtractError, FetchError};
use crate::hysteresis::AlertState;

/// Commands that can be sent to a running monitor worker
#[derive(Debug)]
pub enum MonitorCommand {
    /// Run one cycle immediately, skipping the interval sleep
    CheckNow {
        respond_to: oneshot::Sender<TickOutcome>,
    },

    /// Get the current alert state
    GetState {
        respond_to: oneshot::Sender<AlertState>,
    },

    /// Stop at the next safe point
    Shutdown,
}

/// What a single cycle ended with
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// No url configured yet, nothing fetched
    Unconfigured,

    FetchFailed(FetchError),

    ExtractFailed(ExtractError),

    /// A reading went through the state machine
    Evaluated {
        value: f64,
        state: AlertState,
        fired: bool,
    },

    /// The session was stopped while the fetch was in flight
    Cancelled,

    /// The cycle panicked and was abandoned
    Panicked,
}

/// Result of [`Monitor::start`](super::Monitor::start)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartStatus {
    Started,
    AlreadyRunning,
}

impl fmt::Display for StartStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartStatus::Started => write!(f, "monitoring started"),
            StartStatus::AlreadyRunning => write!(f, "monitoring is already running"),
        }
    }
}

/// Result of [`Monitor::stop`](super::Monitor::stop)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopStatus {
    Stopped,
    AlreadyStopped,
}

impl fmt::Display for StopStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopStatus::Stopped => write!(f, "monitoring stopped"),
            StopStatus::AlreadyStopped => write!(f, "monitoring is already stopped"),
        }
    }
}
