//! MonitorWorker - Samples the status page on a schedule
//!
//! ## Message Flow
//!
//! ```text
//! Snapshot config → Sleep interval → Fetch → Extract → Evaluate → AlertSink
//!                        ↑
//!                        └─── Commands (CheckNow, GetState, Shutdown)
//! ```
//!
//! Errors from a single cycle are logged and never end the worker. Only a
//! cleared running flag or a Shutdown command does.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::config::{Config, ConfigStore};
use crate::extractor::Extractor;
use crate::fetcher::Fetcher;
use crate::hysteresis::AlertState;
use crate::sink::{AlertEvent, AlertSink};

use super::messages::{MonitorCommand, TickOutcome};

/// Background task owned by a single monitoring session
pub(crate) struct MonitorWorker {
    config: Arc<ConfigStore>,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    sink: Arc<dyn AlertSink>,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<MonitorCommand>,

    /// Cleared by the session on stop
    running: Arc<AtomicBool>,

    /// Fresh for every session
    state: AlertState,
}

impl MonitorWorker {
    pub(crate) fn new(
        config: Arc<ConfigStore>,
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn Extractor>,
        sink: Arc<dyn AlertSink>,
        command_rx: mpsc::Receiver<MonitorCommand>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            config,
            fetcher,
            extractor,
            sink,
            command_rx,
            running,
            state: AlertState::Armed,
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run the worker's main loop
    ///
    /// This runs until:
    /// - The running flag is cleared
    /// - A Shutdown command is received
    /// - The command channel is closed
    #[instrument(skip(self))]
    pub(crate) async fn run(mut self) {
        debug!("starting monitor worker");

        while self.is_running() {
            // interval and threshold for this tick are fixed here
            let snapshot = self.config.get();
            trace!("next check in {}s", snapshot.interval);

            if !self.wait_interval(&snapshot).await || !self.is_running() {
                break;
            }

            let outcome = self.guarded_tick(&snapshot).await;
            debug!("tick finished: {outcome:?}");
        }

        debug!("monitor worker stopped");
    }

    /// Sleep for the configured interval while answering commands
    ///
    /// Returns false when the worker should exit.
    async fn wait_interval(&mut self, snapshot: &Config) -> bool {
        let sleep = tokio::time::sleep(snapshot.interval_duration());
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return true,

                cmd = self.command_rx.recv() => match cmd {
                    Some(MonitorCommand::CheckNow { respond_to }) => {
                        debug!("received CheckNow command");
                        let current = self.config.get();
                        let outcome = self.guarded_tick(&current).await;
                        let _ = respond_to.send(outcome);
                    }

                    Some(MonitorCommand::GetState { respond_to }) => {
                        let _ = respond_to.send(self.state);
                    }

                    Some(MonitorCommand::Shutdown) => {
                        debug!("received shutdown command");
                        return false;
                    }

                    None => {
                        warn!("command channel closed, shutting down");
                        return false;
                    }
                }
            }
        }
    }

    /// Run one cycle, turning a panic into an abandoned tick
    async fn guarded_tick(&mut self, config: &Config) -> TickOutcome {
        match AssertUnwindSafe(self.tick(config)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(_) => {
                error!("monitoring cycle panicked, skipping tick");
                TickOutcome::Panicked
            }
        }
    }

    #[instrument(skip_all, fields(url = %config.url))]
    async fn tick(&mut self, config: &Config) -> TickOutcome {
        if !config.has_url() {
            debug!("no url configured, skipping");
            return TickOutcome::Unconfigured;
        }

        let body = match self
            .fetcher
            .fetch(&config.url, config.timeout_duration())
            .await
        {
            Ok(body) => body,
            Err(e) => {
                warn!("fetch failed: {e}");
                return TickOutcome::FetchFailed(e);
            }
        };

        if !self.is_running() {
            debug!("stopped during fetch, dropping result");
            return TickOutcome::Cancelled;
        }

        let reading = match self.extractor.extract(&body) {
            Ok(reading) => reading,
            Err(e) => {
                warn!("could not extract reading: {e}");
                return TickOutcome::ExtractFailed(e);
            }
        };

        let previous = self.state;
        let evaluation = previous.evaluate(reading.value, config.threshold);
        self.state = evaluation.state;

        trace!(
            "reading {} (threshold: {}) -> {:?} => {:?}",
            reading.value, config.threshold, previous, evaluation.state
        );

        if evaluation.fire {
            info!(
                "reading {} dropped to threshold {}, raising alert",
                reading.value, config.threshold
            );
            self.sink.deliver(AlertEvent {
                value: reading.value,
                threshold: config.threshold,
                url: config.url.clone(),
                timestamp: Utc::now(),
            });
        } else if previous == AlertState::Alerted && evaluation.state == AlertState::Armed {
            info!("reading {} recovered, alert re-armed", reading.value);
        }

        TickOutcome::Evaluated {
            value: reading.value,
            state: evaluation.state,
            fired: evaluation.fire,
        }
    }
}
