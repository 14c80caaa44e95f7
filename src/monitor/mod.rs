//! Monitoring session control
//!
//! A [`Monitor`] owns at most one session at a time. Starting spawns a
//! background worker on the tokio runtime with a fresh alert state;
//! stopping clears the session's running flag and wakes the worker so it
//! exits at the next safe point.
//!
//! The worker shares nothing with the foreground except the
//! [`ConfigStore`](crate::config::ConfigStore).

pub mod messages;
mod worker;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::ConfigStore;
use crate::extractor::{Extractor, LabelExtractor};
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::hysteresis::AlertState;
use crate::sink::AlertSink;

use self::messages::{MonitorCommand, StartStatus, StopStatus, TickOutcome};
use self::worker::MonitorWorker;

/// Handle on a running worker
struct MonitorSession {
    running: Arc<AtomicBool>,
    sender: mpsc::Sender<MonitorCommand>,
    task: JoinHandle<()>,
}

impl MonitorSession {
    fn is_active(&self) -> bool {
        self.running.load(Ordering::Acquire) && !self.task.is_finished()
    }
}

/// Start/stop surface for background monitoring
pub struct Monitor {
    config: Arc<ConfigStore>,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    sink: Arc<dyn AlertSink>,
    session: Mutex<Option<MonitorSession>>,
}

impl Monitor {
    /// Monitor using plain HTTP fetching and the default voltage label
    pub fn new(config: Arc<ConfigStore>, sink: impl AlertSink + 'static) -> Self {
        Self {
            config,
            fetcher: Arc::new(HttpFetcher::new()),
            extractor: Arc::new(LabelExtractor::default()),
            sink: Arc::new(sink),
            session: Mutex::new(None),
        }
    }

    pub fn with_fetcher(mut self, fetcher: impl Fetcher + 'static) -> Self {
        self.fetcher = Arc::new(fetcher);
        self
    }

    pub fn with_extractor(mut self, extractor: impl Extractor + 'static) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    /// Spawn the background worker unless one is already running
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> StartStatus {
        let mut session = self.session.lock();
        if session.as_ref().is_some_and(MonitorSession::is_active) {
            debug!("start requested while running");
            return StartStatus::AlreadyRunning;
        }

        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let running = Arc::new(AtomicBool::new(true));

        let worker = MonitorWorker::new(
            self.config.clone(),
            self.fetcher.clone(),
            self.extractor.clone(),
            self.sink.clone(),
            cmd_rx,
            running.clone(),
        );

        *session = Some(MonitorSession {
            running,
            sender: cmd_tx,
            task: tokio::spawn(worker.run()),
        });

        info!("monitoring started");
        StartStatus::Started
    }

    /// Signal the worker to exit
    ///
    /// Returns immediately. A fetch already in flight is allowed to finish,
    /// but its result is discarded.
    pub fn stop(&self) -> StopStatus {
        let Some(session) = self.session.lock().take() else {
            debug!("stop requested while stopped");
            return StopStatus::AlreadyStopped;
        };

        let was_active = session.is_active();
        session.running.store(false, Ordering::Release);
        // wakes a sleeping worker; a full queue is fine since the flag is already cleared
        let _ = session.sender.try_send(MonitorCommand::Shutdown);

        if !was_active {
            return StopStatus::AlreadyStopped;
        }

        info!("monitoring stopped");
        StopStatus::Stopped
    }

    pub fn is_running(&self) -> bool {
        self.session
            .lock()
            .as_ref()
            .is_some_and(MonitorSession::is_active)
    }

    fn sender(&self) -> Option<mpsc::Sender<MonitorCommand>> {
        self.session
            .lock()
            .as_ref()
            .filter(|session| session.is_active())
            .map(|session| session.sender.clone())
    }

    /// Run one cycle immediately on the running worker
    pub async fn check_now(&self) -> Result<TickOutcome> {
        let sender = self.sender().context("monitoring is not running")?;

        let (tx, rx) = oneshot::channel();
        sender
            .send(MonitorCommand::CheckNow { respond_to: tx })
            .await
            .context("failed to send CheckNow command")?;

        rx.await.context("failed to receive tick outcome")
    }

    /// Alert state of the running session, `None` when stopped
    pub async fn alert_state(&self) -> Option<AlertState> {
        let sender = self.sender()?;

        let (tx, rx) = oneshot::channel();
        sender
            .send(MonitorCommand::GetState { respond_to: tx })
            .await
            .ok()?;

        rx.await.ok()
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            session.running.store(false, Ordering::Release);
            let _ = session.sender.try_send(MonitorCommand::Shutdown);
        }
    }
}
