//! Daemon facade used by the control surface.
//!
//! Bundles the configuration store, ledger, state register and loop
//! supervisor behind the operations the HTTP API exposes.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::{Config, ConfigError, ConfigStore};
use crate::indexer::{NyaaIndexer, SearchError};
use crate::ledger::{EpisodeRecord, FileLedger, LedgerError};
use crate::reconciler::{CycleOutcome, Reconciler};
use crate::state::{StateRegister, StateSnapshot};
use crate::supervisor::Supervisor;
use crate::tracker::{AniListTracker, TrackerError, WatchedSeries};

/// Lower bound on the loop interval, whatever the config file says.
pub const MIN_CHECK_INTERVAL: Duration = Duration::from_secs(60);

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error(transparent)]
    Indexer(#[from] SearchError),

    #[error("Tracker user is not configured")]
    NotConfigured,

    #[error("Daemon is already running")]
    AlreadyRunning,

    #[error("Daemon is not running")]
    NotRunning,
}

/// The running daemon.
pub struct Daemon {
    config_store: Arc<ConfigStore>,
    ledger: Arc<FileLedger>,
    state: Arc<StateRegister>,
    reconciler: Arc<Reconciler>,
    supervisor: Supervisor,
    events: broadcast::Sender<StateSnapshot>,
}

impl Daemon {
    /// Daemon with AniList, Nyaa and qBittorrent, persisting under `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self, DaemonError> {
        let config_store = Arc::new(ConfigStore::in_dir(data_dir));
        let config = config_store.load()?;

        let tracker = Arc::new(AniListTracker::new(config.tracker.clone())?);
        let indexer = Arc::new(NyaaIndexer::new(config.indexer.clone())?);
        let reconciler = Reconciler::new(
            config_store,
            Arc::new(FileLedger::in_dir(data_dir)),
            Arc::new(StateRegister::new()),
            tracker,
            indexer,
        );
        Ok(Self::new(reconciler))
    }

    pub fn new(reconciler: Reconciler) -> Self {
        let config_store = Arc::clone(reconciler.config_store());
        let ledger = Arc::clone(reconciler.ledger());
        let state = Arc::clone(reconciler.state());
        let reconciler = Arc::new(reconciler);

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let sender = events.clone();
        state.set_observer(Arc::new(move |snapshot: &StateSnapshot| {
            // No subscribers is fine.
            let _ = sender.send(snapshot.clone());
        }));

        Self {
            config_store,
            ledger,
            state,
            supervisor: Supervisor::new(Arc::clone(&reconciler)),
            reconciler,
            events,
        }
    }

    pub fn status(&self) -> StateSnapshot {
        self.state.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.supervisor.is_running()
    }

    /// Start a cycle in the background.
    pub fn trigger_check(&self) -> JoinHandle<CycleOutcome> {
        self.supervisor.trigger_check()
    }

    /// Start the periodic loop with the configured interval.
    pub async fn start_loop(&self) -> Result<(), DaemonError> {
        let config = self.config_store.load()?;
        if self.supervisor.start(loop_interval(&config)).await {
            Ok(())
        } else {
            Err(DaemonError::AlreadyRunning)
        }
    }

    pub async fn stop_loop(&self) -> Result<(), DaemonError> {
        if self.supervisor.stop().await {
            Ok(())
        } else {
            Err(DaemonError::NotRunning)
        }
    }

    pub fn config(&self) -> Result<Config, ConfigError> {
        self.config_store.load()
    }

    /// Validate and save; a running loop picks up a changed interval at once.
    pub async fn update_config(&self, config: Config) -> Result<Config, DaemonError> {
        let previous = self.config_store.load()?;
        self.config_store.save(&config)?;
        info!("Configuration updated");

        if self.supervisor.is_running()
            && previous.check_interval_minutes != config.check_interval_minutes
        {
            self.supervisor.reset(loop_interval(&config)).await;
        }
        Ok(config)
    }

    pub async fn list_ledger(&self) -> Result<Vec<EpisodeRecord>, LedgerError> {
        self.ledger.load().await
    }

    /// The configured user's current watch list, straight from the tracker.
    pub async fn watchlist(&self) -> Result<Vec<WatchedSeries>, DaemonError> {
        let config = self.config_store.load()?;
        if config.tracker_user.trim().is_empty() {
            return Err(DaemonError::NotConfigured);
        }
        Ok(self
            .reconciler
            .tracker()
            .fetch_watchlist(&config.tracker_user)
            .await?)
    }

    /// Live feed of state snapshots.
    pub fn subscribe(&self) -> broadcast::Receiver<StateSnapshot> {
        self.events.subscribe()
    }

    /// Stop the loop if it is running.
    pub async fn shutdown(&self) {
        self.supervisor.stop().await;
        self.state.clear_observer();
    }
}

fn loop_interval(config: &Config) -> Duration {
    config.check_interval().max(MIN_CHECK_INTERVAL)
}
