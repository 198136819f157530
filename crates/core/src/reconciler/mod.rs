//! Reconciliation cycle.
//!
//! One cycle compares the tracker watch list with the ledger and the
//! client's torrents, enqueues missing episodes, evicts watched or orphaned
//! ones, relocates finished series and publishes the result on the
//! [`StateRegister`](crate::state::StateRegister).

mod cancel;
mod cycle;
mod decision;
mod sweep;

use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::ledger::LedgerError;
use crate::torrent_client::TorrentClientError;
use crate::tracker::TrackerError;

pub use cancel::CancellationToken;
pub use cycle::{expected_name, ClientFactory, Reconciler};
pub use decision::{decide_episode, EpisodeDecision, EpisodeFacts};
pub use sweep::remove_empty_dirs;

/// Reasons a cycle stops before touching the ledger or the client.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("Configuration incomplete: tracker user and save path are required")]
    ConfigIncomplete,

    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to fetch watch list: {0}")]
    Tracker(#[from] TrackerError),

    #[error("Failed to reach torrent client: {0}")]
    TorrentClient(#[from] TorrentClientError),

    #[error("Failed to load ledger: {0}")]
    Ledger(#[from] LedgerError),
}

/// Counters for a finished cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub series_checked: usize,
    pub episodes_checked: usize,
    pub enqueued: usize,
    /// Episodes wanted this cycle but not enqueued.
    pub failed: usize,
    pub evicted: usize,
    pub relocated: usize,
}

/// How a cycle ended. Failures are also recorded on the state register.
#[derive(Debug)]
pub enum CycleOutcome {
    Completed(CycleSummary),
    Cancelled,
    Failed(CycleError),
}

impl CycleOutcome {
    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            CycleOutcome::Completed(_) => "completed",
            CycleOutcome::Cancelled => "cancelled",
            CycleOutcome::Failed(_) => "failed",
        }
    }

    pub fn summary(&self) -> Option<&CycleSummary> {
        match self {
            CycleOutcome::Completed(summary) => Some(summary),
            _ => None,
        }
    }
}
