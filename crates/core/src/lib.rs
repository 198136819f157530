pub mod config;
pub mod daemon;
pub mod indexer;
pub mod ledger;
pub mod metrics;
pub mod parser;
pub mod ranker;
pub mod reconciler;
pub mod state;
pub mod supervisor;
pub mod testing;
pub mod torrent_client;
pub mod tracker;

pub use config::{
    default_data_dir, load_config, load_config_from_str, validate_config, Config, ConfigError,
    ConfigStore, SanitizedConfig,
};
pub use daemon::{Daemon, DaemonError};
pub use ledger::{EpisodeRecord, FileLedger, LedgerError};
pub use parser::ParsedTitle;
pub use reconciler::{CancellationToken, CycleError, CycleOutcome, CycleSummary, Reconciler};
pub use state::{DaemonStatus, StateRegister, StateSnapshot};
pub use supervisor::Supervisor;
