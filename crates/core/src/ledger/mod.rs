//! Durable record of downloaded episodes.
//!
//! One record per line, read whole and rewritten whole. Only the reconciler
//! writes; the control surface reads.

mod file;
mod record;

use thiserror::Error;

pub use file::{FileLedger, LEDGER_FILE_NAME};
pub use record::{parse_line, to_line, EpisodeRecord};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed ledger line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("Failed to serialize ledger record: {0}")]
    Serialize(String),
}
