use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use super::record::{parse_line, to_line};
use super::{EpisodeRecord, LedgerError};

pub const LEDGER_FILE_NAME: &str = "downloaded_episodes";

/// Line-oriented episode ledger on disk.
///
/// Every write replaces the file through a temp file and a rename, so a
/// concurrent reader sees either the old or the new content.
#[derive(Debug)]
pub struct FileLedger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Ledger stored as `downloaded_episodes` inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(LEDGER_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every record in file order. A missing file is an empty ledger.
    pub async fn load(&self) -> Result<Vec<EpisodeRecord>, LedgerError> {
        let content = self.read_raw().await?;
        let mut records = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if let Some(record) = parse_line(line).map_err(|reason| LedgerError::Malformed {
                line: index + 1,
                reason,
            })? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Add records after the existing content.
    pub async fn append(&self, records: &[EpisodeRecord]) -> Result<(), LedgerError> {
        if records.is_empty() {
            return Ok(());
        }
        let _guard = self.write_lock.lock().await;

        let mut content = self.read_raw().await?;
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        push_records(&mut content, records)?;
        self.write_atomic(&content).await?;

        debug!(count = records.len(), "Appended ledger records");
        Ok(())
    }

    /// Remove the records with the given ids; returns how many were removed.
    ///
    /// The file is left untouched when nothing matches. Surviving lines are
    /// written back exactly as they were read.
    pub async fn delete(&self, ids: &HashSet<i64>) -> Result<usize, LedgerError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let _guard = self.write_lock.lock().await;

        let content = self.read_raw().await?;
        let (kept, removed) = partition_lines(&content, ids)?;
        if removed == 0 {
            return Ok(0);
        }
        self.write_atomic(&kept).await?;

        debug!(count = removed, "Deleted ledger records");
        Ok(removed)
    }

    /// Append records, first dropping any existing record with the same id.
    pub async fn replace(&self, records: &[EpisodeRecord]) -> Result<(), LedgerError> {
        if records.is_empty() {
            return Ok(());
        }
        let _guard = self.write_lock.lock().await;

        let ids: HashSet<i64> = records.iter().map(|r| r.episode_id).collect();
        let content = self.read_raw().await?;
        let (mut kept, _) = partition_lines(&content, &ids)?;
        push_records(&mut kept, records)?;
        self.write_atomic(&kept).await?;

        debug!(count = records.len(), "Wrote ledger records");
        Ok(())
    }

    async fn read_raw(&self) -> Result<String, LedgerError> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(LedgerError::Io(e)),
        }
    }

    async fn write_atomic(&self, content: &str) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn push_records(content: &mut String, records: &[EpisodeRecord]) -> Result<(), LedgerError> {
    for record in records {
        let line = to_line(record).map_err(|e| LedgerError::Serialize(e.to_string()))?;
        content.push_str(&line);
        content.push('\n');
    }
    Ok(())
}

/// Split raw content into the lines to keep and the number of records dropped.
fn partition_lines(content: &str, ids: &HashSet<i64>) -> Result<(String, usize), LedgerError> {
    let mut kept = String::with_capacity(content.len());
    let mut removed = 0;
    for (index, line) in content.lines().enumerate() {
        let record = parse_line(line).map_err(|reason| LedgerError::Malformed {
            line: index + 1,
            reason,
        })?;
        match record {
            Some(record) if ids.contains(&record.episode_id) => removed += 1,
            Some(_) => {
                kept.push_str(line);
                kept.push('\n');
            }
            None => {}
        }
    }
    Ok((kept, removed))
}
