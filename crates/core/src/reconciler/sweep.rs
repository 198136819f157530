use std::io;
use std::path::Path;

use tokio::fs;
use tracing::{debug, warn};

/// Remove empty immediate subdirectories of `root`; returns how many went.
///
/// A missing root is not an error. Subdirectories that cannot be read or
/// removed are logged and skipped.
pub async fn remove_empty_dirs(root: &Path) -> io::Result<usize> {
    let mut entries = match fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let dir = entry.path();
        let is_empty = match fs::read_dir(&dir).await {
            Ok(mut children) => children.next_entry().await?.is_none(),
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "Failed to read folder");
                continue;
            }
        };
        if !is_empty {
            continue;
        }
        match fs::remove_dir(&dir).await {
            Ok(()) => {
                debug!(path = %dir.display(), "Deleted empty folder");
                removed += 1;
            }
            Err(e) => warn!(path = %dir.display(), error = %e, "Failed to delete empty folder"),
        }
    }
    Ok(removed)
}
