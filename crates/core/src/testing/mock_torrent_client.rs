//! Mock torrent client for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::torrent_client::{
    AddTorrentRequest, ClientTorrent, TorrentClient, TorrentClientError, CATEGORY,
};

/// A recorded torrent addition for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedAddTorrent {
    /// The request that was made.
    pub request: AddTorrentRequest,
    /// When the request was made.
    pub timestamp: chrono::DateTime<Utc>,
}

/// A recorded relocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRelocation {
    pub hashes: Vec<String>,
    pub location: String,
}

#[derive(Debug, Clone)]
struct MockTorrent {
    torrent: ClientTorrent,
    category: String,
}

#[derive(Debug, Default)]
struct Failures {
    /// The next call of any kind fails with this error.
    next: Option<TorrentClientError>,
    list: bool,
    /// Number of upcoming adds to reject.
    adds: usize,
    deletes: bool,
    /// Adds succeed but the torrent never shows up in listings.
    hide_added: bool,
}

/// Mock implementation of the TorrentClient trait.
///
/// Keeps an in-memory torrent table. Added torrents are listed under the
/// rename given in the request, so hash discovery works as with a real
/// client.
///
/// # Example
///
/// ```rust,ignore
/// let client = MockTorrentClient::new();
/// client.insert_torrent("abc", "Frieren - Episode 1", "/anime/Frieren").await;
///
/// let hash = client
///     .add_and_resolve_hash(&AddTorrentRequest::magnet(uri).with_rename("Frieren - Episode 2"))
///     .await?;
/// assert_eq!(client.added_torrents().await.len(), 1);
/// ```
#[derive(Debug)]
pub struct MockTorrentClient {
    torrents: Arc<RwLock<Vec<MockTorrent>>>,
    added: Arc<RwLock<Vec<RecordedAddTorrent>>>,
    deleted: Arc<RwLock<Vec<Vec<String>>>>,
    relocated: Arc<RwLock<Vec<RecordedRelocation>>>,
    failures: Arc<RwLock<Failures>>,
    hash_counter: Arc<RwLock<u32>>,
}

impl Default for MockTorrentClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTorrentClient {
    pub fn new() -> Self {
        Self {
            torrents: Arc::new(RwLock::new(Vec::new())),
            added: Arc::new(RwLock::new(Vec::new())),
            deleted: Arc::new(RwLock::new(Vec::new())),
            relocated: Arc::new(RwLock::new(Vec::new())),
            failures: Arc::new(RwLock::new(Failures::default())),
            hash_counter: Arc::new(RwLock::new(0)),
        }
    }

    /// Pre-populate a torrent in this daemon's category.
    pub async fn insert_torrent(&self, hash: &str, name: &str, save_path: &str) {
        self.torrents.write().await.push(MockTorrent {
            torrent: ClientTorrent {
                hash: hash.to_lowercase(),
                name: name.to_string(),
                save_path: save_path.to_string(),
                content_path: String::new(),
            },
            category: CATEGORY.to_string(),
        });
    }

    /// Every torrent regardless of category.
    pub async fn torrents(&self) -> Vec<ClientTorrent> {
        self.torrents
            .read()
            .await
            .iter()
            .map(|t| t.torrent.clone())
            .collect()
    }

    pub async fn has_torrent(&self, hash: &str) -> bool {
        self.torrents.read().await.iter().any(|t| t.torrent.hash == hash)
    }

    pub async fn torrent_count(&self) -> usize {
        self.torrents.read().await.len()
    }

    /// Get all recorded add_torrent calls.
    pub async fn added_torrents(&self) -> Vec<RecordedAddTorrent> {
        self.added.read().await.clone()
    }

    /// Hash lists passed to delete_torrents, one entry per call.
    pub async fn deleted_batches(&self) -> Vec<Vec<String>> {
        self.deleted.read().await.clone()
    }

    pub async fn relocations(&self) -> Vec<RecordedRelocation> {
        self.relocated.read().await.clone()
    }

    /// Clear recorded calls; the torrent table is kept.
    pub async fn clear_recorded(&self) {
        self.added.write().await.clear();
        self.deleted.write().await.clear();
        self.relocated.write().await.clear();
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: TorrentClientError) {
        self.failures.write().await.next = Some(error);
    }

    /// Make every listing fail until cleared.
    pub async fn set_list_failure(&self, fail: bool) {
        self.failures.write().await.list = fail;
    }

    /// Reject the next `count` adds.
    pub async fn fail_next_adds(&self, count: usize) {
        self.failures.write().await.adds = count;
    }

    pub async fn set_delete_failure(&self, fail: bool) {
        self.failures.write().await.deletes = fail;
    }

    /// Accept adds without making them visible in listings.
    pub async fn hide_added_torrents(&self, hide: bool) {
        self.failures.write().await.hide_added = hide;
    }

    async fn take_error(&self) -> Option<TorrentClientError> {
        self.failures.write().await.next.take()
    }

    async fn generate_hash(&self) -> String {
        let mut counter = self.hash_counter.write().await;
        *counter += 1;
        format!("mockhash{:08x}", *counter)
    }

    /// Extract info hash from magnet URI if present.
    fn extract_hash_from_magnet(uri: &str) -> Option<String> {
        uri.split(['?', '&'])
            .find_map(|part| part.strip_prefix("xt=urn:btih:"))
            .filter(|hash| !hash.is_empty())
            .map(str::to_lowercase)
    }
}

#[async_trait]
impl TorrentClient for MockTorrentClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list_torrents(&self, category: &str) -> Result<Vec<ClientTorrent>, TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        if self.failures.read().await.list {
            return Err(TorrentClientError::ConnectionFailed(
                "mock client unreachable".to_string(),
            ));
        }
        Ok(self
            .torrents
            .read()
            .await
            .iter()
            .filter(|t| t.category == category)
            .map(|t| t.torrent.clone())
            .collect())
    }

    async fn add_torrent(&self, request: &AddTorrentRequest) -> Result<(), TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        self.added.write().await.push(RecordedAddTorrent {
            request: request.clone(),
            timestamp: Utc::now(),
        });

        let hide = {
            let mut failures = self.failures.write().await;
            if failures.adds > 0 {
                failures.adds -= 1;
                return Err(TorrentClientError::ApiError(
                    "mock client rejected the torrent".to_string(),
                ));
            }
            failures.hide_added
        };
        if hide {
            return Ok(());
        }

        let hash = match Self::extract_hash_from_magnet(&request.magnet) {
            Some(hash) => hash,
            None => self.generate_hash().await,
        };
        let name = if request.rename.is_empty() {
            format!("Mock Torrent {}", hash)
        } else {
            request.rename.clone()
        };

        let mut torrents = self.torrents.write().await;
        torrents.retain(|t| t.torrent.hash != hash);
        torrents.push(MockTorrent {
            torrent: ClientTorrent {
                hash,
                name,
                save_path: request.save_path.clone(),
                content_path: String::new(),
            },
            category: request.category.clone(),
        });
        Ok(())
    }

    async fn delete_torrents(&self, hashes: &[String]) -> Result<(), TorrentClientError> {
        if hashes.is_empty() {
            return Ok(());
        }
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        if self.failures.read().await.deletes {
            return Err(TorrentClientError::ApiError(
                "mock client refused to delete".to_string(),
            ));
        }
        self.deleted.write().await.push(hashes.to_vec());
        self.torrents
            .write()
            .await
            .retain(|t| !hashes.contains(&t.torrent.hash));
        Ok(())
    }

    async fn relocate(&self, hashes: &[String], location: &str) -> Result<(), TorrentClientError> {
        if hashes.is_empty() {
            return Ok(());
        }
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        self.relocated.write().await.push(RecordedRelocation {
            hashes: hashes.to_vec(),
            location: location.to_string(),
        });
        for torrent in self.torrents.write().await.iter_mut() {
            if hashes.contains(&torrent.torrent.hash) {
                torrent.torrent.save_path = location.to_string();
            }
        }
        Ok(())
    }
}
