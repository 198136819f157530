//! Types for torrent client operations.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::parser::strip_special_characters;

/// Category tag carried by every torrent this daemon adds.
pub const CATEGORY: &str = "autoAnimeDownloader";

/// Delay before each lookup of a freshly added torrent.
pub const HASH_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Lookups attempted before giving up on a freshly added torrent.
pub const HASH_POLL_ATTEMPTS: usize = 3;

/// Errors that can occur during torrent client operations.
#[derive(Debug, Error)]
pub enum TorrentClientError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,
}

/// A torrent as listed by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientTorrent {
    /// Info hash (lowercase hex).
    pub hash: String,
    /// Display name; the rename given on add.
    pub name: String,
    #[serde(default)]
    pub save_path: String,
    #[serde(default)]
    pub content_path: String,
}

/// Request to add a torrent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddTorrentRequest {
    pub magnet: String,
    pub save_path: String,
    pub category: String,
    /// Display name the client should show; also used to find the hash afterwards.
    pub rename: String,
}

impl AddTorrentRequest {
    /// Magnet request in this daemon's category.
    pub fn magnet(uri: impl Into<String>) -> Self {
        Self {
            magnet: uri.into(),
            save_path: String::new(),
            category: CATEGORY.to_string(),
            rename: String::new(),
        }
    }

    pub fn with_save_path(mut self, path: impl Into<String>) -> Self {
        self.save_path = path.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_rename(mut self, rename: impl Into<String>) -> Self {
        self.rename = rename.into();
        self
    }
}

/// Trait for torrent client backends.
#[async_trait]
pub trait TorrentClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Torrents in `category`.
    async fn list_torrents(&self, category: &str) -> Result<Vec<ClientTorrent>, TorrentClientError>;

    /// Queue a torrent.
    async fn add_torrent(&self, request: &AddTorrentRequest) -> Result<(), TorrentClientError>;

    /// Remove torrents together with their files. An empty list is a no-op.
    async fn delete_torrents(&self, hashes: &[String]) -> Result<(), TorrentClientError>;

    /// Move torrents to another directory. An empty list is a no-op.
    async fn relocate(&self, hashes: &[String], location: &str) -> Result<(), TorrentClientError>;

    /// Add a torrent and look up the hash the client assigned to it.
    ///
    /// Returns `Ok(None)` when the add succeeded but no listed torrent
    /// carries the rename token after a few polls.
    async fn add_and_resolve_hash(
        &self,
        request: &AddTorrentRequest,
    ) -> Result<Option<String>, TorrentClientError> {
        self.add_torrent(request).await?;

        for attempt in 1..=HASH_POLL_ATTEMPTS {
            tokio::time::sleep(HASH_POLL_INTERVAL).await;
            let torrents = self.list_torrents(&request.category).await?;
            if let Some(hash) = find_hash(&torrents, &request.rename) {
                return Ok(Some(hash));
            }
            debug!(rename = %request.rename, attempt, "Added torrent not listed yet");
        }
        Ok(None)
    }
}

/// Hash of the torrent named `rename`.
///
/// An exact name wins. Otherwise the shortest name containing `rename`, so
/// `X - Episode 1` never resolves to an existing `X - Episode 12`. The same
/// two steps are then repeated with punctuation stripped.
pub fn find_hash(torrents: &[ClientTorrent], rename: &str) -> Option<String> {
    if rename.is_empty() {
        return None;
    }
    if let Some(hash) = best_match(torrents.iter().map(|t| (t, t.name.clone())), rename) {
        return Some(hash);
    }
    let stripped = strip_special_characters(rename);
    if stripped.is_empty() {
        return None;
    }
    best_match(
        torrents
            .iter()
            .map(|t| (t, strip_special_characters(&t.name))),
        &stripped,
    )
}

fn best_match<'a>(
    names: impl Iterator<Item = (&'a ClientTorrent, String)>,
    token: &str,
) -> Option<String> {
    names
        .filter(|(_, name)| name.contains(token))
        .min_by_key(|(_, name)| (name != token, name.len()))
        .map(|(t, _)| t.hash.clone())
}

static FOLDER_SEASON_MARKERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+(?:season\s*\d+|s\s*\d+|\d+(?:st|nd|rd|th)\s+season|cour\s*\d+)")
        .expect("built-in pattern must compile")
});

/// Folder name for a series: no path-hostile characters and no season
/// marker, so sequels land next to earlier seasons.
pub fn sanitize_folder_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !matches!(c, ':' | '<' | '>' | '|' | '?' | '*' | '"' | '\\' | '/'))
        .collect();
    let cleaned = FOLDER_SEASON_MARKERS.replace_all(&cleaned, "");
    cleaned.trim().replace("  ", " ")
}

/// `root/<sanitized title>` as a string for the client API.
pub fn series_save_path(root: &str, title: &str) -> String {
    Path::new(root)
        .join(sanitize_folder_name(title))
        .to_string_lossy()
        .into_owned()
}
