//! Types for the torrent index.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parser::ParsedTitle;

/// A torrent listed by an index, with its name already parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentCandidate {
    /// Release name as published.
    pub name: String,
    /// Magnet URI (or download link when the index gave no info hash).
    pub magnet: String,
    pub seeders: u32,
    /// Size in bytes, 0 when unknown.
    pub size_bytes: u64,
    /// When the entry was published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
    pub parsed: ParsedTitle,
}

impl TorrentCandidate {
    pub fn new(
        name: impl Into<String>,
        magnet: impl Into<String>,
        seeders: u32,
        size_bytes: u64,
    ) -> Self {
        let name = name.into();
        let parsed = ParsedTitle::parse(&name);
        Self {
            name,
            magnet: magnet.into(),
            seeders,
            size_bytes,
            published: None,
            parsed,
        }
    }

    pub fn with_published(mut self, published: DateTime<Utc>) -> Self {
        self.published = Some(published);
        self
    }
}

/// Errors that can occur while querying an index.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Index connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Index API error: {0}")]
    ApiError(String),

    #[error("Failed to parse index response: {0}")]
    ParseError(String),

    #[error("Request timeout")]
    Timeout,
}

/// A torrent index.
///
/// Every operation returns candidates already filtered and ranked, best
/// first. An empty list means nothing matched.
#[async_trait]
pub trait Indexer: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Single episode of a series.
    async fn search_episode(
        &self,
        title: &str,
        episode: u32,
    ) -> Result<Vec<TorrentCandidate>, SearchError>;

    /// Several episodes of a series with one query.
    async fn search_multiple(
        &self,
        title: &str,
        episodes: &[u32],
    ) -> Result<Vec<TorrentCandidate>, SearchError>;

    /// Standalone works; `is_format_movie` is the tracker's own classification.
    async fn search_movie(
        &self,
        title: &str,
        is_format_movie: bool,
    ) -> Result<Vec<TorrentCandidate>, SearchError>;

    /// Season packs.
    async fn search_batch(
        &self,
        title: &str,
        season: Option<u32>,
    ) -> Result<Vec<TorrentCandidate>, SearchError>;
}
