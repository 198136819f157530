use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Broadcast status of a series on the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesStatus {
    Releasing,
    Finished,
    NotYetReleased,
    Cancelled,
    Hiatus,
}

/// One scheduled broadcast of an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiringNode {
    /// Tracker-assigned id, the ledger key.
    pub id: i64,
    pub episode: u32,
    /// Seconds until broadcast; zero or negative once aired.
    pub time_until_airing: i64,
}

impl AiringNode {
    pub fn has_aired(&self) -> bool {
        self.time_until_airing <= 0
    }
}

/// A series the user is currently watching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedSeries {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub romaji_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub english_title: Option<String>,
    /// Episodes the user has marked as watched.
    pub progress: u32,
    pub status: SeriesStatus,
    /// Custom lists the entry belongs to.
    #[serde(default)]
    pub custom_lists: BTreeSet<String>,
    /// Tracker format is a movie.
    #[serde(default)]
    pub is_movie: bool,
    #[serde(default)]
    pub airing: Vec<AiringNode>,
}

impl WatchedSeries {
    /// English title, falling back to romaji.
    pub fn display_title(&self) -> Option<&str> {
        non_empty(&self.english_title).or_else(|| non_empty(&self.romaji_title))
    }

    /// Titles to search the index with: romaji first, then english when it differs.
    pub fn search_titles(&self) -> Vec<&str> {
        let mut titles = Vec::with_capacity(2);
        if let Some(romaji) = non_empty(&self.romaji_title) {
            titles.push(romaji);
        }
        if let Some(english) = non_empty(&self.english_title) {
            if !titles.contains(&english) {
                titles.push(english);
            }
        }
        titles
    }

    pub fn in_custom_list(&self, tag: &str) -> bool {
        !tag.is_empty() && self.custom_lists.contains(tag)
    }

    pub fn is_finished(&self) -> bool {
        self.status == SeriesStatus::Finished
    }
}

fn non_empty(title: &Option<String>) -> Option<&str> {
    title.as_deref().map(str::trim).filter(|t| !t.is_empty())
}

/// Errors that can occur while fetching from the tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Tracker connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Tracker HTTP error: {0}")]
    Http(String),

    #[error("Tracker API error: {0}")]
    Api(String),

    #[error("Failed to parse tracker response: {0}")]
    ParseError(String),

    #[error("Request timeout")]
    Timeout,
}

/// Source of the user's watch list.
#[async_trait]
pub trait Tracker: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Series the user is currently watching or rewatching.
    async fn fetch_watchlist(&self, user: &str) -> Result<Vec<WatchedSeries>, TrackerError>;
}
