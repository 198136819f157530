//! Mock watch-list tracker for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::tracker::{Tracker, TrackerError, WatchedSeries};

/// Mock implementation of the Tracker trait.
///
/// Returns a configurable watch list and records the users asked for.
#[derive(Debug, Default)]
pub struct MockTracker {
    watchlist: Arc<RwLock<Vec<WatchedSeries>>>,
    requests: Arc<RwLock<Vec<String>>>,
    /// If set, the next fetch will fail with this error.
    next_error: Arc<RwLock<Option<TrackerError>>>,
    /// Fail every fetch until cleared.
    unavailable: Arc<RwLock<bool>>,
}

impl MockTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_watchlist(watchlist: Vec<WatchedSeries>) -> Self {
        Self {
            watchlist: Arc::new(RwLock::new(watchlist)),
            ..Self::default()
        }
    }

    pub async fn set_watchlist(&self, watchlist: Vec<WatchedSeries>) {
        *self.watchlist.write().await = watchlist;
    }

    /// Users whose watch list was requested, in order.
    pub async fn requests(&self) -> Vec<String> {
        self.requests.read().await.clone()
    }

    pub async fn set_next_error(&self, error: TrackerError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().await = unavailable;
    }
}

#[async_trait]
impl Tracker for MockTracker {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_watchlist(&self, user: &str) -> Result<Vec<WatchedSeries>, TrackerError> {
        self.requests.write().await.push(user.to_string());
        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }
        if *self.unavailable.read().await {
            return Err(TrackerError::Http("503 Service Unavailable".to_string()));
        }
        Ok(self.watchlist.read().await.clone())
    }
}
