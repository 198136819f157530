//! Mock torrent index for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Notify, RwLock};

use crate::indexer::filter::{select_batches, select_episodes, select_movies};
use crate::indexer::{Indexer, SearchError, SeriesQuery, TorrentCandidate};

/// Which index operation was called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchKind {
    Episode(u32),
    Multiple(Vec<u32>),
    Movie { is_format_movie: bool },
    Batch(Option<u32>),
}

/// A recorded search for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedSearch {
    pub title: String,
    pub kind: SearchKind,
}

/// Mock implementation of the Indexer trait.
///
/// Serves a fixed catalogue through the same filtering and ranking as the
/// real index, so tests only list release names.
///
/// # Example
///
/// ```rust,ignore
/// let indexer = MockIndexer::new();
/// indexer.add_release("[SubsPlease] Frieren - 05 (1080p) [ABCD].mkv").await;
///
/// let found = indexer.search_episode("Frieren", 5).await?;
/// assert_eq!(found.len(), 1);
/// ```
pub struct MockIndexer {
    catalogue: Arc<RwLock<Vec<TorrentCandidate>>>,
    searches: Arc<RwLock<Vec<RecordedSearch>>>,
    /// If set, the next search will fail with this error.
    next_error: Arc<RwLock<Option<SearchError>>>,
    /// Titles whose searches never return.
    hang_titles: Arc<RwLock<HashSet<String>>>,
    hang_reached: Arc<Notify>,
}

impl std::fmt::Debug for MockIndexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockIndexer")
            .field("catalogue", &"<catalogue>")
            .field("searches", &"<searches>")
            .finish()
    }
}

impl Default for MockIndexer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockIndexer {
    pub fn new() -> Self {
        Self {
            catalogue: Arc::new(RwLock::new(Vec::new())),
            searches: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            hang_titles: Arc::new(RwLock::new(HashSet::new())),
            hang_reached: Arc::new(Notify::new()),
        }
    }

    pub async fn add_candidate(&self, candidate: TorrentCandidate) {
        self.catalogue.write().await.push(candidate);
    }

    /// Add a release by name with a magnet derived from its position.
    pub async fn add_release(&self, name: &str) {
        let mut catalogue = self.catalogue.write().await;
        let magnet = format!("magnet:?xt=urn:btih:release{:04}", catalogue.len() + 1);
        catalogue.push(TorrentCandidate::new(name, magnet, 100, 500 * 1024 * 1024));
    }

    pub async fn recorded_searches(&self) -> Vec<RecordedSearch> {
        self.searches.read().await.clone()
    }

    pub async fn clear_recorded(&self) {
        self.searches.write().await.clear();
    }

    /// Configure the next search to fail with the given error.
    pub async fn set_next_error(&self, error: SearchError) {
        *self.next_error.write().await = Some(error);
    }

    /// Searches for `title` block forever.
    pub async fn hang_on(&self, title: &str) {
        self.hang_titles.write().await.insert(title.to_string());
    }

    /// Resolves once a search has blocked on a hanging title.
    pub async fn wait_for_hang(&self) {
        self.hang_reached.notified().await;
    }

    async fn begin(&self, title: &str, kind: SearchKind) -> Result<Vec<TorrentCandidate>, SearchError> {
        self.searches.write().await.push(RecordedSearch {
            title: title.to_string(),
            kind,
        });
        if self.hang_titles.read().await.contains(title) {
            self.hang_reached.notify_one();
            std::future::pending::<()>().await;
        }
        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }
        Ok(self.catalogue.read().await.clone())
    }
}

#[async_trait]
impl Indexer for MockIndexer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search_episode(
        &self,
        title: &str,
        episode: u32,
    ) -> Result<Vec<TorrentCandidate>, SearchError> {
        let listed = self.begin(title, SearchKind::Episode(episode)).await?;
        Ok(select_episodes(listed, &SeriesQuery::from_title(title), &[episode]))
    }

    async fn search_multiple(
        &self,
        title: &str,
        episodes: &[u32],
    ) -> Result<Vec<TorrentCandidate>, SearchError> {
        let listed = self
            .begin(title, SearchKind::Multiple(episodes.to_vec()))
            .await?;
        Ok(select_episodes(listed, &SeriesQuery::from_title(title), episodes))
    }

    async fn search_movie(
        &self,
        title: &str,
        is_format_movie: bool,
    ) -> Result<Vec<TorrentCandidate>, SearchError> {
        let listed = self
            .begin(title, SearchKind::Movie { is_format_movie })
            .await?;
        Ok(select_movies(listed, &SeriesQuery::from_title(title), is_format_movie))
    }

    async fn search_batch(
        &self,
        title: &str,
        season: Option<u32>,
    ) -> Result<Vec<TorrentCandidate>, SearchError> {
        let listed = self.begin(title, SearchKind::Batch(season)).await?;
        Ok(select_batches(listed, &SeriesQuery::from_title(title), season))
    }
}
