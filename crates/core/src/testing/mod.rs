//! Testing utilities and mock implementations.
//!
//! Mocks for the three external services (tracker, index, torrent client)
//! so full reconciliation cycles run without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use anisync_core::testing::{fixtures, MockIndexer, MockTorrentClient, MockTracker};
//!
//! let tracker = MockTracker::with_watchlist(vec![fixtures::series("Frieren", 1, &[(101, 1)])]);
//! let indexer = MockIndexer::new();
//! indexer.add_release(&fixtures::release("SubsPlease", "Frieren", 1)).await;
//! let client = MockTorrentClient::new();
//! ```

mod mock_indexer;
mod mock_torrent_client;
mod mock_tracker;

pub use mock_indexer::{MockIndexer, RecordedSearch, SearchKind};
pub use mock_torrent_client::{MockTorrentClient, RecordedAddTorrent, RecordedRelocation};
pub use mock_tracker::MockTracker;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::collections::BTreeSet;

    use crate::config::Config;
    use crate::ledger::EpisodeRecord;
    use crate::tracker::{AiringNode, SeriesStatus, WatchedSeries};

    /// Releasing series with an english title and aired episodes given as
    /// `(airing id, episode number)`.
    pub fn series(title: &str, progress: u32, episodes: &[(i64, u32)]) -> WatchedSeries {
        WatchedSeries {
            romaji_title: Some(title.to_string()),
            english_title: Some(title.to_string()),
            progress,
            status: SeriesStatus::Releasing,
            custom_lists: BTreeSet::new(),
            is_movie: false,
            airing: episodes
                .iter()
                .map(|(id, episode)| aired(*id, *episode))
                .collect(),
        }
    }

    /// Same as [`series`] but finished airing.
    pub fn finished_series(title: &str, progress: u32, episodes: &[(i64, u32)]) -> WatchedSeries {
        WatchedSeries {
            status: SeriesStatus::Finished,
            ..series(title, progress, episodes)
        }
    }

    pub fn aired(id: i64, episode: u32) -> AiringNode {
        AiringNode {
            id,
            episode,
            time_until_airing: -3600,
        }
    }

    pub fn upcoming(id: i64, episode: u32) -> AiringNode {
        AiringNode {
            id,
            episode,
            time_until_airing: 86_400,
        }
    }

    /// Typical single-episode release name.
    pub fn release(group: &str, title: &str, episode: u32) -> String {
        format!("[{}] {} - {:02} (1080p) [{:08X}].mkv", group, title, episode, episode)
    }

    pub fn ledger_row(id: i64, hash: &str, title: &str, episode: u32) -> EpisodeRecord {
        EpisodeRecord::new(id, hash, format!("{} - Episode {}", title, episode))
    }

    /// Complete configuration rooted at `save_path`.
    pub fn config(save_path: &str) -> Config {
        Config {
            tracker_user: "tester".to_string(),
            save_path: save_path.to_string(),
            ..Config::default()
        }
    }
}
