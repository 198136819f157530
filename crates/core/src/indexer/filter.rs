//! Candidate filtering shared by every index implementation.

use chrono::{DateTime, Duration, Utc};

use super::TorrentCandidate;
use crate::parser::{extract_season, is_movie, matches_title, strip_season_markers};
use crate::ranker::{rank_episodes, rank_movies};

/// Search terms derived from a tracker title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesQuery {
    /// Title with season markers removed; used both as query and as title filter.
    pub base_title: String,
    /// Season named in the tracker title, if any.
    pub season: Option<u32>,
}

impl SeriesQuery {
    pub fn from_title(title: &str) -> Self {
        Self {
            base_title: strip_season_markers(title),
            season: extract_season(title),
        }
    }

    /// Episode searches: a requested season must match exactly, otherwise
    /// only releases without a season or tagged season 1 are accepted.
    pub fn accepts_episode_season(&self, found: Option<u32>) -> bool {
        match self.season {
            Some(requested) => found == Some(requested),
            None => matches!(found, None | Some(1)),
        }
    }

    /// Batch searches only filter when a season was requested.
    pub fn accepts_batch_season(&self, found: Option<u32>) -> bool {
        match self.season {
            Some(requested) => found == Some(requested),
            None => true,
        }
    }

    fn matches(&self, candidate: &TorrentCandidate) -> bool {
        matches_title(&candidate.name, &self.base_title)
    }
}

/// Single-episode releases of `wanted` episodes, ranked.
pub fn select_episodes(
    candidates: Vec<TorrentCandidate>,
    query: &SeriesQuery,
    wanted: &[u32],
) -> Vec<TorrentCandidate> {
    let mut kept: Vec<_> = candidates
        .into_iter()
        .filter(|c| !c.parsed.ignored && !c.parsed.batch)
        .filter(|c| query.matches(c))
        .filter(|c| query.accepts_episode_season(c.parsed.season))
        .filter(|c| c.parsed.episode.is_some_and(|ep| wanted.contains(&ep)))
        .collect();
    rank_episodes(&mut kept);
    kept
}

/// Season packs, ranked like episodes.
pub fn select_batches(
    candidates: Vec<TorrentCandidate>,
    query: &SeriesQuery,
    season: Option<u32>,
) -> Vec<TorrentCandidate> {
    let query = SeriesQuery {
        season: season.or(query.season),
        ..query.clone()
    };
    let mut kept: Vec<_> = candidates
        .into_iter()
        .filter(|c| !c.parsed.ignored && c.parsed.batch)
        .filter(|c| query.matches(c))
        .filter(|c| query.accepts_batch_season(c.parsed.season))
        .collect();
    rank_episodes(&mut kept);
    kept
}

/// Movie releases, ranked by the movie ordering.
pub fn select_movies(
    candidates: Vec<TorrentCandidate>,
    query: &SeriesQuery,
    is_format_movie: bool,
) -> Vec<TorrentCandidate> {
    let mut kept: Vec<_> = candidates
        .into_iter()
        .filter(|c| !c.parsed.ignored)
        .filter(|c| is_movie(&c.name, is_format_movie))
        .filter(|c| query.matches(c))
        .collect();
    rank_movies(&mut kept);
    kept
}

/// Drop entries published more than `days` before `now`. Undated entries stay.
pub fn retain_recent(candidates: &mut Vec<TorrentCandidate>, days: u32, now: DateTime<Utc>) {
    let cutoff = now - Duration::days(i64::from(days));
    candidates.retain(|c| c.published.map_or(true, |published| published >= cutoff));
}
