//! Ledger and watch list handlers.

use axum::extract::State;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use anisync_core::tracker::WatchedSeries;
use anisync_core::EpisodeRecord;

use super::response::{ok, ApiError, ApiResult};
use crate::state::AppState;

/// Ledger rows of one series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnimeSummary {
    pub name: String,
    pub episodes_count: usize,
    pub latest_episode_id: i64,
}

/// GET /api/v1/episodes
pub async fn list_episodes(State(state): State<Arc<AppState>>) -> ApiResult<Vec<EpisodeRecord>> {
    let rows = state
        .daemon()
        .list_ledger()
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    ok(rows)
}

/// GET /api/v1/animes
pub async fn list_animes(State(state): State<Arc<AppState>>) -> ApiResult<Vec<AnimeSummary>> {
    let rows = state
        .daemon()
        .list_ledger()
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    ok(summarize(&rows))
}

/// GET /api/v1/watchlist
pub async fn get_watchlist(State(state): State<Arc<AppState>>) -> ApiResult<Vec<WatchedSeries>> {
    ok(state.daemon().watchlist().await?)
}

/// Series name of a ledger row, `"Title - Episode N"` minus the suffix.
fn series_name(episode_name: &str) -> &str {
    let name = episode_name.trim();
    let name = match name.rsplit_once(" - Episode ") {
        Some((title, _)) if !title.trim().is_empty() => title.trim(),
        _ => name,
    };
    if name.is_empty() {
        "Unknown"
    } else {
        name
    }
}

fn summarize(rows: &[EpisodeRecord]) -> Vec<AnimeSummary> {
    let mut by_name: BTreeMap<&str, AnimeSummary> = BTreeMap::new();
    for row in rows {
        let name = series_name(&row.episode_name);
        by_name
            .entry(name)
            .and_modify(|summary| {
                summary.episodes_count += 1;
                summary.latest_episode_id = summary.latest_episode_id.max(row.episode_id);
            })
            .or_insert_with(|| AnimeSummary {
                name: name.to_string(),
                episodes_count: 1,
                latest_episode_id: row.episode_id,
            });
    }
    by_name.into_values().collect()
}
