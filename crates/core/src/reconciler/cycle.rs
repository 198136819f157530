use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::{Config, ConfigStore};
use crate::indexer::{Indexer, TorrentCandidate};
use crate::ledger::{EpisodeRecord, FileLedger};
use crate::metrics;
use crate::state::StateRegister;
use crate::torrent_client::{
    series_save_path, AddTorrentRequest, ClientTorrent, QBittorrentClient, TorrentClient,
    TorrentClientError, CATEGORY,
};
use crate::tracker::{AiringNode, Tracker, WatchedSeries};

use super::decision::{decide_episode, EpisodeDecision, EpisodeFacts};
use super::sweep::remove_empty_dirs;
use super::{CancellationToken, CycleError, CycleOutcome, CycleSummary};

/// Builds the torrent client from the configuration loaded for a cycle.
pub type ClientFactory =
    Arc<dyn Fn(&Config) -> Result<Arc<dyn TorrentClient>, TorrentClientError> + Send + Sync>;

/// Name a downloaded episode carries in the client and in the ledger.
pub fn expected_name(title: &str, episode: u32) -> String {
    format!("{} - Episode {}", title, episode)
}

/// Cancellation observed at a suspension point.
struct Cancelled;

/// Lookups built once per cycle from the client list and the ledger.
struct CycleView<'a> {
    config: &'a Config,
    client: &'a dyn TorrentClient,
    torrents_by_name: HashSet<&'a str>,
    torrents_by_hash: HashMap<String, &'a ClientTorrent>,
    saved_by_id: HashMap<i64, &'a str>,
}

/// What the per-series pass accumulates for the post-pass.
#[derive(Default)]
struct CycleWork {
    checked_ids: HashSet<i64>,
    ids_to_evict: HashSet<i64>,
    new_rows: Vec<EpisodeRecord>,
    summary: CycleSummary,
}

/// Runs reconciliation cycles.
pub struct Reconciler {
    config_store: Arc<ConfigStore>,
    ledger: Arc<FileLedger>,
    state: Arc<StateRegister>,
    tracker: Arc<dyn Tracker>,
    indexer: Arc<dyn Indexer>,
    client_factory: ClientFactory,
}

impl Reconciler {
    /// Reconciler talking to qBittorrent with the settings of each cycle's config.
    pub fn new(
        config_store: Arc<ConfigStore>,
        ledger: Arc<FileLedger>,
        state: Arc<StateRegister>,
        tracker: Arc<dyn Tracker>,
        indexer: Arc<dyn Indexer>,
    ) -> Self {
        let client_factory: ClientFactory = Arc::new(|config: &Config| {
            let client = QBittorrentClient::new(config.client_config())?;
            Ok(Arc::new(client) as Arc<dyn TorrentClient>)
        });
        Self {
            config_store,
            ledger,
            state,
            tracker,
            indexer,
            client_factory,
        }
    }

    pub fn with_client_factory(mut self, factory: ClientFactory) -> Self {
        self.client_factory = factory;
        self
    }

    /// Use one client for every cycle regardless of configuration.
    pub fn with_client(self, client: Arc<dyn TorrentClient>) -> Self {
        self.with_client_factory(Arc::new(move |_: &Config| Ok(Arc::clone(&client))))
    }

    pub fn state(&self) -> &Arc<StateRegister> {
        &self.state
    }

    pub fn config_store(&self) -> &Arc<ConfigStore> {
        &self.config_store
    }

    pub fn ledger(&self) -> &Arc<FileLedger> {
        &self.ledger
    }

    pub fn tracker(&self) -> &Arc<dyn Tracker> {
        &self.tracker
    }

    /// Run one cycle and record its result on the state register.
    pub async fn run_once(&self, cancel: &CancellationToken) -> CycleOutcome {
        let started = Instant::now();

        let outcome = match self.cycle(cancel).await {
            Ok(Some(summary)) => {
                self.state.record_success(Utc::now());
                info!(
                    series = summary.series_checked,
                    episodes = summary.episodes_checked,
                    enqueued = summary.enqueued,
                    failed = summary.failed,
                    evicted = summary.evicted,
                    relocated = summary.relocated,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Cycle completed"
                );
                CycleOutcome::Completed(summary)
            }
            Ok(None) => {
                info!("Cycle cancelled");
                self.state.clear_error();
                CycleOutcome::Cancelled
            }
            Err(e) => {
                warn!(error = %e, "Cycle failed");
                self.state.set_error(Some(e.to_string()));
                CycleOutcome::Failed(e)
            }
        };

        let label = outcome.label();
        metrics::CYCLES_TOTAL.with_label_values(&[label]).inc();
        metrics::CYCLE_DURATION
            .with_label_values(&[label])
            .observe(started.elapsed().as_secs_f64());
        outcome
    }

    /// `Ok(None)` when cancelled.
    async fn cycle(&self, cancel: &CancellationToken) -> Result<Option<CycleSummary>, CycleError> {
        // Phase 1: load
        let config = self.config_store.load()?;
        if !config.is_complete() {
            return Err(CycleError::ConfigIncomplete);
        }
        let client = (self.client_factory)(&config)?;

        let torrents = match cancel.run_until_cancelled(client.list_torrents(CATEGORY)).await {
            None => return Ok(None),
            Some(result) => result.map_err(|e| upstream_error("torrent_client", e))?,
        };
        let watchlist = match cancel
            .run_until_cancelled(self.tracker.fetch_watchlist(&config.tracker_user))
            .await
        {
            None => return Ok(None),
            Some(result) => result.map_err(|e| upstream_error("tracker", e))?,
        };
        let ledger_rows = self.ledger.load().await?;

        debug!(
            torrents = torrents.len(),
            series = watchlist.len(),
            ledger_rows = ledger_rows.len(),
            "Loaded cycle inputs"
        );

        // Phase 2: indexes
        let view = CycleView {
            config: &config,
            client: client.as_ref(),
            torrents_by_name: torrents.iter().map(|t| t.name.as_str()).collect(),
            torrents_by_hash: torrents
                .iter()
                .map(|t| (t.hash.to_lowercase(), t))
                .collect(),
            saved_by_id: ledger_rows
                .iter()
                .map(|r| (r.episode_id, r.episode_hash.as_str()))
                .collect(),
        };

        // Phase 3: per-series pass
        let mut work = CycleWork::default();
        for series in &watchlist {
            if cancel.is_cancelled() || self.reconcile_series(series, &view, &mut work, cancel).await.is_err() {
                // Keep what was actually enqueued so the next cycle does not add it again.
                self.write_new_rows(&work.new_rows).await;
                return Ok(None);
            }
            work.summary.series_checked += 1;
        }

        // Phase 4: post-pass
        if self.post_pass(&view, &ledger_rows, &mut work, cancel).await.is_err() {
            return Ok(None);
        }

        work.summary.episodes_checked = work.checked_ids.len();
        Ok(Some(work.summary))
    }

    async fn reconcile_series(
        &self,
        series: &WatchedSeries,
        view: &CycleView<'_>,
        work: &mut CycleWork,
        cancel: &CancellationToken,
    ) -> Result<(), Cancelled> {
        let config = view.config;
        let Some(title) = series.display_title() else {
            work.checked_ids.extend(series.airing.iter().map(|node| node.id));
            warn!(episodes = series.airing.len(), "Series has no title, skipping");
            return Ok(());
        };

        let excluded = series.in_custom_list(&config.excluded_list);
        let mut downloaded = 0usize;
        let mut wanted: Vec<(AiringNode, String)> = Vec::new();

        for node in &series.airing {
            work.checked_ids.insert(node.id);
            let name = expected_name(title, node.episode);
            let facts = EpisodeFacts {
                already_saved: view.saved_by_id.contains_key(&node.id),
                aired: node.has_aired(),
                excluded,
                watched: node.episode <= series.progress,
                in_client: view.torrents_by_name.contains(name.as_str()),
                saturated: downloaded >= config.max_episodes_per_series,
            };
            let decision = decide_episode(facts);
            if decision.counts_toward_cap() {
                downloaded += 1;
            }
            match decision {
                EpisodeDecision::Download { redownload } => {
                    debug!(series = %title, episode = node.episode, redownload, "Episode wanted");
                    wanted.push((*node, name));
                }
                EpisodeDecision::Evict => {
                    debug!(series = %title, episode = node.episode, "Episode marked for eviction");
                    work.ids_to_evict.insert(node.id);
                }
                EpisodeDecision::Keep | EpisodeDecision::Skip => {}
            }
        }

        if !wanted.is_empty() {
            let save_path = series_save_path(config.root_for(series.is_finished()), title);
            let mut grouped = self.search_wanted(series, &wanted, cancel).await?;

            for (node, name) in wanted {
                if cancel.is_cancelled() {
                    return Err(Cancelled);
                }
                let candidates = match grouped.remove(&node.episode) {
                    Some(candidates) if !candidates.is_empty() => candidates,
                    _ => self.search_single(series, node.episode, cancel).await?,
                };
                if candidates.is_empty() {
                    warn!(series = %title, episode = node.episode, "No candidates found");
                    work.summary.failed += 1;
                    metrics::ENQUEUE_FAILURES.inc();
                    continue;
                }

                match self
                    .enqueue(view.client, &candidates, &save_path, &name, config.episode_retry_limit, cancel)
                    .await?
                {
                    Some(hash) => {
                        info!(series = %title, episode = node.episode, hash = %hash, "Episode enqueued");
                        work.new_rows
                            .push(EpisodeRecord::new(node.id, hash, name).downloaded_at(Utc::now()));
                        work.summary.enqueued += 1;
                        metrics::TORRENTS_ENQUEUED.inc();
                    }
                    None => {
                        warn!(series = %title, episode = node.episode, "All candidates failed");
                        work.summary.failed += 1;
                        metrics::ENQUEUE_FAILURES.inc();
                    }
                }
            }
        }

        if series.is_finished() && config.relocation_enabled() {
            self.relocate_finished(series, title, view, work, cancel).await?;
        }
        Ok(())
    }

    /// One query for several episodes, grouped by parsed episode number.
    async fn search_wanted(
        &self,
        series: &WatchedSeries,
        wanted: &[(AiringNode, String)],
        cancel: &CancellationToken,
    ) -> Result<HashMap<u32, Vec<TorrentCandidate>>, Cancelled> {
        let mut grouped: HashMap<u32, Vec<TorrentCandidate>> = HashMap::new();
        let Some(title) = series.search_titles().first().copied() else {
            return Ok(grouped);
        };
        if wanted.len() < 2 || series.is_movie {
            return Ok(grouped);
        }

        let episodes: Vec<u32> = wanted.iter().map(|(node, _)| node.episode).collect();
        match cancel
            .run_until_cancelled(self.indexer.search_multiple(title, &episodes))
            .await
        {
            None => return Err(Cancelled),
            Some(Ok(candidates)) => {
                for candidate in candidates {
                    if let Some(episode) = candidate.parsed.episode {
                        grouped.entry(episode).or_default().push(candidate);
                    }
                }
            }
            Some(Err(e)) => {
                metrics::UPSTREAM_ERRORS.with_label_values(&["indexer"]).inc();
                warn!(series = %title, error = %e, "Multi-episode search failed");
            }
        }
        Ok(grouped)
    }

    /// Per-episode query: romaji title first, then english. Movies go
    /// through the movie search with the tracker format as the hint.
    async fn search_single(
        &self,
        series: &WatchedSeries,
        episode: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<TorrentCandidate>, Cancelled> {
        for title in series.search_titles() {
            let search = if series.is_movie {
                self.indexer.search_movie(title, true)
            } else {
                self.indexer.search_episode(title, episode)
            };
            match cancel.run_until_cancelled(search).await
            {
                None => return Err(Cancelled),
                Some(Ok(candidates)) if !candidates.is_empty() => return Ok(candidates),
                Some(Ok(_)) => debug!(series = %title, episode, "No results"),
                Some(Err(e)) => {
                    metrics::UPSTREAM_ERRORS.with_label_values(&["indexer"]).inc();
                    warn!(series = %title, episode, error = %e, "Episode search failed");
                }
            }
        }
        Ok(Vec::new())
    }

    /// Try ranked candidates until one is added and its hash discovered.
    async fn enqueue(
        &self,
        client: &dyn TorrentClient,
        candidates: &[TorrentCandidate],
        save_path: &str,
        name: &str,
        retry_limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, Cancelled> {
        for candidate in candidates.iter().take(retry_limit) {
            let request = AddTorrentRequest::magnet(&candidate.magnet)
                .with_save_path(save_path)
                .with_rename(name);
            match cancel
                .run_until_cancelled(client.add_and_resolve_hash(&request))
                .await
            {
                None => return Err(Cancelled),
                Some(Ok(Some(hash))) => return Ok(Some(hash)),
                Some(Ok(None)) => {
                    warn!(torrent = %candidate.name, "Added torrent not found in client")
                }
                Some(Err(e)) => {
                    metrics::UPSTREAM_ERRORS.with_label_values(&["torrent_client"]).inc();
                    warn!(torrent = %candidate.name, error = %e, "Failed to add torrent");
                }
            }
        }
        Ok(None)
    }

    /// Move a finished series' saved torrents to the completed folder.
    async fn relocate_finished(
        &self,
        series: &WatchedSeries,
        title: &str,
        view: &CycleView<'_>,
        work: &mut CycleWork,
        cancel: &CancellationToken,
    ) -> Result<(), Cancelled> {
        let completed = Path::new(&view.config.completed_path);
        let mut hashes: Vec<String> = Vec::new();
        for node in &series.airing {
            if work.ids_to_evict.contains(&node.id) {
                continue;
            }
            let Some(hash) = view.saved_by_id.get(&node.id) else {
                continue;
            };
            let hash = hash.to_lowercase();
            let Some(torrent) = view.torrents_by_hash.get(&hash) else {
                continue;
            };
            if Path::new(&torrent.save_path).starts_with(completed) || hashes.contains(&hash) {
                continue;
            }
            hashes.push(hash);
        }
        if hashes.is_empty() {
            return Ok(());
        }

        let target = series_save_path(&view.config.completed_path, title);
        match cancel
            .run_until_cancelled(view.client.relocate(&hashes, &target))
            .await
        {
            None => return Err(Cancelled),
            Some(Ok(())) => {
                info!(series = %title, count = hashes.len(), target = %target, "Relocated finished series");
                work.summary.relocated += hashes.len();
                metrics::TORRENTS_RELOCATED.inc_by(hashes.len() as u64);
            }
            Some(Err(e)) => {
                metrics::UPSTREAM_ERRORS.with_label_values(&["torrent_client"]).inc();
                warn!(series = %title, error = %e, "Failed to relocate finished series");
            }
        }
        Ok(())
    }

    /// Evict, persist new rows, sweep empty folders.
    async fn post_pass(
        &self,
        view: &CycleView<'_>,
        ledger_rows: &[EpisodeRecord],
        work: &mut CycleWork,
        cancel: &CancellationToken,
    ) -> Result<(), Cancelled> {
        let config = view.config;
        let mut cancelled = false;

        if config.delete_watched {
            let mut to_remove: HashSet<i64> = ledger_rows
                .iter()
                .map(|r| r.episode_id)
                .filter(|id| !work.checked_ids.contains(id))
                .collect();
            to_remove.extend(work.ids_to_evict.iter().copied());

            if !to_remove.is_empty() {
                let mut hashes: Vec<String> = Vec::new();
                for row in ledger_rows.iter().filter(|r| to_remove.contains(&r.episode_id)) {
                    if !hashes.contains(&row.episode_hash) {
                        hashes.push(row.episode_hash.clone());
                    }
                }

                // Client first: a crash in between leaves an orphan row that is evicted again.
                match cancel.run_until_cancelled(view.client.delete_torrents(&hashes)).await {
                    None => cancelled = true,
                    Some(Ok(())) => match self.ledger.delete(&to_remove).await {
                        Ok(removed) => {
                            info!(count = removed, "Evicted episodes");
                            work.summary.evicted = removed;
                            metrics::EPISODES_EVICTED.inc_by(removed as u64);
                        }
                        Err(e) => warn!(error = %e, "Failed to delete episodes from ledger"),
                    },
                    Some(Err(e)) => {
                        metrics::UPSTREAM_ERRORS.with_label_values(&["torrent_client"]).inc();
                        warn!(count = hashes.len(), error = %e, "Failed to delete torrents, keeping ledger rows");
                    }
                }
            }
        }

        self.write_new_rows(&work.new_rows).await;
        if cancelled {
            return Err(Cancelled);
        }

        let mut roots = vec![config.save_path.as_str()];
        if config.relocation_enabled() {
            roots.push(config.completed_path.as_str());
        }
        for root in roots {
            match remove_empty_dirs(Path::new(root)).await {
                Ok(0) => {}
                Ok(removed) => debug!(root = %root, count = removed, "Removed empty folders"),
                Err(e) => warn!(root = %root, error = %e, "Failed to sweep empty folders"),
            }
        }
        Ok(())
    }

    async fn write_new_rows(&self, rows: &[EpisodeRecord]) {
        if rows.is_empty() {
            return;
        }
        match self.ledger.replace(rows).await {
            Ok(()) => info!(count = rows.len(), "Saved episodes to ledger"),
            Err(e) => warn!(count = rows.len(), error = %e, "Failed to save episodes to ledger"),
        }
    }
}

fn upstream_error<E: Into<CycleError>>(service: &str, error: E) -> CycleError {
    metrics::UPSTREAM_ERRORS.with_label_values(&[service]).inc();
    error.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_name() {
        assert_eq!(expected_name("Frieren", 5), "Frieren - Episode 5");
        assert_eq!(
            expected_name("Oshi no Ko Season 2", 12),
            "Oshi no Ko Season 2 - Episode 12"
        );
    }
}
