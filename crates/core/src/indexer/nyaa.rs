//! Nyaa index over its RSS feed.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use tracing::debug;

use crate::config::IndexerConfig;
use crate::ranker::{parse_seeders, parse_size};

use super::filter::{retain_recent, select_batches, select_episodes, select_movies, SeriesQuery};
use super::{Indexer, SearchError, TorrentCandidate};

/// Anime, English-translated.
const CATEGORY: &str = "1_2";

pub struct NyaaIndexer {
    client: Client,
    config: IndexerConfig,
}

impl NyaaIndexer {
    pub fn new(config: IndexerConfig) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SearchError::ConnectionFailed(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}/?page=rss&f=0&c={}&q={}&s=seeders&o=desc",
            self.config.url.trim_end_matches('/'),
            CATEGORY,
            urlencoding::encode(query)
        )
    }

    /// Run one query and return every listed entry, unfiltered.
    async fn fetch(&self, query: &str) -> Result<Vec<TorrentCandidate>, SearchError> {
        let url = self.search_url(query);
        debug!(query = query, "Searching Nyaa");

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                SearchError::Timeout
            } else if e.is_connect() {
                SearchError::ConnectionFailed(e.to_string())
            } else {
                SearchError::ApiError(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(SearchError::ApiError(format!("HTTP {}", response.status())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SearchError::ApiError(e.to_string()))?;

        let mut candidates = parse_feed(&bytes)?;
        if let Some(days) = self.config.recency_days {
            retain_recent(&mut candidates, days, Utc::now());
        }

        debug!(query = query, results = candidates.len(), "Nyaa search complete");
        Ok(candidates)
    }
}

/// Parse a Nyaa RSS document into candidates.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<TorrentCandidate>, SearchError> {
    let channel =
        rss::Channel::read_from(bytes).map_err(|e| SearchError::ParseError(e.to_string()))?;

    Ok(channel.items().iter().filter_map(parse_item).collect())
}

fn parse_item(item: &rss::Item) -> Option<TorrentCandidate> {
    let name = item.title()?.trim();
    if name.is_empty() {
        return None;
    }

    let magnet = match nyaa_field(item, "infoHash").filter(|h| !h.trim().is_empty()) {
        Some(hash) => format!(
            "magnet:?xt=urn:btih:{}&dn={}",
            hash.trim().to_lowercase(),
            urlencoding::encode(name)
        ),
        None => item.link()?.to_string(),
    };

    let seeders = nyaa_field(item, "seeders").map(parse_seeders).unwrap_or(0);
    let size_bytes = nyaa_field(item, "size").map(parse_size).unwrap_or(0);
    let candidate = TorrentCandidate::new(name, magnet, seeders, size_bytes);

    let published = item
        .pub_date()
        .and_then(|d| DateTime::parse_from_rfc2822(d).ok())
        .map(|d| d.with_timezone(&Utc));

    Some(match published {
        Some(published) => candidate.with_published(published),
        None => candidate,
    })
}

/// `nyaa:` namespaced extension element, e.g. `nyaa:seeders`.
fn nyaa_field<'a>(item: &'a rss::Item, field: &str) -> Option<&'a str> {
    item.extensions().get("nyaa")?.get(field)?.first()?.value()
}

#[async_trait]
impl Indexer for NyaaIndexer {
    fn name(&self) -> &str {
        "nyaa"
    }

    async fn search_episode(
        &self,
        title: &str,
        episode: u32,
    ) -> Result<Vec<TorrentCandidate>, SearchError> {
        let query = SeriesQuery::from_title(title);
        let listed = self
            .fetch(&format!("{} {:02}", query.base_title, episode))
            .await?;
        Ok(select_episodes(listed, &query, &[episode]))
    }

    async fn search_multiple(
        &self,
        title: &str,
        episodes: &[u32],
    ) -> Result<Vec<TorrentCandidate>, SearchError> {
        let query = SeriesQuery::from_title(title);
        let listed = self.fetch(&query.base_title).await?;
        Ok(select_episodes(listed, &query, episodes))
    }

    async fn search_movie(
        &self,
        title: &str,
        is_format_movie: bool,
    ) -> Result<Vec<TorrentCandidate>, SearchError> {
        let query = SeriesQuery::from_title(title);
        let text = if is_format_movie {
            query.base_title.clone()
        } else {
            format!("{} Movie", query.base_title)
        };
        let listed = self.fetch(&text).await?;
        Ok(select_movies(listed, &query, is_format_movie))
    }

    async fn search_batch(
        &self,
        title: &str,
        season: Option<u32>,
    ) -> Result<Vec<TorrentCandidate>, SearchError> {
        let query = SeriesQuery::from_title(title);
        let listed = self.fetch(&query.base_title).await?;
        Ok(select_batches(listed, &query, season))
    }
}
