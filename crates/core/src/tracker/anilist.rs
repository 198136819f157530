//! AniList GraphQL client.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::TrackerConfig;

use super::{AiringNode, SeriesStatus, Tracker, TrackerError, WatchedSeries};

const WATCHLIST_QUERY: &str = r#"
query ($userName: String, $type: MediaType, $statuses: [MediaListStatus], $page: Int) {
  Page(page: $page, perPage: 50) {
    pageInfo {
      hasNextPage
    }
    mediaList(userName: $userName, type: $type, status_in: $statuses) {
      status
      progress
      customLists
      media {
        status
        format
        title {
          english
          romaji
        }
        airingSchedule {
          nodes {
            id
            episode
            timeUntilAiring
          }
        }
      }
    }
  }
}
"#;

/// Upper bound on pages fetched per watch list.
const MAX_PAGES: u32 = 20;

pub struct AniListTracker {
    client: Client,
    url: String,
}

impl AniListTracker {
    pub fn new(config: TrackerConfig) -> Result<Self, TrackerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TrackerError::ConnectionFailed(e.to_string()))?;
        Ok(Self {
            client,
            url: config.url,
        })
    }
}

#[async_trait]
impl Tracker for AniListTracker {
    fn name(&self) -> &str {
        "anilist"
    }

    async fn fetch_watchlist(&self, user: &str) -> Result<Vec<WatchedSeries>, TrackerError> {
        debug!(user = user, "Fetching AniList watch list");

        let mut series = Vec::new();
        for page in 1..=MAX_PAGES {
            let body = self.fetch_page(user, page).await?;
            let parsed = parse_watchlist_page(&body)?;
            series.extend(parsed.series);
            if !parsed.has_next_page {
                debug!(user = user, series = series.len(), "AniList watch list fetched");
                return Ok(series);
            }
        }

        // Callers treat missing series as dropped, so a truncated list is an error.
        warn!(user = user, pages = MAX_PAGES, "AniList watch list has more pages than allowed");
        Err(TrackerError::Api(format!(
            "watch list exceeds {} pages",
            MAX_PAGES
        )))
    }
}

impl AniListTracker {
    async fn fetch_page(&self, user: &str, page: u32) -> Result<String, TrackerError> {
        let body = json!({
            "query": WATCHLIST_QUERY,
            "variables": {
                "userName": user,
                "type": "ANIME",
                "statuses": ["CURRENT", "REPEATING"],
                "page": page,
            },
        });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TrackerError::Timeout
                } else if e.is_connect() {
                    TrackerError::ConnectionFailed(e.to_string())
                } else {
                    TrackerError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TrackerError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(TrackerError::Http(format!(
                "HTTP {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }
        Ok(text)
    }
}

/// One page of a watch list.
#[derive(Debug)]
pub struct WatchlistPage {
    pub series: Vec<WatchedSeries>,
    pub has_next_page: bool,
}

/// Parse one GraphQL response page.
pub fn parse_watchlist_page(body: &str) -> Result<WatchlistPage, TrackerError> {
    let response: GraphQlResponse =
        serde_json::from_str(body).map_err(|e| TrackerError::ParseError(e.to_string()))?;

    if let Some(errors) = response.errors.filter(|e| !e.is_empty()) {
        let message = errors
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(TrackerError::Api(message));
    }

    let data = response
        .data
        .ok_or_else(|| TrackerError::ParseError("response has no data".to_string()))?;

    let page = data.page;
    Ok(WatchlistPage {
        has_next_page: page.page_info.is_some_and(|info| info.has_next_page),
        series: page
            .media_list
            .into_iter()
            .map(MediaListEntry::into_series)
            .collect(),
    })
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<ResponseData>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResponseData {
    #[serde(rename = "Page")]
    page: Page,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(rename = "pageInfo", default)]
    page_info: Option<PageInfo>,
    #[serde(rename = "mediaList", default)]
    media_list: Vec<MediaListEntry>,
}

#[derive(Debug, Deserialize)]
struct PageInfo {
    #[serde(rename = "hasNextPage", default)]
    has_next_page: bool,
}

#[derive(Debug, Deserialize)]
struct MediaListEntry {
    #[serde(default)]
    progress: Option<u32>,
    #[serde(rename = "customLists", default)]
    custom_lists: Option<HashMap<String, bool>>,
    media: Media,
}

#[derive(Debug, Deserialize)]
struct Media {
    status: Option<String>,
    format: Option<String>,
    title: Title,
    #[serde(rename = "airingSchedule")]
    airing_schedule: Option<AiringSchedule>,
}

#[derive(Debug, Deserialize)]
struct Title {
    english: Option<String>,
    romaji: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AiringSchedule {
    #[serde(default)]
    nodes: Vec<RawAiringNode>,
}

#[derive(Debug, Deserialize)]
struct RawAiringNode {
    id: i64,
    episode: u32,
    #[serde(rename = "timeUntilAiring")]
    time_until_airing: i64,
}

impl MediaListEntry {
    fn into_series(self) -> WatchedSeries {
        let custom_lists: BTreeSet<String> = self
            .custom_lists
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(name, member)| member.then_some(name))
            .collect();

        let airing = self
            .media
            .airing_schedule
            .map(|s| s.nodes)
            .unwrap_or_default()
            .into_iter()
            .filter(|n| n.episode >= 1)
            .map(|n| AiringNode {
                id: n.id,
                episode: n.episode,
                time_until_airing: n.time_until_airing,
            })
            .collect();

        WatchedSeries {
            romaji_title: self.media.title.romaji,
            english_title: self.media.title.english,
            progress: self.progress.unwrap_or(0),
            status: parse_status(self.media.status.as_deref()),
            custom_lists,
            is_movie: self.media.format.as_deref() == Some("MOVIE"),
            airing,
        }
    }
}

fn parse_status(status: Option<&str>) -> SeriesStatus {
    match status {
        Some("FINISHED") => SeriesStatus::Finished,
        Some("NOT_YET_RELEASED") => SeriesStatus::NotYetReleased,
        Some("CANCELLED") => SeriesStatus::Cancelled,
        Some("HIATUS") => SeriesStatus::Hiatus,
        _ => SeriesStatus::Releasing,
    }
}
