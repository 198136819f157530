use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Root configuration, reloaded at the start of every cycle.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Identity on the tracking service.
    #[serde(default)]
    pub tracker_user: String,
    /// Root directory for series that are still airing.
    #[serde(default)]
    pub save_path: String,
    /// Root directory for finished series. Empty or equal to `save_path`
    /// disables relocation.
    #[serde(default)]
    pub completed_path: String,
    #[serde(default = "default_check_interval")]
    pub check_interval_minutes: u64,
    /// Base URL of the qBittorrent WebUI.
    #[serde(default = "default_client_url")]
    pub client_url: String,
    /// WebUI login. Left empty when the client bypasses auth for localhost.
    #[serde(default)]
    pub client_username: String,
    #[serde(default)]
    pub client_password: String,
    #[serde(default = "default_max_episodes")]
    pub max_episodes_per_series: usize,
    #[serde(default = "default_retry_limit")]
    pub episode_retry_limit: usize,
    #[serde(default = "default_true")]
    pub delete_watched: bool,
    /// Custom list tag; series carrying it are skipped entirely.
    #[serde(default)]
    pub excluded_list: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub indexer: IndexerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tracker_user: String::new(),
            save_path: String::new(),
            completed_path: String::new(),
            check_interval_minutes: default_check_interval(),
            client_url: default_client_url(),
            client_username: String::new(),
            client_password: String::new(),
            max_episodes_per_series: default_max_episodes(),
            episode_retry_limit: default_retry_limit(),
            delete_watched: true,
            excluded_list: String::new(),
            server: ServerConfig::default(),
            tracker: TrackerConfig::default(),
            indexer: IndexerConfig::default(),
        }
    }
}

impl Config {
    /// Both the tracker identity and the download root are set.
    pub fn is_complete(&self) -> bool {
        !self.tracker_user.trim().is_empty() && !self.save_path.trim().is_empty()
    }

    /// Finished series are moved to `completed_path`.
    pub fn relocation_enabled(&self) -> bool {
        !self.completed_path.is_empty() && self.completed_path != self.save_path
    }

    /// Root folder a series' torrents are saved under.
    pub fn root_for(&self, finished: bool) -> &str {
        if finished && self.relocation_enabled() {
            &self.completed_path
        } else {
            &self.save_path
        }
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_minutes.saturating_mul(60))
    }

    /// Connection settings for the qBittorrent adapter.
    pub fn client_config(&self) -> QBittorrentConfig {
        QBittorrentConfig {
            url: self.client_url.clone(),
            username: self.client_username.clone(),
            password: self.client_password.clone(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Control surface bind address.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// AniList GraphQL endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TrackerConfig {
    #[serde(default = "default_tracker_url")]
    pub url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            url: default_tracker_url(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Nyaa endpoint and search policy.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct IndexerConfig {
    #[serde(default = "default_indexer_url")]
    pub url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Drop entries published more than this many days ago.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recency_days: Option<u32>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            url: default_indexer_url(),
            timeout_secs: default_timeout(),
            recency_days: None,
        }
    }
}

/// qBittorrent connection settings, derived from [`Config`].
#[derive(Debug, Clone, PartialEq)]
pub struct QBittorrentConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    pub timeout_secs: u64,
}

fn default_check_interval() -> u64 {
    10
}

fn default_client_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_max_episodes() -> usize {
    12
}

fn default_retry_limit() -> usize {
    5
}

fn default_true() -> bool {
    true
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_port() -> u16 {
    8091
}

fn default_tracker_url() -> String {
    "https://graphql.anilist.co".to_string()
}

fn default_indexer_url() -> String {
    "https://nyaa.si".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Config as served by the control surface (client password redacted).
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub tracker_user: String,
    pub save_path: String,
    pub completed_path: String,
    pub check_interval_minutes: u64,
    pub client_url: String,
    pub client_username: String,
    pub client_password_configured: bool,
    pub max_episodes_per_series: usize,
    pub episode_retry_limit: usize,
    pub delete_watched: bool,
    pub excluded_list: String,
    pub server: ServerConfig,
    pub tracker: TrackerConfig,
    pub indexer: IndexerConfig,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            tracker_user: config.tracker_user.clone(),
            save_path: config.save_path.clone(),
            completed_path: config.completed_path.clone(),
            check_interval_minutes: config.check_interval_minutes,
            client_url: config.client_url.clone(),
            client_username: config.client_username.clone(),
            client_password_configured: !config.client_password.is_empty(),
            max_episodes_per_series: config.max_episodes_per_series,
            episode_retry_limit: config.episode_retry_limit,
            delete_watched: config.delete_watched,
            excluded_list: config.excluded_list.clone(),
            server: config.server.clone(),
            tracker: config.tracker.clone(),
            indexer: config.indexer.clone(),
        }
    }
}
