//! qBittorrent torrent client implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::QBittorrentConfig;

use super::{AddTorrentRequest, ClientTorrent, TorrentClient, TorrentClientError};

/// qBittorrent WebUI API v2 client.
pub struct QBittorrentClient {
    client: Client,
    config: QBittorrentConfig,
    /// Set once logged in; cleared when the session expires.
    session: Arc<RwLock<Option<String>>>,
}

impl QBittorrentClient {
    pub fn new(config: QBittorrentConfig) -> Result<Self, TorrentClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .cookie_store(true)
            .build()
            .map_err(|e| TorrentClientError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            config,
            session: Arc::new(RwLock::new(None)),
        })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url(), endpoint)
    }

    fn requires_login(&self) -> bool {
        !self.config.username.is_empty()
    }

    /// Login and store session cookie.
    async fn login(&self) -> Result<(), TorrentClientError> {
        let params = [
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];

        let response = self
            .client
            .post(self.url("/api/v2/auth/login"))
            .form(&params)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if body.contains("Ok.") {
            debug!("qBittorrent login successful");
            // Session cookie is stored by the cookie jar
            let mut session = self.session.write().await;
            *session = Some("authenticated".to_string());
            Ok(())
        } else if body.contains("Fails.") || status == StatusCode::FORBIDDEN {
            Err(TorrentClientError::AuthenticationFailed(
                "Invalid credentials".to_string(),
            ))
        } else {
            Err(TorrentClientError::AuthenticationFailed(format!(
                "Unexpected response: {}",
                body.chars().take(100).collect::<String>()
            )))
        }
    }

    /// Ensure we have a valid session, logging in if needed.
    async fn ensure_authenticated(&self) -> Result<(), TorrentClientError> {
        if !self.requires_login() {
            return Ok(());
        }
        let session = self.session.read().await;
        if session.is_some() {
            return Ok(());
        }
        drop(session);
        self.login().await
    }

    /// Send a request, logging in again once if the session expired.
    async fn execute<F>(&self, build: F) -> Result<String, TorrentClientError>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        self.ensure_authenticated().await?;

        let mut response = build().send().await.map_err(map_send_error)?;

        if response.status() == StatusCode::FORBIDDEN && self.requires_login() {
            warn!("qBittorrent session expired, re-authenticating");
            {
                let mut session = self.session.write().await;
                *session = None;
            }
            self.login().await?;
            response = build().send().await.map_err(map_send_error)?;
        }

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TorrentClientError::ApiError(e.to_string()))?;

        if !status.is_success() {
            return Err(TorrentClientError::ApiError(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }
        Ok(body)
    }

    async fn post_form(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<String, TorrentClientError> {
        let url = self.url(endpoint);
        self.execute(|| self.client.post(&url).form(params)).await
    }
}

fn map_send_error(e: reqwest::Error) -> TorrentClientError {
    if e.is_timeout() {
        TorrentClientError::Timeout
    } else if e.is_connect() {
        TorrentClientError::ConnectionFailed(e.to_string())
    } else {
        TorrentClientError::ApiError(e.to_string())
    }
}

/// qBittorrent torrent info response.
#[derive(Debug, Deserialize)]
struct QBTorrentInfo {
    hash: String,
    name: String,
    #[serde(default)]
    save_path: String,
    #[serde(default)]
    content_path: String,
}

impl QBTorrentInfo {
    fn into_client_torrent(self) -> ClientTorrent {
        ClientTorrent {
            hash: self.hash.to_lowercase(),
            name: self.name,
            save_path: self.save_path,
            content_path: self.content_path,
        }
    }
}

fn parse_torrent_list(body: &str) -> Result<Vec<ClientTorrent>, TorrentClientError> {
    let torrents: Vec<QBTorrentInfo> = serde_json::from_str(body).map_err(|e| {
        TorrentClientError::ApiError(format!("Failed to parse torrent list: {}", e))
    })?;
    Ok(torrents
        .into_iter()
        .map(QBTorrentInfo::into_client_torrent)
        .collect())
}

#[async_trait]
impl TorrentClient for QBittorrentClient {
    fn name(&self) -> &str {
        "qbittorrent"
    }

    async fn list_torrents(&self, category: &str) -> Result<Vec<ClientTorrent>, TorrentClientError> {
        let url = format!(
            "{}?category={}",
            self.url("/api/v2/torrents/info"),
            urlencoding::encode(category)
        );
        let body = self.execute(|| self.client.get(&url)).await?;
        parse_torrent_list(&body)
    }

    async fn add_torrent(&self, request: &AddTorrentRequest) -> Result<(), TorrentClientError> {
        let url = self.url("/api/v2/torrents/add");
        debug!(
            rename = %request.rename,
            save_path = %request.save_path,
            "Adding torrent to qBittorrent"
        );

        let body = self
            .execute(|| {
                let mut form = multipart::Form::new()
                    .text("urls", request.magnet.clone())
                    .text("category", request.category.clone());
                if !request.save_path.is_empty() {
                    form = form.text("savepath", request.save_path.clone());
                }
                if !request.rename.is_empty() {
                    form = form.text("rename", request.rename.clone());
                }
                self.client.post(&url).multipart(form)
            })
            .await?;

        if body.contains("Fails.") {
            return Err(TorrentClientError::ApiError(
                "qBittorrent rejected the torrent".to_string(),
            ));
        }
        Ok(())
    }

    async fn delete_torrents(&self, hashes: &[String]) -> Result<(), TorrentClientError> {
        if hashes.is_empty() {
            return Ok(());
        }
        let joined = hashes.join("|");
        self.post_form(
            "/api/v2/torrents/delete",
            &[("hashes", joined.as_str()), ("deleteFiles", "true")],
        )
        .await?;
        debug!(count = hashes.len(), "Deleted torrents");
        Ok(())
    }

    async fn relocate(&self, hashes: &[String], location: &str) -> Result<(), TorrentClientError> {
        if hashes.is_empty() {
            return Ok(());
        }
        let joined = hashes.join("|");
        self.post_form(
            "/api/v2/torrents/setLocation",
            &[("hashes", joined.as_str()), ("location", location)],
        )
        .await?;
        debug!(count = hashes.len(), location = location, "Relocated torrents");
        Ok(())
    }
}
