//! Common test utilities for API testing with mocks.
//!
//! Builds the full router in-process over a daemon whose tracker, index and
//! torrent client are mocks, with the config file and ledger in a temp dir.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use anisync_core::{
    testing::{MockIndexer, MockTorrentClient, MockTracker},
    ConfigStore, Daemon, FileLedger, Reconciler, StateRegister,
};
use anisync_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use anisync_core::testing::fixtures;

/// In-process server with controllable mocks.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_status() {
///     let fixture = TestFixture::configured();
///     let response = fixture.get("/api/v1/status").await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    pub router: Router,
    pub daemon: Arc<Daemon>,
    pub tracker: Arc<MockTracker>,
    pub indexer: Arc<MockIndexer>,
    pub torrent_client: Arc<MockTorrentClient>,
    pub ledger: Arc<FileLedger>,
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Fixture with the default, incomplete configuration.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let data_dir = temp_dir.path().join("data");

        let tracker = Arc::new(MockTracker::new());
        let indexer = Arc::new(MockIndexer::new());
        let torrent_client = Arc::new(MockTorrentClient::new());
        let ledger = Arc::new(FileLedger::in_dir(&data_dir));

        let reconciler = Reconciler::new(
            Arc::new(ConfigStore::in_dir(&data_dir)),
            Arc::clone(&ledger),
            Arc::new(StateRegister::new()),
            tracker.clone(),
            indexer.clone(),
        )
        .with_client(torrent_client.clone());

        let daemon = Arc::new(Daemon::new(reconciler));
        let router = create_router(Arc::new(AppState::new(Arc::clone(&daemon))));

        Self {
            router,
            daemon,
            tracker,
            indexer,
            torrent_client,
            ledger,
            temp_dir,
        }
    }

    /// Fixture with a complete configuration for user `tester`.
    pub fn configured() -> Self {
        let fixture = Self::new();
        let config = fixtures::config(&fixture.save_root().to_string_lossy());
        ConfigStore::in_dir(&fixture.data_dir())
            .save(&config)
            .expect("Failed to save config");
        fixture
    }

    pub fn data_dir(&self) -> PathBuf {
        self.temp_dir.path().join("data")
    }

    pub fn save_root(&self) -> PathBuf {
        self.temp_dir.path().join("anime")
    }

    /// Poll until a cycle has completed successfully.
    pub async fn wait_for_check(&self) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.daemon.status().last_check.is_none() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("cycle did not complete in time");
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request without a body.
    pub async fn post(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    /// Send a PUT request with raw string body (for testing malformed JSON).
    pub async fn put_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("PUT")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, bytes) = self.send(request).await;
        TestResponse {
            status,
            body: parse_body(&bytes),
        }
    }

    /// GET returning the raw body text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        let (status, bytes) = self.send(request).await;
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let (status, bytes) = self.send(request_builder.body(body).unwrap()).await;
        TestResponse {
            status,
            body: parse_body(&bytes),
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, bytes.to_vec())
    }
}

fn parse_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(bytes).unwrap_or(Value::Null)
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}

/// Assert the failure envelope carries `code`.
#[macro_export]
macro_rules! assert_error_code {
    ($response:expr, $code:expr) => {
        assert_eq!($response.body["success"], false);
        assert_eq!(
            $response.body["error"]["code"], $code,
            "Body: {}",
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
