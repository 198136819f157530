//! REST API tests against the in-process router.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use anisync_core::tracker::TrackerError;
use common::{fixtures, TestFixture};

#[tokio::test]
async fn test_health() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/v1/health").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["data"]["status"], "ok");
    assert!(response.body["error"].is_null());
}

#[tokio::test]
async fn test_status_starts_stopped() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/v1/status").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "stopped");
    assert_eq!(response.body["data"]["has_error"], false);
    assert!(response.body["data"]["last_check"].is_null());
}

#[tokio::test]
async fn test_daemon_start_and_stop() {
    let fixture = TestFixture::configured();

    let response = fixture.post("/api/v1/daemon/start").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["data"]["message"], "Daemon started");

    let response = fixture.post("/api/v1/daemon/start").await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_error_code!(response, "ALREADY_RUNNING");

    fixture.wait_for_check().await;
    let response = fixture.get("/api/v1/status").await;
    assert_ne!(response.body["data"]["status"], "stopped");
    assert!(response.body["data"]["last_check"].is_string());

    let response = fixture.post("/api/v1/daemon/stop").await;
    assert_status!(response, StatusCode::OK);

    let response = fixture.post("/api/v1/daemon/stop").await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_error_code!(response, "NOT_RUNNING");

    let response = fixture.get("/api/v1/status").await;
    assert_eq!(response.body["data"]["status"], "stopped");
}

#[tokio::test]
async fn test_manual_check_enqueues_episodes() {
    let fixture = TestFixture::configured();
    fixture
        .tracker
        .set_watchlist(vec![fixtures::series("Frieren", 0, &[(101, 1)])])
        .await;
    fixture
        .indexer
        .add_release(&fixtures::release("SubsPlease", "Frieren", 1))
        .await;

    let response = fixture.post("/api/v1/check").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["data"]["message"], "Check started");

    fixture.wait_for_check().await;
    assert_eq!(fixture.torrent_client.added_torrents().await.len(), 1);

    let response = fixture.get("/api/v1/episodes").await;
    assert_status!(response, StatusCode::OK);
    let episodes = response.body["data"].as_array().unwrap();
    assert_eq!(episodes.len(), 1);
    assert_eq!(episodes[0]["episode_id"], 101);
    assert_eq!(episodes[0]["episode_name"], "Frieren - Episode 1");

    // Manual checks leave a stopped loop stopped.
    let response = fixture.get("/api/v1/status").await;
    assert_eq!(response.body["data"]["status"], "stopped");
}

#[tokio::test]
async fn test_check_with_incomplete_config_reports_error() {
    let fixture = TestFixture::new();

    fixture.post("/api/v1/check").await;
    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while !fixture.daemon.status().has_error() {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("error was never recorded");

    let response = fixture.get("/api/v1/status").await;
    assert_eq!(response.body["data"]["has_error"], true);
    assert!(response.body["data"]["last_error"]
        .as_str()
        .unwrap()
        .contains("incomplete"));
}

#[tokio::test]
async fn test_get_config_is_sanitized() {
    let fixture = TestFixture::new();
    let mut config = fixtures::config("/anime");
    config.client_password = "hunter2".to_string();
    fixture.daemon.update_config(config).await.unwrap();

    let response = fixture.get("/api/v1/config").await;
    assert_status!(response, StatusCode::OK);
    let data = &response.body["data"];
    assert_eq!(data["tracker_user"], "tester");
    assert_eq!(data["save_path"], "/anime");
    assert_eq!(data["client_password_configured"], true);
    assert!(data.get("client_password").is_none());
    assert!(!response.body.to_string().contains("hunter2"));
}

#[tokio::test]
async fn test_put_config_saves_and_keeps_password() {
    let fixture = TestFixture::new();
    let mut config = fixtures::config("/anime");
    config.client_password = "hunter2".to_string();
    fixture.daemon.update_config(config).await.unwrap();

    let response = fixture
        .put(
            "/api/v1/config",
            json!({
                "tracker_user": "someone_else",
                "save_path": "/media/anime",
                "check_interval_minutes": 30,
                "max_episodes_per_series": 4,
            }),
        )
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["data"]["tracker_user"], "someone_else");
    assert_eq!(response.body["data"]["max_episodes_per_series"], 4);

    let stored = fixture.daemon.config().unwrap();
    assert_eq!(stored.save_path, "/media/anime");
    assert_eq!(stored.check_interval_minutes, 30);
    assert_eq!(stored.client_password, "hunter2");
}

#[tokio::test]
async fn test_put_config_rejects_invalid_values() {
    let fixture = TestFixture::configured();

    let response = fixture
        .put(
            "/api/v1/config",
            json!({ "tracker_user": "", "save_path": "/anime" }),
        )
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_error_code!(response, "VALIDATION_ERROR");

    let response = fixture
        .put(
            "/api/v1/config",
            json!({ "tracker_user": "tester", "save_path": "/anime", "episode_retry_limit": 0 }),
        )
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_error_code!(response, "VALIDATION_ERROR");

    // Nothing was written.
    assert_eq!(fixture.daemon.config().unwrap().tracker_user, "tester");
}

#[tokio::test]
async fn test_put_config_rejects_malformed_json() {
    let fixture = TestFixture::configured();

    let response = fixture.put_raw("/api/v1/config", "{not json").await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_error_code!(response, "INVALID_JSON");
}

#[tokio::test]
async fn test_interval_change_restarts_running_loop() {
    let fixture = TestFixture::configured();
    fixture.post("/api/v1/daemon/start").await;
    fixture.wait_for_check().await;

    let mut config = fixture.daemon.config().unwrap();
    config.check_interval_minutes = 45;
    let response = fixture
        .put("/api/v1/config", serde_json::to_value(&config).unwrap())
        .await;
    assert_status!(response, StatusCode::OK);
    assert!(fixture.daemon.is_running());

    fixture.post("/api/v1/daemon/stop").await;
}

#[tokio::test]
async fn test_animes_groups_ledger_rows() {
    let fixture = TestFixture::configured();
    fixture
        .ledger
        .append(&[
            fixtures::ledger_row(101, "h1", "Frieren", 1),
            fixtures::ledger_row(102, "h2", "Frieren", 2),
            fixtures::ledger_row(201, "h3", "Dungeon Meshi", 1),
        ])
        .await
        .unwrap();

    let response = fixture.get("/api/v1/animes").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(
        response.body["data"],
        json!([
            { "name": "Dungeon Meshi", "episodes_count": 1, "latest_episode_id": 201 },
            { "name": "Frieren", "episodes_count": 2, "latest_episode_id": 102 },
        ])
    );
}

#[tokio::test]
async fn test_episodes_empty_ledger() {
    let fixture = TestFixture::configured();

    let response = fixture.get("/api/v1/episodes").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["data"], json!([]));
}

#[tokio::test]
async fn test_watchlist_requires_user() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/v1/watchlist").await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_error_code!(response, "NOT_CONFIGURED");
}

#[tokio::test]
async fn test_watchlist_returns_tracker_list() {
    let fixture = TestFixture::configured();
    fixture
        .tracker
        .set_watchlist(vec![fixtures::series("Frieren", 3, &[(101, 1)])])
        .await;

    let response = fixture.get("/api/v1/watchlist").await;
    assert_status!(response, StatusCode::OK);
    let list = response.body["data"].as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["english_title"], "Frieren");
    assert_eq!(list[0]["progress"], 3);
    assert_eq!(fixture.tracker.requests().await, vec!["tester".to_string()]);
}

#[tokio::test]
async fn test_watchlist_tracker_failure() {
    let fixture = TestFixture::configured();
    fixture
        .tracker
        .set_next_error(TrackerError::ConnectionFailed("refused".to_string()))
        .await;

    let response = fixture.get("/api/v1/watchlist").await;
    assert_status!(response, StatusCode::BAD_GATEWAY);
    assert_error_code!(response, "TRACKER_ERROR");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::configured();
    fixture.get("/api/v1/health").await;

    let (status, body) = fixture.get_text("/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("# TYPE"));
    assert!(body.contains("anisync_daemon_running"));
    assert!(body.contains("anisync_ledger_episodes"));
    assert!(body.contains("anisync_http_requests_total"));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/v1/does-not-exist").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
