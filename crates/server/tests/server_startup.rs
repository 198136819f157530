use std::net::TcpListener;
use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use tempfile::TempDir;
use tokio::time::{sleep, timeout};

/// Find an available port
fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Write a config that points the tracker and client at closed ports.
fn write_config(dir: &Path, port: u16, tracker_user: &str) {
    let dead = get_available_port();
    let config = format!(
        r#"
tracker_user = "{tracker_user}"
save_path = "{save}"
client_url = "http://127.0.0.1:{dead}"

[server]
host = "127.0.0.1"
port = {port}

[tracker]
url = "http://127.0.0.1:{dead}"
timeout_secs = 1

[indexer]
url = "http://127.0.0.1:{dead}"
timeout_secs = 1
"#,
        save = dir.join("anime").display(),
    );
    std::fs::write(dir.join("config.toml"), config).unwrap();
}

/// Spawn the server and return a handle
fn spawn_server(home: &Path) -> tokio::process::Child {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_anisync"))
        .env("ANISYNC_HOME", home)
        .env("RUST_LOG", "error") // Quiet logs during tests
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to spawn server")
}

/// Wait for server to be ready
async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    let client = Client::new();
    for _ in 0..max_attempts {
        if client
            .get(format!("http://127.0.0.1:{}/api/v1/health", port))
            .send()
            .await
            .is_ok()
        {
            return true;
        }
        sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn test_health_endpoint() {
    let home = TempDir::new().unwrap();
    let port = get_available_port();
    write_config(home.path(), port, "tester");

    let mut server = spawn_server(home.path());
    assert!(
        wait_for_server(port, 100).await,
        "Server did not start in time"
    );

    let response = Client::new()
        .get(format!("http://127.0.0.1:{}/api/v1/health", port))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let json: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["status"], "ok");

    server.kill().await.ok();
}

#[tokio::test]
async fn test_loop_starts_automatically_and_reports_upstream_error() {
    let home = TempDir::new().unwrap();
    let port = get_available_port();
    write_config(home.path(), port, "tester");

    let mut server = spawn_server(home.path());
    assert!(
        wait_for_server(port, 100).await,
        "Server did not start in time"
    );

    let client = Client::new();
    let url = format!("http://127.0.0.1:{}/api/v1/status", port);

    // The client URL points at a closed port, so the first cycle fails.
    let status = timeout(Duration::from_secs(10), async {
        loop {
            let json: serde_json::Value = client
                .get(&url)
                .send()
                .await
                .expect("Failed to send request")
                .json()
                .await
                .expect("Failed to parse JSON");
            if json["data"]["has_error"] == true {
                return json;
            }
            sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("cycle error was never reported");

    assert_ne!(status["data"]["status"], "stopped");

    let response = client
        .post(format!("http://127.0.0.1:{}/api/v1/daemon/start", port))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_first_start_writes_default_config() {
    let home = TempDir::new().unwrap();
    let port = get_available_port();

    // No config file: defaults are written, the port comes from the environment.
    let mut server = tokio::process::Command::new(env!("CARGO_BIN_EXE_anisync"))
        .env("ANISYNC_HOME", home.path())
        .env("ANISYNC_SERVER__PORT", port.to_string())
        .env("RUST_LOG", "error")
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to spawn server");

    // Defaults are written before the listener binds.
    let config_path = home.path().join("config.toml");
    let written = timeout(Duration::from_secs(5), async {
        while !config_path.exists() {
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(written.is_ok(), "Default config was not written");

    let contents = std::fs::read_to_string(&config_path).unwrap();
    assert!(contents.contains("check_interval_minutes = 10"));

    assert!(
        wait_for_server(port, 100).await,
        "Server did not start on the overridden port"
    );
    let json: serde_json::Value = Client::new()
        .get(format!("http://127.0.0.1:{}/api/v1/config", port))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse JSON");
    assert_eq!(json["data"]["tracker_user"], "");
    assert_eq!(json["data"]["server"]["port"], port);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_unreadable_config_exits_with_error() {
    let home = TempDir::new().unwrap();
    std::fs::write(
        home.path().join("config.toml"),
        "check_interval_minutes = \"often\"\n",
    )
    .unwrap();

    let result = timeout(
        Duration::from_secs(5),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_anisync"))
            .env("ANISYNC_HOME", home.path())
            .env("RUST_LOG", "error")
            .output(),
    )
    .await
    .expect("Command timed out")
    .expect("Failed to execute command");

    assert!(!result.status.success());
}
