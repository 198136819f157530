//! Health, status and loop control handlers.

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use anisync_core::{CycleOutcome, DaemonStatus, StateSnapshot};

use super::response::{ok, ApiResult, MessageResponse};
use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Daemon status as reported by `/status` and the live feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: DaemonStatus,
    pub last_check: Option<DateTime<Utc>>,
    pub has_error: bool,
    pub last_error: Option<String>,
}

impl From<StateSnapshot> for StatusResponse {
    fn from(snapshot: StateSnapshot) -> Self {
        Self {
            status: snapshot.status,
            last_check: snapshot.last_check,
            has_error: snapshot.has_error(),
            last_error: snapshot.last_error,
        }
    }
}

pub async fn health() -> ApiResult<HealthResponse> {
    ok(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> ApiResult<StatusResponse> {
    ok(StatusResponse::from(state.daemon().status()))
}

/// POST /api/v1/check
///
/// Starts a cycle in the background and returns immediately.
pub async fn trigger_check(State(state): State<Arc<AppState>>) -> ApiResult<MessageResponse> {
    let handle = state.daemon().trigger_check();
    tokio::spawn(async move {
        match handle.await {
            Ok(CycleOutcome::Failed(e)) => warn!(error = %e, "Manual check failed"),
            Ok(outcome) => info!(result = outcome.label(), "Manual check finished"),
            Err(e) => warn!(error = %e, "Manual check task ended abnormally"),
        }
    });
    ok(MessageResponse::new("Check started"))
}

pub async fn start_daemon(State(state): State<Arc<AppState>>) -> ApiResult<MessageResponse> {
    state.daemon().start_loop().await?;
    info!("Daemon loop started via API");
    ok(MessageResponse::new("Daemon started"))
}

pub async fn stop_daemon(State(state): State<Arc<AppState>>) -> ApiResult<MessageResponse> {
    state.daemon().stop_loop().await?;
    info!("Daemon loop stopped via API");
    ok(MessageResponse::new("Daemon stopped"))
}

/// GET /metrics in Prometheus text format.
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state).await;
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}
