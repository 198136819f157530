//! Configuration API handlers.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use std::sync::Arc;

use anisync_core::{Config, SanitizedConfig};

use super::response::{ok, ApiError, ApiResult};
use crate::state::AppState;

/// GET /api/v1/config
pub async fn get_config(State(state): State<Arc<AppState>>) -> ApiResult<SanitizedConfig> {
    let config = state.daemon().config()?;
    ok(SanitizedConfig::from(&config))
}

/// PUT /api/v1/config
///
/// Replaces the whole configuration. The client password is never sent back
/// by GET, so an empty one keeps the stored password.
pub async fn update_config(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Config>, JsonRejection>,
) -> ApiResult<SanitizedConfig> {
    let Json(mut config) =
        payload.map_err(|e| ApiError::bad_request("INVALID_JSON", e.body_text()))?;

    if config.client_password.is_empty() {
        config.client_password = state.daemon().config()?.client_password;
    }

    let saved = state.daemon().update_config(config).await?;
    ok(SanitizedConfig::from(&saved))
}
