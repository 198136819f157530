use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{config, episodes, handlers, middleware::metrics_middleware, ws};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health and status
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::get_status))
        // Loop control
        .route("/check", post(handlers::trigger_check))
        .route("/daemon/start", post(handlers::start_daemon))
        .route("/daemon/stop", post(handlers::stop_daemon))
        // Configuration
        .route("/config", get(config::get_config).put(config::update_config))
        // Ledger and tracker
        .route("/episodes", get(episodes::list_episodes))
        .route("/animes", get(episodes::list_animes))
        .route("/watchlist", get(episodes::get_watchlist))
        // Live status feed
        .route("/ws", get(ws::ws_handler));

    Router::new()
        .route("/metrics", get(handlers::metrics))
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
