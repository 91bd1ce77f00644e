use axum::{Router, http::StatusCode, routing::get};
use tower_http::cors::CorsLayer;
use tower_http::timeout::{RequestBodyTimeoutLayer, TimeoutLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::handlers;
use crate::state::AppState;

/// Router の構築
///
/// タイムアウトでハンドラーの Future が drop されると、実行中のクエリも中断される。
pub fn create_router(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health_check))
        .nest("/api/v1", handlers::user::routes())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            server.write_timeout(),
        ))
        .layer(RequestBodyTimeoutLayer::new(server.read_timeout()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
