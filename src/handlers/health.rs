use axum::{Json, extract::State};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub name: String,
    pub version: String,
    pub env: String,
}

/// GET /api/health
///
/// DB には問い合わせない（プロセスの生存確認のみ）
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        name: state.app.name.clone(),
        version: state.app.version.clone(),
        env: state.app.env.clone(),
    })
}
