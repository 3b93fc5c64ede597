//! Health and readiness endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::server::AppState;

/// GET /health - Liveness
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "credentis",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /ready - Readiness, including database connectivity
pub async fn readiness_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => Ok(Json(serde_json::json!({
            "status": "ready",
            "database": "connected",
        }))),
        Err(e) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            format!("Database unavailable: {}", e),
        )),
    }
}
