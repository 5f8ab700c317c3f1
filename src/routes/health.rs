use axum::{extract::State, response::Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub database: String,
}

/// Health check endpoint
///
/// Always answers 200; a failed database ping shows up as `degraded`.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    let (status, database) = match state.db.ping().await {
        Ok(()) => ("healthy", "up"),
        Err(e) => {
            tracing::warn!("Database ping failed: {}", e);
            ("degraded", "down")
        }
    };

    Json(HealthStatus {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::test_support::*;

    #[tokio::test]
    async fn test_health_check() {
        let app = test_app().await;
        let (status, body) = get(&app, "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "up");
    }
}
