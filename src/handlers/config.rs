//! Configuration handlers
//!
//! Returns public configuration settings to the dashboard

use axum::{extract::State, response::Json};
use serde::Serialize;

use crate::state::AppState;

/// Public configuration response
#[derive(Debug, Serialize)]
pub struct PublicConfig {
    /// Longest shift plan the API accepts, in days
    #[serde(rename = "maxPlanDays")]
    pub max_plan_days: i64,
    pub version: String,
}

/// GET /api/config
pub async fn get_config(State(state): State<AppState>) -> Json<PublicConfig> {
    Json(PublicConfig {
        max_plan_days: state.config.web.max_plan_days,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
