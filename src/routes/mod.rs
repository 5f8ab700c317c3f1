use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::handlers::{config, department, employee, schedule, shift_plan, shift_type};
use crate::state::AppState;

pub mod health;

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let api_routes = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Config routes
        .route("/config", get(config::get_config))
        // Department routes
        .route(
            "/departments",
            get(department::list_departments).post(department::create_department),
        )
        .route(
            "/departments/:id",
            get(department::get_department)
                .put(department::update_department)
                .delete(department::delete_department),
        )
        // Employee routes
        .route(
            "/employees",
            get(employee::list_employees).post(employee::create_employee),
        )
        .route(
            "/employees/:id",
            get(employee::get_employee)
                .put(employee::update_employee)
                .delete(employee::delete_employee),
        )
        // Shift type routes
        .route(
            "/shift-types",
            get(shift_type::list_shift_types).post(shift_type::create_shift_type),
        )
        .route(
            "/shift-types/:id",
            get(shift_type::get_shift_type)
                .put(shift_type::update_shift_type)
                .delete(shift_type::delete_shift_type),
        )
        // Shift plan routes
        .route(
            "/shift-plans",
            get(shift_plan::list_shift_plans).post(shift_plan::create_shift_plan),
        )
        .route(
            "/shift-plans/:id",
            get(shift_plan::get_shift_plan)
                .put(shift_plan::update_shift_plan)
                .delete(shift_plan::delete_shift_plan),
        )
        // Schedule routes
        .route(
            "/schedules/:plan_id",
            get(schedule::list_schedules)
                .post(schedule::save_schedules)
                .delete(schedule::delete_schedules),
        )
        .route("/schedules/:plan_id/calendar", get(schedule::calendar));

    // Static file service for the dashboard, falls back to index.html for SPA routing
    let static_dir = &state.config.web.static_dir;
    let serve_dir = ServeDir::new(static_dir)
        .not_found_service(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .nest("/api", api_routes)
        .fallback_service(serve_dir)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::test_support::*;

    #[tokio::test]
    async fn test_wrong_method_is_rejected() {
        let app = test_app().await;
        let (status, _) = send(&app, axum::http::Method::PATCH, "/api/departments", None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_config_endpoint() {
        let app = test_app().await;
        let (status, body) = get(&app, "/api/config").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["maxPlanDays"], 366);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }
}
