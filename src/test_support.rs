//! Router-level test helpers
//!
//! Every test gets its own in-memory sqlite database, migrated by the same
//! code the server runs at startup.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::config::{Config, DatabaseConfig};
use crate::db;
use crate::routes;
use crate::state::AppState;

pub async fn test_app() -> Router {
    let db = db::init_database(&DatabaseConfig::sqlite_memory())
        .await
        .expect("sqlite in-memory database");
    routes::create_router(AppState::new(db, Config::default()))
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

pub async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn put(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::PUT, uri, Some(body)).await
}

pub async fn delete(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::DELETE, uri, None).await
}

pub async fn create_department(app: &Router, name: &str) -> i64 {
    let (status, body) = post(app, "/api/departments", json!({ "name": name })).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}

pub async fn create_employee(app: &Router, department_id: i64, code: &str, group: Option<&str>) -> i64 {
    let (status, body) = post(
        app,
        "/api/employees",
        json!({
            "firstName": "Test",
            "lastName": code,
            "employeeId": code,
            "role": "nurse",
            "departmentId": department_id,
            "group": group,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}

pub async fn create_plan(app: &Router, department_ids: &[i64], start: &str, end: &str) -> i64 {
    let (status, body) = post(
        app,
        "/api/shift-plans",
        json!({
            "name": "Plan",
            "startDate": start,
            "endDate": end,
            "departmentIds": department_ids,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}

pub async fn create_shift_type(app: &Router, plan_id: i64, code: &str) -> i64 {
    let (status, body) = post(
        app,
        "/api/shift-types",
        json!({
            "code": code,
            "name": format!("Shift {code}"),
            "color": "#336699",
            "shiftPlanId": plan_id,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}
