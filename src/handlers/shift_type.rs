//! Shift type handlers
//!
//! A shift type belongs to exactly one plan and its code is unique inside
//! that plan.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::entity::{schedule, shift_plan, shift_type};
use crate::error::{AppError, AppResult, FieldErrors, OptionExt};
use crate::handlers::double_option;
use crate::middleware::validate::{clock_time, hex_color, not_blank};
use crate::middleware::ValidatedJson;
use crate::state::AppState;

/// Create shift type request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateShiftTypeRequest {
    #[validate(length(min = 1, max = 3), custom(function = "not_blank"))]
    pub code: String,
    #[validate(length(min = 1, max = 64), custom(function = "not_blank"))]
    pub name: String,
    #[validate(custom(function = "hex_color"))]
    pub color: String,
    #[validate(custom(function = "clock_time"))]
    pub start_time: Option<String>,
    #[validate(custom(function = "clock_time"))]
    pub end_time: Option<String>,
    #[serde(default)]
    pub requires_time: bool,
    pub shift_plan_id: i64,
}

/// Update shift type request, absent fields are left unchanged
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateShiftTypeRequest {
    #[validate(length(min = 1, max = 3), custom(function = "not_blank"))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 64), custom(function = "not_blank"))]
    pub name: Option<String>,
    #[validate(custom(function = "hex_color"))]
    pub color: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub start_time: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub end_time: Option<Option<String>>,
    pub requires_time: Option<bool>,
}

/// Shift type response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftTypeResponse {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub color: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub requires_time: bool,
    pub shift_plan_id: i64,
}

impl From<shift_type::Model> for ShiftTypeResponse {
    fn from(m: shift_type::Model) -> Self {
        Self {
            id: m.id,
            code: m.code,
            name: m.name,
            color: m.color,
            start_time: m.start_time,
            end_time: m.end_time,
            requires_time: m.requires_time,
            shift_plan_id: m.shift_plan_id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftTypeQuery {
    pub plan_id: Option<i64>,
}

/// GET /api/shift-types
pub async fn list_shift_types(
    State(state): State<AppState>,
    Query(query): Query<ShiftTypeQuery>,
) -> AppResult<Json<Vec<ShiftTypeResponse>>> {
    let mut select = shift_type::Entity::find();
    if let Some(plan_id) = query.plan_id {
        select = select.filter(shift_type::Column::ShiftPlanId.eq(plan_id));
    }
    let types = select
        .order_by_asc(shift_type::Column::ShiftPlanId)
        .order_by_asc(shift_type::Column::Code)
        .all(&state.db)
        .await?;
    Ok(Json(types.into_iter().map(ShiftTypeResponse::from).collect()))
}

/// GET /api/shift-types/:id
pub async fn get_shift_type(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ShiftTypeResponse>> {
    let shift = shift_type::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_not_found(format!("Shift type {id}"))?;
    Ok(Json(shift.into()))
}

/// POST /api/shift-types
pub async fn create_shift_type(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateShiftTypeRequest>,
) -> AppResult<(StatusCode, Json<ShiftTypeResponse>)> {
    let db = &state.db;

    check_time_window(req.requires_time, req.start_time.as_deref(), req.end_time.as_deref())?;

    shift_plan::Entity::find_by_id(req.shift_plan_id)
        .one(db)
        .await?
        .ok_or_not_found(format!("Shift plan {}", req.shift_plan_id))?;

    let code = req.code.trim().to_string();
    ensure_code_free(db, req.shift_plan_id, &code, None).await?;

    // The unique index turns a concurrent duplicate into a 409 as well
    let shift = shift_type::ActiveModel {
        code: Set(code),
        name: Set(req.name.trim().to_string()),
        color: Set(req.color),
        start_time: Set(req.start_time),
        end_time: Set(req.end_time),
        requires_time: Set(req.requires_time),
        shift_plan_id: Set(req.shift_plan_id),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(shift_type_id = shift.id, plan_id = shift.shift_plan_id, code = %shift.code, "Shift type created");
    Ok((StatusCode::CREATED, Json(shift.into())))
}

/// PUT /api/shift-types/:id
pub async fn update_shift_type(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateShiftTypeRequest>,
) -> AppResult<Json<ShiftTypeResponse>> {
    let db = &state.db;

    let current = shift_type::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_not_found(format!("Shift type {id}"))?;

    let mut fields = FieldErrors::new();
    for (field, value) in [("startTime", &req.start_time), ("endTime", &req.end_time)] {
        if let Some(Some(time)) = value {
            if clock_time(time).is_err() {
                fields.insert(field.to_string(), vec!["must be a HH:MM time".to_string()]);
            }
        }
    }
    if !fields.is_empty() {
        return Err(AppError::Validation(fields));
    }

    let start_time = req.start_time.unwrap_or_else(|| current.start_time.clone());
    let end_time = req.end_time.unwrap_or_else(|| current.end_time.clone());
    let requires_time = req.requires_time.unwrap_or(current.requires_time);
    check_time_window(requires_time, start_time.as_deref(), end_time.as_deref())?;

    let plan_id = current.shift_plan_id;
    let mut model: shift_type::ActiveModel = current.into();

    if let Some(code) = req.code {
        let code = code.trim().to_string();
        ensure_code_free(db, plan_id, &code, Some(id)).await?;
        model.code = Set(code);
    }
    if let Some(name) = req.name {
        model.name = Set(name.trim().to_string());
    }
    if let Some(color) = req.color {
        model.color = Set(color);
    }
    model.start_time = Set(start_time);
    model.end_time = Set(end_time);
    model.requires_time = Set(requires_time);

    let shift = model.update(db).await?;

    tracing::info!(shift_type_id = id, "Shift type updated");
    Ok(Json(shift.into()))
}

/// DELETE /api/shift-types/:id
///
/// Schedule rows using the shift type are removed with it.
pub async fn delete_shift_type(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let txn = state.db.begin().await?;

    shift_type::Entity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_not_found(format!("Shift type {id}"))?;

    let removed = schedule::Entity::delete_many()
        .filter(schedule::Column::ShiftTypeId.eq(id))
        .exec(&txn)
        .await?;
    shift_type::Entity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;

    tracing::info!(shift_type_id = id, schedules_removed = removed.rows_affected, "Shift type deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// A timed shift needs both ends of its window
fn check_time_window(requires_time: bool, start: Option<&str>, end: Option<&str>) -> AppResult<()> {
    if !requires_time {
        return Ok(());
    }
    let mut fields = FieldErrors::new();
    if start.is_none() {
        fields.insert("startTime".to_string(), vec!["required when requiresTime is set".to_string()]);
    }
    if end.is_none() {
        fields.insert("endTime".to_string(), vec!["required when requiresTime is set".to_string()]);
    }
    if fields.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(fields))
    }
}

async fn ensure_code_free<C: ConnectionTrait>(
    db: &C,
    plan_id: i64,
    code: &str,
    except_id: Option<i64>,
) -> AppResult<()> {
    let mut query = shift_type::Entity::find()
        .filter(shift_type::Column::ShiftPlanId.eq(plan_id))
        .filter(shift_type::Column::Code.eq(code));
    if let Some(id) = except_id {
        query = query.filter(shift_type::Column::Id.ne(id));
    }
    if query.one(db).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "Shift code '{code}' already exists in plan {plan_id}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::test_support::*;

    #[tokio::test]
    async fn test_duplicate_code_in_plan_conflicts() {
        let app = test_app().await;
        let dept = create_department(&app, "ER").await;
        let plan = create_plan(&app, &[dept], "2024-07-01", "2024-07-31").await;
        let other = create_plan(&app, &[dept], "2024-08-01", "2024-08-31").await;

        create_shift_type(&app, plan, "N").await;
        let (status, body) = post(
            &app,
            "/api/shift-types",
            json!({ "code": "N", "name": "Night again", "color": "#000000", "shiftPlanId": plan }),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], 409);

        // Same code in another plan is fine
        create_shift_type(&app, other, "N").await;
        let (_, list) = get(&app, &format!("/api/shift-types?planId={plan}")).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let app = test_app().await;
        let dept = create_department(&app, "ER").await;
        let plan = create_plan(&app, &[dept], "2024-07-01", "2024-07-31").await;

        let (status, body) = post(
            &app,
            "/api/shift-types",
            json!({ "code": "LONG", "name": "Late", "color": "red", "startTime": "25:00", "shiftPlanId": plan }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["fields"]["code"].is_array());
        assert!(body["fields"]["color"].is_array());
        assert!(body["fields"]["startTime"].is_array());

        let (status, body) = post(
            &app,
            "/api/shift-types",
            json!({ "code": "E", "name": "Early", "color": "#FFAA00", "requiresTime": true, "startTime": "06:00", "shiftPlanId": plan }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["fields"]["endTime"].is_array());

        let (status, _) = post(
            &app,
            "/api/shift-types",
            json!({ "code": "E", "name": "Early", "color": "#FFAA00", "shiftPlanId": 404 }),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = post(
            &app,
            "/api/shift-types",
            json!({ "code": "E", "name": "Early", "color": "#FFAA00", "requiresTime": true,
                    "startTime": "06:00", "endTime": "14:00", "shiftPlanId": plan }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["startTime"], "06:00");
    }

    #[tokio::test]
    async fn test_update_and_rename_conflict() {
        let app = test_app().await;
        let dept = create_department(&app, "ER").await;
        let plan = create_plan(&app, &[dept], "2024-07-01", "2024-07-31").await;
        create_shift_type(&app, plan, "D").await;
        let night = create_shift_type(&app, plan, "N").await;

        let (status, _) = put(&app, &format!("/api/shift-types/{night}"), json!({ "code": "D" })).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = put(&app, &format!("/api/shift-types/{night}"), json!({ "requiresTime": true })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = put(
            &app,
            &format!("/api/shift-types/{night}"),
            json!({ "name": "Night", "requiresTime": true, "startTime": "22:00", "endTime": "06:00" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Night");
        assert_eq!(body["code"], "N");
        assert_eq!(body["endTime"], "06:00");
    }

    #[tokio::test]
    async fn test_delete_removes_schedules() {
        let app = test_app().await;
        let dept = create_department(&app, "ER").await;
        let emp = create_employee(&app, dept, "E-1", None).await;
        let plan = create_plan(&app, &[dept], "2024-07-01", "2024-07-31").await;
        let day = create_shift_type(&app, plan, "D").await;
        post(
            &app,
            &format!("/api/schedules/{plan}"),
            json!({ "changes": [{ "employeeId": emp, "date": "2024-07-02", "shiftTypeId": day }] }),
        )
        .await;

        let (status, _) = delete(&app, &format!("/api/shift-types/{day}")).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, rows) = get(&app, &format!("/api/schedules/{plan}")).await;
        assert!(rows.as_array().unwrap().is_empty());
        let (status, _) = get(&app, &format!("/api/shift-types/{day}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
