//! Shift plan handlers
//!
//! A plan is a date range scoped to one or more departments. Its shift types
//! and schedules go away with it.

use std::collections::{BTreeSet, HashMap};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::entity::shift_plan::{self, PlanStatus};
use crate::entity::{department, schedule, shift_plan_department, shift_type};
use crate::error::{AppError, AppResult, OptionExt};
use crate::handlers::now;
use crate::handlers::shift_type::ShiftTypeResponse;
use crate::middleware::validate::not_blank;
use crate::middleware::ValidatedJson;
use crate::state::AppState;

/// Create shift plan request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateShiftPlanRequest {
    #[validate(length(min = 1, max = 128), custom(function = "not_blank"))]
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: Option<PlanStatus>,
    #[validate(length(min = 1, message = "at least one department is required"))]
    pub department_ids: Vec<i64>,
}

/// Update shift plan request, absent fields are left unchanged
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateShiftPlanRequest {
    #[validate(length(min = 1, max = 128), custom(function = "not_blank"))]
    pub name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<PlanStatus>,
    #[validate(length(min = 1, message = "at least one department is required"))]
    pub department_ids: Option<Vec<i64>>,
}

/// Shift plan response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftPlanResponse {
    pub id: i64,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: PlanStatus,
    pub department_ids: Vec<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ShiftPlanResponse {
    fn from_model(m: shift_plan::Model, department_ids: Vec<i64>) -> Self {
        Self {
            id: m.id,
            name: m.name,
            start_date: m.start_date,
            end_date: m.end_date,
            status: m.status,
            department_ids,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Shift plan with its shift types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftPlanDetail {
    #[serde(flatten)]
    pub plan: ShiftPlanResponse,
    pub shift_types: Vec<ShiftTypeResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftPlanQuery {
    pub department_id: Option<i64>,
    pub status: Option<PlanStatus>,
}

/// GET /api/shift-plans
pub async fn list_shift_plans(
    State(state): State<AppState>,
    Query(query): Query<ShiftPlanQuery>,
) -> AppResult<Json<Vec<ShiftPlanResponse>>> {
    let db = &state.db;

    let mut select = shift_plan::Entity::find();
    if let Some(department_id) = query.department_id {
        let plan_ids: Vec<i64> = shift_plan_department::Entity::find()
            .filter(shift_plan_department::Column::DepartmentId.eq(department_id))
            .all(db)
            .await?
            .into_iter()
            .map(|link| link.shift_plan_id)
            .collect();
        select = select.filter(shift_plan::Column::Id.is_in(plan_ids));
    }
    if let Some(status) = query.status {
        select = select.filter(shift_plan::Column::Status.eq(status));
    }

    let plans = select
        .order_by_desc(shift_plan::Column::StartDate)
        .order_by_asc(shift_plan::Column::Id)
        .all(db)
        .await?;

    let mut links = department_links(db, plans.iter().map(|p| p.id).collect()).await?;
    let response = plans
        .into_iter()
        .map(|p| {
            let ids = links.remove(&p.id).unwrap_or_default();
            ShiftPlanResponse::from_model(p, ids)
        })
        .collect();

    Ok(Json(response))
}

/// GET /api/shift-plans/:id
pub async fn get_shift_plan(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ShiftPlanDetail>> {
    let db = &state.db;

    let plan = shift_plan::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_not_found(format!("Shift plan {id}"))?;

    let department_ids = department_links(db, vec![id])
        .await?
        .remove(&id)
        .unwrap_or_default();

    let shift_types = shift_type::Entity::find()
        .filter(shift_type::Column::ShiftPlanId.eq(id))
        .order_by_asc(shift_type::Column::Code)
        .all(db)
        .await?
        .into_iter()
        .map(ShiftTypeResponse::from)
        .collect();

    Ok(Json(ShiftPlanDetail {
        plan: ShiftPlanResponse::from_model(plan, department_ids),
        shift_types,
    }))
}

/// POST /api/shift-plans
pub async fn create_shift_plan(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateShiftPlanRequest>,
) -> AppResult<(StatusCode, Json<ShiftPlanResponse>)> {
    check_range(req.start_date, req.end_date, state.config.web.max_plan_days)?;

    let txn = state.db.begin().await?;

    let department_ids = ensure_departments(&txn, &req.department_ids).await?;

    let timestamp = now();
    let plan = shift_plan::ActiveModel {
        name: Set(req.name.trim().to_string()),
        start_date: Set(req.start_date),
        end_date: Set(req.end_date),
        status: Set(req.status.unwrap_or_default()),
        created_at: Set(timestamp),
        updated_at: Set(timestamp),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    link_departments(&txn, plan.id, &department_ids).await?;
    txn.commit().await?;

    tracing::info!(
        plan_id = plan.id,
        start = %plan.start_date,
        end = %plan.end_date,
        departments = department_ids.len(),
        "Shift plan created"
    );
    Ok((
        StatusCode::CREATED,
        Json(ShiftPlanResponse::from_model(plan, department_ids)),
    ))
}

/// PUT /api/shift-plans/:id
///
/// Schedules that fall outside a narrowed date range are removed.
pub async fn update_shift_plan(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateShiftPlanRequest>,
) -> AppResult<Json<ShiftPlanResponse>> {
    let txn = state.db.begin().await?;

    let current = shift_plan::Entity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_not_found(format!("Shift plan {id}"))?;

    let start_date = req.start_date.unwrap_or(current.start_date);
    let end_date = req.end_date.unwrap_or(current.end_date);
    check_range(start_date, end_date, state.config.web.max_plan_days)?;
    let range_changed = start_date != current.start_date || end_date != current.end_date;

    let mut model: shift_plan::ActiveModel = current.into();
    if let Some(name) = req.name {
        model.name = Set(name.trim().to_string());
    }
    if let Some(status) = req.status {
        model.status = Set(status);
    }
    model.start_date = Set(start_date);
    model.end_date = Set(end_date);
    model.updated_at = Set(now());
    let plan = model.update(&txn).await?;

    let department_ids = match req.department_ids {
        Some(requested) => {
            let ids = ensure_departments(&txn, &requested).await?;
            shift_plan_department::Entity::delete_many()
                .filter(shift_plan_department::Column::ShiftPlanId.eq(id))
                .exec(&txn)
                .await?;
            link_departments(&txn, id, &ids).await?;
            ids
        }
        None => department_links(&txn, vec![id])
            .await?
            .remove(&id)
            .unwrap_or_default(),
    };

    let mut schedules_removed = 0;
    if range_changed {
        schedules_removed = schedule::Entity::delete_many()
            .filter(schedule::Column::ShiftPlanId.eq(id))
            .filter(
                Condition::any()
                    .add(schedule::Column::Date.lt(start_date))
                    .add(schedule::Column::Date.gt(end_date)),
            )
            .exec(&txn)
            .await?
            .rows_affected;
    }

    txn.commit().await?;

    tracing::info!(plan_id = id, schedules_removed, "Shift plan updated");
    Ok(Json(ShiftPlanResponse::from_model(plan, department_ids)))
}

/// DELETE /api/shift-plans/:id
pub async fn delete_shift_plan(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let txn = state.db.begin().await?;

    let plan = shift_plan::Entity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_not_found(format!("Shift plan {id}"))?;

    let schedules = schedule::Entity::delete_many()
        .filter(schedule::Column::ShiftPlanId.eq(id))
        .exec(&txn)
        .await?;
    shift_type::Entity::delete_many()
        .filter(shift_type::Column::ShiftPlanId.eq(id))
        .exec(&txn)
        .await?;
    shift_plan_department::Entity::delete_many()
        .filter(shift_plan_department::Column::ShiftPlanId.eq(id))
        .exec(&txn)
        .await?;
    shift_plan::Entity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        plan_id = id,
        name = %plan.name,
        schedules_removed = schedules.rows_affected,
        "Shift plan deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// `end >= start` and the inclusive span fits in `max_days`
fn check_range(start: NaiveDate, end: NaiveDate, max_days: i64) -> AppResult<()> {
    if end < start {
        return Err(AppError::field("endDate", "must not be before startDate"));
    }
    let days = (end - start).num_days() + 1;
    if days > max_days {
        return Err(AppError::field(
            "endDate",
            format!("plan spans {days} days, the limit is {max_days}"),
        ));
    }
    Ok(())
}

/// Deduplicates the ids and checks every department exists
async fn ensure_departments<C: ConnectionTrait>(db: &C, ids: &[i64]) -> AppResult<Vec<i64>> {
    let ids: Vec<i64> = ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
    let found = department::Entity::find()
        .filter(department::Column::Id.is_in(ids.clone()))
        .count(db)
        .await?;
    if found != ids.len() as u64 {
        return Err(AppError::BadRequest(
            "One or more departments do not exist".to_string(),
        ));
    }
    Ok(ids)
}

async fn link_departments<C: ConnectionTrait>(
    db: &C,
    plan_id: i64,
    department_ids: &[i64],
) -> AppResult<()> {
    if department_ids.is_empty() {
        return Ok(());
    }
    let links = department_ids.iter().map(|&department_id| shift_plan_department::ActiveModel {
        shift_plan_id: Set(plan_id),
        department_id: Set(department_id),
    });
    shift_plan_department::Entity::insert_many(links)
        .exec_without_returning(db)
        .await?;
    Ok(())
}

/// plan id -> sorted department ids
pub(crate) async fn department_links<C: ConnectionTrait>(
    db: &C,
    plan_ids: Vec<i64>,
) -> AppResult<HashMap<i64, Vec<i64>>> {
    let mut links: HashMap<i64, Vec<i64>> = HashMap::new();
    if plan_ids.is_empty() {
        return Ok(links);
    }
    let rows = shift_plan_department::Entity::find()
        .filter(shift_plan_department::Column::ShiftPlanId.is_in(plan_ids))
        .order_by_asc(shift_plan_department::Column::DepartmentId)
        .all(db)
        .await?;
    for row in rows {
        links.entry(row.shift_plan_id).or_default().push(row.department_id);
    }
    Ok(links)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::test_support::*;

    #[tokio::test]
    async fn test_create_and_fetch_detail() {
        let app = test_app().await;
        let er = create_department(&app, "ER").await;
        let icu = create_department(&app, "ICU").await;
        let plan = create_plan(&app, &[icu, er, er], "2024-07-01", "2024-07-31").await;
        create_shift_type(&app, plan, "N").await;
        create_shift_type(&app, plan, "D").await;

        let (status, body) = get(&app, &format!("/api/shift-plans/{plan}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "draft");
        assert_eq!(body["departmentIds"], json!([er, icu]));
        let codes: Vec<&str> = body["shiftTypes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["code"].as_str().unwrap())
            .collect();
        assert_eq!(codes, vec!["D", "N"]);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let app = test_app().await;
        let er = create_department(&app, "ER").await;

        let (status, body) = post(
            &app,
            "/api/shift-plans",
            json!({ "name": "July", "startDate": "2024-07-31", "endDate": "2024-07-01", "departmentIds": [er] }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["fields"]["endDate"].is_array());

        let (status, body) = post(
            &app,
            "/api/shift-plans",
            json!({ "name": "July", "startDate": "2024-07-01", "endDate": "2024-07-31", "departmentIds": [] }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["fields"]["departmentIds"].is_array());

        let (status, _) = post(
            &app,
            "/api/shift-plans",
            json!({ "name": "July", "startDate": "2024-07-01", "endDate": "2024-07-31", "departmentIds": [er, 999] }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = post(
            &app,
            "/api/shift-plans",
            json!({ "name": "Long", "startDate": "2024-01-01", "endDate": "2026-01-01", "departmentIds": [er] }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, list) = get(&app, "/api/shift-plans").await;
        assert!(list.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_filters_and_order() {
        let app = test_app().await;
        let er = create_department(&app, "ER").await;
        let icu = create_department(&app, "ICU").await;
        let july = create_plan(&app, &[er], "2024-07-01", "2024-07-31").await;
        let august = create_plan(&app, &[er, icu], "2024-08-01", "2024-08-31").await;
        put(&app, &format!("/api/shift-plans/{july}"), json!({ "status": "active" })).await;

        let (_, all) = get(&app, "/api/shift-plans").await;
        let ids: Vec<i64> = all.as_array().unwrap().iter().map(|p| p["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![august, july]);

        let (_, icu_plans) = get(&app, &format!("/api/shift-plans?departmentId={icu}")).await;
        assert_eq!(icu_plans.as_array().unwrap().len(), 1);
        assert_eq!(icu_plans[0]["id"], august);

        let (_, active) = get(&app, "/api/shift-plans?status=active").await;
        assert_eq!(active.as_array().unwrap().len(), 1);
        assert_eq!(active[0]["id"], july);
    }

    #[tokio::test]
    async fn test_shrinking_range_drops_outside_schedules() {
        let app = test_app().await;
        let er = create_department(&app, "ER").await;
        let icu = create_department(&app, "ICU").await;
        let emp = create_employee(&app, er, "E-1", None).await;
        let plan = create_plan(&app, &[er], "2024-07-01", "2024-07-31").await;
        let day = create_shift_type(&app, plan, "D").await;
        post(
            &app,
            &format!("/api/schedules/{plan}"),
            json!({ "changes": [
                { "employeeId": emp, "date": "2024-07-02", "shiftTypeId": day },
                { "employeeId": emp, "date": "2024-07-20", "shiftTypeId": day },
            ] }),
        )
        .await;

        let (status, body) = put(
            &app,
            &format!("/api/shift-plans/{plan}"),
            json!({ "endDate": "2024-07-15", "departmentIds": [er, icu] }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["endDate"], "2024-07-15");
        assert_eq!(body["departmentIds"], json!([er, icu]));

        let (_, rows) = get(&app, &format!("/api/schedules/{plan}")).await;
        let rows = rows.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["date"], "2024-07-02");

        let (status, _) = put(
            &app,
            &format!("/api/shift-plans/{plan}"),
            json!({ "startDate": "2024-07-20" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let app = test_app().await;
        let er = create_department(&app, "ER").await;
        let emp = create_employee(&app, er, "E-1", None).await;
        let plan = create_plan(&app, &[er], "2024-07-01", "2024-07-31").await;
        let day = create_shift_type(&app, plan, "D").await;
        post(
            &app,
            &format!("/api/schedules/{plan}"),
            json!({ "changes": [{ "employeeId": emp, "date": "2024-07-02", "shiftTypeId": day }] }),
        )
        .await;

        let (status, _) = delete(&app, &format!("/api/shift-plans/{plan}")).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = get(&app, &format!("/api/shift-plans/{plan}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = get(&app, &format!("/api/shift-types/{day}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = get(&app, &format!("/api/schedules/{plan}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // The department is free again
        delete(&app, &format!("/api/employees/{emp}")).await;
        let (status, _) = delete(&app, &format!("/api/departments/{er}")).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}
