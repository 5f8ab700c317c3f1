//! Schedule handlers
//!
//! Cells are written in batches. Each change in a batch succeeds or fails on
//! its own; a cell write is a single upsert on `(employee, plan, date)` so
//! two concurrent writers can never leave two rows behind.

use std::collections::{HashMap, HashSet};

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::NaiveDate;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::calendar::{
    date_range, Assignment, CalendarGrid, ChangeResult, GridEmployee, GridShift, ScheduleChange,
};
use crate::entity::{employee, schedule, shift_plan, shift_type};
use crate::error::{AppError, AppResult, OptionExt};
use crate::handlers::now;
use crate::handlers::shift_plan::department_links;
use crate::middleware::ValidatedJson;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub employee_id: Option<i64>,
}

/// Batch of cell writes
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SaveSchedulesRequest {
    #[validate(length(min = 1, max = 1000))]
    pub changes: Vec<ScheduleChange>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSchedulesResponse {
    pub results: Vec<ChangeResult>,
    pub saved: usize,
    pub failed: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSchedulesQuery {
    pub employee_id: Option<i64>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct DeleteSchedulesResponse {
    pub deleted: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarQuery {
    pub department_id: Option<i64>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// GET /api/schedules/:planId
pub async fn list_schedules(
    State(state): State<AppState>,
    Path(plan_id): Path<i64>,
    Query(query): Query<ScheduleQuery>,
) -> AppResult<Json<Vec<Assignment>>> {
    let db = &state.db;
    find_plan(db, plan_id).await?;

    let mut select = schedule::Entity::find().filter(schedule::Column::ShiftPlanId.eq(plan_id));
    if let Some(from) = query.from {
        select = select.filter(schedule::Column::Date.gte(from));
    }
    if let Some(to) = query.to {
        select = select.filter(schedule::Column::Date.lte(to));
    }
    if let Some(employee_id) = query.employee_id {
        select = select.filter(schedule::Column::EmployeeId.eq(employee_id));
    }

    let rows = select
        .order_by_asc(schedule::Column::Date)
        .order_by_asc(schedule::Column::EmployeeId)
        .all(db)
        .await?;

    Ok(Json(rows.into_iter().map(Assignment::from).collect()))
}

/// POST /api/schedules/:planId
pub async fn save_schedules(
    State(state): State<AppState>,
    Path(plan_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<SaveSchedulesRequest>,
) -> AppResult<Json<SaveSchedulesResponse>> {
    let db = &state.db;
    let plan = find_plan(db, plan_id).await?;

    let departments: HashSet<i64> = department_links(db, vec![plan_id])
        .await?
        .remove(&plan_id)
        .unwrap_or_default()
        .into_iter()
        .collect();

    let employee_ids: Vec<i64> = req
        .changes
        .iter()
        .map(|c| c.employee_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let employees: HashMap<i64, employee::Model> = employee::Entity::find()
        .filter(employee::Column::Id.is_in(employee_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|e| (e.id, e))
        .collect();

    let shift_types: HashSet<i64> = shift_type::Entity::find()
        .filter(shift_type::Column::ShiftPlanId.eq(plan_id))
        .all(db)
        .await?
        .into_iter()
        .map(|t| t.id)
        .collect();

    let mut results = Vec::with_capacity(req.changes.len());
    for change in req.changes {
        let outcome = match check_change(&plan, &departments, &employees, &shift_types, &change) {
            Ok(()) => apply_change(db, plan_id, &change).await,
            Err(reason) => Err(reason),
        };

        let result = match outcome {
            Ok(schedule) => ChangeResult {
                employee_id: change.employee_id,
                date: change.date,
                success: true,
                schedule,
                error: None,
            },
            Err(reason) => {
                tracing::debug!(
                    plan_id,
                    employee_id = change.employee_id,
                    date = %change.date,
                    reason = %reason,
                    "Schedule change rejected"
                );
                ChangeResult {
                    employee_id: change.employee_id,
                    date: change.date,
                    success: false,
                    schedule: None,
                    error: Some(reason),
                }
            }
        };
        results.push(result);
    }

    let saved = results.iter().filter(|r| r.success).count();
    let failed = results.len() - saved;
    tracing::info!(plan_id, saved, failed, "Schedules saved");

    Ok(Json(SaveSchedulesResponse {
        results,
        saved,
        failed,
    }))
}

/// DELETE /api/schedules/:planId
///
/// Without filters every row of the plan is removed.
pub async fn delete_schedules(
    State(state): State<AppState>,
    Path(plan_id): Path<i64>,
    Query(query): Query<DeleteSchedulesQuery>,
) -> AppResult<Json<DeleteSchedulesResponse>> {
    let db = &state.db;
    find_plan(db, plan_id).await?;

    let mut delete = schedule::Entity::delete_many().filter(schedule::Column::ShiftPlanId.eq(plan_id));
    if let Some(employee_id) = query.employee_id {
        delete = delete.filter(schedule::Column::EmployeeId.eq(employee_id));
    }
    if let Some(date) = query.date {
        delete = delete.filter(schedule::Column::Date.eq(date));
    }
    let deleted = delete.exec(db).await?.rows_affected;

    tracing::info!(plan_id, deleted, "Schedules deleted");
    Ok(Json(DeleteSchedulesResponse { deleted }))
}

/// GET /api/schedules/:planId/calendar
pub async fn calendar(
    State(state): State<AppState>,
    Path(plan_id): Path<i64>,
    Query(query): Query<CalendarQuery>,
) -> AppResult<Json<CalendarGrid>> {
    let db = &state.db;
    let plan = find_plan(db, plan_id).await?;

    let mut departments = department_links(db, vec![plan_id])
        .await?
        .remove(&plan_id)
        .unwrap_or_default();
    if let Some(department_id) = query.department_id {
        if !departments.contains(&department_id) {
            return Err(AppError::BadRequest(format!(
                "Department {department_id} is not part of plan {plan_id}"
            )));
        }
        departments = vec![department_id];
    }

    let start = query.from.map_or(plan.start_date, |d| d.max(plan.start_date));
    let end = query.to.map_or(plan.end_date, |d| d.min(plan.end_date));
    let days = date_range(start, end);

    let employees: Vec<GridEmployee> = employee::Entity::find()
        .filter(employee::Column::DepartmentId.is_in(departments))
        .all(db)
        .await?
        .into_iter()
        .map(|e| GridEmployee {
            id: e.id,
            name: e.full_name(),
            group: e.group_name,
        })
        .collect();

    let shifts: Vec<GridShift> = shift_type::Entity::find()
        .filter(shift_type::Column::ShiftPlanId.eq(plan_id))
        .all(db)
        .await?
        .into_iter()
        .map(|t| GridShift {
            id: t.id,
            code: t.code,
            color: t.color,
        })
        .collect();

    let assignments: Vec<Assignment> = schedule::Entity::find()
        .filter(schedule::Column::ShiftPlanId.eq(plan_id))
        .filter(schedule::Column::Date.gte(start))
        .filter(schedule::Column::Date.lte(end))
        .all(db)
        .await?
        .into_iter()
        .map(Assignment::from)
        .collect();

    let grid = CalendarGrid::build(days, &employees, &shifts, &assignments);
    if !grid.duplicates.is_empty() {
        tracing::warn!(plan_id, count = grid.duplicates.len(), "Duplicate schedule cells found");
    }
    Ok(Json(grid))
}

async fn find_plan<C: ConnectionTrait>(db: &C, plan_id: i64) -> AppResult<shift_plan::Model> {
    shift_plan::Entity::find_by_id(plan_id)
        .one(db)
        .await?
        .ok_or_not_found(format!("Shift plan {plan_id}"))
}

/// Item level checks; the message goes back to the client as-is
fn check_change(
    plan: &shift_plan::Model,
    departments: &HashSet<i64>,
    employees: &HashMap<i64, employee::Model>,
    shift_types: &HashSet<i64>,
    change: &ScheduleChange,
) -> Result<(), String> {
    if !plan.contains(change.date) {
        return Err(format!(
            "Date {} is outside the plan ({} to {})",
            change.date, plan.start_date, plan.end_date
        ));
    }
    let employee = employees
        .get(&change.employee_id)
        .ok_or_else(|| format!("Employee {} not found", change.employee_id))?;
    if !departments.contains(&employee.department_id) {
        return Err(format!(
            "Employee {} is not in a department of this plan",
            change.employee_id
        ));
    }
    if let Some(shift_type_id) = change.shift_type_id {
        if !shift_types.contains(&shift_type_id) {
            return Err(format!("Shift type {shift_type_id} does not belong to this plan"));
        }
    }
    Ok(())
}

/// Upsert or clear one cell, returning the row now stored there
async fn apply_change<C: ConnectionTrait>(
    db: &C,
    plan_id: i64,
    change: &ScheduleChange,
) -> Result<Option<Assignment>, String> {
    let cell = Condition::all()
        .add(schedule::Column::EmployeeId.eq(change.employee_id))
        .add(schedule::Column::ShiftPlanId.eq(plan_id))
        .add(schedule::Column::Date.eq(change.date));

    let Some(shift_type_id) = change.shift_type_id else {
        schedule::Entity::delete_many()
            .filter(cell)
            .exec(db)
            .await
            .map_err(store_error)?;
        return Ok(None);
    };

    let timestamp = now();
    let row = schedule::ActiveModel {
        employee_id: Set(change.employee_id),
        shift_type_id: Set(shift_type_id),
        shift_plan_id: Set(plan_id),
        date: Set(change.date),
        created_at: Set(timestamp),
        updated_at: Set(timestamp),
        ..Default::default()
    };
    schedule::Entity::insert(row)
        .on_conflict(
            OnConflict::columns([
                schedule::Column::EmployeeId,
                schedule::Column::ShiftPlanId,
                schedule::Column::Date,
            ])
            .update_columns([schedule::Column::ShiftTypeId, schedule::Column::UpdatedAt])
            .to_owned(),
        )
        .exec_without_returning(db)
        .await
        .map_err(store_error)?;

    let saved = schedule::Entity::find()
        .filter(cell)
        .one(db)
        .await
        .map_err(store_error)?
        .ok_or_else(|| "Schedule row vanished after save".to_string())?;
    Ok(Some(saved.into()))
}

fn store_error(err: sea_orm::DbErr) -> String {
    tracing::error!("Schedule write failed: {}", err);
    "Could not store the schedule".to_string()
}
