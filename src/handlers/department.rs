//! Department handlers
//!
//! Implements department CRUD operations

use std::collections::{BTreeSet, HashMap};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::entity::department::{self, DepartmentStatus};
use crate::entity::{employee, shift_plan_department};
use crate::error::{AppError, AppResult, OptionExt};
use crate::handlers::employee::EmployeeResponse;
use crate::handlers::{double_option, now};
use crate::middleware::validate::not_blank;
use crate::middleware::ValidatedJson;
use crate::state::AppState;

/// Create department request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDepartmentRequest {
    #[validate(length(min = 1, max = 64), custom(function = "not_blank"))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub status: Option<DepartmentStatus>,
    /// Only `null` is accepted: the manager must be a member, and a new
    /// department has none yet
    pub manager_id: Option<i64>,
}

/// Update department request, absent fields are left unchanged
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDepartmentRequest {
    #[validate(length(min = 1, max = 64), custom(function = "not_blank"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 500))]
    pub description: Option<Option<String>>,
    pub status: Option<DepartmentStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub manager_id: Option<Option<i64>>,
}

/// Department response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub status: DepartmentStatus,
    pub manager_id: Option<i64>,
    pub employee_count: u64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl DepartmentResponse {
    fn from_model(m: department::Model, employee_count: u64) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
            status: m.status,
            manager_id: m.manager_id,
            employee_count,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Department with its members, used by the detail view
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentDetail {
    #[serde(flatten)]
    pub department: DepartmentResponse,
    pub manager: Option<EmployeeResponse>,
    pub employees: Vec<EmployeeResponse>,
    pub shift_plan_ids: Vec<i64>,
    /// Distinct employee groups, sorted
    pub groups: Vec<String>,
}

/// GET /api/departments
pub async fn list_departments(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<DepartmentResponse>>> {
    let db = &state.db;

    let departments = department::Entity::find()
        .order_by_asc(department::Column::Name)
        .all(db)
        .await?;

    let counts: HashMap<i64, i64> = employee::Entity::find()
        .select_only()
        .column(employee::Column::DepartmentId)
        .column_as(employee::Column::Id.count(), "employee_count")
        .group_by(employee::Column::DepartmentId)
        .into_tuple::<(i64, i64)>()
        .all(db)
        .await?
        .into_iter()
        .collect();

    let response = departments
        .into_iter()
        .map(|d| {
            let count = counts.get(&d.id).copied().unwrap_or(0).max(0) as u64;
            DepartmentResponse::from_model(d, count)
        })
        .collect();

    Ok(Json(response))
}

/// GET /api/departments/:id
pub async fn get_department(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<DepartmentDetail>> {
    let db = &state.db;

    let dept = department::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_not_found(format!("Department {id}"))?;

    let employees = employee::Entity::find()
        .filter(employee::Column::DepartmentId.eq(id))
        .order_by_asc(employee::Column::LastName)
        .order_by_asc(employee::Column::FirstName)
        .all(db)
        .await?;

    let shift_plan_ids = shift_plan_department::Entity::find()
        .filter(shift_plan_department::Column::DepartmentId.eq(id))
        .order_by_asc(shift_plan_department::Column::ShiftPlanId)
        .all(db)
        .await?
        .into_iter()
        .map(|link| link.shift_plan_id)
        .collect();

    let groups: BTreeSet<String> = employees
        .iter()
        .filter_map(|e| e.group_name.clone())
        .filter(|g| !g.trim().is_empty())
        .collect();

    let manager = dept
        .manager_id
        .and_then(|mid| employees.iter().find(|e| e.id == mid))
        .cloned()
        .map(EmployeeResponse::from);

    Ok(Json(DepartmentDetail {
        department: DepartmentResponse::from_model(dept, employees.len() as u64),
        manager,
        employees: employees.into_iter().map(EmployeeResponse::from).collect(),
        shift_plan_ids,
        groups: groups.into_iter().collect(),
    }))
}

/// POST /api/departments
pub async fn create_department(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateDepartmentRequest>,
) -> AppResult<(StatusCode, Json<DepartmentResponse>)> {
    let db = &state.db;
    let name = req.name.trim().to_string();

    ensure_name_free(db, &name, None).await?;

    if req.manager_id.is_some() {
        return Err(AppError::field(
            "managerId",
            "a new department has no members; assign the manager after adding employees",
        ));
    }

    let ts = now();
    let dept = department::ActiveModel {
        name: Set(name),
        description: Set(req.description),
        status: Set(req.status.unwrap_or_default()),
        manager_id: Set(None),
        created_at: Set(ts),
        updated_at: Set(ts),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(department_id = dept.id, name = %dept.name, "Department created");
    Ok((StatusCode::CREATED, Json(DepartmentResponse::from_model(dept, 0))))
}

/// PUT /api/departments/:id
pub async fn update_department(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateDepartmentRequest>,
) -> AppResult<Json<DepartmentResponse>> {
    let db = &state.db;

    let dept = department::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_not_found(format!("Department {id}"))?;

    let mut model: department::ActiveModel = dept.into();

    if let Some(name) = req.name {
        let name = name.trim().to_string();
        ensure_name_free(db, &name, Some(id)).await?;
        model.name = Set(name);
    }
    if let Some(description) = req.description {
        model.description = Set(description);
    }
    if let Some(status) = req.status {
        model.status = Set(status);
    }
    if let Some(manager_id) = req.manager_id {
        if let Some(mid) = manager_id {
            let manager = employee::Entity::find_by_id(mid)
                .one(db)
                .await?
                .ok_or_else(|| AppError::BadRequest(format!("Manager {mid} does not exist")))?;
            if manager.department_id != id {
                return Err(AppError::BadRequest(format!(
                    "Employee {mid} is not a member of department {id}"
                )));
            }
        }
        model.manager_id = Set(manager_id);
    }
    model.updated_at = Set(now());

    let dept = model.update(db).await?;
    let count = employee::Entity::find()
        .filter(employee::Column::DepartmentId.eq(id))
        .count(db)
        .await?;

    tracing::info!(department_id = id, "Department updated");
    Ok(Json(DepartmentResponse::from_model(dept, count)))
}

/// DELETE /api/departments/:id
///
/// Refused while employees or shift plans still reference the department.
pub async fn delete_department(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let txn = state.db.begin().await?;

    let dept = department::Entity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_not_found(format!("Department {id}"))?;

    let employees = employee::Entity::find()
        .filter(employee::Column::DepartmentId.eq(id))
        .count(&txn)
        .await?;
    if employees > 0 {
        return Err(AppError::BadRequest(format!(
            "Department '{}' still has {} employee(s)",
            dept.name, employees
        )));
    }

    let plans = shift_plan_department::Entity::find()
        .filter(shift_plan_department::Column::DepartmentId.eq(id))
        .count(&txn)
        .await?;
    if plans > 0 {
        return Err(AppError::BadRequest(format!(
            "Department '{}' is used by {} shift plan(s)",
            dept.name, plans
        )));
    }

    department::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(department_id = id, name = %dept.name, "Department deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn ensure_name_free<C: ConnectionTrait>(
    db: &C,
    name: &str,
    except_id: Option<i64>,
) -> AppResult<()> {
    let mut query = department::Entity::find().filter(department::Column::Name.eq(name));
    if let Some(id) = except_id {
        query = query.filter(department::Column::Id.ne(id));
    }
    if query.one(db).await?.is_some() {
        return Err(AppError::Conflict(format!("Department name '{name}' already exists")));
    }
    Ok(())
}
