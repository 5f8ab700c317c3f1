//! Employee handlers
//!
//! Implements employee CRUD operations

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::NaiveDate;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait, Value,
};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidateEmail};

use crate::entity::employee::{self, EmployeeStatus};
use crate::entity::{department, schedule};
use crate::error::{AppError, AppResult, OptionExt};
use crate::handlers::{double_option, now};
use crate::middleware::validate::not_blank;
use crate::middleware::ValidatedJson;
use crate::state::AppState;

/// Create employee request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmployeeRequest {
    #[validate(length(min = 1, max = 64), custom(function = "not_blank"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 64), custom(function = "not_blank"))]
    pub last_name: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    /// External personnel code
    #[serde(rename = "employeeId")]
    #[validate(length(min = 1, max = 32), custom(function = "not_blank"))]
    pub employee_code: String,
    #[validate(length(min = 1, max = 64), custom(function = "not_blank"))]
    pub role: String,
    pub department_id: i64,
    #[validate(length(max = 64))]
    pub group: Option<String>,
    pub status: Option<EmployeeStatus>,
    pub start_date: Option<NaiveDate>,
}

/// Update employee request, absent fields are left unchanged
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEmployeeRequest {
    #[validate(length(min = 1, max = 64), custom(function = "not_blank"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 64), custom(function = "not_blank"))]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 32))]
    pub phone: Option<Option<String>>,
    #[serde(rename = "employeeId")]
    #[validate(length(min = 1, max = 32), custom(function = "not_blank"))]
    pub employee_code: Option<String>,
    #[validate(length(min = 1, max = 64), custom(function = "not_blank"))]
    pub role: Option<String>,
    pub department_id: Option<i64>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 64))]
    pub group: Option<Option<String>>,
    pub status: Option<EmployeeStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub start_date: Option<Option<NaiveDate>>,
}

/// Employee response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeResponse {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(rename = "employeeId")]
    pub employee_code: String,
    pub role: String,
    pub department_id: i64,
    pub group: Option<String>,
    pub status: EmployeeStatus,
    pub start_date: Option<NaiveDate>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<employee::Model> for EmployeeResponse {
    fn from(m: employee::Model) -> Self {
        Self {
            full_name: m.full_name(),
            id: m.id,
            first_name: m.first_name,
            last_name: m.last_name,
            email: m.email,
            phone: m.phone,
            employee_code: m.employee_code,
            role: m.role,
            department_id: m.department_id,
            group: m.group_name,
            status: m.status,
            start_date: m.start_date,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Query parameters for the employee list
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeQuery {
    pub department_id: Option<i64>,
    pub status: Option<EmployeeStatus>,
    pub group: Option<String>,
}

/// GET /api/employees
pub async fn list_employees(
    State(state): State<AppState>,
    Query(query): Query<EmployeeQuery>,
) -> AppResult<Json<Vec<EmployeeResponse>>> {
    let mut select = employee::Entity::find();
    if let Some(department_id) = query.department_id {
        select = select.filter(employee::Column::DepartmentId.eq(department_id));
    }
    if let Some(status) = query.status {
        select = select.filter(employee::Column::Status.eq(status));
    }
    if let Some(group) = query.group {
        select = select.filter(employee::Column::GroupName.eq(group));
    }

    let employees = select
        .order_by_asc(employee::Column::LastName)
        .order_by_asc(employee::Column::FirstName)
        .order_by_asc(employee::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(employees.into_iter().map(EmployeeResponse::from).collect()))
}

/// GET /api/employees/:id
pub async fn get_employee(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<EmployeeResponse>> {
    let employee = employee::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_not_found(format!("Employee {id}"))?;
    Ok(Json(employee.into()))
}

/// POST /api/employees
pub async fn create_employee(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateEmployeeRequest>,
) -> AppResult<(StatusCode, Json<EmployeeResponse>)> {
    let db = &state.db;

    ensure_department(db, req.department_id).await?;
    let code = req.employee_code.trim().to_string();
    ensure_code_free(db, &code, None).await?;

    let ts = now();
    let employee = employee::ActiveModel {
        first_name: Set(req.first_name.trim().to_string()),
        last_name: Set(req.last_name.trim().to_string()),
        email: Set(req.email),
        phone: Set(req.phone),
        employee_code: Set(code),
        role: Set(req.role.trim().to_string()),
        department_id: Set(req.department_id),
        group_name: Set(normalize_group(req.group)),
        status: Set(req.status.unwrap_or_default()),
        start_date: Set(req.start_date),
        created_at: Set(ts),
        updated_at: Set(ts),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(employee_id = employee.id, department_id = employee.department_id, "Employee created");
    Ok((StatusCode::CREATED, Json(employee.into())))
}

/// PUT /api/employees/:id
///
/// Moving an employee to another department drops them as manager of the old one.
pub async fn update_employee(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateEmployeeRequest>,
) -> AppResult<Json<EmployeeResponse>> {
    if let Some(Some(email)) = &req.email {
        if !email.validate_email() {
            return Err(AppError::field("email", "must be a valid email address"));
        }
    }

    let txn = state.db.begin().await?;

    let current = employee::Entity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_not_found(format!("Employee {id}"))?;
    let old_department = current.department_id;

    let mut model: employee::ActiveModel = current.into();

    if let Some(first_name) = req.first_name {
        model.first_name = Set(first_name.trim().to_string());
    }
    if let Some(last_name) = req.last_name {
        model.last_name = Set(last_name.trim().to_string());
    }
    if let Some(email) = req.email {
        model.email = Set(email);
    }
    if let Some(phone) = req.phone {
        model.phone = Set(phone);
    }
    if let Some(code) = req.employee_code {
        let code = code.trim().to_string();
        ensure_code_free(&txn, &code, Some(id)).await?;
        model.employee_code = Set(code);
    }
    if let Some(role) = req.role {
        model.role = Set(role.trim().to_string());
    }
    if let Some(group) = req.group {
        model.group_name = Set(normalize_group(group));
    }
    if let Some(status) = req.status {
        model.status = Set(status);
    }
    if let Some(start_date) = req.start_date {
        model.start_date = Set(start_date);
    }
    if let Some(department_id) = req.department_id {
        if department_id != old_department {
            ensure_department(&txn, department_id).await?;
            clear_manager(&txn, id).await?;
            model.department_id = Set(department_id);
        }
    }
    model.updated_at = Set(now());

    let employee = model.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(employee_id = id, "Employee updated");
    Ok(Json(employee.into()))
}

/// DELETE /api/employees/:id
///
/// Removes the employee's schedule rows and any manager reference to them.
pub async fn delete_employee(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let txn = state.db.begin().await?;

    employee::Entity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_not_found(format!("Employee {id}"))?;

    let schedules = schedule::Entity::delete_many()
        .filter(schedule::Column::EmployeeId.eq(id))
        .exec(&txn)
        .await?;
    clear_manager(&txn, id).await?;
    employee::Entity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        employee_id = id,
        schedules_removed = schedules.rows_affected,
        "Employee deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}

async fn ensure_department<C: ConnectionTrait>(db: &C, department_id: i64) -> AppResult<()> {
    if department::Entity::find_by_id(department_id).one(db).await?.is_none() {
        return Err(AppError::BadRequest(format!(
            "Department {department_id} does not exist"
        )));
    }
    Ok(())
}

async fn ensure_code_free<C: ConnectionTrait>(
    db: &C,
    code: &str,
    except_id: Option<i64>,
) -> AppResult<()> {
    let mut query = employee::Entity::find().filter(employee::Column::EmployeeCode.eq(code));
    if let Some(id) = except_id {
        query = query.filter(employee::Column::Id.ne(id));
    }
    if query.one(db).await?.is_some() {
        return Err(AppError::Conflict(format!("Employee ID '{code}' is already in use")));
    }
    Ok(())
}

/// Unset `manager_id` on every department managed by `employee_id`
async fn clear_manager<C: ConnectionTrait>(db: &C, employee_id: i64) -> AppResult<()> {
    department::Entity::update_many()
        .col_expr(department::Column::ManagerId, Expr::value(Value::BigInt(None)))
        .col_expr(department::Column::UpdatedAt, Expr::value(now()))
        .filter(department::Column::ManagerId.eq(employee_id))
        .exec(db)
        .await?;
    Ok(())
}

fn normalize_group(group: Option<String>) -> Option<String> {
    group
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty())
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::test_support::*;

    #[tokio::test]
    async fn test_create_and_list() {
        let app = test_app().await;
        let dept = create_department(&app, "ER").await;
        let (status, body) = post(
            &app,
            "/api/employees",
            json!({
                "firstName": "Ada",
                "lastName": "Moss",
                "email": "ada@example.com",
                "employeeId": "E-100",
                "role": "nurse",
                "departmentId": dept,
                "group": " Night ",
                "startDate": "2023-04-01",
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["fullName"], "Ada Moss");
        assert_eq!(body["employeeId"], "E-100");
        assert_eq!(body["group"], "Night");
        assert_eq!(body["status"], "active");
        assert_eq!(body["startDate"], "2023-04-01");

        create_employee(&app, dept, "E-101", None).await;
        let (_, all) = get(&app, &format!("/api/employees?departmentId={dept}")).await;
        assert_eq!(all.as_array().unwrap().len(), 2);
        let (_, night) = get(&app, "/api/employees?group=Night").await;
        assert_eq!(night.as_array().unwrap().len(), 1);
        let (_, on_leave) = get(&app, "/api/employees?status=on_leave").await;
        assert!(on_leave.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejections() {
        let app = test_app().await;
        let dept = create_department(&app, "ER").await;

        let (status, body) = post(
            &app,
            "/api/employees",
            json!({
                "firstName": "",
                "lastName": "Moss",
                "email": "not-an-email",
                "employeeId": "E-1",
                "role": "nurse",
                "departmentId": dept,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["fields"]["firstName"].is_array());
        assert!(body["fields"]["email"].is_array());

        let (status, _) = post(
            &app,
            "/api/employees",
            json!({
                "firstName": "Ada",
                "lastName": "Moss",
                "employeeId": "E-1",
                "role": "nurse",
                "departmentId": 999,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        create_employee(&app, dept, "E-1", None).await;
        let (status, _) = post(
            &app,
            "/api/employees",
            json!({
                "firstName": "Bo",
                "lastName": "Lin",
                "employeeId": "E-1",
                "role": "aide",
                "departmentId": dept,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_update_partial() {
        let app = test_app().await;
        let dept = create_department(&app, "ER").await;
        let id = create_employee(&app, dept, "E-1", Some("Day")).await;

        let (status, body) = put(
            &app,
            &format!("/api/employees/{id}"),
            json!({ "status": "on_leave", "group": null, "phone": "555-0100" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "on_leave");
        assert!(body["group"].is_null());
        assert_eq!(body["phone"], "555-0100");
        assert_eq!(body["employeeId"], "E-1");

        let (status, _) = put(&app, &format!("/api/employees/{id}"), json!({ "email": "nope" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = put(&app, "/api/employees/999", json!({ "role": "x" })).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_enforces_field_limits() {
        let app = test_app().await;
        let dept = create_department(&app, "ER").await;
        let id = create_employee(&app, dept, "E-1", None).await;
        let uri = format!("/api/employees/{id}");

        let (status, body) = put(&app, &uri, json!({ "phone": "5".repeat(33), "group": "g".repeat(65) })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["fields"]["phone"].is_array());
        assert!(body["fields"]["group"].is_array());

        let (status, body) = put(&app, &uri, json!({ "role": "   " })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["fields"]["role"].is_array());

        let (_, unchanged) = get(&app, &uri).await;
        assert!(unchanged["phone"].is_null());
        assert_eq!(unchanged["role"], "nurse");

        let (status, body) = put(&app, &uri, json!({ "phone": "5".repeat(32), "group": null })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["phone"].as_str().map(str::len), Some(32));
    }

    #[tokio::test]
    async fn test_create_rejects_blank_role() {
        let app = test_app().await;
        let dept = create_department(&app, "ER").await;
        let (status, body) = post(
            &app,
            "/api/employees",
            json!({ "firstName": "Ada", "lastName": "Moss", "employeeId": "E-9", "role": "  ", "departmentId": dept }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["fields"]["role"].is_array());
    }

    #[tokio::test]
    async fn test_move_department_drops_manager_role() {
        let app = test_app().await;
        let a = create_department(&app, "A").await;
        let b = create_department(&app, "B").await;
        let id = create_employee(&app, a, "E-1", None).await;
        put(&app, &format!("/api/departments/{a}"), json!({ "managerId": id })).await;

        let (status, body) = put(&app, &format!("/api/employees/{id}"), json!({ "departmentId": b })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["departmentId"], b);

        let (_, dept) = get(&app, &format!("/api/departments/{a}")).await;
        assert!(dept["managerId"].is_null());
    }

    #[tokio::test]
    async fn test_delete_cascades_schedules_and_manager() {
        let app = test_app().await;
        let dept = create_department(&app, "ER").await;
        let id = create_employee(&app, dept, "E-1", None).await;
        let keep = create_employee(&app, dept, "E-2", None).await;
        put(&app, &format!("/api/departments/{dept}"), json!({ "managerId": id })).await;

        let plan = create_plan(&app, &[dept], "2024-07-01", "2024-07-07").await;
        let shift = create_shift_type(&app, plan, "D").await;
        let (status, _) = post(
            &app,
            &format!("/api/schedules/{plan}"),
            json!({ "changes": [
                { "employeeId": id, "date": "2024-07-01", "shiftTypeId": shift },
                { "employeeId": keep, "date": "2024-07-01", "shiftTypeId": shift },
            ]}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = delete(&app, &format!("/api/employees/{id}")).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, rows) = get(&app, &format!("/api/schedules/{plan}")).await;
        let rows = rows.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["employeeId"], keep);

        let (_, dept) = get(&app, &format!("/api/departments/{dept}")).await;
        assert!(dept["managerId"].is_null());
        let (status, _) = get(&app, &format!("/api/employees/{id}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
