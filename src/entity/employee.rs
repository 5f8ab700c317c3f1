//! Employee entity
//!
//! Table: sd_employee

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Employment status
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "snake_case")]
pub enum EmployeeStatus {
    #[default]
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
    #[sea_orm(string_value = "on_leave")]
    OnLeave,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sd_employee")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(column_type = "String(Some(64))")]
    pub first_name: String,

    #[sea_orm(column_type = "String(Some(64))")]
    pub last_name: String,

    #[sea_orm(column_type = "String(Some(128))", nullable)]
    pub email: Option<String>,

    #[sea_orm(column_type = "String(Some(32))", nullable)]
    pub phone: Option<String>,

    /// External personnel code (exposed as `employeeId`)
    #[sea_orm(column_type = "String(Some(32))", unique)]
    pub employee_code: String,

    #[sea_orm(column_type = "String(Some(64))")]
    pub role: String,

    pub department_id: i64,

    /// Display group inside the department
    #[sea_orm(column_type = "String(Some(64))", nullable)]
    pub group_name: Option<String>,

    pub status: EmployeeStatus,

    pub start_date: Option<Date>,

    /// Unix timestamp
    pub created_at: i64,

    /// Unix timestamp
    pub updated_at: i64,
}

impl Model {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::department::Entity",
        from = "Column::DepartmentId",
        to = "super::department::Column::Id"
    )]
    Department,
    #[sea_orm(has_many = "super::schedule::Entity")]
    Schedule,
}

impl Related<super::department::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Department.def()
    }
}

impl Related<super::schedule::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Schedule.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
