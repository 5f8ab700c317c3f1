//! Department entity
//!
//! Table: sd_department

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Department status
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "snake_case")]
pub enum DepartmentStatus {
    #[default]
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sd_department")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(column_type = "String(Some(64))", unique)]
    pub name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    pub status: DepartmentStatus,

    /// Managing employee. Not a foreign key, cleared when the employee is deleted.
    pub manager_id: Option<i64>,

    /// Unix timestamp
    pub created_at: i64,

    /// Unix timestamp
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::employee::Entity")]
    Employee,
    #[sea_orm(has_many = "super::shift_plan_department::Entity")]
    ShiftPlanDepartment,
}

impl Related<super::employee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Employee.def()
    }
}

impl Related<super::shift_plan::Entity> for Entity {
    fn to() -> RelationDef {
        super::shift_plan_department::Relation::ShiftPlan.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::shift_plan_department::Relation::Department.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
