//! ShiftPlan entity - a named scheduling period
//!
//! Table: sd_shift_plan

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Plan status
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    #[default]
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "active")]
    Active,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sd_shift_plan")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(column_type = "String(Some(128))")]
    pub name: String,

    pub start_date: Date,

    /// Inclusive
    pub end_date: Date,

    pub status: PlanStatus,

    /// Unix timestamp
    pub created_at: i64,

    /// Unix timestamp
    pub updated_at: i64,
}

impl Model {
    pub fn contains(&self, date: Date) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::shift_type::Entity")]
    ShiftType,
    #[sea_orm(has_many = "super::schedule::Entity")]
    Schedule,
    #[sea_orm(has_many = "super::shift_plan_department::Entity")]
    ShiftPlanDepartment,
}

impl Related<super::shift_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShiftType.def()
    }
}

impl Related<super::schedule::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Schedule.def()
    }
}

impl Related<super::department::Entity> for Entity {
    fn to() -> RelationDef {
        super::shift_plan_department::Relation::Department.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::shift_plan_department::Relation::ShiftPlan.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
