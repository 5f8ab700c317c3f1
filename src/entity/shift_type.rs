//! ShiftType entity - a labeled shift inside one plan
//!
//! Table: sd_shift_type. `(shift_plan_id, code)` is unique, see `db::auto_migrate`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sd_shift_type")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Short code shown in calendar cells, at most 3 characters
    #[sea_orm(column_type = "String(Some(3))")]
    pub code: String,

    #[sea_orm(column_type = "String(Some(64))")]
    pub name: String,

    /// `#RRGGBB`
    #[sea_orm(column_type = "String(Some(7))")]
    pub color: String,

    /// `HH:MM`
    #[sea_orm(column_type = "String(Some(5))", nullable)]
    pub start_time: Option<String>,

    /// `HH:MM`, may be earlier than `start_time` for overnight shifts
    #[sea_orm(column_type = "String(Some(5))", nullable)]
    pub end_time: Option<String>,

    pub requires_time: bool,

    pub shift_plan_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::shift_plan::Entity",
        from = "Column::ShiftPlanId",
        to = "super::shift_plan::Column::Id"
    )]
    ShiftPlan,
    #[sea_orm(has_many = "super::schedule::Entity")]
    Schedule,
}

impl Related<super::shift_plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShiftPlan.def()
    }
}

impl Related<super::schedule::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Schedule.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
