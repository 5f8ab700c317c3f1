//! Plan <-> department link table
//!
//! Table: sd_shift_plan_department

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sd_shift_plan_department")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub shift_plan_id: i64,

    #[sea_orm(primary_key, auto_increment = false)]
    pub department_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::shift_plan::Entity",
        from = "Column::ShiftPlanId",
        to = "super::shift_plan::Column::Id"
    )]
    ShiftPlan,
    #[sea_orm(
        belongs_to = "super::department::Entity",
        from = "Column::DepartmentId",
        to = "super::department::Column::Id"
    )]
    Department,
}

impl Related<super::shift_plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShiftPlan.def()
    }
}

impl Related<super::department::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Department.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
