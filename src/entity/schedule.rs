//! Schedule entity - one shift type assigned to one employee on one day
//!
//! Table: sd_schedule. `(employee_id, shift_plan_id, date)` is unique, see
//! `db::auto_migrate`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sd_schedule")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub employee_id: i64,

    pub shift_type_id: i64,

    pub shift_plan_id: i64,

    pub date: Date,

    /// Unix timestamp
    pub created_at: i64,

    /// Unix timestamp
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::employee::Entity",
        from = "Column::EmployeeId",
        to = "super::employee::Column::Id"
    )]
    Employee,
    #[sea_orm(
        belongs_to = "super::shift_type::Entity",
        from = "Column::ShiftTypeId",
        to = "super::shift_type::Column::Id"
    )]
    ShiftType,
    #[sea_orm(
        belongs_to = "super::shift_plan::Entity",
        from = "Column::ShiftPlanId",
        to = "super::shift_plan::Column::Id"
    )]
    ShiftPlan,
}

impl Related<super::employee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Employee.def()
    }
}

impl Related<super::shift_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShiftType.def()
    }
}

impl Related<super::shift_plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShiftPlan.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::calendar::Assignment {
    fn from(m: Model) -> Self {
        Self {
            schedule_id: m.id,
            employee_id: m.employee_id,
            shift_type_id: m.shift_type_id,
            date: m.date,
        }
    }
}
