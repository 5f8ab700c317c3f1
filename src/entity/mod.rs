//! Entity module - SeaORM entity definitions
//!
//! One file per table. Relations are declared where a real foreign key
//! exists; `department.manager_id` is resolved by hand to avoid a cycle
//! between the department and employee tables.

pub mod department;
pub mod employee;
pub mod schedule;
pub mod shift_plan;
pub mod shift_plan_department;
pub mod shift_type;
