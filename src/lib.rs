//! Shiftdesk - workforce shift scheduling admin service
//!
//! REST API over departments, employees, shift types, shift plans and
//! schedules, plus the calendar model the dashboard renders and edits.

pub mod calendar;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;
