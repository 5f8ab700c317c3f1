//! Schema validation for JSON bodies
//!
//! `ValidatedJson<T>` deserializes the body like `axum::Json` and then runs
//! the `validator` rules declared on `T`. Both failures become a 400 with
//! the offending fields listed.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Rejects empty and whitespace-only strings
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("blank", "must not be blank"));
    }
    Ok(())
}

/// `#RRGGBB`
pub fn hex_color(value: &str) -> Result<(), ValidationError> {
    let valid = value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(invalid("color", "must be a #RRGGBB color"));
    }
    Ok(())
}

/// `HH:MM`, 24-hour clock
pub fn clock_time(value: &str) -> Result<(), ValidationError> {
    if value.len() != 5 || chrono::NaiveTime::parse_from_str(value, "%H:%M").is_err() {
        return Err(invalid("time", "must be a HH:MM time"));
    }
    Ok(())
}
