//! Request handlers module

use serde::{Deserialize, Deserializer};

pub mod config;
pub mod department;
pub mod employee;
pub mod schedule;
pub mod shift_plan;
pub mod shift_type;

/// Current Unix timestamp for created_at / updated_at columns
pub(crate) fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// For partial updates: a missing field is `None`, an explicit `null` is
/// `Some(None)`. Use together with `#[serde(default)]`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
