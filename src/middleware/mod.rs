//! Request middleware and extractors

pub mod validate;

pub use validate::ValidatedJson;
