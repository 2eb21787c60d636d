/// Shared domain models, error taxonomy, and filename sanitizing for Mediagate.
pub mod errors;
pub mod models;
pub mod sanitize;
