//! Wire model for the validation endpoint.

pub mod models;
