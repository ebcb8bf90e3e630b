//! HTTP client for the validation endpoint.

pub mod http;
