//! Stockboard Connect - client for the dashboard backend.
//!
//! Implements the engine's holding repository and subscription lookup over
//! the backend's REST API, authenticated with the session's bearer token.

pub mod client;

// Re-export commonly used types
pub use client::{DashboardApiClient, DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS};
