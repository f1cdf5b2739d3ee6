/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration and token endpoints
/// - `users`: User management and approval
/// - `organizations`: Organization management
/// - `cargo_requests`: Cargo request management and status updates
/// - `analytics`: Organization analytics report

pub mod analytics;
pub mod auth;
pub mod cargo_requests;
pub mod health;
pub mod organizations;
pub mod users;

use serde::{Deserialize, Deserializer, Serialize};

/// Short acknowledgement body, e.g. `{"status": "user approved"}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub status: String,
}

impl StatusMessage {
    pub fn new(status: &str) -> Self {
        Self {
            status: status.to_string(),
        }
    }
}

/// Deserializes a nullable field of a partial update
///
/// Used with `#[serde(default)]`: an absent field stays `None`, an explicit
/// `null` becomes `Some(None)`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
