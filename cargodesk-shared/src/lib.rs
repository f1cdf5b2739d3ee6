//! # CargoDesk Shared Library
//!
//! Domain types and business rules of the CargoDesk logistics backend, used
//! by the API server.
//!
//! ## Module Organization
//!
//! - `models`: users, organizations and cargo requests with their queries
//! - `auth`: passwords, tokens, request authentication and the role policy
//! - `analytics`: the per-organization monthly report
//! - `db`: connection pool and migrations

pub mod analytics;
pub mod auth;
pub mod db;
pub mod models;

/// Current version of the CargoDesk shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
