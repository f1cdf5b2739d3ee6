/// Middleware for the API server
///
/// Authentication lives in [`crate::app`] next to the router it guards.

pub mod security;
