/// Database access: connection pool and schema migrations
///
/// Queries themselves live next to their types in [`crate::models`] and
/// [`crate::analytics`].

pub mod migrations;
pub mod pool;
