/// Database models
///
/// Each model owns its SQL. Reads that depend on the caller take a
/// [`Visibility`](crate::auth::authorization::Visibility) and translate it
/// into a WHERE clause, so a record outside the caller's scope is never
/// loaded.
///
/// # Models
///
/// - `user`: accounts, roles, approval and organization membership
/// - `organization`: organizations and their owners
/// - `cargo_request`: cargo requests and their status
///
/// # Example
///
/// ```no_run
/// use cargodesk_shared::auth::authorization::Visibility;
/// use cargodesk_shared::models::cargo_request::{CargoRequest, CargoStatus};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, driver_id: Uuid) -> Result<(), sqlx::Error> {
/// let pending = CargoRequest::list_visible(
///     &pool,
///     &Visibility::Driver(driver_id),
///     Some(CargoStatus::Pending),
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```

pub mod cargo_request;
pub mod organization;
pub mod user;
