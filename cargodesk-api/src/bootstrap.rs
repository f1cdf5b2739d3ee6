/// Startup tasks run after migrations
///
/// Ensures the configured admin account exists, is approved and holds the
/// ADMIN role. Running it again is a no-op.

use anyhow::Context;
use cargodesk_shared::{
    auth::password,
    models::user::{CreateUser, UpdateUser, User, UserRole},
};
use sqlx::PgPool;

use crate::config::AdminConfig;

/// What [`ensure_admin`] had to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminBootstrap {
    Created,
    Promoted,
    Unchanged,
}

/// Creates the admin account, or promotes and approves an existing user
/// with the same username
///
/// An existing account keeps its password.
pub async fn ensure_admin(pool: &PgPool, admin: &AdminConfig) -> anyhow::Result<AdminBootstrap> {
    if let Some(user) = User::find_by_username(pool, &admin.username).await? {
        if user.role == UserRole::Admin && user.is_approved {
            tracing::debug!(user_id = %user.id, "Admin account present");
            return Ok(AdminBootstrap::Unchanged);
        }

        if user.role != UserRole::Admin {
            User::update(
                pool,
                user.id,
                UpdateUser {
                    role: Some(UserRole::Admin),
                    ..Default::default()
                },
            )
            .await?;
        }
        User::set_approved(pool, user.id, true).await?;

        tracing::info!(user_id = %user.id, "Existing user promoted to admin");
        return Ok(AdminBootstrap::Promoted);
    }

    let password_hash =
        password::hash_password(&admin.password).context("Failed to hash admin password")?;

    let user = User::create(
        pool,
        CreateUser {
            username: admin.username.clone(),
            email: admin.email.clone(),
            password_hash,
            first_name: String::new(),
            last_name: String::new(),
            role: UserRole::Admin,
            phone: None,
            organization_id: None,
            is_approved: true,
        },
    )
    .await
    .context("Failed to create admin account")?;

    tracing::info!(user_id = %user.id, username = %user.username, "Admin account created");

    Ok(AdminBootstrap::Created)
}
