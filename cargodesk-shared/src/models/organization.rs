/// Organization model and database operations
///
/// Every organization is owned by exactly one user (one-to-one via the unique
/// `owner_id`). Members point at it through `users.organization_id`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE organizations (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     owner_id UUID NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Deleting an organization deletes its cargo requests and clears the
/// membership of every member.
///
/// # Owner membership
///
/// `owner_id` and the owner's own `organization_id` are independent columns.
/// [`Organization::create`] links an owner who has no organization yet to the
/// one they create; nothing else keeps the two in sync, so an owner can be a
/// member of a different organization than the one they own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::auth::authorization::Visibility;

/// Organization record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Organization {
    pub id: Uuid,

    pub name: String,

    /// Owning user
    pub owner_id: Uuid,

    pub created_at: DateTime<Utc>,
}

/// Input for creating a new organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrganization {
    pub name: String,

    /// Always the authenticated caller, never request input
    pub owner_id: Uuid,
}

/// Appends the WHERE clause for a visibility scope.
///
/// Returns false when the scope cannot match any organization.
fn push_scope(query: &mut QueryBuilder<'_, Postgres>, visibility: &Visibility) -> bool {
    match visibility {
        Visibility::All => {
            query.push(" WHERE TRUE");
            true
        }
        Visibility::Owner(owner_id) => {
            query.push(" WHERE owner_id = ");
            query.push_bind(*owner_id);
            true
        }
        _ => false,
    }
}

impl Organization {
    /// Creates an organization owned by `data.owner_id`
    ///
    /// If the owner is not yet a member of any organization, they become a
    /// member of the new one. Both writes share one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the owner already owns an organization
    /// (`organizations_owner_id_key`) or the database fails.
    pub async fn create(pool: &PgPool, data: CreateOrganization) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let organization = sqlx::query_as::<_, Organization>(
            r#"
            INSERT INTO organizations (name, owner_id)
            VALUES ($1, $2)
            RETURNING id, name, owner_id, created_at
            "#,
        )
        .bind(data.name)
        .bind(data.owner_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE users
            SET organization_id = $1, updated_at = NOW()
            WHERE id = $2 AND organization_id IS NULL
            "#,
        )
        .bind(organization.id)
        .bind(organization.owner_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            organization_id = %organization.id,
            owner_id = %organization.owner_id,
            "Organization created"
        );

        Ok(organization)
    }

    /// Finds an organization by ID, regardless of visibility
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Organization>(
            "SELECT id, name, owner_id, created_at FROM organizations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Finds an organization by ID within a visibility scope
    pub async fn find_visible(
        pool: &PgPool,
        id: Uuid,
        visibility: &Visibility,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query =
            QueryBuilder::<Postgres>::new("SELECT id, name, owner_id, created_at FROM organizations");
        if !push_scope(&mut query, visibility) {
            return Ok(None);
        }
        query.push(" AND id = ").push_bind(id);

        query.build_query_as::<Organization>().fetch_optional(pool).await
    }

    /// Lists organizations within a visibility scope, oldest first
    pub async fn list_visible(
        pool: &PgPool,
        visibility: &Visibility,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query =
            QueryBuilder::<Postgres>::new("SELECT id, name, owner_id, created_at FROM organizations");
        if !push_scope(&mut query, visibility) {
            return Ok(Vec::new());
        }
        query.push(" ORDER BY created_at, id");

        query.build_query_as::<Organization>().fetch_all(pool).await
    }

    /// Renames an organization
    ///
    /// # Returns
    ///
    /// The updated organization, or `None` if it doesn't exist
    pub async fn rename(pool: &PgPool, id: Uuid, name: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Organization>(
            r#"
            UPDATE organizations
            SET name = $2
            WHERE id = $1
            RETURNING id, name, owner_id, created_at
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_optional(pool)
        .await
    }

    /// Deletes an organization
    ///
    /// Cascades to its cargo requests; members keep their accounts but lose
    /// their membership.
    ///
    /// # Returns
    ///
    /// True if the organization was deleted, false if it didn't exist
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
