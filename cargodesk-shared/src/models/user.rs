/// User model and database operations
///
/// Users carry a role, an approval flag and an optional organization
/// membership. Registration creates unapproved users; an owner or admin of
/// the organization approves (or rejects) them.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('ADMIN', 'OWNER', 'LOGISTICIAN', 'DRIVER');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     username VARCHAR(150) NOT NULL UNIQUE,
///     email VARCHAR(254) NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     first_name VARCHAR(150) NOT NULL DEFAULT '',
///     last_name VARCHAR(150) NOT NULL DEFAULT '',
///     role user_role NOT NULL DEFAULT 'DRIVER',
///     is_approved BOOLEAN NOT NULL DEFAULT FALSE,
///     phone VARCHAR(20),
///     organization_id UUID REFERENCES organizations(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use cargodesk_shared::models::user::{CreateUser, User, UserRole};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     username: "jdoe".to_string(),
///     email: "jdoe@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     first_name: "John".to_string(),
///     last_name: "Doe".to_string(),
///     role: UserRole::Driver,
///     phone: None,
///     organization_id: None,
///     is_approved: false,
/// }).await?;
///
/// assert_eq!(user.full_name(), "John Doe");
/// # Ok(())
/// # }
/// ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::auth::authorization::Visibility;

const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, role, \
     is_approved, phone, organization_id, created_at, updated_at, last_login_at";

/// Roles a user can hold
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// Sees and manages everything
    Admin,

    /// Owns an organization and manages its members
    Owner,

    /// Creates and manages cargo requests
    Logistician,

    /// Carries cargo
    #[default]
    Driver,
}

impl UserRole {
    /// Converts role to its stored string form
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::Owner => "OWNER",
            UserRole::Logistician => "LOGISTICIAN",
            UserRole::Driver => "DRIVER",
        }
    }

    /// Parses a role from its stored string form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ADMIN" => Some(UserRole::Admin),
            "OWNER" => Some(UserRole::Owner),
            "LOGISTICIAN" => Some(UserRole::Logistician),
            "DRIVER" => Some(UserRole::Driver),
            _ => None,
        }
    }

    /// Whether this role manages an organization (owner or admin)
    pub fn is_manager(&self) -> bool {
        matches!(self, UserRole::Owner | UserRole::Admin)
    }
}

/// User account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    /// Login name, unique across all users
    pub username: String,

    /// Email address, unique across all users
    pub email: String,

    /// Argon2id password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub first_name: String,

    pub last_name: String,

    pub role: UserRole,

    /// Set by an owner or admin; unapproved users cannot mutate cargo
    pub is_approved: bool,

    pub phone: Option<String>,

    /// Organization the user is a member of
    pub organization_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    /// Display name: first and last name joined by a space, trimmed
    pub fn full_name(&self) -> String {
        full_name(&self.first_name, &self.last_name)
    }
}

fn full_name(first_name: &str, last_name: &str) -> String {
    format!("{} {}", first_name, last_name).trim().to_string()
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,

    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub organization_id: Option<Uuid>,
    pub is_approved: bool,
}

/// Input for updating an existing user
///
/// Only `Some` fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<UserRole>,

    /// Use `Some(None)` to clear
    pub phone: Option<Option<String>>,

    /// Use `Some(None)` to leave the organization
    pub organization_id: Option<Option<Uuid>>,
}

impl UpdateUser {
    /// Whether the update would change nothing
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.password_hash.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.role.is_none()
            && self.phone.is_none()
            && self.organization_id.is_none()
    }
}

/// Appends the WHERE clause for a visibility scope.
///
/// Returns false when the scope cannot match any user.
fn push_scope(query: &mut QueryBuilder<'_, Postgres>, visibility: &Visibility) -> bool {
    match visibility {
        Visibility::All => {
            query.push(" WHERE TRUE");
            true
        }
        Visibility::Organization(organization_id) => {
            query.push(" WHERE organization_id = ");
            query.push_bind(*organization_id);
            true
        }
        _ => false,
    }
}

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Returns an error if the username or email is taken
    /// (`users_username_key` / `users_email_key`) or the database fails.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO users (username, email, password_hash, first_name, last_name,
                               role, phone, organization_id, is_approved)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(data.username)
            .bind(data.email)
            .bind(data.password_hash)
            .bind(data.first_name)
            .bind(data.last_name)
            .bind(data.role)
            .bind(data.phone)
            .bind(data.organization_id)
            .bind(data.is_approved)
            .fetch_one(pool)
            .await
    }

    /// Finds a user by ID, regardless of visibility
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by username (used for login)
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by ID within a visibility scope
    ///
    /// Returns `None` both when the user doesn't exist and when it exists
    /// outside the scope.
    pub async fn find_visible(
        pool: &PgPool,
        id: Uuid,
        visibility: &Visibility,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users"));
        if !push_scope(&mut query, visibility) {
            return Ok(None);
        }
        query.push(" AND id = ");
        query.push_bind(id);

        query.build_query_as::<User>().fetch_optional(pool).await
    }

    /// Lists users within a visibility scope, ordered by username
    pub async fn list_visible(
        pool: &PgPool,
        visibility: &Visibility,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users"));
        if !push_scope(&mut query, visibility) {
            return Ok(Vec::new());
        }
        query.push(" ORDER BY username");

        query.build_query_as::<User>().fetch_all(pool).await
    }

    /// Updates an existing user
    ///
    /// Only `Some` fields are written; `updated_at` is always bumped.
    ///
    /// # Returns
    ///
    /// The updated user, or `None` if it doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new("UPDATE users SET updated_at = NOW()");

        if let Some(username) = data.username {
            query.push(", username = ").push_bind(username);
        }
        if let Some(email) = data.email {
            query.push(", email = ").push_bind(email);
        }
        if let Some(password_hash) = data.password_hash {
            query.push(", password_hash = ").push_bind(password_hash);
        }
        if let Some(first_name) = data.first_name {
            query.push(", first_name = ").push_bind(first_name);
        }
        if let Some(last_name) = data.last_name {
            query.push(", last_name = ").push_bind(last_name);
        }
        if let Some(role) = data.role {
            query.push(", role = ").push_bind(role);
        }
        if let Some(phone) = data.phone {
            query.push(", phone = ").push_bind(phone);
        }
        if let Some(organization_id) = data.organization_id {
            query.push(", organization_id = ").push_bind(organization_id);
        }

        query.push(" WHERE id = ").push_bind(id);
        query.push(format!(" RETURNING {USER_COLUMNS}"));

        query.build_query_as::<User>().fetch_optional(pool).await
    }

    /// Sets the approval flag
    ///
    /// # Returns
    ///
    /// The updated user, or `None` if it doesn't exist
    pub async fn set_approved(
        pool: &PgPool,
        id: Uuid,
        approved: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE users
            SET is_approved = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(approved)
            .fetch_optional(pool)
            .await
    }

    /// Deletes a user by ID
    ///
    /// Cascades to the organization they own and to every cargo request they
    /// take part in.
    ///
    /// # Returns
    ///
    /// True if the user was deleted, false if it didn't exist
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Updates the last login timestamp
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Resolves display names for a set of user IDs
    ///
    /// IDs that don't resolve are absent from the returned map.
    pub async fn display_names(
        pool: &PgPool,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, String>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(Uuid, String, String)> = sqlx::query_as(
            "SELECT id, first_name, last_name FROM users WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, first_name, last_name)| (id, full_name(&first_name, &last_name)))
            .collect())
    }
}
