/// Cargo request model and database operations
///
/// A cargo request links a driver and a logistician within an organization
/// to a monetary amount and a status. Logisticians create and update them;
/// owners, admins and the assigned participants read them.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE cargo_status AS ENUM ('PENDING', 'IN_PROGRESS', 'COMPLETED', 'CANCELLED');
///
/// CREATE TABLE cargo_requests (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(200) NOT NULL,
///     description TEXT,
///     driver_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     logistician_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
///     amount NUMERIC(10, 2) NOT NULL,
///     status cargo_status NOT NULL DEFAULT 'PENDING',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Status
///
/// Any status may follow any other; there is no transition ordering.
/// Concurrent updates are last-write-wins.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::user::{User, UserRole};
use crate::auth::authorization::Visibility;

/// Largest number of digits before the decimal point (NUMERIC(10, 2))
pub const MAX_AMOUNT_INTEGER_DIGITS: u32 = 8;

/// Digits kept after the decimal point
pub const AMOUNT_DECIMAL_PLACES: u32 = 2;

const CARGO_SELECT: &str = r#"
    SELECT c.id, c.title, c.description,
           c.driver_id, BTRIM(d.first_name || ' ' || d.last_name) AS driver_name,
           c.logistician_id, BTRIM(l.first_name || ' ' || l.last_name) AS logistician_name,
           c.organization_id, c.amount, c.status, c.created_at, c.updated_at
    FROM cargo_requests c
    JOIN users d ON d.id = c.driver_id
    JOIN users l ON l.id = c.logistician_id
"#;

/// Cargo request status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "cargo_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CargoStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl CargoStatus {
    /// All statuses, in declaration order
    pub const ALL: [CargoStatus; 4] = [
        CargoStatus::Pending,
        CargoStatus::InProgress,
        CargoStatus::Completed,
        CargoStatus::Cancelled,
    ];

    /// Converts status to its stored string form
    pub fn as_str(&self) -> &'static str {
        match self {
            CargoStatus::Pending => "PENDING",
            CargoStatus::InProgress => "IN_PROGRESS",
            CargoStatus::Completed => "COMPLETED",
            CargoStatus::Cancelled => "CANCELLED",
        }
    }

    /// Parses a status from its stored string form
    ///
    /// Matching is exact: `"pending"` is not a status.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }
}

/// Cargo request with the display names of its participants
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CargoRequest {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub driver_id: Uuid,
    pub driver_name: String,
    pub logistician_id: Uuid,
    pub logistician_name: String,
    pub organization_id: Uuid,
    pub amount: Decimal,
    pub status: CargoStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a cargo request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCargoRequest {
    pub title: String,
    pub description: Option<String>,
    pub driver_id: Uuid,
    pub logistician_id: Uuid,

    /// Always the creating logistician's organization
    pub organization_id: Uuid,

    pub amount: Decimal,
    pub status: CargoStatus,
}

/// Input for updating a cargo request
///
/// The organization is fixed at creation and cannot be changed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCargoRequest {
    pub title: Option<String>,

    /// Use `Some(None)` to clear
    pub description: Option<Option<String>>,

    pub driver_id: Option<Uuid>,
    pub logistician_id: Option<Uuid>,
    pub amount: Option<Decimal>,
    pub status: Option<CargoStatus>,
}

/// Checks an amount fits NUMERIC(10, 2)
///
/// Trailing zeros are ignored, so `12.500` is accepted.
pub fn validate_amount(amount: &Decimal) -> Result<(), String> {
    let normalized = amount.normalize();

    if normalized.scale() > AMOUNT_DECIMAL_PLACES {
        return Err(format!(
            "Ensure that there are no more than {} decimal places.",
            AMOUNT_DECIMAL_PLACES
        ));
    }

    let integer_digits = normalized.trunc().abs().to_string().trim_start_matches('0').len() as u32;
    if integer_digits > MAX_AMOUNT_INTEGER_DIGITS {
        return Err(format!(
            "Ensure that there are no more than {} digits before the decimal point.",
            MAX_AMOUNT_INTEGER_DIGITS
        ));
    }

    Ok(())
}

/// Describes why a user cannot take the given cargo role
///
/// Returns `None` when `user` exists and holds `expected`.
pub fn participant_problem(user: Option<&User>, expected: UserRole) -> Option<String> {
    match user {
        None => Some("User does not exist".to_string()),
        Some(user) if user.role != expected => Some(format!(
            "User {} is a {}, expected {}",
            user.username,
            user.role.as_str(),
            expected.as_str()
        )),
        Some(_) => None,
    }
}

/// Appends the WHERE clause for a visibility scope.
///
/// Returns false when the scope cannot match any cargo request.
fn push_scope(query: &mut QueryBuilder<'_, Postgres>, visibility: &Visibility) -> bool {
    match visibility {
        Visibility::All => {
            query.push(" WHERE TRUE");
        }
        Visibility::Organization(organization_id) => {
            query.push(" WHERE c.organization_id = ").push_bind(*organization_id);
        }
        Visibility::Logistician(user_id) => {
            query.push(" WHERE c.logistician_id = ").push_bind(*user_id);
        }
        Visibility::Driver(user_id) => {
            query.push(" WHERE c.driver_id = ").push_bind(*user_id);
        }
        Visibility::Owner(_) | Visibility::Nothing => return false,
    }
    true
}

impl CargoRequest {
    /// Creates a cargo request
    ///
    /// Participant roles are checked by the caller with
    /// [`participant_problem`]; the database only enforces that they exist.
    pub async fn create(pool: &PgPool, data: CreateCargoRequest) -> Result<Self, sqlx::Error> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO cargo_requests (title, description, driver_id, logistician_id,
                                        organization_id, amount, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(data.title)
        .bind(data.description)
        .bind(data.driver_id)
        .bind(data.logistician_id)
        .bind(data.organization_id)
        .bind(data.amount)
        .bind(data.status)
        .fetch_one(pool)
        .await?;

        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Finds a cargo request by ID, regardless of visibility
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("{CARGO_SELECT} WHERE c.id = $1");

        sqlx::query_as::<_, CargoRequest>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a cargo request by ID within a visibility scope
    pub async fn find_visible(
        pool: &PgPool,
        id: Uuid,
        visibility: &Visibility,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new(CARGO_SELECT);
        if !push_scope(&mut query, visibility) {
            return Ok(None);
        }
        query.push(" AND c.id = ").push_bind(id);

        query.build_query_as::<CargoRequest>().fetch_optional(pool).await
    }

    /// Lists cargo requests within a visibility scope, newest first
    ///
    /// `status` narrows the list to one status.
    pub async fn list_visible(
        pool: &PgPool,
        visibility: &Visibility,
        status: Option<CargoStatus>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new(CARGO_SELECT);
        if !push_scope(&mut query, visibility) {
            return Ok(Vec::new());
        }
        if let Some(status) = status {
            query.push(" AND c.status = ").push_bind(status);
        }
        query.push(" ORDER BY c.created_at DESC, c.id");

        query.build_query_as::<CargoRequest>().fetch_all(pool).await
    }

    /// Updates a cargo request
    ///
    /// Only `Some` fields are written; `updated_at` is always bumped.
    ///
    /// # Returns
    ///
    /// The updated request, or `None` if it doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateCargoRequest,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new("UPDATE cargo_requests SET updated_at = NOW()");

        if let Some(title) = data.title {
            query.push(", title = ").push_bind(title);
        }
        if let Some(description) = data.description {
            query.push(", description = ").push_bind(description);
        }
        if let Some(driver_id) = data.driver_id {
            query.push(", driver_id = ").push_bind(driver_id);
        }
        if let Some(logistician_id) = data.logistician_id {
            query.push(", logistician_id = ").push_bind(logistician_id);
        }
        if let Some(amount) = data.amount {
            query.push(", amount = ").push_bind(amount);
        }
        if let Some(status) = data.status {
            query.push(", status = ").push_bind(status);
        }

        query.push(" WHERE id = ").push_bind(id);

        let updated = query.build().execute(pool).await?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        Self::find_by_id(pool, id).await
    }

    /// Sets the status of a cargo request
    ///
    /// # Returns
    ///
    /// The updated request, or `None` if it doesn't exist
    pub async fn update_status(
        pool: &PgPool,
        id: Uuid,
        status: CargoStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let updated = sqlx::query(
            r#"
            UPDATE cargo_requests
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .execute(pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        Self::find_by_id(pool, id).await
    }

    /// Deletes a cargo request
    ///
    /// # Returns
    ///
    /// True if the request was deleted, false if it didn't exist
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cargo_requests WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
