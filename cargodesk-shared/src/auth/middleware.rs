/// Request authentication
///
/// Resolves the `Authorization: Bearer <token>` header of a request into an
/// [`AuthContext`]. The token only names the user; role, approval and
/// organization are read from the current user row, so changes made by an
/// owner or admin apply to the next request.
///
/// The API crate runs [`authenticate`] from an axum middleware layer and
/// inserts the resulting context into the request extensions.
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use cargodesk_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("{} ({})", auth.username, auth.role.as_str())
/// }
/// ```

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};
use crate::models::user::{User, UserRole};

/// Authenticated caller, added to request extensions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,

    /// Whether an owner or admin has approved the caller
    pub is_approved: bool,

    /// Organization the caller is a member of
    pub organization_id: Option<Uuid>,
}

impl AuthContext {
    /// Builds the context from the caller's current user row
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
            is_approved: user.is_approved,
            organization_id: user.organization_id,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Error type for authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No Authorization header
    #[error("Authentication credentials were not provided")]
    MissingCredentials,

    /// Authorization header is not a Bearer token
    #[error("{0}")]
    InvalidFormat(String),

    /// Token failed validation
    #[error("{0}")]
    InvalidToken(#[from] JwtError),

    /// Token is valid but its user no longer exists
    #[error("User not found")]
    UnknownUser,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Extracts the Bearer token from request headers
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::InvalidFormat("Authorization header is not valid text".to_string()))?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))
}

/// Authenticates a request from its headers
///
/// # Errors
///
/// - `MissingCredentials` / `InvalidFormat` for a missing or malformed header
/// - `InvalidToken` for a bad signature, expired token or refresh token
/// - `UnknownUser` when the token's user has been deleted
pub async fn authenticate(
    pool: &PgPool,
    headers: &HeaderMap,
    secret: &str,
) -> Result<AuthContext, AuthError> {
    let token = bearer_token(headers)?;
    let claims = validate_access_token(token, secret)?;

    let user = User::find_by_id(pool, claims.sub)
        .await?
        .ok_or(AuthError::UnknownUser)?;

    tracing::debug!(user_id = %user.id, role = user.role.as_str(), "Request authenticated");

    Ok(AuthContext::from_user(&user))
}
