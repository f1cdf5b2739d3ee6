/// Authentication endpoints
///
/// This module provides the public endpoints:
/// - Registration
/// - Token issue (login)
/// - Token refresh
///
/// # Endpoints
///
/// - `POST /v1/register` - Register a new, unapproved user
/// - `POST /v1/token` - Exchange credentials for an access/refresh pair
/// - `POST /v1/token/refresh` - Exchange a refresh token for an access token

use axum::{extract::State, http::StatusCode, Json};
use cargodesk_shared::{
    auth::{jwt, password},
    models::user::{CreateUser, User, UserRole},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::users::{check_password, validate_username, UserResponse};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    extract::ValidJson,
};

const INVALID_CREDENTIALS: &str = "No active account found with the given credentials";

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        length(min = 1, max = 150, message = "Ensure this field has between 1 and 150 characters."),
        custom(function = "validate_username")
    )]
    pub username: String,

    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,

    /// Password (checked for strength)
    pub password: String,

    /// Must equal `password`
    pub password2: String,

    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    #[serde(default)]
    pub first_name: String,

    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    #[serde(default)]
    pub last_name: String,

    /// Requested role, DRIVER if absent
    #[serde(default)]
    pub role: UserRole,

    #[validate(length(max = 20, message = "Ensure this field has no more than 20 characters."))]
    pub phone: Option<String>,
}

impl RegisterRequest {
    /// Cross-field checks that `validator` can't express
    fn problems(&self) -> Vec<ValidationErrorDetail> {
        let mut problems = Vec::new();

        if self.password != self.password2 {
            problems.push(ValidationErrorDetail {
                field: "password".to_string(),
                message: "Password fields didn't match.".to_string(),
            });
        } else {
            problems.extend(check_password("password", &self.password, &self.username));
        }

        if self.role == UserRole::Admin {
            problems.push(ValidationErrorDetail {
                field: "role".to_string(),
                message: "Registration as ADMIN is not allowed.".to_string(),
            });
        }

        problems
    }
}

/// Token request
#[derive(Debug, Deserialize, Validate)]
pub struct TokenRequest {
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub username: String,

    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub password: String,
}

/// Refresh request
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub refresh: String,
}

/// Refresh response
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    /// New access token
    pub access: String,
}

/// Register a new user
///
/// The account starts unapproved and outside any organization. Owners add
/// members through `POST /v1/users`; an owner or admin approves them.
///
/// # Endpoint
///
/// ```text
/// POST /v1/register
/// Content-Type: application/json
///
/// {
///   "username": "dan",
///   "email": "dan@example.com",
///   "password": "long-enough-secret",
///   "password2": "long-enough-secret",
///   "first_name": "Dan",
///   "last_name": "Driver",
///   "role": "DRIVER"
/// }
/// ```
///
/// # Response
///
/// `201 Created` with the new user.
///
/// # Errors
///
/// - `400 Bad Request`: Malformed JSON
/// - `409 Conflict`: Username or email already exists
/// - `422 Unprocessable Entity`: Validation failed, passwords differ, weak password or ADMIN role
pub async fn register(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let problems = req.problems();
    if !problems.is_empty() {
        return Err(ApiError::ValidationError(problems));
    }

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            username: req.username,
            email: req.email,
            password_hash,
            first_name: req.first_name,
            last_name: req.last_name,
            role: req.role,
            phone: req.phone,
            organization_id: None,
            is_approved: false,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "User registered");

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Issue tokens
///
/// Authenticates a user by username and password.
///
/// # Endpoint
///
/// ```text
/// POST /v1/token
/// Content-Type: application/json
///
/// { "username": "dan", "password": "long-enough-secret" }
/// ```
///
/// # Response
///
/// ```json
/// { "access": "eyJ...", "refresh": "eyJ..." }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown username or wrong password
pub async fn token(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<TokenRequest>,
) -> ApiResult<Json<jwt::TokenPair>> {
    let user = User::find_by_username(&state.db, &req.username)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Login rejected");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    User::update_last_login(&state.db, user.id).await?;

    let tokens = jwt::issue_token_pair(user.id, state.jwt_secret(), state.config.jwt.lifetimes())?;

    tracing::info!(user_id = %user.id, "Tokens issued");

    Ok(Json(tokens))
}

/// Refresh an access token
///
/// # Endpoint
///
/// ```text
/// POST /v1/token/refresh
/// Content-Type: application/json
///
/// { "refresh": "eyJ..." }
/// ```
///
/// # Response
///
/// ```json
/// { "access": "eyJ..." }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid or expired refresh token, or an access token
pub async fn refresh(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let access = jwt::refresh_access_token(
        &req.refresh,
        state.jwt_secret(),
        state.config.jwt.lifetimes().access,
    )?;

    Ok(Json(RefreshResponse { access }))
}
