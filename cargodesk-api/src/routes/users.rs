/// User management endpoints
///
/// Owners and admins see the members of their own organization. Owners
/// manage only members of the organization they own; admins manage every
/// member they can see.
///
/// # Endpoints
///
/// - `GET /v1/users/me` - Caller's own profile
/// - `GET /v1/users` - List users of the caller's organization
/// - `POST /v1/users` - Create a user in the caller's organization
/// - `GET /v1/users/:id` - Get a user
/// - `PUT|PATCH /v1/users/:id` - Update a user
/// - `DELETE /v1/users/:id` - Delete a user
/// - `PATCH /v1/users/:id/approve` - Approve a user
/// - `PATCH /v1/users/:id/reject` - Reject (delete) a user

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use cargodesk_shared::{
    auth::{
        authorization::{
            authorize, require_member_management, require_role_grant, visibility, Action,
            Resource,
        },
        middleware::AuthContext,
        password,
    },
    models::{
        organization::Organization,
        user::{CreateUser, UpdateUser, User, UserRole},
    },
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::StatusMessage;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    extract::ValidJson,
};

/// User as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub is_approved: bool,
    pub phone: Option<String>,

    /// Organization ID
    pub organization: Option<Uuid>,

    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            is_approved: user.is_approved,
            phone: user.phone,
            organization: user.organization_id,
            last_login_at: user.last_login_at,
        }
    }
}

/// Usernames may contain letters, digits and `@ . + - _`
pub(crate) fn validate_username(username: &str) -> Result<(), ValidationError> {
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_');

    if username.chars().all(allowed) {
        Ok(())
    } else {
        let mut error = ValidationError::new("username");
        error.message = Some(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .into(),
        );
        Err(error)
    }
}

/// Runs the password strength rules, scoping problems to `field`
pub(crate) fn check_password(
    field: &str,
    candidate: &str,
    username: &str,
) -> Vec<ValidationErrorDetail> {
    match password::validate_password_strength(candidate, Some(username)) {
        Ok(()) => Vec::new(),
        Err(problems) => problems
            .into_iter()
            .map(|message| ValidationErrorDetail {
                field: field.to_string(),
                message,
            })
            .collect(),
    }
}

/// Create user request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(
        length(min = 1, max = 150, message = "Ensure this field has between 1 and 150 characters."),
        custom(function = "validate_username")
    )]
    pub username: String,

    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,

    pub password: String,

    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    #[serde(default)]
    pub first_name: String,

    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    #[serde(default)]
    pub last_name: String,

    #[serde(default)]
    pub role: UserRole,

    #[validate(length(max = 20, message = "Ensure this field has no more than 20 characters."))]
    pub phone: Option<String>,
}

/// Update user request
///
/// Absent fields are left unchanged; `"phone": null` clears the phone.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(
        length(min = 1, max = 150, message = "Ensure this field has between 1 and 150 characters."),
        custom(function = "validate_username")
    )]
    pub username: Option<String>,

    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,

    pub password: Option<String>,

    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    pub first_name: Option<String>,

    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    pub last_name: Option<String>,

    pub role: Option<UserRole>,

    #[validate(length(max = 20, message = "Ensure this field has no more than 20 characters."))]
    #[serde(default, deserialize_with = "crate::routes::double_option")]
    pub phone: Option<Option<String>>,
}

/// Loads a user the caller can see and is allowed to manage
///
/// Users outside the caller's visibility are 404; visible users the caller
/// doesn't manage are 403.
async fn managed_user(
    state: &AppState,
    auth: &AuthContext,
    id: Uuid,
    action: Action,
) -> ApiResult<User> {
    authorize(auth, Resource::User, action)?;

    let user = User::find_visible(&state.db, id, &visibility(auth, Resource::User))
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    let organization = match user.organization_id {
        Some(organization_id) => Organization::find_by_id(&state.db, organization_id).await?,
        None => None,
    };

    require_member_management(auth, &user, organization.as_ref())?;

    Ok(user)
}

/// Get the caller's own profile
///
/// # Endpoint
///
/// ```text
/// GET /v1/users/me
/// Authorization: Bearer <access token>
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Missing or invalid token
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UserResponse>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

    Ok(Json(user.into()))
}

/// List users of the caller's organization
///
/// Roles other than owner and admin get an empty list.
///
/// # Endpoint
///
/// ```text
/// GET /v1/users
/// ```
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<UserResponse>>> {
    authorize(&auth, Resource::User, Action::List)?;

    let users = User::list_visible(&state.db, &visibility(&auth, Resource::User)).await?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Create a user in the caller's organization
///
/// The new user joins the caller's organization whatever the request says,
/// and starts unapproved.
///
/// # Endpoint
///
/// ```text
/// POST /v1/users
/// Content-Type: application/json
///
/// {
///   "username": "driver1",
///   "email": "driver1@example.com",
///   "password": "long-enough-secret",
///   "first_name": "Dan",
///   "last_name": "Driver",
///   "role": "DRIVER"
/// }
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an owner or admin, or grants ADMIN without being one
/// - `409 Conflict`: Username or email taken
/// - `422 Unprocessable Entity`: Validation failed
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidJson(req): ValidJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    authorize(&auth, Resource::User, Action::Create)?;
    require_role_grant(&auth, req.role)?;

    let problems = check_password("password", &req.password, &req.username);
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
            organization_id: auth.organization_id,
            is_approved: false,
        },
    )
    .await?;

    tracing::info!(
        user_id = %user.id,
        created_by = %auth.user_id,
        role = user.role.as_str(),
        "User created"
    );

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Get a user
///
/// # Endpoint
///
/// ```text
/// GET /v1/users/:id
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: Caller doesn't manage this user
/// - `404 Not Found`: User doesn't exist or is not visible
pub async fn retrieve(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    let user = managed_user(&state, &auth, id, Action::Retrieve).await?;
    Ok(Json(user.into()))
}

/// Update a user
///
/// Serves both `PUT` and `PATCH`; only fields present in the body change.
///
/// # Endpoint
///
/// ```text
/// PATCH /v1/users/:id
/// Content-Type: application/json
///
/// { "phone": "+15550100", "role": "LOGISTICIAN" }
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: Caller doesn't manage this user, or grants ADMIN without being one
/// - `404 Not Found`: User doesn't exist or is not visible
/// - `409 Conflict`: New username or email taken
/// - `422 Unprocessable Entity`: Validation failed
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    ValidJson(req): ValidJson<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    let user = managed_user(&state, &auth, id, Action::Update).await?;

    if let Some(role) = req.role {
        require_role_grant(&auth, role)?;
    }

    let password_hash = match &req.password {
        Some(candidate) => {
            let username = req.username.as_deref().unwrap_or(&user.username);
            let problems = check_password("password", candidate, username);
            if !problems.is_empty() {
                return Err(ApiError::ValidationError(problems));
            }
            Some(password::hash_password(candidate)?)
        }
        None => None,
    };

    let changes = UpdateUser {
        username: req.username,
        email: req.email,
        password_hash,
        first_name: req.first_name,
        last_name: req.last_name,
        role: req.role,
        phone: req.phone,
        organization_id: None,
    };

    if changes.is_empty() {
        return Ok(Json(user.into()));
    }

    let updated = User::update(&state.db, id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    tracing::info!(user_id = %id, updated_by = %auth.user_id, "User updated");

    Ok(Json(updated.into()))
}

/// Delete a user
///
/// Cascades to the organization they own and the cargo requests they take
/// part in.
///
/// # Endpoint
///
/// ```text
/// DELETE /v1/users/:id
/// ```
///
/// # Response
///
/// `204 No Content`
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    managed_user(&state, &auth, id, Action::Delete).await?;

    if !User::delete(&state.db, id).await? {
        return Err(ApiError::not_found("User"));
    }

    tracing::info!(user_id = %id, deleted_by = %auth.user_id, "User deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Approve a user
///
/// # Endpoint
///
/// ```text
/// PATCH /v1/users/:id/approve
/// ```
///
/// # Response
///
/// ```json
/// { "status": "user approved" }
/// ```
pub async fn approve(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<StatusMessage>> {
    managed_user(&state, &auth, id, Action::Approve).await?;

    User::set_approved(&state.db, id, true)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    tracing::info!(user_id = %id, approved_by = %auth.user_id, "User approved");

    Ok(Json(StatusMessage::new("user approved")))
}

/// Reject a user
///
/// Rejection deletes the account.
///
/// # Endpoint
///
/// ```text
/// PATCH /v1/users/:id/reject
/// ```
///
/// # Response
///
/// `204 No Content`
pub async fn reject(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    managed_user(&state, &auth, id, Action::Reject).await?;

    if !User::delete(&state.db, id).await? {
        return Err(ApiError::not_found("User"));
    }

    tracing::info!(user_id = %id, rejected_by = %auth.user_id, "User rejected");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_characters() {
        assert!(validate_username("driver.one+test@x_y-z").is_ok());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("semi;colon").is_err());
    }

    #[test]
    fn test_create_request_defaults_to_driver() {
        let req: CreateUserRequest = serde_json::from_str(
            r#"{"username": "dan", "email": "dan@example.com", "password": "long-enough-secret"}"#,
        )
        .unwrap();

        assert_eq!(req.role, UserRole::Driver);
        assert_eq!(req.first_name, "");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_create_request_validation() {
        let req: CreateUserRequest = serde_json::from_str(
            r#"{"username": "bad name", "email": "nope", "password": "x", "phone": "012345678901234567890"}"#,
        )
        .unwrap();

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("phone"));
    }

    #[test]
    fn test_update_request_phone_states() {
        let absent: UpdateUserRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.phone, None);

        let cleared: UpdateUserRequest = serde_json::from_str(r#"{"phone": null}"#).unwrap();
        assert_eq!(cleared.phone, Some(None));

        let set: UpdateUserRequest = serde_json::from_str(r#"{"phone": "+1555"}"#).unwrap();
        assert_eq!(set.phone, Some(Some("+1555".to_string())));
    }

    #[test]
    fn test_update_request_phone_length() {
        let long: UpdateUserRequest =
            serde_json::from_str(r#"{"phone": "012345678901234567890"}"#).unwrap();
        let errors = long.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("phone"));

        let cleared: UpdateUserRequest = serde_json::from_str(r#"{"phone": null}"#).unwrap();
        assert!(cleared.validate().is_ok());

        let fits: UpdateUserRequest =
            serde_json::from_str(r#"{"phone": "01234567890123456789"}"#).unwrap();
        assert!(fits.validate().is_ok());
    }

    #[test]
    fn test_check_password_scopes_problems() {
        let problems = check_password("password", "12345678", "dan");
        assert!(!problems.is_empty());
        assert!(problems.iter().all(|p| p.field == "password"));

        assert!(check_password("password", "a-much-better-secret", "dan").is_empty());
    }

    #[test]
    fn test_user_response_hides_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            username: "dan".to_string(),
            email: "dan@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            first_name: "Dan".to_string(),
            last_name: "Driver".to_string(),
            role: UserRole::Driver,
            is_approved: false,
            phone: None,
            organization_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        };

        let json = serde_json::to_value(UserResponse::from(user)).unwrap();
        assert_eq!(json["role"], "DRIVER");
        assert!(json["organization"].is_null());
        assert!(json.get("password_hash").is_none());
        assert!(!json.to_string().contains("argon2id"));
    }
}
