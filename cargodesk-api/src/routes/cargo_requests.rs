/// Cargo request endpoints
///
/// Approved logisticians create and change cargo requests; everyone reads
/// the requests in their visibility scope (admins all, owners their
/// organization's, logisticians and drivers the ones they take part in).
///
/// # Endpoints
///
/// - `GET /v1/cargo-requests?status=PENDING` - List visible cargo requests
/// - `POST /v1/cargo-requests` - Create a cargo request
/// - `GET /v1/cargo-requests/:id` - Get a cargo request
/// - `PUT|PATCH /v1/cargo-requests/:id` - Update a cargo request
/// - `DELETE /v1/cargo-requests/:id` - Delete a cargo request
/// - `PATCH /v1/cargo-requests/:id/update_status` - Change the status

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use cargodesk_shared::{
    auth::{
        authorization::{authorize, cargo_organization, visibility, Action, Resource},
        middleware::AuthContext,
    },
    models::{
        cargo_request::{
            participant_problem, validate_amount, CargoRequest, CargoStatus, CreateCargoRequest,
            UpdateCargoRequest,
        },
        user::{User, UserRole},
    },
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::StatusMessage;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    extract::ValidJson,
};

/// Cargo request as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CargoRequestResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub driver: Uuid,
    pub driver_name: String,
    pub logistician: Uuid,
    pub logistician_name: String,
    pub organization: Uuid,

    /// Serialized as a string, e.g. `"100.00"`
    pub amount: Decimal,

    pub status: CargoStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CargoRequest> for CargoRequestResponse {
    fn from(cargo: CargoRequest) -> Self {
        Self {
            id: cargo.id,
            title: cargo.title,
            description: cargo.description,
            driver: cargo.driver_id,
            driver_name: cargo.driver_name,
            logistician: cargo.logistician_id,
            logistician_name: cargo.logistician_name,
            organization: cargo.organization_id,
            amount: cargo.amount,
            status: cargo.status,
            created_at: cargo.created_at,
            updated_at: cargo.updated_at,
        }
    }
}

/// List query parameters
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

/// Create cargo request payload
///
/// There is no organization field: requests are filed under the creating
/// logistician's organization.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCargoPayload {
    #[validate(length(min = 1, max = 200, message = "Ensure this field has between 1 and 200 characters."))]
    pub title: String,

    pub description: Option<String>,

    /// Driver user ID
    pub driver: Uuid,

    /// Logistician user ID
    pub logistician: Uuid,

    pub amount: Decimal,

    /// PENDING if absent
    pub status: Option<String>,
}

/// Update cargo request payload
///
/// Absent fields are left unchanged; `"description": null` clears it.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCargoPayload {
    #[validate(length(min = 1, max = 200, message = "Ensure this field has between 1 and 200 characters."))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "crate::routes::double_option")]
    pub description: Option<Option<String>>,

    pub driver: Option<Uuid>,
    pub logistician: Option<Uuid>,
    pub amount: Option<Decimal>,
    pub status: Option<String>,
}

/// Status update payload
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStatusPayload {
    pub status: String,
}

fn parse_status(value: &str) -> ApiResult<CargoStatus> {
    CargoStatus::parse(value)
        .ok_or_else(|| ApiError::field("status", format!("\"{}\" is not a valid choice.", value)))
}

fn check_amount(amount: &Decimal) -> ApiResult<()> {
    validate_amount(amount).map_err(|message| ApiError::field("amount", message))
}

/// Checks that the referenced users exist and hold the matching role
///
/// Both fields are checked so the response names every problem.
async fn check_participants(
    state: &AppState,
    driver: Option<Uuid>,
    logistician: Option<Uuid>,
) -> ApiResult<()> {
    let mut problems = Vec::new();

    for (field, id, expected) in [
        ("driver", driver, UserRole::Driver),
        ("logistician", logistician, UserRole::Logistician),
    ] {
        let Some(id) = id else { continue };

        let user = User::find_by_id(&state.db, id).await?;
        if let Some(message) = participant_problem(user.as_ref(), expected) {
            problems.push(ValidationErrorDetail {
                field: field.to_string(),
                message,
            });
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ApiError::ValidationError(problems))
    }
}

/// Loads a cargo request the caller may act on
///
/// The role gate runs first, so a driver gets 403 before any lookup.
/// Requests outside the caller's visibility are 404.
async fn visible_cargo(
    state: &AppState,
    auth: &AuthContext,
    id: Uuid,
    action: Action,
) -> ApiResult<CargoRequest> {
    authorize(auth, Resource::CargoRequest, action)?;

    CargoRequest::find_visible(&state.db, id, &visibility(auth, Resource::CargoRequest))
        .await?
        .ok_or_else(|| ApiError::not_found("Cargo request"))
}

/// List cargo requests
///
/// Newest first. `status` narrows the list to one status.
///
/// # Endpoint
///
/// ```text
/// GET /v1/cargo-requests?status=IN_PROGRESS
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Unknown status filter
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<CargoRequestResponse>>> {
    authorize(&auth, Resource::CargoRequest, Action::List)?;

    let status = query.status.as_deref().map(parse_status).transpose()?;

    let cargo_requests = CargoRequest::list_visible(
        &state.db,
        &visibility(&auth, Resource::CargoRequest),
        status,
    )
    .await?;

    Ok(Json(
        cargo_requests
            .into_iter()
            .map(CargoRequestResponse::from)
            .collect(),
    ))
}

/// Create a cargo request
///
/// # Endpoint
///
/// ```text
/// POST /v1/cargo-requests
/// Content-Type: application/json
///
/// {
///   "title": "Pallets to Lyon",
///   "driver": "uuid",
///   "logistician": "uuid",
///   "amount": "100.00"
/// }
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an approved logistician, or has no organization
/// - `422 Unprocessable Entity`: Invalid field, unknown status or participant with the wrong role
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidJson(req): ValidJson<CreateCargoPayload>,
) -> ApiResult<(StatusCode, Json<CargoRequestResponse>)> {
    let organization_id = cargo_organization(&auth)?;

    let status = match req.status.as_deref() {
        Some(value) => parse_status(value)?,
        None => CargoStatus::default(),
    };
    check_amount(&req.amount)?;
    check_participants(&state, Some(req.driver), Some(req.logistician)).await?;

    let cargo = CargoRequest::create(
        &state.db,
        CreateCargoRequest {
            title: req.title,
            description: req.description,
            driver_id: req.driver,
            logistician_id: req.logistician,
            organization_id,
            amount: req.amount,
            status,
        },
    )
    .await?;

    tracing::info!(
        cargo_request_id = %cargo.id,
        organization_id = %organization_id,
        created_by = %auth.user_id,
        "Cargo request created"
    );

    Ok((StatusCode::CREATED, Json(cargo.into())))
}

/// Get a cargo request
///
/// # Endpoint
///
/// ```text
/// GET /v1/cargo-requests/:id
/// ```
///
/// # Errors
///
/// - `404 Not Found`: Request doesn't exist or is not visible
pub async fn retrieve(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CargoRequestResponse>> {
    let cargo = visible_cargo(&state, &auth, id, Action::Retrieve).await?;
    Ok(Json(cargo.into()))
}

/// Update a cargo request
///
/// Serves both `PUT` and `PATCH`; only fields present in the body change.
/// The organization never changes.
///
/// # Endpoint
///
/// ```text
/// PATCH /v1/cargo-requests/:id
/// Content-Type: application/json
///
/// { "amount": "120.00", "description": null }
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an approved logistician
/// - `404 Not Found`: Request doesn't exist or is not visible
/// - `422 Unprocessable Entity`: Invalid field
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    ValidJson(req): ValidJson<UpdateCargoPayload>,
) -> ApiResult<Json<CargoRequestResponse>> {
    let cargo = visible_cargo(&state, &auth, id, Action::Update).await?;

    let status = req.status.as_deref().map(parse_status).transpose()?;
    if let Some(amount) = &req.amount {
        check_amount(amount)?;
    }
    check_participants(&state, req.driver, req.logistician).await?;

    let changes = UpdateCargoRequest {
        title: req.title,
        description: req.description,
        driver_id: req.driver,
        logistician_id: req.logistician,
        amount: req.amount,
        status,
    };

    let updated = CargoRequest::update(&state.db, cargo.id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("Cargo request"))?;

    tracing::info!(cargo_request_id = %id, updated_by = %auth.user_id, "Cargo request updated");

    Ok(Json(updated.into()))
}

/// Delete a cargo request
///
/// # Endpoint
///
/// ```text
/// DELETE /v1/cargo-requests/:id
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
    visible_cargo(&state, &auth, id, Action::Delete).await?;

    if !CargoRequest::delete(&state.db, id).await? {
        return Err(ApiError::not_found("Cargo request"));
    }

    tracing::info!(cargo_request_id = %id, deleted_by = %auth.user_id, "Cargo request deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Change the status of a cargo request
///
/// Any status may follow any other. An unknown status leaves the request
/// unchanged.
///
/// # Endpoint
///
/// ```text
/// PATCH /v1/cargo-requests/:id/update_status
/// Content-Type: application/json
///
/// { "status": "IN_PROGRESS" }
/// ```
///
/// # Response
///
/// ```json
/// { "status": "cargo status updated" }
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an approved logistician
/// - `404 Not Found`: Request doesn't exist or is not visible
/// - `422 Unprocessable Entity`: Not one of PENDING, IN_PROGRESS, COMPLETED, CANCELLED
pub async fn update_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    ValidJson(req): ValidJson<UpdateStatusPayload>,
) -> ApiResult<Json<StatusMessage>> {
    let cargo = visible_cargo(&state, &auth, id, Action::UpdateStatus).await?;
    let status = parse_status(&req.status)?;

    CargoRequest::update_status(&state.db, cargo.id, status)
        .await?
        .ok_or_else(|| ApiError::not_found("Cargo request"))?;

    tracing::info!(
        cargo_request_id = %id,
        from = cargo.status.as_str(),
        to = status.as_str(),
        "Cargo status updated"
    );

    Ok(Json(StatusMessage::new("cargo status updated")))
}
