/// Organization endpoints
///
/// # Endpoints
///
/// - `GET /v1/organizations` - List visible organizations
/// - `POST /v1/organizations` - Create an organization owned by the caller
/// - `GET /v1/organizations/:id` - Get an organization
/// - `PUT|PATCH /v1/organizations/:id` - Rename an organization
/// - `DELETE /v1/organizations/:id` - Delete an organization and its cargo requests

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use cargodesk_shared::{
    auth::{
        authorization::{authorize, require_organization_access, visibility, Action, Resource},
        middleware::AuthContext,
    },
    models::organization::{CreateOrganization, Organization},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ValidJson,
};

/// Organization as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationResponse {
    pub id: Uuid,
    pub name: String,

    /// Owning user ID
    pub owner: Uuid,

    pub created_at: DateTime<Utc>,
}

impl From<Organization> for OrganizationResponse {
    fn from(organization: Organization) -> Self {
        Self {
            id: organization.id,
            name: organization.name,
            owner: organization.owner_id,
            created_at: organization.created_at,
        }
    }
}

/// Create organization request
///
/// There is no owner field: the owner is always the caller.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrganizationRequest {
    #[validate(length(min = 1, max = 255, message = "Ensure this field has between 1 and 255 characters."))]
    pub name: String,
}

/// Update organization request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateOrganizationRequest {
    #[validate(length(min = 1, max = 255, message = "Ensure this field has between 1 and 255 characters."))]
    pub name: Option<String>,
}

async fn accessible_organization(
    state: &AppState,
    auth: &AuthContext,
    id: Uuid,
    action: Action,
) -> ApiResult<Organization> {
    authorize(auth, Resource::Organization, action)?;

    let organization =
        Organization::find_visible(&state.db, id, &visibility(auth, Resource::Organization))
            .await?
            .ok_or_else(|| ApiError::not_found("Organization"))?;

    require_organization_access(auth, &organization)?;

    Ok(organization)
}

/// List organizations
///
/// Admins see every organization, owners the one they own, everyone else
/// an empty list.
///
/// # Endpoint
///
/// ```text
/// GET /v1/organizations
/// ```
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<OrganizationResponse>>> {
    authorize(&auth, Resource::Organization, Action::List)?;

    let organizations =
        Organization::list_visible(&state.db, &visibility(&auth, Resource::Organization)).await?;

    Ok(Json(
        organizations
            .into_iter()
            .map(OrganizationResponse::from)
            .collect(),
    ))
}

/// Create an organization
///
/// # Endpoint
///
/// ```text
/// POST /v1/organizations
/// Content-Type: application/json
///
/// { "name": "Acme Freight" }
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an owner or admin
/// - `409 Conflict`: Caller already owns an organization
/// - `422 Unprocessable Entity`: Invalid name
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidJson(req): ValidJson<CreateOrganizationRequest>,
) -> ApiResult<(StatusCode, Json<OrganizationResponse>)> {
    authorize(&auth, Resource::Organization, Action::Create)?;

    let organization = Organization::create(
        &state.db,
        CreateOrganization {
            name: req.name,
            owner_id: auth.user_id,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(organization.into())))
}

/// Get an organization
///
/// # Endpoint
///
/// ```text
/// GET /v1/organizations/:id
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an owner or admin
/// - `404 Not Found`: Organization doesn't exist or is not visible
pub async fn retrieve(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<OrganizationResponse>> {
    let organization = accessible_organization(&state, &auth, id, Action::Retrieve).await?;
    Ok(Json(organization.into()))
}

/// Rename an organization
///
/// Serves both `PUT` and `PATCH`.
///
/// # Endpoint
///
/// ```text
/// PATCH /v1/organizations/:id
/// Content-Type: application/json
///
/// { "name": "Acme Logistics" }
/// ```
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    ValidJson(req): ValidJson<UpdateOrganizationRequest>,
) -> ApiResult<Json<OrganizationResponse>> {
    let organization = accessible_organization(&state, &auth, id, Action::Update).await?;

    let Some(name) = req.name else {
        return Ok(Json(organization.into()));
    };

    let updated = Organization::rename(&state.db, id, &name)
        .await?
        .ok_or_else(|| ApiError::not_found("Organization"))?;

    tracing::info!(organization_id = %id, updated_by = %auth.user_id, "Organization renamed");

    Ok(Json(updated.into()))
}

/// Delete an organization
///
/// Deletes its cargo requests; members stay but lose their membership.
///
/// # Endpoint
///
/// ```text
/// DELETE /v1/organizations/:id
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
    accessible_organization(&state, &auth, id, Action::Delete).await?;

    if !Organization::delete(&state.db, id).await? {
        return Err(ApiError::not_found("Organization"));
    }

    tracing::info!(organization_id = %id, deleted_by = %auth.user_id, "Organization deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_is_not_request_input() {
        let req: CreateOrganizationRequest =
            serde_json::from_str(r#"{"name": "Acme", "owner": "00000000-0000-0000-0000-000000000000"}"#)
                .unwrap();
        assert_eq!(req.name, "Acme");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_name_length() {
        let blank = CreateOrganizationRequest { name: String::new() };
        assert!(blank.validate().is_err());

        let long = UpdateOrganizationRequest {
            name: Some("x".repeat(256)),
        };
        assert!(long.validate().is_err());

        let absent = UpdateOrganizationRequest { name: None };
        assert!(absent.validate().is_ok());
    }

    #[test]
    fn test_response_shape() {
        let organization = Organization {
            id: Uuid::new_v4(),
            name: "Acme".to_string(),
            owner_id: Uuid::new_v4(),
            created_at: Utc::now(),
        };
        let owner = organization.owner_id;

        let json = serde_json::to_value(OrganizationResponse::from(organization)).unwrap();
        assert_eq!(json["owner"], owner.to_string());
        assert_eq!(json["name"], "Acme");
        assert!(json.get("owner_id").is_none());
    }
}
