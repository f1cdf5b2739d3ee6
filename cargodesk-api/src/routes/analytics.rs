/// Analytics endpoint
///
/// # Endpoint
///
/// ```text
/// GET /v1/analytics
/// Authorization: Bearer <access token>
/// ```
///
/// # Response
///
/// ```json
/// {
///   "organization": {"id": "uuid", "name": "Acme Freight", "total_amount": "225.00", "total_cargos": 3},
///   "monthly_data": [
///     {"month": 1, "year": 2024,
///      "driver": {"id": "uuid", "name": "Dan Driver"},
///      "logistician": {"id": "uuid", "name": "Lou Gist"},
///      "total_amount": "100.00", "total_cargos": 1}
///   ]
/// }
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an owner or admin, or has no organization
/// - `404 Not Found`: Caller's organization no longer exists

use axum::{extract::State, Extension, Json};
use cargodesk_shared::{
    analytics::{organization_report, AnalyticsReport},
    auth::{authorization::report_organization, middleware::AuthContext},
};

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};

/// Report for the caller's own organization, computed live
pub async fn report(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<AnalyticsReport>> {
    let organization_id = report_organization(&auth)?;

    let report = organization_report(&state.db, organization_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Organization"))?;

    tracing::info!(
        organization_id = %organization_id,
        requested_by = %auth.user_id,
        total_cargos = report.organization.total_cargos,
        "Analytics report served"
    );

    Ok(Json(report))
}
