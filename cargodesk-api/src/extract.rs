/// Request extractors
///
/// [`ValidJson`] replaces axum's `Json` for request bodies: rejections are
/// rendered as [`ApiError`] like every other error, and the payload is run
/// through `validator` before the handler sees it.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::{ApiError, ValidationErrorDetail};

/// JSON body that deserialized and passed validation
///
/// - Malformed JSON or a wrong content type: 400 `bad_request`
/// - Missing fields or wrong types: 422 `validation_error` on `body`
/// - `validator` rule violations: 422 `validation_error` per field
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(json_rejection)?;

        value.validate()?;
        Ok(ValidJson(value))
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::JsonDataError(err) => ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "body".to_string(),
            message: err.body_text(),
        }]),
        other => ApiError::BadRequest(other.body_text()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, response::IntoResponse, routing::post, Router};
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Deserialize, Validate)]
    struct Payload {
        #[validate(length(min = 1, message = "This field may not be blank."))]
        title: String,
    }

    async fn handler(ValidJson(payload): ValidJson<Payload>) -> impl IntoResponse {
        payload.title
    }

    async fn send(body: &str) -> StatusCode {
        Router::new()
            .route("/", post(handler))
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_valid_payload() {
        assert_eq!(send(r#"{"title": "Pallets"}"#).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        assert_eq!(send(r#"{"title": "#).await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_field_is_validation_error() {
        assert_eq!(send(r#"{}"#).await, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_rule_violation_is_validation_error() {
        assert_eq!(send(r#"{"title": ""}"#).await, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
