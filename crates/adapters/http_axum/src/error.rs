//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use hearth_domain::error::{HearthError, NotFoundError};

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`HearthError`] to an HTTP response with appropriate status code.
#[derive(Debug)]
pub struct ApiError(HearthError);

impl ApiError {
    /// 404 for a record that vanished between lookup and mutation, or never existed.
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self(HearthError::NotFound(NotFoundError {
            entity,
            id: id.to_string(),
        }))
    }
}

impl From<HearthError> for ApiError {
    fn from(err: HearthError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            HearthError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            HearthError::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string()),
            HearthError::Storage(err) => {
                tracing::error!(error = %err, "storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            HearthError::Delivery(err) => {
                tracing::error!(error = %err, "agent delivery error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "agent delivery failed".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_domain::error::ValidationError;

    #[test]
    fn should_map_validation_error_to_bad_request() {
        let response = ApiError::from(HearthError::from(ValidationError::EmptySummary)).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn should_map_not_found_to_404() {
        let response = ApiError::not_found("Automation", "abc").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn should_hide_delivery_details_behind_500() {
        let response = ApiError::from(HearthError::Delivery("agent offline".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
