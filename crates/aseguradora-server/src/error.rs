//! HTTP error mapping

use aseguradora_core::{Error, ValidationError};
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, error};

/// Error returned by every policy handler, rendered as `{"error": message}`
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed body, schema violation, or duplicate policy number
    #[error("{0}")]
    BadRequest(String),

    /// Unknown identifier
    #[error("{0}")]
    NotFound(String),

    /// Body larger than the configured limit
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Storage failure or other server-side fault
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn policy_not_found(id: &str) -> Self {
        Error::policy_not_found(id).into()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            err if err.is_client_error() => ApiError::BadRequest(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        // Every other body rejection (syntax, shape, content type) is a 400
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(rejection.body_text())
        } else {
            ApiError::BadRequest(rejection.body_text())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            error!(%status, error = %message, "Request failed");
        } else {
            debug!(%status, error = %message, "Request rejected");
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aseguradora_core::FieldError;

    #[test]
    fn test_core_error_mapping() {
        let cases = [
            (Error::duplicate_policy_number("P1"), StatusCode::BAD_REQUEST),
            (
                ValidationError::new(vec![FieldError::new("policyHolder", "is required")]).into(),
                StatusCode::BAD_REQUEST,
            ),
            (Error::policy_not_found("x"), StatusCode::NOT_FOUND),
            (Error::storage("connection reset"), StatusCode::INTERNAL_SERVER_ERROR),
            (Error::config("bad url"), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err = ValidationError::new(vec![FieldError::new("insuredAmount", "must be a number")]);
        let api: ApiError = err.into();
        assert_eq!(api.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            api.to_string(),
            "policy validation failed: insuredAmount: must be a number"
        );
    }

    #[test]
    fn test_not_found_keeps_message() {
        let api = ApiError::policy_not_found("abc");
        assert_eq!(api.to_string(), "policy 'abc' not found");
        assert_eq!(api.into_response().status(), StatusCode::NOT_FOUND);
    }
}
