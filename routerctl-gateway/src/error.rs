//! Error types for the gateway crate.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use routerctl_executor::ServiceError;
use serde_json::json;

use crate::validate::FieldError;

/// Errors that can occur during gateway request handling.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// A firewall, DHCP or network operation failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The request body is not JSON.
    #[error("malformed JSON body: {0}")]
    MalformedBody(String),

    /// One or more request fields are missing or invalid.
    #[error("invalid request: {} field(s) rejected", .0.len())]
    Validation(Vec<FieldError>),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            GatewayError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                Json(json!({"success": false, "errors": errors})),
            )
                .into_response(),
            GatewayError::MalformedBody(_) => (
                StatusCode::BAD_REQUEST,
                Json(json!({"success": false, "error": self.to_string()})),
            )
                .into_response(),
            GatewayError::Service(ref e) => {
                tracing::error!(error = %e, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"success": false, "error": self.to_string()})),
                )
                    .into_response()
            }
        }
    }
}
