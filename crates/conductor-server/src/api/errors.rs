//! Error handling for the Conductor Server API
//!
//! This module contains standardized error handling for the API.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use tracing::warn;

use crate::error::ServerError;

impl ServerError {
    /// HTTP status code and machine-readable error code for this error
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, "ERR_NOT_FOUND"),
            ServerError::ValidationError(_) => (StatusCode::BAD_REQUEST, "ERR_VALIDATION_ERROR"),
            ServerError::DispatchError(_) => (StatusCode::BAD_GATEWAY, "ERR_DISPATCH_ERROR"),
            ServerError::ConfigError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "ERR_CONFIG_ERROR"),
            ServerError::InternalError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "ERR_INTERNAL_SERVER_ERROR")
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_code) = self.status_and_code();
        let message = self.to_string();

        if status.is_server_error() {
            warn!(%status, error_code, error = %message, "Request failed");
        }

        let body = json!({
            "success": false,
            "error": message,
            "errorDetails": {
                "errorCode": error_code,
                "errorMessage": message,
            }
        });

        (status, Json(body)).into_response()
    }
}
