use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::usecases::autopay_errors::AutopayError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code: status.as_u16(),
            message: message.into(),
            details: None,
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl IntoResponse for AutopayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            AutopayError::Gateway {
                message, details, ..
            } => ErrorResponse {
                code: status.as_u16(),
                message,
                details: (!details.is_null()).then_some(details),
            },
            AutopayError::Internal(err) => {
                // Don't leak internal error detail to client
                error!(error = ?err, "autopay: internal error");
                ErrorResponse::new(status, "Internal server error")
            }
            other => ErrorResponse::new(status, other.to_string()),
        };
        body.into_response()
    }
}
