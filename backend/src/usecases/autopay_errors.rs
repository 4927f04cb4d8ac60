use axum::http::StatusCode;
use crates::payments::autopay_client::gateway_error_of;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AutopayError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    InvalidState(String),
    #[error("autopay gateway request failed: {message}")]
    Gateway {
        status: Option<u16>,
        message: String,
        details: Value,
    },
    #[error("unauthorized")]
    Unauthorized,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AutopayError {
    /// Wraps a failed gateway call, keeping the gateway's error payload when there is one.
    pub fn gateway(err: anyhow::Error) -> Self {
        match gateway_error_of(&err) {
            Some(api_error) => AutopayError::Gateway {
                status: Some(api_error.status),
                message: api_error.message.clone(),
                details: api_error.body.clone(),
            },
            None => AutopayError::Gateway {
                status: None,
                message: err.to_string(),
                details: Value::Null,
            },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AutopayError::Validation(_) => StatusCode::BAD_REQUEST,
            AutopayError::NotFound(_) => StatusCode::NOT_FOUND,
            AutopayError::InvalidState(_) => StatusCode::CONFLICT,
            AutopayError::Gateway { .. } => StatusCode::BAD_GATEWAY,
            AutopayError::Unauthorized => StatusCode::UNAUTHORIZED,
            AutopayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, AutopayError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crates::payments::autopay_client::GatewayApiError;
    use serde_json::json;

    #[test]
    fn gateway_error_payload_is_attached() {
        let err = anyhow::Error::from(GatewayApiError {
            status: 400,
            code: Some("INVALID_MANDATE".to_string()),
            message: "mandate amount exceeds limit".to_string(),
            body: json!({"code": "INVALID_MANDATE"}),
            context: "setup mandate".to_string(),
        });

        match AutopayError::gateway(err) {
            AutopayError::Gateway {
                status,
                message,
                details,
            } => {
                assert_eq!(status, Some(400));
                assert_eq!(message, "mandate amount exceeds limit");
                assert_eq!(details["code"], "INVALID_MANDATE");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn transport_failures_still_map_to_gateway_errors() {
        let err = AutopayError::gateway(anyhow::anyhow!("operation timed out"));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }
}
