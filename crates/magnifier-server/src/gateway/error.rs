use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found")]
    NotFound,

    #[error("{message}")]
    Upstream { message: String, details: String },

    #[error("{message}")]
    Internal { message: String, details: String },
}

impl GatewayError {
    pub fn invalid(message: impl Into<String>) -> Self {
        GatewayError::InvalidRequest(message.into())
    }

    pub fn upstream(message: impl Into<String>, source: impl std::fmt::Display) -> Self {
        GatewayError::Upstream {
            message: message.into(),
            details: source.to_string(),
        }
    }

    pub fn internal(message: impl Into<String>, source: impl std::fmt::Display) -> Self {
        GatewayError::Internal {
            message: message.into(),
            details: source.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::NotFound => StatusCode::NOT_FOUND,
            GatewayError::Upstream { .. } | GatewayError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub code: u16,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.to_string();
        let details = match self {
            GatewayError::Upstream { details, .. } | GatewayError::Internal { details, .. } => {
                Some(details)
            }
            _ => None,
        };

        if status.is_server_error() {
            tracing::error!(%status, error = %error, details = ?details, "Request failed");
        }

        let body = Json(ErrorResponse {
            error,
            details,
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}
