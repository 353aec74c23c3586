//! Response envelopes and error mapping.
//!
//! Every route answers with `{ "success": true, "data": ..., "message"?: ... }`
//! or `{ "success": false, "error": { "code", "message" } }`. Internal
//! errors are reduced to their display text; nothing else leaks.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use stagehand_core::RelayError;
use thiserror::Error;

/// Shown when a route needs a running relay and there is none.
pub const NOT_RUNNING_MESSAGE: &str = "MediaMTX server is not running";

/// Shown when the relay runs but its control API does not answer.
pub const API_UNREACHABLE_MESSAGE: &str = "MediaMTX control API is unreachable";

/// Axum-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The relay binary is missing.
    #[error("{0}")]
    RelayUnavailable(String),

    /// The route needs a running relay.
    #[error("MediaMTX server is not running")]
    RelayNotRunning,

    /// The relay is running but its control API did not answer.
    #[error("MediaMTX control API is unreachable")]
    ControlApiUnreachable,

    /// A relay lifecycle operation failed.
    #[error("{message}")]
    Relay { code: &'static str, message: String },

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HttpError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::RelayUnavailable(_) | Self::RelayNotRunning | Self::ControlApiUnreachable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Relay { .. } | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable discriminant for client-side handling.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::RelayUnavailable(_) => "RELAY_UNAVAILABLE",
            Self::RelayNotRunning => "RELAY_NOT_RUNNING",
            Self::ControlApiUnreachable => "CONTROL_API_UNREACHABLE",
            Self::Relay { code, .. } => *code,
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: ErrorDetail,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            tracing::error!(code = self.code(), error = %self, "Request failed");
        }

        let body = ErrorBody {
            success: false,
            error: ErrorDetail {
                code: self.code(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<RelayError> for HttpError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::Unavailable { .. } => Self::RelayUnavailable(err.to_string()),
            RelayError::Internal(msg) => Self::Internal(msg),
            other => Self::Relay {
                code: other.code(),
                message: other.to_string(),
            },
        }
    }
}

/// Success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
            message: None,
        })
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            data,
            message: Some(message.into()),
        })
    }
}
