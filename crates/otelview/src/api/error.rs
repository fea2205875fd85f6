use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use otelview_core::ViewError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    BadRequest { message: String },

    #[error("{message}")]
    NotFound {
        message: String,
        trace_id: Option<String>,
    },

    #[error("{message}")]
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn trace_not_found(trace_id: &str) -> Self {
        Self::NotFound {
            message: "trace not found".to_string(),
            trace_id: Some(trace_id.to_string()),
        }
    }

    /// Maps a storage-layer failure. Anything that is not a lookup miss is logged here.
    pub fn from_view_error(context: &str, err: ViewError) -> Self {
        match err {
            ViewError::NotFound(message) => Self::NotFound {
                message,
                trace_id: None,
            },
            ViewError::InvalidArgument(message) | ViewError::Parse(message) => {
                Self::BadRequest { message }
            }
            other => {
                tracing::error!(error = %other, "{context}");
                Self::Internal {
                    message: context.to_string(),
                }
            }
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::NotFound {
                message,
                trace_id: Some(trace_id),
            } => json!({ "error": message, "trace_id": trace_id }),
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
