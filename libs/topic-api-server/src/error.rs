use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use pipeline::PipelineError;
use profiles::ProfileError;
use topic_engine::TopicError;

/// Failure to start or run the listener.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("bind api :{port}: {source}")]
    Bind { port: u16, source: std::io::Error },

    #[error("axum serve: {0}")]
    Serve(std::io::Error),
}

/// Handler failure, rendered as a status code plus `{"error": ...}`.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Topic(#[from] TopicError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Profile(#[from] ProfileError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) | Self::Profile(ProfileError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) | Self::Profile(ProfileError::Invalid(_)) => StatusCode::BAD_REQUEST,
            Self::Profile(ProfileError::Duplicate(_)) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, axum::Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
