use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

/// Every failure a request can end with. All of them are terminal for the
/// request and none of them is fatal to the process.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("An user with this email already exists")]
    DuplicateEmail,

    #[error("{0}")]
    Unauthorized(String),

    #[error("User already has a running timer entry")]
    AlreadyRunning,

    #[error("User does not have an in progress timer entry")]
    NotRunning,

    #[error("Timer entry with id {0} not found")]
    NotFound(Uuid),

    #[error("Cannot update a time entry that belongs to another user")]
    Forbidden,

    #[error("{0}")]
    InvalidRange(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unauthorized() -> Self {
        Self::Unauthorized("Unauthorized".into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::DuplicateEmail
            | Self::AlreadyRunning
            | Self::NotRunning
            | Self::InvalidRange(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = ?self, "request failed");
            // Internal details stay in the log.
            return (status, "Internal server error".to_string()).into_response();
        }
        warn!(%status, error = %self, "request rejected");
        (status, self.to_string()).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}
