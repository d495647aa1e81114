use axum::extract::rejection::PathRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::types::ErrorBody;
use service::errors::ServiceError;
use thiserror::Error;
use tracing::error;

/// Error returned by handlers and middleware; the only place HTTP statuses are chosen.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("invalid interserver secret key")]
    InvalidInterserverSecret,
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Service(ServiceError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Service(ServiceError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Service(ServiceError::InsufficientBalance { .. }) => StatusCode::CONFLICT,
            ApiError::Service(ServiceError::Db(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InvalidInterserverSecret => StatusCode::FORBIDDEN,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            ApiError::InvalidInterserverSecret => ErrorBody {
                error: "Invalid interserver secret key".into(),
                detail: None,
            },
            ApiError::Service(ServiceError::NotFound(msg)) => ErrorBody { error: "Not Found".into(), detail: Some(msg.clone()) },
            ApiError::Service(ServiceError::Validation(msg)) | ApiError::BadRequest(msg) => {
                ErrorBody { error: "Bad Request".into(), detail: Some(msg.clone()) }
            }
            ApiError::Service(e @ ServiceError::InsufficientBalance { .. }) => {
                ErrorBody { error: "Insufficient Balance".into(), detail: Some(e.to_string()) }
            }
            ApiError::Unauthorized(msg) => ErrorBody { error: "Unauthorized".into(), detail: Some(msg.clone()) },
            // cause stays in the logs
            ApiError::Service(ServiceError::Db(_)) | ApiError::Internal(_) => ErrorBody {
                error: "Internal Server Error".into(),
                detail: Some("internal server error".into()),
            },
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(self.body())).into_response()
    }
}
