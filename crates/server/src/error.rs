use authorization::RefreshError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to bind to address: {0}")]
    Bind(#[source] std::io::Error),

    #[error("Server error: {0}")]
    Server(#[source] std::io::Error),
}

/// Errors returned to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ApiError {
    #[error("Forbidden: IP address not authorized")]
    Forbidden,

    #[error("Refresh failed: {0}")]
    Refresh(#[from] RefreshError),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Refresh(RefreshError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            Self::Refresh(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            detail: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
