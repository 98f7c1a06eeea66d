use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::s3::S3Error;

/// Closed error taxonomy for the HTTP surface.
///
/// Every failure path maps to exactly one of these; nothing is retried and
/// nothing is swallowed. Page handlers translate `Unauthenticated` into a
/// redirect to the login view themselves; for API-style endpoints the
/// `IntoResponse` mapping below applies.
#[derive(Debug, Error)]
pub enum AppError {
    /// No credential is bound to the session.
    #[error("authentication required")]
    Unauthenticated,

    /// The login probe rejected the supplied credentials. Deliberately one
    /// generic message: network failure and bad keys are indistinguishable
    /// to the end user.
    #[error("Invalid credentials or endpoint!")]
    InvalidCredentials,

    /// A required request parameter is missing or empty.
    #[error("{0}")]
    InvalidRequest(String),

    /// The storage call failed; carries the raw backend error text.
    #[error("{0}")]
    Backend(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<S3Error> for AppError {
    fn from(err: S3Error) -> Self {
        AppError::Backend(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_the_taxonomy() {
        assert_eq!(AppError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::InvalidRequest("bucket is required".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Backend("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
