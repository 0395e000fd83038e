use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use boxoffice_domain::DomainError;

/// Wire shape of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: u16,
    pub error: String,
    pub message: String,
    pub path: String,
    pub timestamp: DateTime<Utc>,
}

/// A domain error bound to the request path it occurred on.
#[derive(Debug)]
pub struct ApiError {
    kind: DomainError,
    path: String,
}

impl ApiError {
    pub fn new(kind: DomainError, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    pub fn validation(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(DomainError::Validation(message.into()), path)
    }

    fn status(&self) -> StatusCode {
        match self.kind {
            DomainError::Validation(_) => StatusCode::BAD_REQUEST,
            DomainError::EventNotFound(_) => StatusCode::NOT_FOUND,
            DomainError::NoTicketsAvailable(_) => StatusCode::CONFLICT,
            // Retriable: the claim was never attempted, try again shortly.
            DomainError::LockUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self.kind {
            DomainError::Internal(detail) => {
                tracing::error!("Internal error on {}: {}", self.path, detail);
                "An unexpected error occurred. Please try again later.".to_string()
            }
            other => {
                tracing::warn!("{} on {}: {}", status, self.path, other);
                other.to_string()
            }
        };

        let body = ErrorBody {
            status: status.as_u16(),
            error: status
                .canonical_reason()
                .unwrap_or("Unknown")
                .to_string(),
            message,
            path: self.path,
            timestamp: Utc::now(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_the_taxonomy() {
        let cases = [
            (DomainError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (DomainError::EventNotFound(1), StatusCode::NOT_FOUND),
            (DomainError::NoTicketsAvailable(1), StatusCode::CONFLICT),
            (
                DomainError::LockUnavailable("k".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                DomainError::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (kind, expected) in cases {
            assert_eq!(ApiError::new(kind, "/p").status(), expected);
        }
    }
}
