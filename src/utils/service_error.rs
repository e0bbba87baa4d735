// Service error taxonomy shared across handlers and services
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("No active subscription")]
    NoSubscription,

    #[error("Insufficient credits")]
    InsufficientCredit,

    #[error("Upstream service failure: {0}")]
    UpstreamFailure(String),

    #[error("Upstream blocked the request: {0}")]
    UpstreamBlocked(String),

    #[error("Upstream operation timed out")]
    UpstreamTimeout,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal server error")]
    InternalError,
}

impl ServiceError {
    /// Stable machine-readable code, wire-visible alongside the message
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Unauthorized => "UNAUTHORIZED",
            ServiceError::Forbidden => "FORBIDDEN",
            ServiceError::NotFound => "NOT_FOUND",
            ServiceError::ValidationError(_) => "VALIDATION_ERROR",
            ServiceError::NoSubscription => "NO_SUBSCRIPTION",
            ServiceError::InsufficientCredit => "INSUFFICIENT_CREDIT",
            ServiceError::UpstreamFailure(_) => "UPSTREAM_FAILURE",
            ServiceError::UpstreamBlocked(_) => "UPSTREAM_BLOCKED",
            ServiceError::UpstreamTimeout => "UPSTREAM_TIMEOUT",
            ServiceError::DatabaseError(_) => "DATABASE_ERROR",
            ServiceError::InternalError => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden => StatusCode::FORBIDDEN,
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::ValidationError(_) => StatusCode::BAD_REQUEST,
            // Ledger gate refusals are authorization failures, not bad input
            ServiceError::NoSubscription => StatusCode::FORBIDDEN,
            ServiceError::InsufficientCredit => StatusCode::FORBIDDEN,
            ServiceError::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
            ServiceError::UpstreamBlocked(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            ServiceError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

// Conversion from various error types
impl From<diesel::result::Error> for ServiceError {
    fn from(error: diesel::result::Error) -> Self {
        match error {
            diesel::result::Error::NotFound => ServiceError::NotFound,
            _ => ServiceError::DatabaseError(error.to_string()),
        }
    }
}

impl<E: std::error::Error + 'static> From<bb8::RunError<E>> for ServiceError {
    fn from(error: bb8::RunError<E>) -> Self {
        ServiceError::DatabaseError(error.to_string())
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(error: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(error.to_string())
    }
}

impl From<crate::utils::password::PasswordError> for ServiceError {
    fn from(_: crate::utils::password::PasswordError) -> Self {
        ServiceError::InternalError
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_gate_errors_are_distinguishable() {
        assert_eq!(ServiceError::NoSubscription.code(), "NO_SUBSCRIPTION");
        assert_eq!(
            ServiceError::InsufficientCredit.code(),
            "INSUFFICIENT_CREDIT"
        );
        assert_ne!(
            ServiceError::NoSubscription.code(),
            ServiceError::InsufficientCredit.code()
        );
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ServiceError::Unauthorized.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ServiceError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ServiceError::UpstreamTimeout.status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ServiceError::UpstreamBlocked("safety".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_not_found_from_diesel() {
        let err: ServiceError = diesel::result::Error::NotFound.into();
        assert!(matches!(err, ServiceError::NotFound));
    }
}
