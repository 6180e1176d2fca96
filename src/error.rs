use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failure of a catalog, reservation, query or sweep operation.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    /// Seats are unknown or already taken; `seats` names every offending label.
    #[error("{message}")]
    Conflict { message: String, seats: Vec<String> },
    /// Lock timeouts, deadlocks and pool exhaustion. Safe to retry.
    #[error("temporarily unavailable: {0}")]
    Transient(String),
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl BookingError {
    pub fn conflict(prefix: &str, seats: Vec<String>) -> Self {
        BookingError::Conflict {
            message: format!("{}: {}", prefix, seats.join(", ")),
            seats,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::Transient(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            BookingError::BadRequest(_) => StatusCode::BAD_REQUEST,
            BookingError::NotFound(_) => StatusCode::NOT_FOUND,
            BookingError::Conflict { .. } => StatusCode::CONFLICT,
            BookingError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            BookingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// lock_not_available, deadlock_detected, serialization_failure
const RETRYABLE_SQLSTATES: [&str; 3] = ["55P03", "40P01", "40001"];

impl From<sqlx::Error> for BookingError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut => {
                BookingError::Transient("no database connection available".to_string())
            }
            sqlx::Error::Database(db_err)
                if db_err
                    .code()
                    .is_some_and(|code| RETRYABLE_SQLSTATES.contains(&code.as_ref())) =>
            {
                BookingError::Transient(db_err.message().to_string())
            }
            _ => BookingError::Internal(err.into()),
        }
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            BookingError::Conflict { message, seats } => json!({
                "error": message,
                "seats": seats,
            }),
            BookingError::Transient(msg) => {
                tracing::warn!("Transient failure: {}", msg);
                json!({ "error": "Service temporarily unavailable, please retry" })
            }
            BookingError::Internal(err) => {
                tracing::error!("Internal Server Error: {:?}", err);
                json!({ "error": "Internal Server Error" })
            }
            other => json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_message_lists_seats() {
        let err = BookingError::conflict("Seats not available", vec!["1".into(), "A7".into()]);
        assert_eq!(err.to_string(), "Seats not available: 1, A7");
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert!(!err.is_retryable());
    }

    #[test]
    fn pool_timeout_is_retryable() {
        let err = BookingError::from(sqlx::Error::PoolTimedOut);
        assert!(err.is_retryable());
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn other_sqlx_errors_are_internal() {
        let err = BookingError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, BookingError::Internal(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
