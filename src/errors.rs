use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};
use axum::http::StatusCode;
use axum::Json;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Serialize;

#[derive(Serialize)]
pub struct ErrorResponse {
    timestamp: String,
    status: u16,
    error: String,
    message: String,
    #[serde(rename = "errorCode")]
    error_code: ErrorCode,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ChatNotFound,
    ValidationError,
    ServiceUnavailable,
    UnexpectedError,
}

pub enum AppError {
    /// The client sent something we refuse to work with.
    ValidationError(String),

    /// A requested record does not exist.
    NotFound(String),

    /// A failure coming out of the database layer, original error boxed.
    DatabaseError(Box<dyn Error + Send + Sync>),

    /// An internal processing failure (encoding, file I/O, ...).
    ProcessingError(String),

    /// A dependency this deployment is not configured for.
    Unavailable(String),
}

impl fmt::Debug for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationError(msg) => write!(f, "ValidationError: {}", msg),
            Self::NotFound(msg) => write!(f, "NotFound: {}", msg),
            Self::DatabaseError(err) => write!(f, "DatabaseError: {}", err),
            Self::ProcessingError(msg) => write!(f, "ProcessingError: {}", msg),
            Self::Unavailable(msg) => write!(f, "Unavailable: {}", msg),
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ValidationError(msg) => write!(f, "Invalid input: {}", msg),
            AppError::NotFound(msg) => write!(f, "Entity not found: {}", msg),
            AppError::DatabaseError(err) => write!(f, "A database error occurred: {}", err),
            AppError::ProcessingError(msg) => write!(f, "A processing error occurred: {}", msg),
            AppError::Unavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> AppError {
        AppError::DatabaseError(Box::new(err))
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::DatabaseError(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, ErrorCode::ValidationError, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::ChatNotFound, msg),
            AppError::DatabaseError(internal_err) => {
                tracing::error!("Database error: {:?}", internal_err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::ServiceUnavailable,
                    "Internal service outage.".to_string(),
                )
            }
            AppError::ProcessingError(msg) => {
                tracing::error!("Intern processing error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::UnexpectedError,
                    "Unexpected server error processing.".to_string(),
                )
            }
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::ServiceUnavailable, msg),
        };

        tracing::error!("An error occurred: status={}, code={:?}, msg='{}'", status, error_code, message);

        let error_response = ErrorResponse {
            timestamp: Utc::now().to_rfc3339(),
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Unknown Status").to_string(),
            message,
            error_code,
        };

        (status, Json(error_response)).into_response()
    }
}
