use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum AppError {
    /// Referenced reader, writer or book does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation requires a reader/book association that is absent.
    #[error("Book not owned: {0}")]
    NotOwned(String),

    /// Attempt to borrow a book that is already on the reader's shelf.
    #[error("Book already owned: {0}")]
    AlreadyOwned(String),

    /// Page navigation requested with no current book set.
    #[error("No current book; open a book before turning pages")]
    NoCurrentBook,

    /// Missing, invalid or expired credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed request data.
    #[error("Invalid request: {0}")]
    Invalid(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::NotOwned(_) => StatusCode::FORBIDDEN,
            AppError::AlreadyOwned(_) => StatusCode::CONFLICT,
            AppError::NoCurrentBook => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Invalid(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        tracing::error!(error = %self, "Request error");

        (status, self.to_string()).into_response()
    }
}

/// Result type alias for the application.
pub type Result<T> = std::result::Result<T, AppError>;
