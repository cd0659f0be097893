use crate::models::MessageResponse;
use axum::{
    Json,
    extract::{multipart::MultipartRejection, rejection::QueryRejection},
    http::StatusCode,
};
use thiserror::Error;
use tracing::error;

/// Failures of the import pipeline.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The upload is not a readable workbook.
    #[error("{0}")]
    Format(String),

    /// The batch is empty or its first row lacks the required fields.
    #[error("{0}")]
    Rejected(String),

    /// At least one row could not be written. Rows already written stay.
    #[error("{failed} of {attempted} rows failed to import: {reason}", attempted = .written + .failed)]
    Persist {
        written: usize,
        failed: usize,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("database connection lock poisoned")]
    Poisoned,
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: "Unauthorized access. Please log in.".to_string(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        error!("internal error: {err}");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Internal server error".to_string(),
        }
    }
}

impl From<ImportError> for AppError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Format(message) | ImportError::Rejected(message) => {
                Self::bad_request(message)
            }
            ImportError::Persist { .. } => {
                error!("error inserting data: {err}");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "Failed to import data".to_string(),
                }
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        error!("error fetching data: {err}");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Failed to fetch data".to_string(),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = MessageResponse {
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
