//! HTTP error mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use crate::domain::{DomainError, ValidationResult};
use crate::store::StoreError;
use crate::transfer::TransferError;

use super::dto::ErrorResponse;

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    MalformedInput { message: String },
    NotFound { message: String },
    Conflict { code: &'static str, message: String },
    /// A schedule candidate failed validation
    Invalid(ValidationResult),
    Internal { message: String },
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } | AppError::MalformedInput { .. } => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest { .. } => "BAD_REQUEST",
            AppError::MalformedInput { .. } => "MALFORMED_INPUT",
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::Conflict { code, .. } => *code,
            AppError::Invalid(_) => "VALIDATION_FAILED",
            AppError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    fn into_body(self) -> ErrorResponse {
        let code = self.code().to_string();
        match self {
            AppError::Invalid(result) => ErrorResponse {
                code,
                message: format!(
                    "schedule failed validation with {} violation(s)",
                    result.violations.len()
                ),
                details: serde_json::to_value(&result).ok(),
            },
            AppError::BadRequest { message }
            | AppError::MalformedInput { message }
            | AppError::NotFound { message }
            | AppError::Conflict { message, .. }
            | AppError::Internal { message } => ErrorResponse {
                code,
                message,
                details: None,
            },
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { .. } => AppError::NotFound {
                message: e.to_string(),
            },
            StoreError::Duplicate { .. } => AppError::Conflict {
                code: "DUPLICATE",
                message: e.to_string(),
            },
            StoreError::InvalidInput(message) => AppError::BadRequest { message },
            StoreError::Conflict(message) => AppError::Conflict {
                code: "CONFLICT",
                message,
            },
            StoreError::VersionConflict { .. } => AppError::Conflict {
                code: "VERSION_CONFLICT",
                message: e.to_string(),
            },
            StoreError::Invalid(result) => AppError::Invalid(result),
            StoreError::Transition(t) => AppError::Conflict {
                code: "INVALID_TRANSITION",
                message: t.to_string(),
            },
            StoreError::Domain(d) => d.into(),
            StoreError::SnapshotIo { .. } | StoreError::SnapshotCorrupt { .. } => {
                AppError::Internal {
                    message: e.to_string(),
                }
            }
        }
    }
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::MalformedInput(message) => AppError::MalformedInput { message },
            DomainError::NotValidated(_) => AppError::Internal {
                message: e.to_string(),
            },
        }
    }
}

impl From<TransferError> for AppError {
    fn from(e: TransferError) -> Self {
        match e {
            TransferError::Malformed(message) => AppError::MalformedInput { message },
            TransferError::UnsupportedVersion(_) => AppError::BadRequest {
                message: e.to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        if status.is_server_error() {
            error!(%status, code, error = ?self, "request failed");
        } else {
            warn!(%status, code, error = ?self, "request rejected");
        }

        (status, Json(self.into_body())).into_response()
    }
}
