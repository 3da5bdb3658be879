//! Error types for the book rental server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_with::skip_serializing_none;
use thiserror::Error;
use utoipa::ToSchema;

/// Machine readable error codes returned in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidInput,
    Unauthorized,
    Forbidden,
    AccountNotFound,
    InvalidPassword,
    AdminInactive,
    MemberInactive,
    MemberNotFound,
    MemberAlreadyExists,
    NoLevelMatch,
    BookNotFound,
    CategoryNotFound,
    CopyNotFound,
    CopyNotAvailable,
    InvalidCondition,
    NoFields,
    MaxBookExceeded,
    InsufficientBalance,
    LoanNotFound,
    LoanItemNotFound,
    AlreadyReturned,
    RenewLimitReached,
    AlreadyOverdue,
    ReservationNotFound,
    ReservationNotActive,
    ReservationItemMismatch,
    DuplicateBookIds,
    DuplicateReservation,
    DuplicateItems,
    NoAvailableCopy,
    CannotCancel,
    InvalidSearchType,
    NotFound,
    DuplicateEntry,
    DatabaseConstraintError,
    ServiceUnavailable,
    DatabaseError,
    InternalServerError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::AccountNotFound => "ACCOUNT_NOT_FOUND",
            ErrorCode::InvalidPassword => "INVALID_PASSWORD",
            ErrorCode::AdminInactive => "ADMIN_INACTIVE",
            ErrorCode::MemberInactive => "MEMBER_INACTIVE",
            ErrorCode::MemberNotFound => "MEMBER_NOT_FOUND",
            ErrorCode::MemberAlreadyExists => "MEMBER_ALREADY_EXISTS",
            ErrorCode::NoLevelMatch => "NO_LEVEL_MATCH",
            ErrorCode::BookNotFound => "BOOK_NOT_FOUND",
            ErrorCode::CategoryNotFound => "CATEGORY_NOT_FOUND",
            ErrorCode::CopyNotFound => "COPY_NOT_FOUND",
            ErrorCode::CopyNotAvailable => "COPY_NOT_AVAILABLE",
            ErrorCode::InvalidCondition => "INVALID_CONDITION",
            ErrorCode::NoFields => "NO_FIELDS",
            ErrorCode::MaxBookExceeded => "MAX_BOOK_EXCEEDED",
            ErrorCode::InsufficientBalance => "INSUFFICIENT_BALANCE",
            ErrorCode::LoanNotFound => "LOAN_NOT_FOUND",
            ErrorCode::LoanItemNotFound => "LOAN_ITEM_NOT_FOUND",
            ErrorCode::AlreadyReturned => "ALREADY_RETURNED",
            ErrorCode::RenewLimitReached => "RENEW_LIMIT_REACHED",
            ErrorCode::AlreadyOverdue => "ALREADY_OVERDUE",
            ErrorCode::ReservationNotFound => "RESERVATION_NOT_FOUND",
            ErrorCode::ReservationNotActive => "RESERVATION_NOT_ACTIVE",
            ErrorCode::ReservationItemMismatch => "RESERVATION_ITEM_MISMATCH",
            ErrorCode::DuplicateBookIds => "DUPLICATE_BOOK_IDS",
            ErrorCode::DuplicateReservation => "DUPLICATE_RESERVATION",
            ErrorCode::DuplicateItems => "DUPLICATE_ITEMS",
            ErrorCode::NoAvailableCopy => "NO_AVAILABLE_COPY",
            ErrorCode::CannotCancel => "CANNOT_CANCEL",
            ErrorCode::InvalidSearchType => "INVALID_SEARCH_TYPE",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::DuplicateEntry => "DUPLICATE_ENTRY",
            ErrorCode::DatabaseConstraintError => "DATABASE_CONSTRAINT_ERROR",
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {1}")]
    Authentication(ErrorCode, String),

    #[error("Authorization failed: {1}")]
    Authorization(ErrorCode, String),

    #[error("Not found: {1}")]
    NotFound(ErrorCode, String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Business rule violation ({0}): {1}")]
    BusinessRule(ErrorCode, String),

    #[error("Conflict: {1}")]
    Conflict(ErrorCode, String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn business(code: ErrorCode, message: impl Into<String>) -> Self {
        AppError::BusinessRule(code, message.into())
    }

    pub fn not_found(code: ErrorCode, message: impl Into<String>) -> Self {
        AppError::NotFound(code, message.into())
    }

    /// Status and machine code this error is reported with
    pub fn status_and_code(&self) -> (StatusCode, ErrorCode) {
        match self {
            AppError::Authentication(code, _) => (StatusCode::UNAUTHORIZED, *code),
            AppError::Authorization(code, _) => (StatusCode::FORBIDDEN, *code),
            AppError::NotFound(code, _) => (StatusCode::NOT_FOUND, *code),
            AppError::Validation(_) | AppError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, ErrorCode::InvalidInput)
            }
            AppError::BusinessRule(code, _) => (StatusCode::BAD_REQUEST, *code),
            AppError::Conflict(code, _) => (StatusCode::CONFLICT, *code),
            AppError::Database(e) => database_status(e),
            AppError::Unavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::ServiceUnavailable)
            }
            AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::InternalServerError)
            }
        }
    }
}

fn database_status(e: &sqlx::Error) -> (StatusCode, ErrorCode) {
    match e {
        sqlx::Error::RowNotFound => (StatusCode::NOT_FOUND, ErrorCode::NotFound),
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            (StatusCode::CONFLICT, ErrorCode::DuplicateEntry)
        }
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            (StatusCode::CONFLICT, ErrorCode::DatabaseConstraintError)
        }
        sqlx::Error::Database(db) if db.is_check_violation() => {
            (StatusCode::BAD_REQUEST, ErrorCode::DatabaseConstraintError)
        }
        sqlx::Error::PoolTimedOut => {
            (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::ServiceUnavailable)
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DatabaseError),
    }
}

/// Error response body
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let (message, details) = match self {
            AppError::Authentication(_, msg)
            | AppError::Authorization(_, msg)
            | AppError::NotFound(_, msg)
            | AppError::BadRequest(msg)
            | AppError::BusinessRule(_, msg)
            | AppError::Conflict(_, msg)
            | AppError::Unavailable(msg) => (msg, None),
            AppError::Validation(errors) => (
                "Request validation failed".to_string(),
                serde_json::to_value(&errors).ok(),
            ),
            AppError::Database(e) => match code {
                ErrorCode::DatabaseError => {
                    tracing::error!("Database error: {:?}", e);
                    ("Database error".to_string(), None)
                }
                ErrorCode::ServiceUnavailable => {
                    tracing::warn!("Database pool exhausted: {}", e);
                    ("Database temporarily unavailable".to_string(), None)
                }
                _ => {
                    tracing::debug!("Database constraint rejected request: {}", e);
                    let detail = match &e {
                        sqlx::Error::Database(db) => db
                            .constraint()
                            .map(|c| serde_json::json!({ "constraint": c })),
                        _ => None,
                    };
                    (constraint_message(code).to_string(), detail)
                }
            },
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("Internal server error".to_string(), None)
            }
        };

        let body = Json(ErrorResponse {
            code,
            message,
            details,
        });

        (status, body).into_response()
    }
}

fn constraint_message(code: ErrorCode) -> &'static str {
    match code {
        ErrorCode::DuplicateEntry => "Record already exists",
        ErrorCode::NotFound => "Record not found",
        _ => "Database constraint violated",
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_code_serializes_screaming_snake_case() {
        let json = serde_json::to_value(ErrorCode::MaxBookExceeded).unwrap();
        assert_eq!(json, "MAX_BOOK_EXCEEDED");
        assert_eq!(ErrorCode::MaxBookExceeded.as_str(), "MAX_BOOK_EXCEEDED");
        assert_eq!(
            serde_json::to_value(ErrorCode::ReservationItemMismatch).unwrap(),
            ErrorCode::ReservationItemMismatch.as_str()
        );
    }

    #[test]
    fn test_business_rule_is_bad_request() {
        let err = AppError::business(ErrorCode::InsufficientBalance, "not enough");
        assert_eq!(
            err.status_and_code(),
            (StatusCode::BAD_REQUEST, ErrorCode::InsufficientBalance)
        );
    }

    #[test]
    fn test_row_not_found_maps_to_404() {
        let err = AppError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.status_and_code().0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_response_body_has_code_and_message() {
        let response =
            AppError::Authorization(ErrorCode::MemberInactive, "Member is suspended".into())
                .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = body_json(response).await;
        assert_eq!(body["code"], "MEMBER_INACTIVE");
        assert_eq!(body["message"], "Member is suspended");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn test_internal_errors_are_not_leaked() {
        let response = AppError::Internal("secret stack trace".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["code"], "INTERNAL_SERVER_ERROR");
        assert_eq!(body["message"], "Internal server error");
    }
}
