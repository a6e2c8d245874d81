//! Typed errors and HTTP mapping.

use crate::model::{EntityKind, Id};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Postgres SQLSTATE for a UNIQUE violation.
const UNIQUE_VIOLATION: &str = "23505";
/// Postgres SQLSTATE for a FOREIGN KEY violation.
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    /// Required field missing or empty.
    #[error("validation: {0}")]
    Validation(String),
    /// A supplied foreign key does not resolve to an existing row.
    #[error("invalid reference: {column} points to missing {kind} {id}")]
    Reference {
        column: &'static str,
        kind: EntityKind,
        id: Id,
    },
    /// A foreign key written past the validator no longer resolves (reported by storage).
    #[error("invalid reference: {0}")]
    ReferenceViolation(String),
    #[error("not found: {kind} with id {id}")]
    NotFound { kind: EntityKind, id: Id },
    /// Path segment that is not an integer id; no such resource.
    #[error("not found: {kind} with id '{raw}'")]
    InvalidId { kind: EntityKind, raw: String },
    /// Value already taken in a unique column.
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("storage: {0}")]
    Storage(String),
}

impl AppError {
    /// Maps constraint violations reported by Postgres onto the core taxonomy. The validator
    /// catches these first; this covers writes that race past it.
    pub fn from_db(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if let Some(mapped) = db
                .code()
                .and_then(|code| Self::from_constraint(&code, db.message()))
            {
                return mapped;
            }
        }
        AppError::Db(e)
    }

    fn from_constraint(sqlstate: &str, message: &str) -> Option<Self> {
        match sqlstate {
            UNIQUE_VIOLATION => Some(AppError::Conflict(message.to_string())),
            FOREIGN_KEY_VIOLATION => Some(AppError::ReferenceViolation(message.to_string())),
            _ => None,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::Reference { .. } | AppError::ReferenceViolation(_) => {
                (StatusCode::BAD_REQUEST, "reference_error")
            }
            AppError::NotFound { .. } | AppError::InvalidId { .. } => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Conflict(_) => (StatusCode::BAD_REQUEST, "conflict"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Db(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            AppError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        let cases = [
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (
                AppError::Reference {
                    column: "auteur_id",
                    kind: EntityKind::User,
                    id: 9,
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::NotFound {
                    kind: EntityKind::Article,
                    id: 1,
                },
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::InvalidId {
                    kind: EntityKind::Article,
                    raw: "abc".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (AppError::Conflict("x".into()), StatusCode::BAD_REQUEST),
            (AppError::ReferenceViolation("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Storage("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn reference_error_names_the_column() {
        let err = AppError::Reference {
            column: "categorie_id",
            kind: EntityKind::Category,
            id: 42,
        };
        assert_eq!(
            err.to_string(),
            "invalid reference: categorie_id points to missing category 42"
        );
    }

    #[test]
    fn constraint_violations_map_to_write_rejections() {
        assert!(matches!(
            AppError::from_constraint("23505", "duplicate key"),
            Some(AppError::Conflict(_))
        ));
        let err = AppError::from_constraint("23503", "violates foreign key constraint").unwrap();
        assert!(matches!(err, AppError::ReferenceViolation(_)));
        let body = err.into_response();
        assert_eq!(body.status(), StatusCode::BAD_REQUEST);
        assert!(AppError::from_constraint("40001", "serialization failure").is_none());
    }
}
