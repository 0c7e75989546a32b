//! Error handling module for the course core.
//!
//! Every failure carries the name of the operation that raised it plus the
//! offending field or identifier. Store error text is logged where it is
//! converted and never surfaces through [`AppError::public_message`].

use thiserror::Error;

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const INVALID_IDENTIFIER: &str = "INVALID_IDENTIFIER";
    pub const VERSION_MISMATCH: &str = "VERSION_MISMATCH";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    pub const MAPPING_ERROR: &str = "MAPPING_ERROR";
}

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Required field empty, too short, or holding an unknown enum value
    #[error("{op}: invalid field `{field}`: {message}")]
    Validation {
        op: &'static str,
        field: &'static str,
        message: String,
    },
    /// No document (or embedded parent comment) matched
    #[error("{op}: {entity} {id} not found")]
    NotFound {
        op: &'static str,
        entity: &'static str,
        id: String,
    },
    /// Caller supplied an identifier that does not parse
    #[error("{op}: malformed {field} `{id}`")]
    InvalidIdentifier {
        op: &'static str,
        field: &'static str,
        id: String,
    },
    /// Optimistic concurrency conflict on a category write
    #[error("{op}: category {id} was modified concurrently (current version {current_version})")]
    Conflict {
        op: &'static str,
        id: String,
        current_version: i64,
    },
    /// Underlying store call failed
    #[error("{op}: database error: {source}")]
    Persistence {
        op: &'static str,
        #[source]
        source: sqlx::Error,
    },
    /// Stored row could not be mapped onto the domain model
    #[error("{op}: cannot map {model}: {message}")]
    Mapping {
        op: &'static str,
        model: &'static str,
        message: String,
    },
}

impl AppError {
    pub fn validation(op: &'static str, field: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation {
            op,
            field,
            message: message.into(),
        }
    }

    pub fn not_found(op: &'static str, entity: &'static str, id: impl Into<String>) -> Self {
        AppError::NotFound {
            op,
            entity,
            id: id.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => codes::VALIDATION_ERROR,
            AppError::NotFound { .. } => codes::NOT_FOUND,
            AppError::InvalidIdentifier { .. } => codes::INVALID_IDENTIFIER,
            AppError::Conflict { .. } => codes::VERSION_MISMATCH,
            AppError::Persistence { .. } => codes::DATABASE_ERROR,
            AppError::Mapping { .. } => codes::MAPPING_ERROR,
        }
    }

    /// Name of the operation that failed.
    pub fn operation(&self) -> &'static str {
        match self {
            AppError::Validation { op, .. }
            | AppError::NotFound { op, .. }
            | AppError::InvalidIdentifier { op, .. }
            | AppError::Conflict { op, .. }
            | AppError::Persistence { op, .. }
            | AppError::Mapping { op, .. } => op,
        }
    }

    /// Message safe to hand to external callers.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Persistence { op, .. } => format!("{}: storage unavailable", op),
            AppError::Mapping { op, model, .. } => format!("{}: stored {} is corrupt", op, model),
            other => other.to_string(),
        }
    }
}

/// Build a `map_err` adapter that logs a sqlx failure and wraps it with the
/// operation name.
pub fn persistence(op: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |source| {
        tracing::error!(operation = op, "Database error: {:?}", source);
        AppError::Persistence { op, source }
    }
}

/// Build a `map_err` adapter for serde failures on stored JSON columns.
pub fn mapping(op: &'static str, model: &'static str) -> impl FnOnce(serde_json::Error) -> AppError {
    move |err| {
        tracing::error!(operation = op, model, "JSON error: {:?}", err);
        AppError::Mapping {
            op,
            model,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_message_hides_store_text() {
        let err = persistence("get_course")(sqlx::Error::PoolTimedOut);
        assert_eq!(err.error_code(), codes::DATABASE_ERROR);
        assert_eq!(err.operation(), "get_course");
        assert_eq!(err.public_message(), "get_course: storage unavailable");
        assert!(err.to_string().contains("pool timed out"));
    }

    #[test]
    fn context_is_rendered() {
        let err = AppError::not_found("reply_course_comment", "comment", "abc");
        assert_eq!(err.error_code(), codes::NOT_FOUND);
        assert_eq!(err.public_message(), "reply_course_comment: comment abc not found");
    }
}
