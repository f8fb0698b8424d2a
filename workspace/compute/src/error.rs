use std::fmt;

use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use tracing::error;

/// Which uniqueness rule a write ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    DuplicateBudget,
    DuplicateCategory,
    EmailTaken,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            ConflictKind::DuplicateBudget => "Budget already exists for this category and period",
            ConflictKind::DuplicateCategory => "Category with this name already exists",
            ConflictKind::EmailTaken => "User with this email already exists",
        };
        f.write_str(message)
    }
}

/// Typed outcomes of the core services. Callers map these 1:1 onto response statuses.
#[derive(Error, Debug)]
pub enum ComputeError {
    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Entity absent or not owned by the caller; the two cases are indistinguishable.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A referenced category is not accessible to the caller.
    #[error("Invalid category: {0}")]
    InvalidReference(String),

    #[error("{0}")]
    Conflict(ConflictKind),

    /// Category deletion blocked by referencing transactions.
    #[error("Cannot delete category {category_id}: it is used by {transaction_count} transaction(s)")]
    HasTransactions {
        category_id: i32,
        transaction_count: u64,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Password hashing failed.
    #[error("Credential error: {0}")]
    Credentials(String),
}

pub type Result<T> = std::result::Result<T, ComputeError>;

pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

pub(crate) fn is_foreign_key_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_)))
}

/// Translates a failed write, turning a uniqueness violation into `Conflict(kind)`.
pub(crate) fn conflict_or_database(err: DbErr, kind: ConflictKind) -> ComputeError {
    if is_unique_violation(&err) {
        ComputeError::Conflict(kind)
    } else {
        error!("Database error: {}", err);
        ComputeError::Database(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_messages_name_the_rule() {
        assert_eq!(
            ComputeError::Conflict(ConflictKind::DuplicateBudget).to_string(),
            "Budget already exists for this category and period"
        );
        assert_eq!(
            ComputeError::Conflict(ConflictKind::DuplicateCategory).to_string(),
            "Category with this name already exists"
        );
    }

    #[test]
    fn has_transactions_reports_the_count() {
        let err = ComputeError::HasTransactions {
            category_id: 4,
            transaction_count: 3,
        };
        assert!(err.to_string().contains("3 transaction(s)"));
    }

    #[test]
    fn non_constraint_errors_stay_database_errors() {
        let err = conflict_or_database(DbErr::Custom("boom".into()), ConflictKind::EmailTaken);
        assert!(matches!(err, ComputeError::Database(_)));
    }
}
