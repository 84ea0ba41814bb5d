use serde::Serialize;
use thiserror::Error;

use super::repository::RepositoryError;

/// A violated input constraint on one form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    /// Message catalog key, e.g. `validation.not-blank`.
    pub code: &'static str,
    /// Upper bound for size violations.
    pub max: Option<usize>,
}

/// Failures of book operations.
///
/// Everything except `Database` is a business failure that the listing page
/// reports inline; `Database` is unexpected and goes to the error page.
#[derive(Error, Debug)]
pub enum BookError {
    #[error("book {id} not found")]
    NotFound { id: i64 },

    #[error("book {id} was changed by another request")]
    OptimisticLock { id: i64 },

    #[error("invalid input ({} field error(s))", .0.len())]
    Validation(Vec<FieldError>),

    #[error("database failure")]
    Database(#[from] sqlx::Error),
}

impl BookError {
    /// Message catalog key for business failures.
    pub fn message_key(&self) -> Option<&'static str> {
        match self {
            BookError::NotFound { .. } => Some("error.booknotfound"),
            BookError::OptimisticLock { .. } => Some("error.optlockfailure"),
            BookError::Validation(_) => Some("error.validation"),
            BookError::Database(_) => None,
        }
    }
}

impl From<RepositoryError> for BookError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::StaleVersion { id, .. } => BookError::OptimisticLock { id },
            RepositoryError::Sqlx(e) => BookError::Database(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_failures_have_message_keys() {
        assert_eq!(
            BookError::NotFound { id: 1 }.message_key(),
            Some("error.booknotfound")
        );
        assert_eq!(
            BookError::OptimisticLock { id: 1 }.message_key(),
            Some("error.optlockfailure")
        );
        assert_eq!(
            BookError::Validation(Vec::new()).message_key(),
            Some("error.validation")
        );
        assert_eq!(BookError::Database(sqlx::Error::RowNotFound).message_key(), None);
    }

    #[test]
    fn stale_write_maps_to_optimistic_lock() {
        let error: BookError = RepositoryError::StaleVersion { id: 4, version: 1 }.into();
        assert!(matches!(error, BookError::OptimisticLock { id: 4 }));
    }
}
