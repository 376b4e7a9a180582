use crate::Error;

/// Errors classified by the helper itself.
///
/// Everything else coming out of an engine is passed through as is, wrapped in an
/// [`Error`] with some context about the statement that was running. Use
/// [`DbError::of`] to branch on a classified error:
/// ```rust
/// use dbhelper_core::{DbError, Error};
/// let error = Error::new(DbError::DuplicateKey("Duplicate entry '1' for key 'PRIMARY'".into()))
///     .context("While inserting into `t_user`");
/// assert!(matches!(DbError::of(&error), Some(DbError::DuplicateKey(..))));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DbError {
    #[error("Field `{field}` expects {expected} but got {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: String,
    },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Empty condition group {0}")]
    EmptyGroup(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),
    #[error("The deadline of the context expired")]
    DeadlineExceeded,
    #[error("The context was cancelled")]
    Cancelled,
}

impl DbError {
    /// Find the classified error inside `error`, looking through any context layer.
    pub fn of(error: &Error) -> Option<&DbError> {
        error.chain().find_map(|e| e.downcast_ref::<DbError>())
    }
}

/// True when the engine reported a duplicate entry on a unique key.
pub fn is_duplicate_key(error: &Error) -> bool {
    matches!(DbError::of(error), Some(DbError::DuplicateKey(..)))
}
