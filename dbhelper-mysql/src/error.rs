use dbhelper_core::{DbError, Error, is_duplicate_key};

/// Server error raised when an insert or update violates a unique key.
pub const ER_DUP_ENTRY: u16 = 1062;

/// Classify a server error, then add `context` and log it.
pub(crate) fn classify(error: Error, context: &str) -> Error {
    let duplicate = match error.downcast_ref::<mysql_async::Error>() {
        Some(mysql_async::Error::Server(e)) if e.code == ER_DUP_ENTRY => Some(e.message.clone()),
        _ => None,
    };
    let error = match duplicate {
        Some(message) => Error::new(DbError::DuplicateKey(message)),
        None => error,
    };
    let error = error.context(context.to_string());
    log::error!("{:#}", error);
    error
}

/// True if `error` comes from a duplicate entry on a unique key.
pub fn is_dup_entry(error: &Error) -> bool {
    is_duplicate_key(error)
        || error.chain().any(|e| {
            matches!(
                e.downcast_ref::<mysql_async::Error>(),
                Some(mysql_async::Error::Server(e)) if e.code == ER_DUP_ENTRY
            )
        })
}
