use crate::SqlWriter;

/// Engine description: its name and the dialect used to render statements.
pub trait Driver: Send + Sync {
    type SqlWriter: SqlWriter;

    const NAME: &'static str;

    fn sql_writer(&self) -> Self::SqlWriter;
}
