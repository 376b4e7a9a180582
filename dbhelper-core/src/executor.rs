use crate::{
    Driver, QueryResult, Result, RowLabeled, RowsAffected, Statement,
    stream::{Stream, StreamExt, TryStreamExt},
};
use std::future::Future;

/// Anything able to run a [`Statement`]: a pool, a transaction or a [`crate::Handle`].
pub trait Executor: Send + Sync {
    type Driver: Driver;

    fn driver(&self) -> &Self::Driver;

    /// General method to send any statement and return any result type (either row or count)
    fn run(&self, statement: Statement) -> impl Stream<Item = Result<QueryResult>> + Send;

    /// Execute the statement and returns the rows.
    fn fetch(&self, statement: Statement) -> impl Stream<Item = Result<RowLabeled>> + Send {
        self.run(statement).filter_map(|v| async move {
            match v {
                Ok(QueryResult::Row(v)) => Some(Ok(v)),
                Err(e) => Some(Err(e)),
                _ => None,
            }
        })
    }

    /// Execute the statement and return the total number of rows affected.
    fn execute(&self, statement: Statement) -> impl Future<Output = Result<RowsAffected>> + Send {
        self.run(statement)
            .filter_map(|v| async move {
                match v {
                    Ok(QueryResult::Affected(v)) => Some(Ok(v)),
                    Err(e) => Some(Err(e)),
                    _ => None,
                }
            })
            .try_collect()
    }
}

/// Shared handle to a set of connections, safe to use concurrently.
pub trait Pool: Executor + Clone + 'static {
    type Transaction: Transaction<Driver = Self::Driver>;

    /// Create a pool with at least one connection established to the given URL
    fn connect(url: &str) -> impl Future<Output = Result<Self>> + Send;

    /// Take one connection out of the pool and open a transaction on it.
    fn begin(&self) -> impl Future<Output = Result<Self::Transaction>> + Send;
}

/// Exclusive connection with an open transaction.
///
/// Clones refer to the same connection. Once finished, any further use fails
/// with [`crate::DbError::InvalidState`].
pub trait Transaction: Executor + Clone + 'static {
    fn commit(&self) -> impl Future<Output = Result<()>> + Send;
    fn rollback(&self) -> impl Future<Output = Result<()>> + Send;
}
