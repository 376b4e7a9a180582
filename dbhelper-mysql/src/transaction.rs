use crate::{MySQLDriver, run_on};
use async_stream::stream;
use dbhelper_core::{
    DbError, Driver, Error, ErrorContext, Executor, QueryResult, Result, SqlWriter, Statement,
    Transaction,
    stream::{Stream, StreamExt},
};
use mysql_async::{Conn, prelude::Queryable};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Connection with an open transaction, clones share the same connection.
///
/// A transaction dropped without commit or rollback goes back to the pool, where
/// the connection reset discards it.
#[derive(Debug, Clone)]
pub struct MySQLTransaction {
    connection: Arc<Mutex<Option<Conn>>>,
}

impl MySQLTransaction {
    pub(crate) fn new(connection: Conn) -> Self {
        Self {
            connection: Arc::new(Mutex::new(Some(connection))),
        }
    }

    fn finished() -> Error {
        Error::new(DbError::InvalidState(
            "The transaction was already committed or rolled back".into(),
        ))
    }

    async fn finish(&self, sql: String) -> Result<()> {
        let Some(mut connection) = self.connection.lock().await.take() else {
            return Err(Self::finished());
        };
        connection
            .query_drop(sql.as_str())
            .await
            .with_context(|| format!("While running `{sql}`"))
    }
}

impl Executor for MySQLTransaction {
    type Driver = MySQLDriver;

    fn driver(&self) -> &Self::Driver {
        &MySQLDriver {}
    }

    fn run(&self, statement: Statement) -> impl Stream<Item = Result<QueryResult>> + Send {
        let connection = self.connection.clone();
        stream! {
            let mut guard = connection.lock().await;
            let Some(connection) = guard.as_mut() else {
                let e = Self::finished().context(format!("While running the query:\n{}", statement));
                log::error!("{:#}", e);
                yield Err(e);
                return;
            };
            let stream = run_on(connection, statement);
            let mut stream = std::pin::pin!(stream);
            while let Some(result) = stream.next().await {
                yield result;
            }
        }
    }
}

impl Transaction for MySQLTransaction {
    async fn commit(&self) -> Result<()> {
        let mut sql = String::new();
        self.driver().sql_writer().write_transaction_commit(&mut sql);
        self.finish(sql).await
    }

    async fn rollback(&self) -> Result<()> {
        let mut sql = String::new();
        self.driver()
            .sql_writer()
            .write_transaction_rollback(&mut sql);
        self.finish(sql).await
    }
}
