use crate::{RowWrap, ValueWrap, classify};
use async_stream::try_stream;
use dbhelper_core::{
    Error, QueryResult, Result, RowsAffected, Statement,
    stream::{Stream, StreamExt, TryStreamExt},
};
use mysql_async::{Conn, Params, prelude::Queryable};

fn positional(values: Vec<dbhelper_core::Value>) -> Result<Params> {
    Ok(Params::Positional(
        values
            .into_iter()
            .map(|v| ValueWrap(v).try_into())
            .collect::<Result<_>>()?,
    ))
}

/// Run `statement` on `connection`, yielding the rows or the number of rows affected.
///
/// Statements without parameters go through the text protocol so that commands
/// which cannot be prepared still work.
pub(crate) fn run_on(
    connection: &mut Conn,
    statement: Statement,
) -> impl Stream<Item = Result<QueryResult>> + Send + '_ {
    let context = format!("While running the query:\n{}", statement);
    try_stream! {
        let mut rows = 0;
        if statement.params.is_empty() {
            let mut result = connection.query_iter(statement.sql.as_str()).await?;
            while let Some(mut stream) = result.stream::<RowWrap>().await? {
                while let Some(row) = stream.next().await.transpose()? {
                    rows += 1;
                    yield QueryResult::Row(row.0)
                }
            }
            if rows == 0 {
                yield QueryResult::Affected(RowsAffected {
                    rows_affected: result.affected_rows(),
                    last_affected_id: result.last_insert_id(),
                });
            }
        } else {
            let params = positional(statement.params)?;
            let mut result = connection.exec_iter(statement.sql.as_str(), params).await?;
            while let Some(mut stream) = result.stream::<RowWrap>().await? {
                while let Some(row) = stream.next().await.transpose()? {
                    rows += 1;
                    yield QueryResult::Row(row.0)
                }
            }
            if rows == 0 {
                yield QueryResult::Affected(RowsAffected {
                    rows_affected: result.affected_rows(),
                    last_affected_id: result.last_insert_id(),
                });
            }
        }
    }
    .map_err(move |e: Error| classify(e, &context))
}
