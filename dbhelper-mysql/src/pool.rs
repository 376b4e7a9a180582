use crate::{MySQLDriver, MySQLTransaction, run_on};
use async_stream::stream;
use dbhelper_core::{
    DatabaseConfig, DbError, Driver, Error, ErrorContext, Executor, Pool, QueryResult, Result,
    SqlWriter, Statement,
    stream::{Stream, StreamExt},
    truncate_long,
};
use mysql_async::{Opts, OptsBuilder, PoolConstraints, PoolOpts, prelude::Queryable};
use url::Url;

/// Shared set of MySQL connections, each statement borrows one for its duration.
#[derive(Debug, Clone)]
pub struct MySQLPool {
    pub(crate) pool: mysql_async::Pool,
}

impl MySQLPool {
    pub fn new(pool: mysql_async::Pool) -> Self {
        Self { pool }
    }

    /// Pool sized and aged after `config`, connections are reset when returned.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        let context = || {
            format!(
                "While configuring the pool for `{}:{}/{}`",
                config.host, config.port, config.database
            )
        };
        let opts = Opts::from_url(&config.url()).with_context(context)?;
        let min = config.max_idle_conns;
        let max = if config.max_open_conns == 0 {
            PoolConstraints::default().max().max(min)
        } else {
            config.max_open_conns
        };
        let Some(constraints) = PoolConstraints::new(min, max) else {
            return Err(Error::new(DbError::InvalidArgument(format!(
                "max_idle_conns ({min}) must not exceed max_open_conns ({max})"
            )))
            .context(context()));
        };
        let pool_opts = PoolOpts::default()
            .with_constraints(constraints)
            .with_abs_conn_ttl(config.conn_max_lifetime())
            .with_reset_connection(true);
        let opts = OptsBuilder::from_opts(opts).pool_opts(pool_opts);
        Ok(Self::new(mysql_async::Pool::new(opts)))
    }

    pub fn inner(&self) -> &mysql_async::Pool {
        &self.pool
    }

    /// Close every connection, waiting for the borrowed ones to come back.
    pub async fn disconnect(self) -> Result<()> {
        self.pool
            .disconnect()
            .await
            .context("While disconnecting the MySQL pool")
    }
}

impl Executor for MySQLPool {
    type Driver = MySQLDriver;

    fn driver(&self) -> &Self::Driver {
        &MySQLDriver {}
    }

    fn run(&self, statement: Statement) -> impl Stream<Item = Result<QueryResult>> + Send {
        let pool = self.pool.clone();
        stream! {
            let mut connection = match pool.get_conn().await {
                Ok(connection) => connection,
                Err(e) => {
                    let e = Error::new(e).context("While taking a connection from the pool");
                    log::error!("{:#}", e);
                    yield Err(e);
                    return;
                }
            };
            let stream = run_on(&mut connection, statement);
            let mut stream = std::pin::pin!(stream);
            while let Some(result) = stream.next().await {
                yield result;
            }
        }
    }
}

impl Pool for MySQLPool {
    type Transaction = MySQLTransaction;

    async fn connect(url: &str) -> Result<MySQLPool> {
        let context = || format!("While trying to connect to `{}`", truncate_long!(url));
        let prefix = format!("{}://", <Self::Driver as Driver>::NAME);
        if !url.starts_with(&prefix) {
            let error = Error::msg(format!(
                "MySQL connection url must start with `{}`",
                &prefix
            ))
            .context(context());
            log::error!("{:#}", error);
            return Err(error);
        }
        let url = Url::parse(url).with_context(context)?;
        let opts = Opts::from_url(url.as_str()).with_context(context)?;
        let pool = mysql_async::Pool::new(opts);
        let connection = pool.get_conn().await.with_context(context).map_err(|e| {
            log::error!("{:#}", e);
            e
        })?;
        drop(connection);
        Ok(MySQLPool { pool })
    }

    async fn begin(&self) -> Result<MySQLTransaction> {
        let mut connection = self
            .pool
            .get_conn()
            .await
            .context("While taking a connection for a transaction")?;
        let mut sql = String::new();
        self.driver().sql_writer().write_transaction_begin(&mut sql);
        connection
            .query_drop(sql)
            .await
            .context("While starting the transaction")?;
        Ok(MySQLTransaction::new(connection))
    }
}
