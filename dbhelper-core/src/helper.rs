use crate::{
    AsCondition, AsValue, Condition, ConnectionRegistry, Context, DbError, Driver, Error, ErrorContext,
    Executor, FromRow, Handle, Namespace, Pool, QueryOptions, QuerySpec, Record, Result,
    RowsAffected, SqlWriter, Statement, TransactionManager, Value, WriteContext,
    stream::{StreamExt, TryStreamExt},
    truncate_long,
};

pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_PRIMARY_KEY: &str = "id";
/// Column flagging soft deleted rows, zero while the row is alive.
pub const DELETED_COLUMN: &str = "deleted";

/// Statement bound to the connection resolved for a context.
pub struct BoundQuery<'p, P: Pool> {
    pub handle: Handle<'p, P>,
    pub ctx: Context,
    pub statement: Statement,
}

impl<'p, P: Pool> BoundQuery<'p, P> {
    pub fn new(handle: Handle<'p, P>, ctx: Context, statement: Statement) -> Self {
        Self {
            handle,
            ctx,
            statement,
        }
    }

    fn describe(&self) -> String {
        format!("While running the query:\n{}", truncate_long!(self.statement.sql))
    }

    /// All the rows returned, decoded.
    pub async fn fetch<T: FromRow>(self) -> Result<Vec<T>> {
        let context = self.describe();
        log::debug!("{}", self.statement);
        let rows = self
            .handle
            .fetch(self.statement)
            .and_then(|row| async move { T::from_row(row) })
            .try_collect::<Vec<_>>();
        self.ctx.guard(rows).await.context(context)
    }

    /// The first row returned, the remaining ones are not read.
    pub async fn fetch_one<T: FromRow>(self) -> Result<Option<T>> {
        let context = self.describe();
        log::debug!("{}", self.statement);
        let stream = self.handle.fetch(self.statement);
        let row = async {
            let mut stream = std::pin::pin!(stream);
            match stream.next().await {
                Some(row) => T::from_row(row?).map(Some),
                None => Ok(None),
            }
        };
        self.ctx.guard(row).await.context(context)
    }

    /// Total number of rows affected.
    pub async fn execute(self) -> Result<RowsAffected> {
        let context = self.describe();
        log::debug!("{}", self.statement);
        let result = self.handle.execute(self.statement);
        self.ctx.guard(result).await.context(context)
    }
}

fn invalid_argument(message: impl Into<String>) -> Error {
    Error::new(DbError::InvalidArgument(message.into()))
}

fn non_negative(name: &str, value: i64) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| invalid_argument(format!("The {name} must not be negative, got {value}")))
}

/// Data access helper of one database.
///
/// Every operation takes the request [`Context`]: if it holds a transaction for
/// the namespace of the helper the statement runs inside it, otherwise on the pool.
/// Conditions are either a typed [`Condition`] or a [`crate::Filters`] description.
pub struct DbHelper<P: Pool> {
    transactions: TransactionManager<P>,
    writer: <P::Driver as Driver>::SqlWriter,
    primary_key: String,
    batch_size: usize,
}

impl<P: Pool> DbHelper<P> {
    pub fn new(pool: P) -> Self {
        Self::from_registry(ConnectionRegistry::new(pool))
    }

    pub fn from_registry(registry: ConnectionRegistry<P>) -> Self {
        let writer = registry.pool().driver().sql_writer();
        Self {
            transactions: TransactionManager::new(registry),
            writer,
            primary_key: DEFAULT_PRIMARY_KEY.into(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Use a separate transaction slot, for applications talking to more databases.
    pub fn with_namespace(self, namespace: impl Into<Namespace>) -> Self {
        let pool = self.registry().pool().clone();
        Self {
            transactions: TransactionManager::new(ConnectionRegistry::with_namespace(
                namespace, pool,
            )),
            ..self
        }
    }

    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    /// Rows per statement in [`DbHelper::create_batch`] when no size is given.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn registry(&self) -> &ConnectionRegistry<P> {
        self.transactions.registry()
    }

    pub fn transactions(&self) -> &TransactionManager<P> {
        &self.transactions
    }

    pub fn namespace(&self) -> &Namespace {
        self.registry().namespace()
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn writer(&self) -> &dyn SqlWriter {
        self.writer.as_dyn()
    }

    pub fn pool(&self) -> &P {
        self.registry().pool()
    }

    /// Connection the statements for `ctx` run on.
    pub fn resolve(&self, ctx: &Context) -> Handle<'_, P> {
        self.registry().resolve(ctx)
    }

    pub async fn begin(&self, ctx: &Context) -> Result<Context> {
        self.transactions.begin(ctx).await
    }

    pub async fn commit(&self, ctx: &Context) -> (Context, Result<()>) {
        self.transactions.commit(ctx).await
    }

    pub async fn rollback(&self, ctx: &Context) -> (Context, Result<()>) {
        self.transactions.rollback(ctx).await
    }

    /// Bind `statement` to the connection resolved for `ctx`.
    pub fn bind(&self, ctx: &Context, statement: Statement) -> BoundQuery<'_, P> {
        BoundQuery::new(self.resolve(ctx), ctx.clone(), statement)
    }

    /// Render `spec` and bind it to the connection resolved for `ctx`.
    pub fn build_query(&self, ctx: &Context, spec: &QuerySpec) -> Result<BoundQuery<'_, P>> {
        let statement = spec
            .build(self.writer())
            .with_context(|| format!("While building the select from `{}`", spec.table))?;
        Ok(self.bind(ctx, statement))
    }

    fn query_spec(
        &self,
        table: &str,
        conditions: impl AsCondition,
        options: QueryOptions,
    ) -> Result<QuerySpec> {
        Ok(QuerySpec::new(table)
            .filter(conditions.as_condition()?)
            .options(options))
    }

    fn render(&self, write: impl FnOnce(&dyn SqlWriter, &mut WriteContext, &mut String)) -> Statement {
        let mut context = WriteContext::placeholders();
        let mut sql = String::new();
        write(self.writer(), &mut context, &mut sql);
        Statement::new(sql, context.into_params())
    }

    /// Condition of a statement writing rows, an absent or empty one is refused.
    fn write_condition(&self, table: &str, conditions: impl AsCondition) -> Result<Condition> {
        let Some(condition) = conditions.as_condition()? else {
            return Err(invalid_argument(format!(
                "Refusing to write every row of `{table}`, the condition is empty"
            )));
        };
        if condition.has_empty_group() {
            return Err(Error::new(DbError::EmptyGroup(format!(
                "in the condition on `{table}`"
            ))));
        }
        Ok(condition)
    }

    /// Insert one row, the engine generated identifier is in `last_affected_id`.
    pub async fn create(&self, ctx: &Context, table: &str, record: &Record) -> Result<RowsAffected> {
        if record.is_empty() {
            return Err(invalid_argument(format!("No column to insert into `{table}`")));
        }
        let statement =
            self.render(|w, c, out| w.write_insert(c, out, table, std::slice::from_ref(record)));
        self.bind(ctx, statement).execute().await
    }

    /// Insert `records` with one statement every `batch_size` rows, zero uses the default size.
    ///
    /// All the records must have the same columns. Unless `ctx` already has a
    /// transaction the batches run in one opened for the occasion, so either every
    /// row is inserted or none.
    pub async fn create_batch(
        &self,
        ctx: &Context,
        table: &str,
        records: &[Record],
        batch_size: usize,
    ) -> Result<RowsAffected> {
        let Some(first) = records.first() else {
            return Ok(RowsAffected::default());
        };
        if first.is_empty() {
            return Err(invalid_argument(format!("No column to insert into `{table}`")));
        }
        if let Some(i) = records.iter().position(|r| !r.same_columns(first)) {
            return Err(invalid_argument(format!(
                "The record {i} has different columns than the first one ({})",
                first.columns().collect::<Vec<_>>().join(", ")
            )));
        }
        let batch_size = if batch_size == 0 {
            self.batch_size
        } else {
            batch_size
        };
        if self.transactions.is_active(ctx) {
            return self.insert_batches(ctx, table, records, batch_size).await;
        }
        let tx = self.begin(ctx).await?;
        match self.insert_batches(&tx, table, records, batch_size).await {
            Ok(result) => {
                let (_, committed) = self.commit(&tx).await;
                committed.map(|_| result)
            }
            Err(e) => {
                let (_, rolled_back) = self.rollback(&tx).await;
                if let Err(rollback_error) = rolled_back {
                    log::error!("{:#}", rollback_error);
                }
                Err(e)
            }
        }
    }

    async fn insert_batches(
        &self,
        ctx: &Context,
        table: &str,
        records: &[Record],
        batch_size: usize,
    ) -> Result<RowsAffected> {
        let mut total = RowsAffected::default();
        for (i, chunk) in records.chunks(batch_size).enumerate() {
            let statement = self.render(|w, c, out| w.write_insert(c, out, table, chunk));
            let result = self
                .bind(ctx, statement)
                .execute()
                .await
                .with_context(|| format!("While inserting the batch {i} into `{table}`"))?;
            total.extend([result]);
        }
        Ok(total)
    }

    /// Delete the rows matching `conditions`, at most `limit` of them when positive.
    pub async fn delete(
        &self,
        ctx: &Context,
        table: &str,
        conditions: impl AsCondition,
        limit: i64,
    ) -> Result<u64> {
        let limit = non_negative("limit", limit)?;
        let condition = self.write_condition(table, conditions)?;
        let statement = self.render(|w, c, out| w.write_delete(c, out, table, &condition, limit));
        Ok(self.bind(ctx, statement).execute().await?.rows_affected)
    }

    /// Set the columns of `record` on the rows matching `conditions`, at most `limit` when positive.
    pub async fn update(
        &self,
        ctx: &Context,
        table: &str,
        record: &Record,
        conditions: impl AsCondition,
        limit: i64,
    ) -> Result<u64> {
        let limit = non_negative("limit", limit)?;
        if record.is_empty() {
            return Err(invalid_argument(format!("No column to update in `{table}`")));
        }
        let condition = self.write_condition(table, conditions)?;
        let statement =
            self.render(|w, c, out| w.write_update(c, out, table, record, &condition, limit));
        Ok(self.bind(ctx, statement).execute().await?.rows_affected)
    }

    /// Rows matching `conditions`, an empty `order` keeps the engine order, `limit` zero means all.
    pub async fn list<T: FromRow>(
        &self,
        ctx: &Context,
        table: &str,
        conditions: impl AsCondition,
        order: &str,
        limit: i64,
        options: QueryOptions,
    ) -> Result<Vec<T>> {
        self.list_page(ctx, table, conditions, order, limit, 0, options)
            .await
    }

    /// Like [`DbHelper::list`], skipping the first `offset` rows.
    #[allow(clippy::too_many_arguments)]
    pub async fn list_page<T: FromRow>(
        &self,
        ctx: &Context,
        table: &str,
        conditions: impl AsCondition,
        order: &str,
        limit: i64,
        offset: i64,
        options: QueryOptions,
    ) -> Result<Vec<T>> {
        let spec = self
            .query_spec(table, conditions, options)?
            .order(order)
            .limit(limit)
            .offset(offset);
        self.build_query(ctx, &spec)?.fetch().await
    }

    /// One row matching `conditions` in the given order, `None` if there is none.
    pub async fn take<T: FromRow>(
        &self,
        ctx: &Context,
        table: &str,
        conditions: impl AsCondition,
        order: &str,
        options: QueryOptions,
    ) -> Result<Option<T>> {
        let spec = self
            .query_spec(table, conditions, options)?
            .order(order)
            .limit(1);
        self.build_query(ctx, &spec)?.fetch_one().await
    }

    /// Like [`DbHelper::take`], an empty `order` sorts by primary key.
    ///
    /// With joins the primary key is qualified by the table alias, or its name.
    pub async fn first<T: FromRow>(
        &self,
        ctx: &Context,
        table: &str,
        conditions: impl AsCondition,
        order: &str,
        options: QueryOptions,
    ) -> Result<Option<T>> {
        let order = match order {
            "" if options.joins.is_empty() => self.primary_key.clone(),
            "" => format!(
                "{}.{}",
                table.split_whitespace().last().unwrap_or(table),
                self.primary_key
            ),
            v => v.to_string(),
        };
        self.take(ctx, table, conditions, &order, options).await
    }

    /// Number of rows matching `conditions`, of groups when the options group the rows.
    pub async fn count(
        &self,
        ctx: &Context,
        table: &str,
        conditions: impl AsCondition,
        options: QueryOptions,
    ) -> Result<i64> {
        let spec = self.query_spec(table, conditions, options)?;
        let statement = spec
            .build_count(self.writer())
            .with_context(|| format!("While building the count of `{table}`"))?;
        let row = self
            .bind(ctx, statement)
            .fetch_one::<crate::Row>()
            .await?;
        match row.as_deref() {
            Some([value, ..]) => Ok(Option::<i64>::try_from_value(value.clone())?.unwrap_or(0)),
            _ => Ok(0),
        }
    }

    /// Sum of `column` over the rows matching `conditions`, zero when there is none.
    pub async fn sum(
        &self,
        ctx: &Context,
        table: &str,
        conditions: impl AsCondition,
        column: &str,
        options: QueryOptions,
    ) -> Result<u64> {
        let spec = self.query_spec(table, conditions, options)?;
        let statement = spec
            .build_sum(self.writer(), column)
            .with_context(|| format!("While building the sum of `{column}` in `{table}`"))?;
        let row = self
            .bind(ctx, statement)
            .fetch_one::<crate::RowLabeled>()
            .await?;
        match row {
            Some(row) => Ok(row.get::<Option<u64>>("total")?.unwrap_or(0)),
            None => Ok(0),
        }
    }

    /// Insert `record`, on a duplicate primary key apply `assignments` to the existing row.
    pub async fn upsert(
        &self,
        ctx: &Context,
        table: &str,
        record: &Record,
        assignments: &Record,
    ) -> Result<RowsAffected> {
        if record.is_empty() || assignments.is_empty() {
            return Err(invalid_argument(format!(
                "Upsert into `{table}` needs both the record and the assignments"
            )));
        }
        let statement = self.render(|w, c, out| {
            w.write_upsert(c, out, table, record, assignments, &self.primary_key)
        });
        self.bind(ctx, statement).execute().await
    }

    /// Insert `record` unless it collides with an existing unique key.
    pub async fn insert_ignore(
        &self,
        ctx: &Context,
        table: &str,
        record: &Record,
    ) -> Result<RowsAffected> {
        if record.is_empty() {
            return Err(invalid_argument(format!("No column to insert into `{table}`")));
        }
        let statement = self
            .render(|w, c, out| w.write_insert_ignore(c, out, table, std::slice::from_ref(record)));
        self.bind(ctx, statement).execute().await
    }

    /// Run a hand written select, `params` bind its `?` placeholders in order.
    pub async fn raw_query<T: FromRow>(
        &self,
        ctx: &Context,
        sql: &str,
        params: Vec<Value>,
    ) -> Result<Vec<T>> {
        let statement = self.raw_statement(sql, &params);
        self.bind(ctx, statement).fetch().await
    }

    /// Run a hand written statement, `params` bind its `?` placeholders in order.
    pub async fn raw_exec(
        &self,
        ctx: &Context,
        sql: &str,
        params: Vec<Value>,
    ) -> Result<RowsAffected> {
        let statement = self.raw_statement(sql, &params);
        self.bind(ctx, statement).execute().await
    }

    /// List parameters expand into one placeholder per element.
    fn raw_statement(&self, sql: &str, params: &[Value]) -> Statement {
        self.render(|writer, context, out| writer.write_raw(context, out, sql, params))
    }

    /// Flag the row with primary key `id` as deleted.
    ///
    /// The `deleted` column receives the id itself rather than a boolean, so a
    /// unique key including `deleted` lets a new row reuse the values of the deleted one.
    pub async fn soft_delete_by_id(&self, ctx: &Context, table: &str, id: u64) -> Result<u64> {
        let record = Record::new().set(DELETED_COLUMN, id);
        self.update(
            ctx,
            table,
            &record,
            Condition::eq(self.primary_key.as_str(), id),
            1,
        )
        .await
    }

    /// Rows matching `conditions` that are not soft deleted.
    pub async fn list_not_deleted<T: FromRow>(
        &self,
        ctx: &Context,
        table: &str,
        conditions: impl AsCondition,
    ) -> Result<Vec<T>> {
        let mut children = vec![Condition::eq(DELETED_COLUMN, 0)];
        if let Some(condition) = conditions.as_condition()? {
            children.extend(condition.conjuncts().iter().cloned());
        }
        let spec = QuerySpec::new(table).filter(Condition::and(children));
        self.build_query(ctx, &spec)?.fetch().await
    }
}
