use crate::{
    ConnectionRegistry, Context, DbError, Error, ErrorContext, Pool, Result, Transaction,
};

/// Opens and finishes the transactions of one [`ConnectionRegistry`].
///
/// The transaction lives in the [`Context`]: `begin` returns a derived context
/// holding it, every operation resolving that context runs inside the
/// transaction, `commit` and `rollback` return a context where it is gone.
#[derive(Debug, Clone)]
pub struct TransactionManager<P: Pool> {
    registry: ConnectionRegistry<P>,
}

impl<P: Pool> TransactionManager<P> {
    pub fn new(registry: ConnectionRegistry<P>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ConnectionRegistry<P> {
        &self.registry
    }

    /// True if `ctx` holds a transaction for this namespace.
    pub fn is_active(&self, ctx: &Context) -> bool {
        ctx.has_handle(self.registry.namespace())
    }

    /// Open a transaction and return the context carrying it.
    ///
    /// Nested transactions are not supported, beginning twice on the same namespace
    /// fails with [`DbError::InvalidState`]. On error `ctx` is still the one to use.
    pub async fn begin(&self, ctx: &Context) -> Result<Context> {
        let namespace = self.registry.namespace();
        if self.is_active(ctx) {
            return Err(Error::new(DbError::InvalidState(format!(
                "A transaction is already active on the namespace `{namespace}`"
            ))));
        }
        let transaction = ctx
            .guard(self.registry.pool().begin())
            .await
            .with_context(|| format!("While beginning a transaction on `{namespace}`"))
            .map_err(|e| {
                log::error!("{:#}", e);
                e
            })?;
        log::debug!("Transaction began on `{namespace}`");
        Ok(ctx.with_handle(namespace, transaction))
    }

    /// Commit the transaction of `ctx`.
    ///
    /// The returned context never holds the transaction, whatever the outcome.
    pub async fn commit(&self, ctx: &Context) -> (Context, Result<()>) {
        self.finish(ctx, true).await
    }

    /// Roll back the transaction of `ctx`.
    ///
    /// The returned context never holds the transaction, whatever the outcome.
    pub async fn rollback(&self, ctx: &Context) -> (Context, Result<()>) {
        self.finish(ctx, false).await
    }

    async fn finish(&self, ctx: &Context, commit: bool) -> (Context, Result<()>) {
        let namespace = self.registry.namespace();
        let action = if commit { "commit" } else { "roll back" };
        // A handle of another type belongs to someone else, it stays
        let Some(transaction) = self.registry.transaction(ctx) else {
            return (
                ctx.clone(),
                Err(Error::new(DbError::InvalidState(format!(
                    "No transaction to {action} on the namespace `{namespace}`"
                )))),
            );
        };
        let cleared = ctx.without_handle(namespace);
        let result = if commit {
            transaction.commit().await
        } else {
            transaction.rollback().await
        };
        let result = result.with_context(|| {
            format!("While trying to {action} the transaction on `{namespace}`")
        });
        match &result {
            Ok(..) => log::debug!("Transaction on `{namespace}` finished with {action}"),
            Err(e) => log::error!("{:#}", e),
        }
        (cleared, result)
    }
}
