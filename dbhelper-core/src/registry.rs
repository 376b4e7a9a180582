use crate::{
    Context, Executor, Namespace, Pool, QueryResult, Result, Statement,
    future::Either,
    stream::Stream,
};

/// Connection a statement runs on, chosen by [`ConnectionRegistry::resolve`].
pub enum Handle<'p, P: Pool> {
    /// Shared pool, statements run concurrently on any connection.
    Pool(&'p P),
    /// Transaction stored in the context, statements run in sequence on its connection.
    Transaction(P::Transaction),
}

impl<P: Pool> Handle<'_, P> {
    pub fn is_transaction(&self) -> bool {
        matches!(self, Handle::Transaction(..))
    }
}

impl<P: Pool> Executor for Handle<'_, P> {
    type Driver = P::Driver;

    fn driver(&self) -> &Self::Driver {
        match self {
            Handle::Pool(pool) => pool.driver(),
            Handle::Transaction(transaction) => transaction.driver(),
        }
    }

    fn run(&self, statement: Statement) -> impl Stream<Item = Result<QueryResult>> + Send {
        match self {
            Handle::Pool(pool) => Either::Left(pool.run(statement)),
            Handle::Transaction(transaction) => Either::Right(transaction.run(statement)),
        }
    }
}

/// Pool of one logical database plus the namespace of its transactions in [`Context`].
#[derive(Debug, Clone)]
pub struct ConnectionRegistry<P: Pool> {
    namespace: Namespace,
    pool: P,
}

impl<P: Pool> ConnectionRegistry<P> {
    pub fn new(pool: P) -> Self {
        Self::with_namespace(Namespace::default(), pool)
    }

    pub fn with_namespace(namespace: impl Into<Namespace>, pool: P) -> Self {
        Self {
            namespace: namespace.into(),
            pool,
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }

    /// Transaction stored in `ctx` for this namespace, if any.
    pub fn transaction(&self, ctx: &Context) -> Option<P::Transaction> {
        if !ctx.has_handle(&self.namespace) {
            return None;
        }
        let transaction = ctx.handle::<P::Transaction>(&self.namespace).cloned();
        if transaction.is_none() {
            log::warn!(
                "The context holds a handle of an unexpected type for the namespace `{}`, it will be ignored",
                self.namespace
            );
        }
        transaction
    }

    /// The transaction active in `ctx` for this namespace, otherwise the pool.
    pub fn resolve(&self, ctx: &Context) -> Handle<'_, P> {
        match self.transaction(ctx) {
            Some(transaction) => Handle::Transaction(transaction),
            None => Handle::Pool(&self.pool),
        }
    }
}
