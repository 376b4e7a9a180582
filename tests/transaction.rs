mod resource {
    pub mod engine;
}

#[cfg(test)]
mod tests {
    use crate::resource::engine::{MockPool, Origin, init_logs};
    use dbhelper::{
        CancellationToken, Context, DbError, DbHelper, Filters, QueryOptions, RowLabeled,
    };
    use std::time::Duration;

    async fn list(helper: &DbHelper<MockPool>, ctx: &Context) {
        helper
            .list::<RowLabeled>(ctx, "t_user", Filters::new(), "", 0, QueryOptions::new())
            .await
            .expect("Failed to list the users");
    }

    #[tokio::test]
    async fn begin_and_commit() {
        init_logs();
        let pool = MockPool::new();
        let helper = DbHelper::new(pool.clone());
        let ctx = Context::new();
        let tx = helper.begin(&ctx).await.expect("Could not begin");
        assert!(helper.transactions().is_active(&tx));
        assert!(!helper.transactions().is_active(&ctx));
        assert!(helper.resolve(&tx).is_transaction());
        assert!(!helper.resolve(&ctx).is_transaction());

        list(&helper, &tx).await;
        list(&helper, &ctx).await;
        let origins = pool
            .executed()
            .into_iter()
            .map(|v| v.origin)
            .collect::<Vec<_>>();
        assert_eq!(origins, [Origin::Transaction(1), Origin::Pool]);

        let (after, result) = helper.commit(&tx).await;
        result.expect("Could not commit");
        assert!(!helper.transactions().is_active(&after));
        assert!(helper.transactions().is_active(&tx));
        assert_eq!(pool.events(), ["begin 1", "commit 1"]);
    }

    #[tokio::test]
    async fn rollback_clears_the_context() {
        init_logs();
        let pool = MockPool::new();
        let helper = DbHelper::new(pool.clone());
        let tx = helper.begin(&Context::new()).await.expect("Could not begin");
        let (after, result) = helper.rollback(&tx).await;
        result.expect("Could not roll back");
        assert!(!after.has_handle(helper.namespace()));
        assert_eq!(pool.events(), ["begin 1", "rollback 1"]);
    }

    #[tokio::test]
    async fn begin_twice_is_refused() {
        init_logs();
        let pool = MockPool::new();
        let helper = DbHelper::new(pool.clone());
        let tx = helper.begin(&Context::new()).await.expect("Could not begin");
        let error = helper.begin(&tx).await.expect_err("Nested begin should fail");
        assert!(matches!(DbError::of(&error), Some(DbError::InvalidState(..))));
        assert_eq!(pool.events(), ["begin 1"]);
    }

    #[tokio::test]
    async fn finish_without_transaction() {
        init_logs();
        let pool = MockPool::new();
        let helper = DbHelper::new(pool.clone());
        let ctx = Context::new();
        let (after, result) = helper.commit(&ctx).await;
        let error = result.expect_err("Commit without a transaction should fail");
        assert!(matches!(DbError::of(&error), Some(DbError::InvalidState(..))));
        assert!(!after.has_handle(helper.namespace()));
        let (_, result) = helper.rollback(&ctx).await;
        assert!(result.is_err());
        assert!(pool.events().is_empty());
    }

    #[tokio::test]
    async fn failed_commit_still_clears_the_context() {
        init_logs();
        let pool = MockPool::new();
        pool.fail_commit();
        let helper = DbHelper::new(pool.clone());
        let tx = helper.begin(&Context::new()).await.expect("Could not begin");
        let (after, result) = helper.commit(&tx).await;
        let error = result.expect_err("The commit should fail");
        assert!(format!("{:#}", error).contains("The engine refused to commit"));
        assert!(!helper.transactions().is_active(&after));
    }

    #[tokio::test]
    async fn finished_transaction_is_unusable() {
        init_logs();
        let pool = MockPool::new();
        let helper = DbHelper::new(pool.clone());
        let tx = helper.begin(&Context::new()).await.expect("Could not begin");
        let (_, result) = helper.commit(&tx).await;
        result.expect("Could not commit");
        let error = helper
            .list::<RowLabeled>(&tx, "t_user", Filters::new(), "", 0, QueryOptions::new())
            .await
            .expect_err("A committed transaction should not run statements");
        assert!(matches!(DbError::of(&error), Some(DbError::InvalidState(..))));
        let (_, result) = helper.commit(&tx).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn foreign_handle_is_kept() {
        init_logs();
        let pool = MockPool::new();
        let helper = DbHelper::new(pool.clone());
        let ctx = Context::new().with_handle(helper.namespace(), 5u32);
        let (after, result) = helper.commit(&ctx).await;
        let error = result.expect_err("A handle of another type is not a transaction");
        assert!(matches!(DbError::of(&error), Some(DbError::InvalidState(..))));
        assert_eq!(after.handle::<u32>(helper.namespace()), Some(&5));
        let (after, result) = helper.rollback(&after).await;
        assert!(result.is_err());
        assert!(after.has_handle(helper.namespace()));
        assert!(pool.events().is_empty());
    }

    #[tokio::test]
    async fn contexts_do_not_share_transactions() {
        init_logs();
        let pool = MockPool::new();
        let helper = DbHelper::new(pool.clone());
        let ctx = Context::new();
        let (first, second) = tokio::join!(helper.begin(&ctx), helper.begin(&ctx));
        let (first, second) = (first.expect("Could not begin"), second.expect("Could not begin"));
        list(&helper, &first).await;
        list(&helper, &second).await;
        let mut origins = pool
            .executed()
            .into_iter()
            .map(|v| v.origin)
            .collect::<Vec<_>>();
        origins.sort_by_key(|v| format!("{v:?}"));
        assert_eq!(origins, [Origin::Transaction(1), Origin::Transaction(2)]);
        assert!(!helper.transactions().is_active(&ctx));
    }

    #[tokio::test]
    async fn namespaces_are_isolated() {
        init_logs();
        let orders = MockPool::new();
        let users = MockPool::new();
        let orders_helper = DbHelper::new(orders.clone()).with_namespace("orders");
        let users_helper = DbHelper::new(users.clone()).with_namespace("users");
        let ctx = Context::new();

        let tx = orders_helper.begin(&ctx).await.expect("Could not begin");
        assert!(!users_helper.transactions().is_active(&tx));
        list(&users_helper, &tx).await;
        list(&orders_helper, &tx).await;
        assert_eq!(users.last().origin, Origin::Pool);
        assert_eq!(orders.last().origin, Origin::Transaction(1));

        let both = users_helper.begin(&tx).await.expect("Could not begin");
        assert!(orders_helper.transactions().is_active(&both));
        assert!(users_helper.transactions().is_active(&both));

        let (after, result) = orders_helper.commit(&both).await;
        result.expect("Could not commit");
        assert!(!orders_helper.transactions().is_active(&after));
        assert!(users_helper.transactions().is_active(&after));
        list(&users_helper, &after).await;
        assert_eq!(users.last().origin, Origin::Transaction(1));

        let (after, result) = users_helper.rollback(&after).await;
        result.expect("Could not roll back");
        assert!(!users_helper.transactions().is_active(&after));
        assert_eq!(orders.events(), ["begin 1", "commit 1"]);
        assert_eq!(users.events(), ["begin 1", "rollback 1"]);
    }

    #[tokio::test]
    async fn begin_respects_the_deadline() {
        init_logs();
        let pool = MockPool::new();
        pool.delay(Duration::from_millis(500));
        let helper = DbHelper::new(pool.clone());
        let ctx = Context::new().with_timeout(Duration::from_millis(20));
        let error = helper.begin(&ctx).await.expect_err("Begin should time out");
        assert!(matches!(DbError::of(&error), Some(DbError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn cancelled_context_runs_nothing() {
        init_logs();
        let pool = MockPool::new();
        let helper = DbHelper::new(pool.clone());
        let token = CancellationToken::new();
        token.cancel();
        let ctx = Context::new().with_cancellation(token);
        let error = helper.begin(&ctx).await.expect_err("Begin should be cancelled");
        assert!(matches!(DbError::of(&error), Some(DbError::Cancelled)));
        assert!(pool.events().is_empty());
        let error = helper
            .count(&ctx, "t_user", Filters::new(), QueryOptions::new())
            .await
            .expect_err("Count should be cancelled");
        assert!(matches!(DbError::of(&error), Some(DbError::Cancelled)));
    }

    #[tokio::test]
    async fn slow_query_is_interrupted() {
        init_logs();
        let pool = MockPool::new();
        let helper = DbHelper::new(pool.clone());
        let token = CancellationToken::new();
        let ctx = Context::new().with_cancellation(token.clone());
        pool.delay(Duration::from_millis(500));
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });
        let error = helper
            .list::<RowLabeled>(&ctx, "t_user", Filters::new(), "", 0, QueryOptions::new())
            .await
            .expect_err("The list should be cancelled");
        assert!(matches!(DbError::of(&error), Some(DbError::Cancelled)));
        canceller.await.expect("The canceller panicked");
    }
}
