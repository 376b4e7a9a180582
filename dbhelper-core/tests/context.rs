#[cfg(test)]
mod tests {
    use dbhelper_core::{CancellationToken, Context, DbError, Namespace, Result};
    use std::time::Duration;

    fn classified(result: Result<()>) -> Option<DbError> {
        result.err().and_then(|e| DbError::of(&e).cloned())
    }

    #[test]
    fn namespaces() {
        let orders = Namespace::from("orders");
        let users = Namespace::from(String::from("users"));
        let ctx = Context::new()
            .with_handle(&orders, 1u32)
            .with_handle(&users, "tx".to_string());
        assert_eq!(ctx.handle::<u32>(&orders), Some(&1));
        assert_eq!(ctx.handle::<String>(&users).map(String::as_str), Some("tx"));
        assert_eq!(ctx.handle::<String>(&orders), None);
        let cleared = ctx.without_handle(&orders);
        assert!(!cleared.has_handle(&orders));
        assert!(cleared.has_handle(&users));
        assert!(ctx.has_handle(&orders));
        assert_eq!(Namespace::default().to_string(), "<default>");
        assert_eq!(Namespace::from_static("users"), users);
    }

    #[tokio::test]
    async fn deadline() {
        let ctx = Context::new().with_timeout(Duration::from_millis(10));
        assert!(ctx.check().is_ok());
        let slow = ctx.guard(async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        });
        assert_eq!(classified(slow.await), Some(DbError::DeadlineExceeded));
        assert_eq!(classified(ctx.check()), Some(DbError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn cancellation() {
        let token = CancellationToken::new();
        let ctx = Context::new().with_cancellation(token.clone());
        assert_eq!(ctx.guard(async { Ok(5) }).await.unwrap(), 5);
        token.cancel();
        let result = ctx.guard(async { Ok(()) }).await;
        assert_eq!(classified(result), Some(DbError::Cancelled));
        assert!(ctx.cancellation().is_some_and(CancellationToken::is_cancelled));
    }

    #[tokio::test]
    async fn derived_contexts_keep_the_limits() {
        let token = CancellationToken::new();
        let ctx = Context::new()
            .with_cancellation(token.clone())
            .with_timeout(Duration::from_secs(60))
            .with_handle(&Namespace::from("orders"), 1u8);
        let derived = ctx.without_handle(&Namespace::from("orders"));
        assert_eq!(derived.deadline(), ctx.deadline());
        token.cancel();
        assert_eq!(classified(derived.check()), Some(DbError::Cancelled));
    }
}
