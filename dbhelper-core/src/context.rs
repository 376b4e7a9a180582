use crate::{DbError, Error, Result};
use std::{
    any::Any,
    borrow::Cow,
    collections::BTreeMap,
    fmt::{self, Debug, Display, Formatter},
    future::{self, Future},
    sync::Arc,
    time::Duration,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Identifier of one logical database.
///
/// Each namespace has its own slot in [`Context`], so transactions opened on
/// different databases never see each other.
#[derive(Default, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Namespace(Cow<'static, str>);

impl Namespace {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for Namespace {
    fn from(value: &'static str) -> Self {
        Self(Cow::Borrowed(value))
    }
}

impl From<String> for Namespace {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}

impl Display for Namespace {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<default>")
        } else {
            f.write_str(&self.0)
        }
    }
}

type Slot = Arc<dyn Any + Send + Sync>;

/// Request scoped, immutable bag of values.
///
/// Holds the open transaction handle of each [`Namespace`], an optional deadline
/// and an optional cancellation token. Deriving a context never changes the
/// parent, callers keep using the value returned by the operation:
/// ```rust
/// use dbhelper_core::{Context, Namespace};
/// let ns = Namespace::from("orders");
/// let ctx = Context::new();
/// let derived = ctx.with_handle(&ns, 42u32);
/// assert!(!ctx.has_handle(&ns));
/// assert_eq!(derived.handle::<u32>(&ns), Some(&42));
/// assert!(!derived.without_handle(&ns).has_handle(&ns));
/// ```
#[derive(Default, Clone)]
pub struct Context {
    slots: Arc<BTreeMap<Namespace, Slot>>,
    deadline: Option<Instant>,
    cancellation: Option<CancellationToken>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(&self, deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            ..self.clone()
        }
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            cancellation: Some(token),
            ..self.clone()
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    pub fn has_handle(&self, namespace: &Namespace) -> bool {
        self.slots.contains_key(namespace)
    }

    /// The value stored for `namespace`, `None` if absent or of another type.
    pub fn handle<T: Any>(&self, namespace: &Namespace) -> Option<&T> {
        self.slots.get(namespace)?.downcast_ref::<T>()
    }

    /// Derive a context where `namespace` holds `handle`.
    pub fn with_handle<T: Any + Send + Sync>(&self, namespace: &Namespace, handle: T) -> Self {
        let mut slots = BTreeMap::clone(&self.slots);
        slots.insert(namespace.clone(), Arc::new(handle));
        Self {
            slots: Arc::new(slots),
            ..self.clone()
        }
    }

    /// Derive a context where `namespace` is empty.
    pub fn without_handle(&self, namespace: &Namespace) -> Self {
        if !self.has_handle(namespace) {
            return self.clone();
        }
        let mut slots = BTreeMap::clone(&self.slots);
        slots.remove(namespace);
        Self {
            slots: Arc::new(slots),
            ..self.clone()
        }
    }

    /// Fail if the context is already cancelled or past its deadline.
    pub fn check(&self) -> Result<()> {
        if self.cancellation.as_ref().is_some_and(|v| v.is_cancelled()) {
            return Err(Error::new(DbError::Cancelled));
        }
        if self.deadline.is_some_and(|v| v <= Instant::now()) {
            return Err(Error::new(DbError::DeadlineExceeded));
        }
        Ok(())
    }

    /// Run `operation` unless the deadline expires or the token is cancelled first.
    pub async fn guard<T>(&self, operation: impl Future<Output = Result<T>>) -> Result<T> {
        self.check()?;
        let cancelled = async {
            match &self.cancellation {
                Some(token) => token.cancelled().await,
                None => future::pending().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => future::pending().await,
            }
        };
        tokio::select! {
            biased;
            _ = cancelled => Err(Error::new(DbError::Cancelled)),
            _ = expired => Err(Error::new(DbError::DeadlineExceeded)),
            result = operation => result,
        }
    }
}

impl Debug for Context {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("handles", &self.slots.keys().collect::<Vec<_>>())
            .field("deadline", &self.deadline)
            .field("cancelled", &self.cancellation.as_ref().map(|v| v.is_cancelled()))
            .finish()
    }
}
