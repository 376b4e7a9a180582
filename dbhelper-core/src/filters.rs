use crate::{Combinator, Condition, DbError, Error, Operator, Result, Value, has_suffix};

pub const LIKE_SUFFIX: &str = " lk";
pub const NOT_EQUAL_SUFFIX: &str = " ne";
pub const IN_SUFFIX: &str = " in";

/// Right hand side of a [`Filters`] entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Value(Value),
    Nested(Filters),
}

/// Ordered condition description written in the suffix notation.
///
/// Each entry is a `(key, value)` pair:
/// - `"name"` compares with `=` (`IN` for lists, `IS NULL` for null)
/// - `"name lk"` is a substring `LIKE`, the value must be a string
/// - `"name ne"` is `<>` for scalars and `NOT IN` for lists
/// - `"name in"` is `IN`, the value must be a list
/// - `"AND..."` / `"OR..."` introduce a nested description combined with that word
///
/// Entries keep their insertion order, so the compiled predicate is deterministic.
/// ```rust
/// use dbhelper_core::{Combinator, filters};
/// let filters = filters! {
///     "k1" => "v1",
///     "OR" => {
///         "k3" => "v3",
///         "AND" => { "k4" => "v4", "k5" => "v5" },
///     },
///     "k6 ne" => ["v66", "v67"],
/// };
/// let condition = filters.compile(Combinator::And).unwrap();
/// assert_eq!(
///     condition.to_string(),
///     "(k1 = 'v1' AND (k3 = 'v3' OR (k4 = 'v4' AND k5 = 'v5')) AND k6 NOT IN ('v66','v67'))"
/// );
/// ```
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Filters {
    entries: Vec<(String, Filter)>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(key, value);
        self
    }

    pub fn nested(mut self, key: impl Into<String>, filters: Filters) -> Self {
        self.entries.push((key.into(), Filter::Nested(filters)));
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.entries.push((key.into(), Filter::Value(value.into())));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Filter)> {
        self.entries.iter()
    }

    /// Compile into a [`Condition::Group`] whose children are combined with `combinator`.
    ///
    /// Fails with [`DbError::EmptyGroup`] when the description, or any nested one, has no
    /// entries and with [`DbError::TypeMismatch`] when a value does not fit its suffix.
    pub fn compile(&self, combinator: Combinator) -> Result<Condition> {
        if self.entries.is_empty() {
            return Err(Error::new(DbError::EmptyGroup(format!("`{combinator}`"))));
        }
        let children = self
            .entries
            .iter()
            .map(|(key, filter)| compile_entry(key, filter))
            .collect::<Result<Vec<_>>>()?;
        Ok(Condition::Group {
            combinator,
            children,
        })
    }
}

fn combinator_of(key: &str) -> Option<Combinator> {
    if key.starts_with("AND") {
        Some(Combinator::And)
    } else if key.starts_with("OR") {
        Some(Combinator::Or)
    } else {
        None
    }
}

fn type_mismatch(field: &str, expected: &'static str, found: &Filter) -> Error {
    Error::new(DbError::TypeMismatch {
        field: field.to_string(),
        expected,
        found: match found {
            Filter::Value(v) => v.type_name().to_string(),
            Filter::Nested(..) => "a nested condition".to_string(),
        },
    })
}

fn compile_entry(key: &str, filter: &Filter) -> Result<Condition> {
    let strip = |suffix: &str| key[..key.len() - suffix.len()].to_string();
    if has_suffix(key, LIKE_SUFFIX) {
        let field = strip(LIKE_SUFFIX);
        return match filter {
            Filter::Value(Value::Varchar(v)) => Ok(Condition::like(field, v)),
            _ => Err(type_mismatch(&field, "a string", filter)),
        };
    }
    if has_suffix(key, NOT_EQUAL_SUFFIX) {
        let field = strip(NOT_EQUAL_SUFFIX);
        return match filter {
            Filter::Value(v) => Ok(Condition::leaf(field, Operator::NotEqualOrNotIn, v.clone())),
            Filter::Nested(..) => Err(type_mismatch(&field, "a scalar or a list", filter)),
        };
    }
    if has_suffix(key, IN_SUFFIX) {
        let field = strip(IN_SUFFIX);
        return match filter {
            Filter::Value(v @ Value::List(..)) => Ok(Condition::leaf(field, Operator::In, v.clone())),
            _ => Err(type_mismatch(&field, "a list", filter)),
        };
    }
    match (combinator_of(key), filter) {
        (Some(combinator), Filter::Nested(nested)) => nested
            .compile(combinator)
            .map_err(|e| e.context(format!("While compiling the nested condition `{key}`"))),
        (None, Filter::Nested(..)) => Err(type_mismatch(key, "a scalar or a list", filter)),
        (_, Filter::Value(v)) => Ok(Condition::leaf(key, Operator::Eq, v.clone())),
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Filters {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), Filter::Value(v.into())))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for Filters {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.push(k, v);
        }
    }
}

/// Build [`Filters`] in the suffix notation, braces introduce a nested description.
#[macro_export]
macro_rules! filters {
    (@munch $filters:ident;) => { $filters };
    (@munch $filters:ident; $key:expr => { $($inner:tt)* } $(, $($rest:tt)*)?) => {{
        let $filters = $filters.nested($key, $crate::filters!($($inner)*));
        $crate::filters!(@munch $filters; $($($rest)*)?)
    }};
    (@munch $filters:ident; $key:expr => $value:expr $(, $($rest:tt)*)?) => {{
        let $filters = $filters.with($key, $value);
        $crate::filters!(@munch $filters; $($($rest)*)?)
    }};
    () => { $crate::Filters::new() };
    ($($body:tt)+) => {{
        let filters = $crate::Filters::new();
        $crate::filters!(@munch filters; $($body)+)
    }};
}
