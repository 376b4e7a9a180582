use crate::{GenericSqlWriter, SqlWriter, Value, WriteContext};
use std::fmt::{self, Display, Formatter};

/// Comparison applied by a [`Condition::Leaf`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `field = value`, `field IN (...)` for lists, `field IS NULL` for null.
    Eq,
    /// `field LIKE value`.
    Like,
    /// `field <> value`, `field NOT IN (...)` for lists, `field IS NOT NULL` for null.
    NotEqualOrNotIn,
    /// `field IN (...)`.
    In,
}

/// How the children of a [`Condition::Group`] combine.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    #[default]
    And,
    Or,
}

impl Combinator {
    pub fn keyword(&self) -> &'static str {
        match self {
            Combinator::And => "AND",
            Combinator::Or => "OR",
        }
    }
}

impl Display for Combinator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Predicate tree rendered into the `WHERE` clause of a statement.
///
/// Build it directly:
/// ```rust
/// use dbhelper_core::Condition;
/// let condition = Condition::and([
///     Condition::eq("k1", "v1"),
///     Condition::or([Condition::eq("k3", "v3"), Condition::like("k2", "v2")]),
/// ]);
/// assert_eq!(condition.to_string(), "(k1 = 'v1' AND (k3 = 'v3' OR k2 LIKE '%v2%'))");
/// ```
/// or compile it from the suffix notation through [`crate::Filters`].
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Leaf {
        field: String,
        operator: Operator,
        value: Value,
    },
    Group {
        combinator: Combinator,
        children: Vec<Condition>,
    },
    Not(Box<Condition>),
}

impl Condition {
    pub fn leaf(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Condition::Leaf {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::leaf(field, Operator::Eq, value)
    }

    /// Substring match, the value is wrapped in `%` on both sides.
    pub fn like(field: impl Into<String>, value: impl AsRef<str>) -> Self {
        Self::leaf(
            field,
            Operator::Like,
            Value::Varchar(format!("%{}%", value.as_ref())),
        )
    }

    /// Like pattern passed through unchanged, the caller decides where the wildcards go.
    pub fn like_pattern(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::leaf(field, Operator::Like, Value::Varchar(pattern.into()))
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::leaf(field, Operator::NotEqualOrNotIn, value)
    }

    pub fn is_in<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self::leaf(
            field,
            Operator::In,
            Value::List(values.into_iter().map(Into::into).collect()),
        )
    }

    pub fn group(combinator: Combinator, children: impl IntoIterator<Item = Condition>) -> Self {
        Condition::Group {
            combinator,
            children: children.into_iter().collect(),
        }
    }

    pub fn and(children: impl IntoIterator<Item = Condition>) -> Self {
        Self::group(Combinator::And, children)
    }

    pub fn or(children: impl IntoIterator<Item = Condition>) -> Self {
        Self::group(Combinator::Or, children)
    }

    pub fn not(condition: Condition) -> Self {
        Condition::Not(Box::new(condition))
    }

    /// A group with no children, at any depth.
    pub fn has_empty_group(&self) -> bool {
        match self {
            Condition::Leaf { .. } => false,
            Condition::Group { children, .. } => {
                children.is_empty() || children.iter().any(Condition::has_empty_group)
            }
            Condition::Not(inner) => inner.has_empty_group(),
        }
    }

    /// Children that would be written as top level conjuncts of a `WHERE` clause.
    pub fn conjuncts(&self) -> &[Condition] {
        match self {
            Condition::Group {
                combinator: Combinator::And,
                children,
            } => children,
            _ => std::slice::from_ref(self),
        }
    }
}

impl Display for Condition {
    /// Renders with the values inlined as literals, meant for logs and tests.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let writer = GenericSqlWriter::new();
        let mut context = WriteContext::inline();
        let mut out = String::with_capacity(64);
        writer.write_condition(&mut context, &mut out, self);
        f.write_str(&out)
    }
}
