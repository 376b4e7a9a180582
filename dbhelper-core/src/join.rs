use crate::Value;

/// Join added to a select, see [`crate::QueryOptions`].
///
/// With a table and an `on` clause it renders `<kind> join <table> on <on>`,
/// with neither `kind` holds a complete fragment written verbatim. In both cases
/// `args` bind the `?` placeholders of the fragment.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: String,
    pub table: Option<String>,
    pub on: Option<String>,
    pub args: Vec<Value>,
}

impl Join {
    pub fn new(kind: impl Into<String>, table: impl Into<String>, on: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            table: Some(table.into()),
            on: Some(on.into()),
            args: Vec::new(),
        }
    }
    pub fn left(table: impl Into<String>, on: impl Into<String>) -> Self {
        Self::new("left", table, on)
    }
    pub fn inner(table: impl Into<String>, on: impl Into<String>) -> Self {
        Self::new("inner", table, on)
    }
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            kind: sql.into(),
            ..Default::default()
        }
    }
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }
}

/// Pre-formed SQL predicate appended to the `WHERE` clause as `AND (sql)`.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct RawPredicate {
    pub sql: String,
    pub args: Vec<Value>,
}

impl RawPredicate {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
        }
    }
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }
}

impl From<&str> for RawPredicate {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RawPredicate {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
