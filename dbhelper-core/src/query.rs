use crate::{
    Combinator, Condition, DbError, Error, Filters, GenericSqlWriter, Join, RawPredicate, Result,
    SqlWriter, Statement, WriteContext,
};
use std::fmt::{self, Display, Formatter};

/// Anything accepted as the condition of a read or write.
///
/// An empty [`Filters`] means no condition at all, a [`Condition`] is taken as is.
pub trait AsCondition {
    fn as_condition(&self) -> Result<Option<Condition>>;
}

impl AsCondition for Filters {
    fn as_condition(&self) -> Result<Option<Condition>> {
        if self.is_empty() {
            return Ok(None);
        }
        self.compile(Combinator::And).map(Some)
    }
}

impl AsCondition for Condition {
    fn as_condition(&self) -> Result<Option<Condition>> {
        Ok(Some(self.clone()))
    }
}

impl AsCondition for Option<Condition> {
    fn as_condition(&self) -> Result<Option<Condition>> {
        Ok(self.clone())
    }
}

impl<T: AsCondition + ?Sized> AsCondition for &T {
    fn as_condition(&self) -> Result<Option<Condition>> {
        (*self).as_condition()
    }
}

/// Optional parts of a select: joins, projection, raw predicates and grouping.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct QueryOptions {
    pub joins: Vec<Join>,
    pub select: Vec<String>,
    pub where_raw: Vec<RawPredicate>,
    pub group: Vec<String>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }
    pub fn select<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.select.extend(columns.into_iter().map(Into::into));
        self
    }
    pub fn where_raw(mut self, predicate: impl Into<RawPredicate>) -> Self {
        self.where_raw.push(predicate.into());
        self
    }
    pub fn group<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.group.extend(columns.into_iter().map(Into::into));
        self
    }
}

/// Everything needed to render a select on one table.
///
/// ```rust
/// use dbhelper_core::{Condition, GenericSqlWriter, QuerySpec, Value};
/// let statement = QuerySpec::new("t_user")
///     .filter(Condition::and([Condition::eq("k1", "v1"), Condition::like("name", "eva")]))
///     .order("id desc")
///     .limit(10)
///     .build(&GenericSqlWriter::new())
///     .unwrap();
/// assert_eq!(
///     statement.sql,
///     "SELECT *\nFROM t_user\nWHERE k1 = ? AND name LIKE ?\nORDER BY id desc\nLIMIT 10"
/// );
/// assert_eq!(statement.params, [Value::from("v1"), Value::from("%eva%")]);
/// ```
#[derive(Default, Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub table: String,
    pub joins: Vec<Join>,
    pub select: Vec<String>,
    pub conditions: Option<Condition>,
    pub raw_predicates: Vec<RawPredicate>,
    pub group_by: Vec<String>,
    pub order: Option<String>,
    /// Maximum number of rows, zero means unlimited.
    pub limit: i64,
    /// Rows to skip, zero means none.
    pub offset: i64,
}

impl QuerySpec {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    /// Set the condition, `None` leaves the select unfiltered.
    pub fn filter(mut self, condition: impl Into<Option<Condition>>) -> Self {
        self.conditions = condition.into();
        self
    }

    pub fn options(mut self, options: QueryOptions) -> Self {
        self.joins.extend(options.joins);
        self.select.extend(options.select);
        self.raw_predicates.extend(options.where_raw);
        self.group_by.extend(options.group);
        self
    }

    /// Empty strings are ignored.
    pub fn order(mut self, order: impl Into<String>) -> Self {
        let order = order.into();
        self.order = (!order.is_empty()).then_some(order);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    /// Check the parts that cannot be rendered.
    pub fn validate(&self) -> Result<()> {
        if self.table.trim().is_empty() {
            return Err(Error::new(DbError::InvalidArgument(
                "The table name is empty".into(),
            )));
        }
        if self.limit < 0 {
            return Err(Error::new(DbError::InvalidArgument(format!(
                "The limit must not be negative, got {}",
                self.limit
            ))));
        }
        if self.offset < 0 {
            return Err(Error::new(DbError::InvalidArgument(format!(
                "The offset must not be negative, got {}",
                self.offset
            ))));
        }
        if self
            .conditions
            .as_ref()
            .is_some_and(Condition::has_empty_group)
        {
            return Err(Error::new(DbError::EmptyGroup(format!(
                "in the condition on `{}`",
                self.table
            ))));
        }
        Ok(())
    }

    fn render(
        &self,
        writer: &dyn SqlWriter,
        write: impl FnOnce(&dyn SqlWriter, &mut WriteContext, &mut String),
    ) -> Result<Statement> {
        self.validate()?;
        let mut context = WriteContext::placeholders();
        let mut sql = String::new();
        write(writer, &mut context, &mut sql);
        Ok(Statement::new(sql, context.into_params()))
    }

    /// Render the select with `?` placeholders.
    pub fn build(&self, writer: &dyn SqlWriter) -> Result<Statement> {
        self.render(writer, |w, c, out| w.write_select(c, out, self))
    }

    /// Render the count of the matching rows, order and limit are ignored.
    pub fn build_count(&self, writer: &dyn SqlWriter) -> Result<Statement> {
        self.render(writer, |w, c, out| w.write_count(c, out, self))
    }

    /// Render the sum of `column` over the matching rows.
    pub fn build_sum(&self, writer: &dyn SqlWriter, column: &str) -> Result<Statement> {
        if column.trim().is_empty() {
            return Err(Error::new(DbError::InvalidArgument(
                "The column to sum is empty".into(),
            )));
        }
        self.render(writer, |w, c, out| w.write_sum(c, out, self, column))
    }
}

impl Display for QuerySpec {
    /// The select with the values inlined, for logs.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut context = WriteContext::inline();
        let mut out = String::with_capacity(128);
        GenericSqlWriter::new().write_select(&mut context, &mut out, self);
        f.write_str(&out)
    }
}
