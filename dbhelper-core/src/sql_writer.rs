use crate::{
    Condition, Join, Operator, QuerySpec, RawPredicate, Record, Value, possibly_parenthesized,
    separated_by,
};
use std::fmt::Write;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

macro_rules! write_integer {
    ($out:ident, $value:expr) => {{
        let mut buffer = itoa::Buffer::new();
        $out.push_str(buffer.format($value));
    }};
}
macro_rules! write_float {
    ($this:ident, $context:ident, $out:ident, $value:expr) => {{
        if $value.is_infinite() {
            $this.write_value_infinity($context, $out, $value.is_sign_negative());
        } else if $value.is_nan() {
            $this.write_value_nan($context, $out);
        } else {
            let mut buffer = ryu::Buffer::new();
            $out.push_str(buffer.format($value));
        }
    }};
}

/// State threaded through a single rendering.
///
/// In placeholder mode every value becomes a `?` and is appended to `params` in
/// textual order. In inline mode values are written as escaped literals, this is
/// what `Display` implementations and debugging output use.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct WriteContext {
    pub inline: bool,
    pub params: Vec<Value>,
}

impl WriteContext {
    pub fn placeholders() -> Self {
        Self {
            inline: false,
            params: Vec::new(),
        }
    }
    pub fn inline() -> Self {
        Self {
            inline: true,
            params: Vec::new(),
        }
    }
    pub fn into_params(self) -> Vec<Value> {
        self.params
    }
}

/// Dialect printer converting conditions, records and query specifications into SQL.
pub trait SqlWriter: Send + Sync {
    fn as_dyn(&self) -> &dyn SqlWriter;

    /// Escape occurrences of `search` char with `replace` while copying into buffer.
    fn write_escaped(
        &self,
        _context: &mut WriteContext,
        out: &mut String,
        value: &str,
        search: char,
        replace: &str,
    ) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + c.len_utf8();
            }
        }
        out.push_str(&value[position..]);
    }

    /// Quote identifiers ("name") doubling inner quotes.
    fn write_identifier_quoted(&self, context: &mut WriteContext, out: &mut String, value: &str) {
        out.push('"');
        self.write_escaped(context, out, value, '"', "\"\"");
        out.push('"');
    }

    /// Table names may carry an alias or a schema, they are written as given.
    fn write_table(&self, _context: &mut WriteContext, out: &mut String, table: &str) {
        out.push_str(table);
    }

    /// Render a concrete value (including proper quoting / escaping).
    fn write_value(&self, context: &mut WriteContext, out: &mut String, value: &Value) {
        match value {
            Value::Null => self.write_value_none(context, out),
            Value::Boolean(v) => self.write_value_bool(context, out, *v),
            Value::Int64(v) => write_integer!(out, *v),
            Value::UInt64(v) => write_integer!(out, *v),
            Value::Float64(v) => write_float!(self, context, out, *v),
            Value::Decimal(v) => {
                let _ = write!(out, "{}", v);
            }
            Value::Varchar(v) => self.write_value_string(context, out, v),
            Value::Blob(v) => self.write_value_blob(context, out, v.as_ref()),
            Value::Date(v) => self.write_value_date(context, out, v, false),
            Value::Time(v) => self.write_value_time(context, out, v, false),
            Value::Timestamp(v) => self.write_value_timestamp(context, out, v),
            Value::TimestampWithTimezone(v) => self.write_value_timestamptz(context, out, v),
            Value::Uuid(v) => {
                let _ = write!(out, "'{}'", v);
            }
            Value::List(v) => self.write_value_list(context, out, v),
        }
    }

    /// Render NULL literal.
    fn write_value_none(&self, _context: &mut WriteContext, out: &mut String) {
        out.push_str("NULL");
    }

    /// Render boolean literal.
    fn write_value_bool(&self, _context: &mut WriteContext, out: &mut String, value: bool) {
        out.push_str(["false", "true"][value as usize]);
    }

    fn write_value_infinity(&self, _context: &mut WriteContext, out: &mut String, negative: bool) {
        out.push_str(if negative {
            "CAST('-inf' AS DOUBLE)"
        } else {
            "CAST('inf' AS DOUBLE)"
        });
    }

    fn write_value_nan(&self, _context: &mut WriteContext, out: &mut String) {
        out.push_str("CAST('NaN' AS DOUBLE)");
    }

    /// Render and escape a string literal using single quotes.
    fn write_value_string(&self, context: &mut WriteContext, out: &mut String, value: &str) {
        out.push('\'');
        self.write_escaped(context, out, value, '\'', "''");
        out.push('\'');
    }

    /// Render a blob literal using hex escapes.
    fn write_value_blob(&self, _context: &mut WriteContext, out: &mut String, value: &[u8]) {
        out.push('\'');
        for b in value {
            let _ = write!(out, "\\x{:02X}", b);
        }
        out.push('\'');
    }

    /// Render a DATE literal (optionally as part of TIMESTAMP composition).
    fn write_value_date(
        &self,
        _context: &mut WriteContext,
        out: &mut String,
        value: &Date,
        timestamp: bool,
    ) {
        let b = if timestamp { "" } else { "'" };
        let _ = write!(
            out,
            "{b}{:04}-{:02}-{:02}{b}",
            value.year(),
            value.month() as u8,
            value.day()
        );
    }

    /// Render a TIME literal (optionally as part of TIMESTAMP composition).
    fn write_value_time(
        &self,
        _context: &mut WriteContext,
        out: &mut String,
        value: &Time,
        timestamp: bool,
    ) {
        let b = if timestamp { "" } else { "'" };
        let _ = write!(
            out,
            "{b}{:02}:{:02}:{:02}",
            value.hour(),
            value.minute(),
            value.second(),
        );
        let mut subsecond = value.nanosecond();
        if subsecond != 0 {
            let mut width = 9;
            while subsecond % 10 == 0 {
                subsecond /= 10;
                width -= 1;
            }
            let _ = write!(out, ".{:0width$}", subsecond);
        }
        out.push_str(b);
    }

    /// Render a TIMESTAMP literal.
    fn write_value_timestamp(
        &self,
        context: &mut WriteContext,
        out: &mut String,
        value: &PrimitiveDateTime,
    ) {
        out.push('\'');
        self.write_value_date(context, out, &value.date(), true);
        out.push(' ');
        self.write_value_time(context, out, &value.time(), true);
        out.push('\'');
    }

    /// Render a TIMESTAMPTZ literal, converted to UTC.
    fn write_value_timestamptz(
        &self,
        context: &mut WriteContext,
        out: &mut String,
        value: &OffsetDateTime,
    ) {
        let date_time = value.to_utc();
        self.write_value_timestamp(
            context,
            out,
            &PrimitiveDateTime::new(date_time.date(), date_time.time()),
        );
    }

    /// Render a parenthesized list, the right hand side of `IN`.
    fn write_value_list(&self, context: &mut WriteContext, out: &mut String, value: &[Value]) {
        out.push('(');
        if value.is_empty() {
            self.write_value_none(context, out);
        }
        separated_by(
            out,
            value,
            |out, v| {
                self.write_param(context, out, v);
            },
            ",",
        );
        out.push(')');
    }

    fn write_placeholder(&self, _context: &mut WriteContext, out: &mut String) {
        out.push('?');
    }

    /// Write a bound value: a literal in inline mode, a placeholder otherwise.
    fn write_param(&self, context: &mut WriteContext, out: &mut String, value: &Value) {
        match value {
            Value::List(v) => self.write_value_list(context, out, v),
            _ if context.inline => self.write_value(context, out, value),
            _ => {
                self.write_placeholder(context, out);
                context.params.push(value.clone());
            }
        }
    }

    /// Append a raw SQL fragment whose `?` placeholders are bound to `args` in order.
    ///
    /// A list argument expands into `(?,?,...)`. Arguments left without a `?` are
    /// still bound in placeholder mode, the engine reports the mismatch.
    fn write_raw(&self, context: &mut WriteContext, out: &mut String, sql: &str, args: &[Value]) {
        let mut args = args.iter();
        let mut position = 0;
        for (i, c) in sql.char_indices() {
            if c != '?' {
                continue;
            }
            let Some(arg) = args.next() else {
                break;
            };
            out.push_str(&sql[position..i]);
            self.write_param(context, out, arg);
            position = i + 1;
        }
        out.push_str(&sql[position..]);
        if !context.inline {
            context.params.extend(args.cloned());
        }
    }

    /// Render a predicate tree.
    fn write_condition(&self, context: &mut WriteContext, out: &mut String, value: &Condition) {
        match value {
            Condition::Leaf {
                field,
                operator,
                value,
            } => self.write_condition_leaf(context, out, field, *operator, value),
            Condition::Group {
                children,
                combinator,
            } => {
                if let [child] = children.as_slice() {
                    self.write_condition(context, out, child);
                    return;
                }
                out.push('(');
                separated_by(
                    out,
                    children,
                    |out, v| self.write_condition(context, out, v),
                    &format!(" {} ", combinator.keyword()),
                );
                out.push(')');
            }
            Condition::Not(inner) => {
                out.push_str("NOT ");
                let self_parenthesized = matches!(
                    inner.as_ref(),
                    Condition::Group { children, .. } if children.len() > 1
                );
                possibly_parenthesized!(
                    out,
                    !self_parenthesized,
                    self.write_condition(context, out, inner)
                );
            }
        }
    }

    /// Render one comparison, the operator depends on the shape of the value.
    fn write_condition_leaf(
        &self,
        context: &mut WriteContext,
        out: &mut String,
        field: &str,
        operator: Operator,
        value: &Value,
    ) {
        if matches!((operator, value), (Operator::NotEqualOrNotIn, Value::List(v)) if v.is_empty()) {
            // Nothing is excluded, every row matches
            out.push_str("1 = 1");
            return;
        }
        out.push_str(field);
        match (operator, value) {
            (Operator::Eq, Value::Null) => out.push_str(" IS NULL"),
            (Operator::NotEqualOrNotIn, Value::Null) => out.push_str(" IS NOT NULL"),
            (Operator::Eq | Operator::In, Value::List(v)) => {
                out.push_str(" IN ");
                self.write_value_list(context, out, v);
            }
            (Operator::In, v) => {
                out.push_str(" IN ");
                self.write_value_list(context, out, std::slice::from_ref(v));
            }
            (Operator::NotEqualOrNotIn, Value::List(v)) => {
                out.push_str(" NOT IN ");
                self.write_value_list(context, out, v);
            }
            (operator, v) => {
                out.push_str(match operator {
                    Operator::Like => " LIKE ",
                    Operator::NotEqualOrNotIn => " <> ",
                    _ => " = ",
                });
                self.write_param(context, out, v);
            }
        }
    }

    /// Render a JOIN clause.
    fn write_join(&self, context: &mut WriteContext, out: &mut String, join: &Join) {
        match (&join.table, &join.on) {
            (None, None) => self.write_raw(context, out, &join.kind, &join.args),
            (table, on) => {
                let sql = format!(
                    "{} join {} on {}",
                    join.kind,
                    table.as_deref().unwrap_or_default(),
                    on.as_deref().unwrap_or_default()
                );
                self.write_raw(context, out, &sql, &join.args);
            }
        }
    }

    /// Render the `WHERE` clause, nothing if there is no predicate at all.
    fn write_where(
        &self,
        context: &mut WriteContext,
        out: &mut String,
        condition: Option<&Condition>,
        raw: &[RawPredicate],
    ) {
        let conjuncts = condition.map(Condition::conjuncts).unwrap_or_default();
        if conjuncts.is_empty() && raw.is_empty() {
            return;
        }
        out.push_str("\nWHERE ");
        separated_by(
            out,
            conjuncts,
            |out, v| self.write_condition(context, out, v),
            " AND ",
        );
        let mut separate = !conjuncts.is_empty();
        for predicate in raw {
            if separate {
                out.push_str(" AND ");
            }
            out.push('(');
            self.write_raw(context, out, &predicate.sql, &predicate.args);
            out.push(')');
            separate = true;
        }
    }

    fn write_group_by(&self, _context: &mut WriteContext, out: &mut String, columns: &[String]) {
        if columns.is_empty() {
            return;
        }
        out.push_str("\nGROUP BY ");
        separated_by(out, columns, |out, v| out.push_str(v), ",");
    }

    /// Render `LIMIT` / `OFFSET`, a zero value means the clause is absent.
    fn write_limit_offset(
        &self,
        _context: &mut WriteContext,
        out: &mut String,
        limit: u64,
        offset: u64,
    ) {
        if limit > 0 {
            out.push_str("\nLIMIT ");
            write_integer!(out, limit);
        }
        if offset > 0 {
            out.push_str("\nOFFSET ");
            write_integer!(out, offset);
        }
    }

    /// Everything after the projection: `FROM`, joins, `WHERE` and `GROUP BY`.
    fn write_select_body(&self, context: &mut WriteContext, out: &mut String, spec: &QuerySpec) {
        out.push_str("\nFROM ");
        self.write_table(context, out, &spec.table);
        for join in &spec.joins {
            out.push('\n');
            self.write_join(context, out, join);
        }
        self.write_where(
            context,
            out,
            spec.conditions.as_ref(),
            &spec.raw_predicates,
        );
        self.write_group_by(context, out, &spec.group_by);
    }

    /// Emit SELECT statement (projection, FROM, joins, WHERE, GROUP, ORDER, LIMIT).
    fn write_select(&self, context: &mut WriteContext, out: &mut String, spec: &QuerySpec) {
        out.reserve(128 + spec.select.len() * 16);
        out.push_str("SELECT ");
        if spec.select.is_empty() {
            out.push('*');
        } else {
            separated_by(out, &spec.select, |out, v| out.push_str(v), ",");
        }
        self.write_select_body(context, out, spec);
        if let Some(order) = spec.order.as_deref().filter(|v| !v.is_empty()) {
            out.push_str("\nORDER BY ");
            out.push_str(order);
        }
        self.write_limit_offset(
            context,
            out,
            spec.limit.max(0) as u64,
            spec.offset.max(0) as u64,
        );
    }

    /// Emit the count of the rows matched, grouped queries count the groups.
    fn write_count(&self, context: &mut WriteContext, out: &mut String, spec: &QuerySpec) {
        if spec.group_by.is_empty() {
            out.push_str("SELECT COUNT(*)");
            self.write_select_body(context, out, spec);
            return;
        }
        out.push_str("SELECT COUNT(*) FROM (SELECT ");
        let projection = if spec.select.is_empty() {
            &spec.group_by
        } else {
            &spec.select
        };
        separated_by(out, projection, |out, v| out.push_str(v), ",");
        self.write_select_body(context, out, spec);
        out.push_str("\n) AS grouped");
    }

    /// Emit the sum of `column` over the matched rows as `total`.
    fn write_sum(
        &self,
        context: &mut WriteContext,
        out: &mut String,
        spec: &QuerySpec,
        column: &str,
    ) {
        let _ = write!(out, "SELECT SUM({}) AS total", column);
        self.write_select_body(context, out, spec);
        self.write_limit_offset(context, out, 1, 0);
    }

    /// Emit INSERT with one row per record, all records share the columns of the first one.
    fn write_insert(&self, context: &mut WriteContext, out: &mut String, table: &str, records: &[Record]) {
        let Some(first) = records.first() else {
            return;
        };
        out.reserve(128 + first.len() * 32 * records.len());
        out.push_str("INSERT INTO ");
        self.write_insert_columns(context, out, table, first);
        self.write_insert_values(context, out, records);
    }

    /// Emit INSERT skipping the rows that would violate a unique key.
    fn write_insert_ignore(
        &self,
        context: &mut WriteContext,
        out: &mut String,
        table: &str,
        records: &[Record],
    ) {
        if records.is_empty() {
            return;
        }
        self.write_insert(context, out, table, records);
        out.push_str("\nON CONFLICT DO NOTHING");
    }

    fn write_insert_columns(
        &self,
        context: &mut WriteContext,
        out: &mut String,
        table: &str,
        record: &Record,
    ) {
        self.write_table(context, out, table);
        out.push_str(" (");
        separated_by(
            out,
            record.columns(),
            |out, v| self.write_identifier_quoted(context, out, v),
            ", ",
        );
        out.push_str(") VALUES");
    }

    fn write_insert_values(&self, context: &mut WriteContext, out: &mut String, records: &[Record]) {
        separated_by(
            out,
            records,
            |out, record| {
                out.push_str("\n(");
                separated_by(
                    out,
                    record.values(),
                    |out, v| self.write_param(context, out, v),
                    ", ",
                );
                out.push(')');
            },
            ",",
        );
    }

    /// Emit INSERT that applies `assignments` when the row conflicts on `conflict`.
    fn write_upsert(
        &self,
        context: &mut WriteContext,
        out: &mut String,
        table: &str,
        record: &Record,
        assignments: &Record,
        conflict: &str,
    ) {
        self.write_insert(context, out, table, std::slice::from_ref(record));
        self.write_insert_update_fragment(context, out, assignments, conflict);
    }

    /// Emit ON CONFLICT DO UPDATE fragment for upsert.
    fn write_insert_update_fragment(
        &self,
        context: &mut WriteContext,
        out: &mut String,
        assignments: &Record,
        conflict: &str,
    ) {
        out.push_str("\nON CONFLICT (");
        self.write_identifier_quoted(context, out, conflict);
        out.push_str(") DO UPDATE SET\n");
        self.write_assignments(context, out, assignments, ",\n");
    }

    fn write_assignments(
        &self,
        context: &mut WriteContext,
        out: &mut String,
        assignments: &Record,
        separator: &str,
    ) {
        separated_by(
            out,
            assignments.iter(),
            |out, (column, value)| {
                self.write_identifier_quoted(context, out, column);
                out.push_str(" = ");
                self.write_param(context, out, value);
            },
            separator,
        );
    }

    /// Emit UPDATE statement, `limit` zero means every matching row.
    fn write_update(
        &self,
        context: &mut WriteContext,
        out: &mut String,
        table: &str,
        record: &Record,
        condition: &Condition,
        limit: u64,
    ) {
        out.reserve(128 + record.len() * 32);
        out.push_str("UPDATE ");
        self.write_table(context, out, table);
        out.push_str(" SET\n");
        self.write_assignments(context, out, record, ",\n");
        self.write_where(context, out, Some(condition), &[]);
        self.write_limit_offset(context, out, limit, 0);
    }

    /// Emit DELETE statement with WHERE clause.
    fn write_delete(
        &self,
        context: &mut WriteContext,
        out: &mut String,
        table: &str,
        condition: &Condition,
        limit: u64,
    ) {
        out.reserve(128 + table.len());
        out.push_str("DELETE FROM ");
        self.write_table(context, out, table);
        self.write_where(context, out, Some(condition), &[]);
        self.write_limit_offset(context, out, limit, 0);
    }

    /// Emit BEGIN statement.
    fn write_transaction_begin(&self, out: &mut String) {
        out.push_str("BEGIN");
    }

    /// Emit COMMIT statement.
    fn write_transaction_commit(&self, out: &mut String) {
        out.push_str("COMMIT");
    }

    /// Emit ROLLBACK statement.
    fn write_transaction_rollback(&self, out: &mut String) {
        out.push_str("ROLLBACK");
    }
}

/// Fallback generic SQL writer (closest to PostgreSQL / SQLite conventions).
#[derive(Default, Debug, Clone, Copy)]
pub struct GenericSqlWriter;

impl GenericSqlWriter {
    /// Construct a new generic writer.
    pub fn new() -> Self {
        Self {}
    }
}

impl SqlWriter for GenericSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }
}
