use dbhelper_core::{Record, SqlWriter, WriteContext};
use std::fmt::Write;

/// MySQL dialect: backtick identifiers, `INSERT IGNORE`, `ON DUPLICATE KEY UPDATE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySQLSqlWriter {}

impl SqlWriter for MySQLSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }

    fn write_identifier_quoted(&self, context: &mut WriteContext, out: &mut String, value: &str) {
        out.push('`');
        self.write_escaped(context, out, value, '`', "``");
        out.push('`');
    }

    fn write_value_infinity(&self, _context: &mut WriteContext, out: &mut String, negative: bool) {
        if negative {
            out.push('-');
        }
        out.push_str("1.0e+10000");
    }

    /// Backslash is an escape character in MySQL string literals.
    fn write_value_string(&self, _context: &mut WriteContext, out: &mut String, value: &str) {
        out.push('\'');
        for c in value.chars() {
            match c {
                '\'' => out.push_str("''"),
                '\\' => out.push_str("\\\\"),
                c => out.push(c),
            }
        }
        out.push('\'');
    }

    fn write_value_blob(&self, _context: &mut WriteContext, out: &mut String, value: &[u8]) {
        out.push_str("X'");
        for b in value {
            let _ = write!(out, "{:02X}", b);
        }
        out.push('\'');
    }

    /// MySQL has no `OFFSET` without `LIMIT`, the largest limit stands for unlimited.
    fn write_limit_offset(
        &self,
        _context: &mut WriteContext,
        out: &mut String,
        limit: u64,
        offset: u64,
    ) {
        if limit > 0 {
            let _ = write!(out, "\nLIMIT {}", limit);
        } else if offset > 0 {
            let _ = write!(out, "\nLIMIT {}", u64::MAX);
        }
        if offset > 0 {
            let _ = write!(out, "\nOFFSET {}", offset);
        }
    }

    fn write_insert_ignore(
        &self,
        context: &mut WriteContext,
        out: &mut String,
        table: &str,
        records: &[Record],
    ) {
        let Some(first) = records.first() else {
            return;
        };
        out.push_str("INSERT IGNORE INTO ");
        self.write_insert_columns(context, out, table, first);
        self.write_insert_values(context, out, records);
    }

    fn write_insert_update_fragment(
        &self,
        context: &mut WriteContext,
        out: &mut String,
        assignments: &Record,
        _conflict: &str,
    ) {
        out.push_str("\nON DUPLICATE KEY UPDATE\n");
        self.write_assignments(context, out, assignments, ",\n");
    }

    fn write_transaction_begin(&self, out: &mut String) {
        out.push_str("START TRANSACTION");
    }
}
