#[cfg(test)]
mod tests {
    use dbhelper_core::{
        Condition, Driver, QuerySpec, Record, SqlWriter, Value, WriteContext, filters,
        AsCondition,
    };
    use dbhelper_mysql::{MySQLDriver, MySQLSqlWriter};
    use indoc::indoc;

    const WRITER: MySQLSqlWriter = MySQLSqlWriter {};

    fn render(write: impl FnOnce(&mut WriteContext, &mut String)) -> (String, Vec<Value>) {
        let mut context = WriteContext::placeholders();
        let mut sql = String::new();
        write(&mut context, &mut sql);
        (sql, context.into_params())
    }

    fn literal(value: impl Into<Value>) -> String {
        let mut out = String::new();
        WRITER.write_value(&mut WriteContext::inline(), &mut out, &value.into());
        out
    }

    #[test]
    fn driver() {
        assert_eq!(MySQLDriver::NAME, "mysql");
        let mut out = String::new();
        MySQLDriver::new()
            .sql_writer()
            .write_transaction_begin(&mut out);
        assert_eq!(out, "START TRANSACTION");
    }

    #[test]
    fn literals() {
        assert_eq!(literal("a\\b'c"), "'a\\\\b''c'");
        assert_eq!(literal(Value::Blob(Box::new([0xca, 0xfe]))), "X'CAFE'");
        assert_eq!(literal(f64::NEG_INFINITY), "-1.0e+10000");
        assert_eq!(literal(false), "false");
    }

    #[test]
    fn select() {
        let filters = filters! { "name lk" => "eva", "OR" => { "age" => 30, "vip" => true } };
        let spec = QuerySpec::new("t_user")
            .filter(filters.as_condition().unwrap())
            .order("id desc")
            .offset(10);
        let statement = spec.build(&WRITER).unwrap();
        assert_eq!(
            statement.sql,
            indoc! {"
                SELECT *
                FROM t_user
                WHERE name LIKE ? AND (age = ? OR vip = ?)
                ORDER BY id desc
                LIMIT 18446744073709551615
                OFFSET 10
            "}
            .trim()
        );
        assert_eq!(statement.params.len(), 3);
    }

    #[test]
    fn insert_ignore_and_upsert() {
        let record = Record::new().set("id", 1).set("name", "eva");
        let (sql, params) =
            render(|c, out| WRITER.write_insert_ignore(c, out, "t_user", std::slice::from_ref(&record)));
        assert_eq!(
            sql,
            indoc! {"
                INSERT IGNORE INTO t_user (`id`, `name`) VALUES
                (?, ?)
            "}
            .trim()
        );
        assert_eq!(params.len(), 2);

        let assignments = Record::new().set("name", "eva").set("odd`col", 2);
        let (sql, params) =
            render(|c, out| WRITER.write_upsert(c, out, "t_user", &record, &assignments, "id"));
        assert_eq!(
            sql,
            indoc! {"
                INSERT INTO t_user (`id`, `name`) VALUES
                (?, ?)
                ON DUPLICATE KEY UPDATE
                `name` = ?,
                `odd``col` = ?
            "}
            .trim()
        );
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn update_with_limit() {
        let (sql, _) = render(|c, out| {
            WRITER.write_update(
                c,
                out,
                "t_user",
                &Record::new().set("deleted", 9u64),
                &Condition::eq("id", 9u64),
                1,
            )
        });
        assert_eq!(sql, "UPDATE t_user SET\n`deleted` = ?\nWHERE id = ?\nLIMIT 1");
    }
}
