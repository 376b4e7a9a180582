#[cfg(test)]
mod tests {
    use dbhelper_core::{
        AsCondition, Combinator, Condition, DbError, Filter, Filters, GenericSqlWriter, Operator,
        SqlWriter, Value, WriteContext, filters,
    };

    fn placeholders(condition: &Condition) -> (String, Vec<Value>) {
        let mut context = WriteContext::placeholders();
        let mut out = String::new();
        GenericSqlWriter::new().write_condition(&mut context, &mut out, condition);
        (out, context.into_params())
    }

    #[test]
    fn compile_suffixes() {
        let filters = filters! {
            "k1" => "v1",
            "k2 lk" => "v2",
            "k3 ne" => "v3",
            "k4 in" => [1, 2],
            "k5" => ["a", "b"],
            "k6 ne" => vec![7, 8],
        };
        let condition = filters.compile(Combinator::And).unwrap();
        assert_eq!(
            condition.to_string(),
            "(k1 = 'v1' AND k2 LIKE '%v2%' AND k3 <> 'v3' AND k4 IN (1,2) AND k5 IN ('a','b') AND k6 NOT IN (7,8))"
        );
        let (sql, params) = placeholders(&condition);
        assert_eq!(
            sql,
            "(k1 = ? AND k2 LIKE ? AND k3 <> ? AND k4 IN (?,?) AND k5 IN (?,?) AND k6 NOT IN (?,?))"
        );
        assert_eq!(
            params,
            [
                Value::from("v1"),
                Value::from("%v2%"),
                Value::from("v3"),
                Value::from(1),
                Value::from(2),
                Value::from("a"),
                Value::from("b"),
                Value::from(7),
                Value::from(8),
            ]
        );
    }

    #[test]
    fn compile_nested() {
        let filters = filters! {
            "k1" => "v1",
            "OR" => {
                "k2 lk" => "v2",
                "k3" => "v3",
            },
        };
        assert_eq!(
            filters.compile(Combinator::And).unwrap().to_string(),
            "(k1 = 'v1' AND (k2 LIKE '%v2%' OR k3 = 'v3'))"
        );

        let filters = filters! {
            "OR1" => { "a" => 1, "b" => 2 },
            "OR2" => { "c" => 3, "AND" => { "d" => 4, "e ne" => 5 } },
        };
        let condition = filters.compile(Combinator::And).unwrap();
        assert_eq!(
            condition.to_string(),
            "((a = 1 OR b = 2) AND (c = 3 OR (d = 4 AND e <> 5)))"
        );
        let (sql, params) = placeholders(&condition);
        assert_eq!(sql, "((a = ? OR b = ?) AND (c = ? OR (d = ? AND e <> ?)))");
        assert_eq!(params.len(), 5);

        let filters = filters! { "ORDER_ID" => 10, "ANDROID" => true };
        assert_eq!(
            filters.compile(Combinator::Or).unwrap().to_string(),
            "(ORDER_ID = 10 OR ANDROID = true)"
        );
    }

    #[test]
    fn compile_keeps_insertion_order() {
        let filters = Filters::from_iter([("z", 1), ("a", 2), ("m", 3)]);
        assert_eq!(
            filters.compile(Combinator::And).unwrap().to_string(),
            "(z = 1 AND a = 2 AND m = 3)"
        );
        let mut filters = Filters::new().with("z", 1);
        filters.push("a", 2).extend([("m", 3)]);
        assert_eq!(filters.len(), 3);
        assert_eq!(
            filters.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>(),
            ["z", "a", "m"]
        );
    }

    #[test]
    fn compile_nulls_and_empty_lists() {
        let filters = filters! {
            "deleted_at" => Value::Null,
            "archived_at ne" => Value::Null,
            "id in" => Vec::<i64>::new(),
            "tag ne" => Vec::<&str>::new(),
        };
        let condition = filters.compile(Combinator::And).unwrap();
        assert_eq!(
            condition.to_string(),
            "(deleted_at IS NULL AND archived_at IS NOT NULL AND id IN (NULL) AND 1 = 1)"
        );
        let (_, params) = placeholders(&condition);
        assert!(params.is_empty());
    }

    #[test]
    fn empty_exclusion_matches_everything() {
        assert_eq!(
            Condition::ne("tag", Value::List(vec![])).to_string(),
            "1 = 1"
        );
        assert_eq!(
            Condition::not(Condition::ne("tag", Value::List(vec![]))).to_string(),
            "NOT (1 = 1)"
        );
        assert_eq!(
            Condition::is_in("tag", Vec::<&str>::new()).to_string(),
            "tag IN (NULL)"
        );
    }

    #[test]
    fn compile_single_entry() {
        let condition = filters! { "k1" => "v1" }.compile(Combinator::And).unwrap();
        assert_eq!(condition.to_string(), "k1 = 'v1'");
        assert_eq!(condition.conjuncts().len(), 1);
    }

    #[test]
    fn compile_errors() {
        let error = Filters::new().compile(Combinator::And).unwrap_err();
        assert!(matches!(DbError::of(&error), Some(DbError::EmptyGroup(..))));

        let error = Filters::new()
            .with("k1", "v1")
            .nested("OR", Filters::new())
            .compile(Combinator::And)
            .unwrap_err();
        assert!(matches!(DbError::of(&error), Some(DbError::EmptyGroup(..))));
        assert!(format!("{:#}", error).contains("While compiling the nested condition `OR`"));

        let error = filters! { "name lk" => 3 }.compile(Combinator::And).unwrap_err();
        assert_eq!(
            DbError::of(&error),
            Some(&DbError::TypeMismatch {
                field: "name".into(),
                expected: "a string",
                found: "BIGINT".into(),
            })
        );

        let error = filters! { "id in" => 3 }.compile(Combinator::And).unwrap_err();
        assert!(matches!(
            DbError::of(&error),
            Some(DbError::TypeMismatch { field, .. }) if field == "id"
        ));

        let error = filters! { "profile" => { "a" => 1 } }
            .compile(Combinator::And)
            .unwrap_err();
        assert!(matches!(
            DbError::of(&error),
            Some(DbError::TypeMismatch { field, .. }) if field == "profile"
        ));

        let error = filters! { "OR" => { "a lk" => ["x"] } }
            .compile(Combinator::And)
            .unwrap_err();
        assert!(matches!(DbError::of(&error), Some(DbError::TypeMismatch { .. })));
    }

    #[test]
    fn as_condition() {
        assert_eq!(Filters::new().as_condition().unwrap(), None);
        assert!(filters! { "a" => 1 }.as_condition().unwrap().is_some());
        assert_eq!(
            Condition::eq("a", 1).as_condition().unwrap(),
            Some(Condition::eq("a", 1))
        );
        assert_eq!(Option::<Condition>::None.as_condition().unwrap(), None);
        let filters = filters! { "a lk" => 1 };
        assert!((&filters).as_condition().is_err());
    }

    #[test]
    fn typed_conditions() {
        let condition = Condition::and([
            Condition::eq("status", 1),
            Condition::not(Condition::or([
                Condition::like_pattern("name", "eva%"),
                Condition::is_in("role", ["admin", "root"]),
            ])),
            Condition::not(Condition::ne("age", Value::Null)),
            Condition::leaf("kind", Operator::In, "single"),
        ]);
        assert_eq!(
            condition.to_string(),
            "(status = 1 AND NOT (name LIKE 'eva%' OR role IN ('admin','root')) AND NOT (age IS NOT NULL) AND kind IN ('single'))"
        );
        assert_eq!(condition.conjuncts().len(), 4);
        assert!(!condition.has_empty_group());
        assert!(Condition::and([Condition::not(Condition::or(Vec::new()))]).has_empty_group());
    }

    #[test]
    fn string_escaping() {
        let condition = Condition::eq("name", "O'Hara");
        assert_eq!(condition.to_string(), "name = 'O''Hara'");
        let condition = Condition::like("name", "it's");
        assert_eq!(condition.to_string(), "name LIKE '%it''s%'");
    }

    #[test]
    fn filter_entries() {
        let filters = Filters::new().with("a", 1).nested("OR", filters! { "b" => 2 });
        let entries = filters.iter().collect::<Vec<_>>();
        assert_eq!(entries[0].1, Filter::Value(Value::Int64(1)));
        assert!(matches!(entries[1].1, Filter::Nested(..)));
    }
}
