//! Record-set variable behavior: shape fixing, keyed access, transactions.

use stash_tests::prelude::*;

mod row_lifecycle {
    use super::*;

    #[test]
    fn test_insert_select_update_delete() {
        let mut store = Store::new();
        let desc = person_desc();
        store
            .insert_record("pkg", "people", &desc, person(1, "ada"), VariableKind::Regular)
            .unwrap();
        store
            .insert_record("pkg", "people", &desc, person(2, "bob"), VariableKind::Regular)
            .unwrap();

        assert_eq!(
            store.select_by_key("pkg", "people", &Value::Int(1)),
            Ok(Some(&person(1, "ada")))
        );

        assert_eq!(
            store.update_record("pkg", "people", &desc, person(2, "beth")),
            Ok(true)
        );
        assert_eq!(
            store.update_record("pkg", "people", &desc, person(9, "nobody")),
            Ok(false)
        );

        assert_eq!(store.delete_record("pkg", "people", &Value::Int(1)), Ok(true));
        assert_eq!(store.delete_record("pkg", "people", &Value::Int(1)), Ok(false));
        assert_eq!(store.select_all("pkg", "people").unwrap().count(), 1);
    }

    #[test]
    fn test_insert_with_existing_key_replaces_the_row() {
        let mut store = Store::new();
        let desc = person_desc();
        store
            .insert_record("pkg", "people", &desc, person(1, "ada"), VariableKind::Regular)
            .unwrap();
        store
            .insert_record("pkg", "people", &desc, person(1, "adele"), VariableKind::Regular)
            .unwrap();

        assert_eq!(store.select_all("pkg", "people").unwrap().count(), 1);
        assert_eq!(
            store.select_by_key("pkg", "people", &Value::Int(1)),
            Ok(Some(&person(1, "adele")))
        );
    }

    #[test]
    fn test_shape_is_fixed_by_the_first_insert() {
        let mut store = Store::new();
        store
            .insert_record(
                "pkg",
                "people",
                &person_desc(),
                person(1, "ada"),
                VariableKind::Regular,
            )
            .unwrap();

        let narrow = RowDescriptor::new(vec![ColumnDef::new("id", ValueType::Int)]);
        assert_eq!(
            store.insert_record("pkg", "people", &narrow, vec![Value::Int(2)], VariableKind::Regular),
            Err(StoreError::Record(RecordError::ShapeMismatch))
        );
        // The failed insert left nothing behind.
        assert_eq!(store.select_all("pkg", "people").unwrap().count(), 1);
    }

    #[test]
    fn test_declared_but_empty_record_set() {
        let mut store = Store::new();
        store
            .declare_record("pkg", "people", VariableKind::Regular)
            .unwrap();
        assert!(store.variable_exists("pkg", "people"));
        assert_eq!(store.select_all("pkg", "people").unwrap().count(), 0);
        assert_eq!(store.select_by_key("pkg", "people", &Value::Int(1)), Ok(None));
    }

    #[test]
    fn test_null_key_identifies_a_row() {
        let mut store = Store::new();
        let desc = person_desc();
        store
            .insert_record(
                "pkg",
                "people",
                &desc,
                vec![Value::Null, Value::String("anon".into())],
                VariableKind::Regular,
            )
            .unwrap();

        assert!(store
            .select_by_key("pkg", "people", &Value::Null)
            .unwrap()
            .is_some());
        assert_eq!(store.delete_record("pkg", "people", &Value::Null), Ok(true));
    }
}

mod keyed_lookup {
    use super::*;

    fn populated() -> Store {
        let mut store = Store::new();
        let desc = person_desc();
        for (id, name) in [(1, "ada"), (2, "bob"), (3, "cyd")] {
            store
                .insert_record("pkg", "people", &desc, person(id, name), VariableKind::Regular)
                .unwrap();
        }
        store
    }

    #[test]
    fn test_select_by_keys_preserves_key_order_and_skips_misses() {
        let store = populated();
        let keys = vec![Value::Int(3), Value::Int(99), Value::Int(1)];
        let rows: Vec<_> = store.select_by_keys("pkg", "people", &keys).unwrap().collect();
        assert_eq!(rows, vec![&person(3, "cyd"), &person(1, "ada")]);
    }

    #[test]
    fn test_key_type_must_match_the_key_column() {
        let store = populated();
        assert_eq!(
            store.select_by_key("pkg", "people", &Value::String("1".into())),
            Err(StoreError::Record(RecordError::KeyTypeMismatch {
                expected: ValueType::Int,
                actual: ValueType::String,
            }))
        );
    }

    #[test]
    fn test_list_valued_keys_are_rejected() {
        let store = populated();
        let keys = vec![Value::List(vec![Value::Int(1), Value::Int(2)])];
        assert_eq!(
            store.select_by_keys("pkg", "people", &keys).err(),
            Some(StoreError::Record(RecordError::UnsupportedDimensionality))
        );
    }

    #[test]
    fn test_lookup_on_missing_objects_is_strict() {
        let store = populated();
        assert_eq!(
            store.select_by_key("nope", "people", &Value::Int(1)),
            Err(StoreError::UnknownPackage { name: "nope".into() })
        );
        assert_eq!(
            store.select_by_key("pkg", "nope", &Value::Int(1)),
            Err(StoreError::UnknownVariable { name: "nope".into() })
        );
    }
}

mod transactional_records {
    use super::*;

    #[test]
    fn test_rollback_restores_the_row_set() {
        // GIVEN a transactional record set with one row
        let mut store = Store::new();
        let desc = person_desc();
        store
            .insert_record(
                "pkg",
                "people",
                &desc,
                person(1, "ada"),
                VariableKind::Transactional,
            )
            .unwrap();

        // WHEN a subtransaction rewrites the set and aborts
        store.begin_subtransaction();
        store
            .insert_record(
                "pkg",
                "people",
                &desc,
                person(2, "bob"),
                VariableKind::Transactional,
            )
            .unwrap();
        store.delete_record("pkg", "people", &Value::Int(1)).unwrap();
        assert_eq!(store.select_all("pkg", "people").unwrap().count(), 1);
        store.rollback_subtransaction().unwrap();

        // THEN the original single row is back
        let rows: Vec<_> = store.select_all("pkg", "people").unwrap().collect();
        assert_eq!(rows, vec![&person(1, "ada")]);
    }

    #[test]
    fn test_committed_changes_carry_into_the_parent() {
        let mut store = Store::new();
        let desc = person_desc();
        store
            .insert_record(
                "pkg",
                "people",
                &desc,
                person(1, "ada"),
                VariableKind::Transactional,
            )
            .unwrap();
        store.begin_subtransaction();
        store
            .update_record("pkg", "people", &desc, person(1, "adele"))
            .unwrap();
        store.commit_subtransaction().unwrap();
        store.commit();

        assert_eq!(
            store.select_by_key("pkg", "people", &Value::Int(1)),
            Ok(Some(&person(1, "adele")))
        );
    }

    #[test]
    fn test_redeclared_record_variable_starts_empty() {
        let mut store = Store::new();
        store
            .insert_record(
                "pkg",
                "r",
                &person_desc(),
                person(1, "ada"),
                VariableKind::Transactional,
            )
            .unwrap();
        store.remove_variable("pkg", "r").unwrap();
        store
            .declare_record("pkg", "r", VariableKind::Transactional)
            .unwrap();

        assert_eq!(store.select_all("pkg", "r").unwrap().count(), 0);
    }

    #[test]
    fn test_scalar_access_to_a_record_variable_fails() {
        let mut store = Store::new();
        store
            .declare_record("pkg", "people", VariableKind::Regular)
            .unwrap();
        assert_eq!(
            store.get_scalar("pkg", "people", ValueType::Int, true),
            Err(StoreError::KindMismatch {
                name: "people".into(),
                expected: "scalar",
                actual: "record",
            })
        );
        assert_eq!(
            store.select_all("pkg", "missing").map(|_| ()),
            Err(StoreError::UnknownVariable {
                name: "missing".into()
            })
        );
    }
}
