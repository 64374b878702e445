//! Unit tests for the logical schema model, DDL import and dependency ordering.

use merise::error::{MissingTarget, SchemaError};
use merise::schema::{
    default_fk_name, dependency_order, parse_ddl, split_statements, Column, DatabaseSchema,
    ForeignKey, SchemaGraph, Table, TableId,
};

fn table_with_id(name: &str) -> Table {
    Table::new(name).with_column(Column::new("id", "INT").with_primary_key().with_not_null())
}

fn fk_table(name: &str, column: &str, target: &str) -> Table {
    table_with_id(name)
        .with_column(Column::new(column, "INT"))
        .with_foreign_key(ForeignKey::new(
            default_fk_name(name, column),
            column,
            target,
            "id",
        ))
}

mod model_tests {
    use super::*;

    #[test]
    fn test_blank_name_falls_back_to_default() {
        assert_eq!(DatabaseSchema::new("").name(), "db");
        assert_eq!(DatabaseSchema::new("   ").name(), "db");
        assert_eq!(DatabaseSchema::new("shop").name(), "shop");
    }

    #[test]
    fn test_add_table_last_write_wins_in_place() {
        let mut schema = DatabaseSchema::new("shop");
        schema.add_table(table_with_id("users"));
        schema.add_table(table_with_id("orders"));

        let replaced = table_with_id("users").with_column(Column::new("email", "TEXT"));
        let id = schema.add_table(replaced);

        assert_eq!(id, TableId(0));
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.table_names().collect::<Vec<_>>(), vec!["users", "orders"]);
        assert!(schema.get_table("users").unwrap().has_column("email"));
    }

    #[test]
    fn test_remove_absent_table_is_noop() {
        let mut schema = DatabaseSchema::new("shop");
        schema.add_table(table_with_id("users"));

        assert!(schema.remove_table("ghosts").is_none());
        assert_eq!(schema.len(), 1);
        assert!(schema.remove_table("users").is_some());
        assert!(schema.is_empty());
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let mut schema = DatabaseSchema::new("shop");
        schema.add_table(table_with_id("users"));

        assert!(schema.contains_table("users"));
        assert!(!schema.contains_table("USERS"));
        assert_eq!(schema.get_table_id("users"), Some(TableId(0)));
        assert_eq!(schema.table(TableId(0)).unwrap().name, "users");
    }

    #[test]
    fn test_remove_column_drops_its_foreign_keys() {
        let mut table = fk_table("orders", "user_id", "users");
        assert!(table.is_foreign_key_column("user_id"));

        let removed = table.remove_column("user_id").unwrap();
        assert_eq!(removed.name, "user_id");
        assert!(table.foreign_keys.is_empty());
    }

    #[test]
    fn test_foreign_keys_for_column() {
        let table = fk_table("orders", "user_id", "users")
            .with_column(Column::new("coupon_id", "INT"))
            .with_foreign_key(ForeignKey::new("fk_orders_coupon", "coupon_id", "coupons", "id"));

        let names: Vec<_> = table
            .foreign_keys_for("coupon_id")
            .map(|fk| fk.name.as_str())
            .collect();
        assert_eq!(names, vec!["fk_orders_coupon"]);
        assert!(!table.is_foreign_key_column("id"));
    }

    #[test]
    fn test_remove_foreign_key_by_name() {
        let mut table = fk_table("orders", "user_id", "users");
        let removed = table.remove_foreign_key("fk_orders_user_id");

        assert_eq!(removed.len(), 1);
        assert!(table.foreign_keys.is_empty());
        assert!(table.has_column("user_id"));
    }

    #[test]
    fn test_nullable_flags() {
        assert!(Column::new("a", "INT").is_nullable());
        assert!(!Column::new("a", "INT").with_not_null().is_nullable());
        assert!(!Column::new("a", "INT").with_primary_key().is_nullable());
    }

    #[test]
    fn test_rename_table_rewrites_references() {
        let mut schema = DatabaseSchema::new("shop");
        schema.add_table(table_with_id("users"));
        schema.add_table(fk_table("orders", "user_id", "users"));

        assert!(schema.rename_table("users", "customers"));
        assert_eq!(
            schema.table_names().collect::<Vec<_>>(),
            vec!["customers", "orders"]
        );
        let fk = &schema.get_table("orders").unwrap().foreign_keys[0];
        assert_eq!(fk.referenced_table, "customers");
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_rename_table_refuses_taken_name() {
        let mut schema = DatabaseSchema::new("shop");
        schema.add_table(table_with_id("users"));
        schema.add_table(table_with_id("orders"));

        assert!(!schema.rename_table("users", "orders"));
        assert!(!schema.rename_table("ghosts", "spirits"));
        assert!(schema.contains_table("users"));
    }

    #[test]
    fn test_rename_column_rewrites_both_ends() {
        let mut schema = DatabaseSchema::new("shop");
        schema.add_table(table_with_id("users"));
        schema.add_table(fk_table("orders", "user_id", "users"));

        assert!(schema.rename_column("users", "id", "user_pk"));
        assert!(schema.rename_column("orders", "user_id", "buyer_id"));

        let fk = &schema.get_table("orders").unwrap().foreign_keys[0];
        assert_eq!(fk.column, "buyer_id");
        assert_eq!(fk.referenced_column, "user_pk");
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_unresolved_references_tolerated_until_asked() {
        let mut schema = DatabaseSchema::new("shop");
        schema.add_table(fk_table("orders", "user_id", "users"));
        schema.add_table(
            table_with_id("items")
                .with_foreign_key(ForeignKey::new("fk_items_order", "order_id", "orders", "id")),
        );

        let dangling = schema.unresolved_references();
        assert_eq!(dangling.len(), 2);
        assert_eq!(dangling[0].table, "orders");
        assert_eq!(dangling[0].missing, MissingTarget::Table);
        assert_eq!(dangling[1].table, "items");
        assert_eq!(dangling[1].missing, MissingTarget::LocalColumn);

        schema.add_table(table_with_id("users"));
        assert_eq!(schema.unresolved_references().len(), 1);
    }

    #[test]
    fn test_missing_referenced_column() {
        let mut schema = DatabaseSchema::new("shop");
        schema.add_table(Table::new("users").with_column(Column::new("email", "TEXT")));
        schema.add_table(fk_table("orders", "user_id", "users"));

        match schema.validate() {
            Err(SchemaError::DanglingForeignKey {
                table,
                referenced_table,
                missing,
                ..
            }) => {
                assert_eq!(table, "orders");
                assert_eq!(referenced_table, "users");
                assert_eq!(missing, MissingTarget::Column);
            }
            other => panic!("expected DanglingForeignKey, got {:?}", other),
        }
    }

    #[test]
    fn test_clear_resets_name() {
        let mut schema = DatabaseSchema::new("shop");
        schema.add_table(table_with_id("users"));
        schema.clear();

        assert!(schema.is_empty());
        assert_eq!(schema.name(), DatabaseSchema::DEFAULT_NAME);
    }
}

mod ddl_tests {
    use super::*;

    const SHOP: &str = r#"
-- shop schema
USE shop;

CREATE TABLE `users` (
  `id` INT UNSIGNED NOT NULL AUTO_INCREMENT,
  `email` VARCHAR(255) NOT NULL UNIQUE,
  `note` TEXT DEFAULT 'UNIQUE; not really',
  PRIMARY KEY (`id`)
);

CREATE TABLE orders (
  id INT PRIMARY KEY,
  user_id INT UNSIGNED NOT NULL,
  total DECIMAL(10,2),
  CONSTRAINT fk_orders_user FOREIGN KEY (user_id) REFERENCES users (id)
);

/* line items */
CREATE TABLE order_items (
  order_id INT REFERENCES orders(id),
  line_no INT,
  PRIMARY KEY (order_id, line_no)
);

INSERT INTO users VALUES (1, 'a@example.com', NULL);
"#;

    #[test]
    fn test_split_statements_ignores_quoted_semicolons() {
        let stmts = split_statements("SELECT 'a;b'; -- c;\nSELECT 2;");
        assert_eq!(stmts, vec!["SELECT 'a;b'", "SELECT 2"]);
    }

    #[test]
    fn test_parse_ddl_tables_in_order() {
        let schema = parse_ddl(SHOP);

        assert_eq!(schema.name(), "shop");
        assert_eq!(
            schema.table_names().collect::<Vec<_>>(),
            vec!["users", "orders", "order_items"]
        );
    }

    #[test]
    fn test_parse_ddl_column_flags() {
        let schema = parse_ddl(SHOP);
        let users = schema.get_table("users").unwrap();

        let id = users.get_column("id").unwrap();
        assert_eq!(id.col_type, "INT UNSIGNED");
        assert!(id.primary_key);
        assert!(id.not_null);
        assert!(id.auto_increment);

        let email = users.get_column("email").unwrap();
        assert_eq!(email.col_type, "VARCHAR(255)");
        assert!(email.not_null);
        assert!(email.unique);

        let note = users.get_column("note").unwrap();
        assert!(!note.unique);

        let orders = schema.get_table("orders").unwrap();
        assert_eq!(orders.get_column("total").unwrap().col_type, "DECIMAL(10,2)");
        assert!(orders.get_column("id").unwrap().primary_key);
    }

    #[test]
    fn test_parse_ddl_foreign_keys() {
        let schema = parse_ddl(SHOP);

        let orders = schema.get_table("orders").unwrap();
        assert_eq!(
            orders.foreign_keys,
            vec![ForeignKey::new("fk_orders_user", "user_id", "users", "id")]
        );

        let items = schema.get_table("order_items").unwrap();
        assert_eq!(items.foreign_keys.len(), 1);
        assert_eq!(items.foreign_keys[0].name, "fk_order_items_order_id");
        assert_eq!(items.foreign_keys[0].referenced_table, "orders");

        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_parse_ddl_composite_primary_key() {
        let schema = parse_ddl(SHOP);
        let items = schema.get_table("order_items").unwrap();
        let pk: Vec<_> = items.primary_key().iter().map(|c| c.name.as_str()).collect();

        assert_eq!(pk, vec!["order_id", "line_no"]);
        assert!(items.get_column("line_no").unwrap().not_null);
    }

    #[test]
    fn test_constraint_column_names_are_case_sensitive() {
        let schema = parse_ddl(
            "CREATE TABLE t (id INT, parent INT, PRIMARY KEY (ID), FOREIGN KEY (PARENT) REFERENCES t (id));",
        );
        let t = schema.get_table("t").unwrap();

        assert!(t.primary_key().is_empty());
        assert!(!t.get_column("id").unwrap().not_null);

        let dangling = schema.unresolved_references();
        assert_eq!(dangling.len(), 1);
        assert_eq!(dangling[0].column, "PARENT");
        assert_eq!(dangling[0].missing, MissingTarget::LocalColumn);
    }

    #[test]
    fn test_parse_alter_table_foreign_key() {
        let schema = parse_ddl(
            "CREATE TABLE a (id INT PRIMARY KEY, b_id INT);\n\
             CREATE TABLE b (id INT PRIMARY KEY);\n\
             ALTER TABLE a ADD CONSTRAINT fk_a_b FOREIGN KEY (b_id) REFERENCES b (id);",
        );

        let a = schema.get_table("a").unwrap();
        assert_eq!(a.foreign_keys, vec![ForeignKey::new("fk_a_b", "b_id", "b", "id")]);
    }

    #[test]
    fn test_parse_postgres_serial() {
        let schema = parse_ddl("CREATE TABLE \"tags\" (id SERIAL PRIMARY KEY, label TEXT);");
        let id = schema.get_table("tags").unwrap().get_column("id").unwrap();

        assert!(id.auto_increment);
        assert!(id.not_null);
    }

    #[test]
    fn test_redefined_table_replaces_previous() {
        let schema = parse_ddl(
            "CREATE TABLE t (a INT);\nCREATE TABLE u (id INT);\nCREATE TABLE t (b INT);",
        );

        assert_eq!(schema.table_names().collect::<Vec<_>>(), vec!["t", "u"]);
        let t = schema.get_table("t").unwrap();
        assert!(t.has_column("b"));
        assert!(!t.has_column("a"));
    }
}

mod order_tests {
    use super::*;

    fn shop() -> DatabaseSchema {
        let mut schema = DatabaseSchema::new("shop");
        schema.add_table(
            fk_table("order_items", "order_id", "orders")
                .with_column(Column::new("product_id", "INT"))
                .with_foreign_key(ForeignKey::new(
                    "fk_items_product",
                    "product_id",
                    "products",
                    "id",
                )),
        );
        schema.add_table(fk_table("orders", "user_id", "users"));
        schema.add_table(table_with_id("users"));
        schema.add_table(table_with_id("products"));
        schema
    }

    fn cycle() -> DatabaseSchema {
        let mut schema = DatabaseSchema::new("loop");
        schema.add_table(fk_table("A", "b_id", "B"));
        schema.add_table(fk_table("B", "c_id", "C"));
        schema.add_table(fk_table("C", "a_id", "A"));
        schema
    }

    fn position(order: &[String], name: &str) -> usize {
        order.iter().position(|t| t == name).unwrap()
    }

    #[test]
    fn test_referenced_tables_come_first() {
        let order = dependency_order(&shop()).unwrap();

        assert_eq!(order.len(), 4);
        assert!(position(&order, "users") < position(&order, "orders"));
        assert!(position(&order, "orders") < position(&order, "order_items"));
        assert!(position(&order, "products") < position(&order, "order_items"));
    }

    #[test]
    fn test_ties_broken_by_insertion_order() {
        let order = dependency_order(&shop()).unwrap();
        assert_eq!(order, vec!["users", "products", "orders", "order_items"]);
    }

    #[test]
    fn test_levels() {
        let schema = shop();
        let topo = SchemaGraph::from_schema(&schema).topo_sort().unwrap();

        assert_eq!(
            topo.levels,
            vec![
                vec!["users".to_string(), "products".to_string()],
                vec!["orders".to_string()],
                vec!["order_items".to_string()],
            ]
        );
    }

    #[test]
    fn test_order_is_deterministic() {
        let schema = shop();
        let first = dependency_order(&schema).unwrap();
        for _ in 0..5 {
            assert_eq!(dependency_order(&schema).unwrap(), first);
        }
    }

    #[test]
    fn test_self_reference_does_not_block() {
        let mut schema = DatabaseSchema::new("org");
        schema.add_table(fk_table("employees", "manager_id", "employees"));

        assert!(schema.get_table("employees").unwrap().has_self_reference());
        assert_eq!(dependency_order(&schema).unwrap(), vec!["employees"]);
    }

    #[test]
    fn test_cycle_names_every_member() {
        match dependency_order(&cycle()) {
            Err(SchemaError::CircularReference { tables, blocked }) => {
                assert_eq!(tables, vec!["A", "B", "C"]);
                assert!(blocked.is_empty());
            }
            other => panic!("expected CircularReference, got {:?}", other),
        }
    }

    #[test]
    fn test_cycle_reports_blocked_dependents() {
        let mut schema = cycle();
        schema.add_table(fk_table("D", "a_id", "A"));
        schema.add_table(table_with_id("E"));

        match dependency_order(&schema) {
            Err(SchemaError::CircularReference { tables, blocked }) => {
                assert_eq!(tables, vec!["A", "B", "C"]);
                assert_eq!(blocked, vec!["D"]);
            }
            other => panic!("expected CircularReference, got {:?}", other),
        }
    }

    #[test]
    fn test_two_table_cycle() {
        let mut schema = DatabaseSchema::new("pair");
        schema.add_table(table_with_id("solo"));
        schema.add_table(fk_table("x", "y_id", "y"));
        schema.add_table(fk_table("y", "x_id", "x"));

        let err = dependency_order(&schema).unwrap_err();
        assert_eq!(err.code(), "CIRCULAR_REFERENCE");
        assert!(err.to_string().contains("x, y"));
    }

    #[test]
    fn test_cycles_lists_components() {
        let schema = cycle();
        let graph = SchemaGraph::from_schema(&schema);

        assert_eq!(graph.cycles(), vec![vec!["A", "B", "C"]]);
        assert!(SchemaGraph::from_schema(&shop()).cycles().is_empty());
    }

    #[test]
    fn test_dangling_reference_does_not_block_order() {
        let mut schema = DatabaseSchema::new("shop");
        schema.add_table(fk_table("orders", "user_id", "users"));

        let topo = SchemaGraph::from_schema(&schema).topo_sort().unwrap();
        assert_eq!(topo.order, vec!["orders"]);
        assert_eq!(topo.unresolved.len(), 1);
        assert_eq!(topo.unresolved[0].referenced_table, "users");
    }

    #[test]
    fn test_empty_schema_orders_to_nothing() {
        let schema = DatabaseSchema::new("empty");
        let topo = SchemaGraph::from_schema(&schema).topo_sort().unwrap();

        assert!(topo.order.is_empty());
        assert!(topo.levels.is_empty());
    }

    #[test]
    fn test_graph_edges() {
        let schema = shop();
        let graph = SchemaGraph::from_schema(&schema);

        assert_eq!(graph.len(), 4);
        // order_items references orders and products
        assert_eq!(graph.parents[0], vec![TableId(1), TableId(3)]);
        assert_eq!(graph.children[2], vec![TableId(1)]);
    }
}
