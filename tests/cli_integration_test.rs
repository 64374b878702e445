//! Integration tests for the merise binary.

use jsonschema::Validator;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

fn merise_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_merise"))
}

fn run(args: &[&str]) -> Output {
    merise_bin().args(args).output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

const SHOP_YAML: &str = r#"
kind: conceptual
name: shop
entities:
  - name: client
    attributes:
      - { name: id, type: INT, identifier: true }
      - { name: nom, type: VARCHAR(50) }
  - name: commande
    attributes:
      - { name: id, type: INT, identifier: true }
  - name: produit
    attributes:
      - { name: id, type: INT, identifier: true }
associations:
  - name: passe
    participants:
      - { entity: client, cardinality: "0,n" }
      - { entity: commande, cardinality: "1,1" }
  - name: contient
    participants:
      - { entity: commande, cardinality: "1,n" }
      - { entity: produit, cardinality: "0,n" }
    attributes:
      - { name: quantite, type: INT }
"#;

const SHOP_SQL: &str = r#"
CREATE TABLE order_items (
  order_id INT NOT NULL,
  product_id INT NOT NULL,
  PRIMARY KEY (order_id, product_id),
  FOREIGN KEY (order_id) REFERENCES orders(id),
  FOREIGN KEY (product_id) REFERENCES products(id)
);

CREATE TABLE orders (
  id INT PRIMARY KEY,
  user_id INT NOT NULL,
  FOREIGN KEY (user_id) REFERENCES users(id)
);

CREATE TABLE users (id INT PRIMARY KEY, email VARCHAR(255));
CREATE TABLE products (id INT PRIMARY KEY, name VARCHAR(255));
"#;

const CYCLE_SQL: &str = r#"
CREATE TABLE a (id INT PRIMARY KEY, b_id INT, FOREIGN KEY (b_id) REFERENCES b(id));
CREATE TABLE b (id INT PRIMARY KEY, c_id INT, FOREIGN KEY (c_id) REFERENCES c(id));
CREATE TABLE c (id INT PRIMARY KEY, a_id INT, FOREIGN KEY (a_id) REFERENCES a(id));
CREATE TABLE d (id INT PRIMARY KEY, a_id INT, FOREIGN KEY (a_id) REFERENCES a(id));
"#;

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn load_schema(name: &str) -> Validator {
    let output = run(&["schema", name]);
    assert!(output.status.success(), "schema {} failed: {}", name, stderr(&output));
    let schema: Value = serde_json::from_str(&stdout(&output)).expect("Invalid schema JSON");
    Validator::new(&schema).expect("Failed to compile schema")
}

fn assert_matches_schema(json: &Value, schema_name: &str) {
    let validator = load_schema(schema_name);
    if let Err(error) = validator.validate(json) {
        panic!(
            "JSON output doesn't match {} schema:\n  - {}\n\nOutput was:\n{}",
            schema_name,
            error,
            serde_json::to_string_pretty(json).unwrap()
        );
    }
}

mod convert_tests {
    use super::*;

    #[test]
    fn test_convert_to_sql() {
        let dir = TempDir::new().unwrap();
        let input = write_file(&dir, "shop.yaml", SHOP_YAML);

        let output = run(&["convert", input.to_str().unwrap()]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));

        let sql = stdout(&output);
        assert!(sql.starts_with("-- Generated by merise"));
        assert!(sql.contains("client_id INT NOT NULL"));
        assert!(sql.contains("CONSTRAINT fk_commande_client_id FOREIGN KEY (client_id) REFERENCES client (id)"));
        assert!(sql.contains("CREATE TABLE contient ("));
        assert!(sql.contains("quantite INT"));

        let client = sql.find("CREATE TABLE client").unwrap();
        let commande = sql.find("CREATE TABLE commande").unwrap();
        let contient = sql.find("CREATE TABLE contient").unwrap();
        assert!(client < commande && commande < contient);

        assert!(stderr(&output).contains("into 4 tables"));
    }

    #[test]
    fn test_convert_to_yaml_document() {
        let dir = TempDir::new().unwrap();
        let input = write_file(&dir, "shop.yaml", SHOP_YAML);
        let out = dir.path().join("shop.mld.yaml");

        let output = run(&[
            "convert",
            input.to_str().unwrap(),
            "--format",
            "yaml",
            "--fk-type",
            "BIGINT",
            "-o",
            out.to_str().unwrap(),
        ]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));

        let content = fs::read_to_string(&out).unwrap();
        assert!(content.contains("kind: logical"));
        assert!(content.contains("BIGINT"));

        // The written document orders cleanly
        let order = run(&["order", out.to_str().unwrap()]);
        assert!(order.status.success());
        assert_eq!(
            stdout(&order).lines().collect::<Vec<_>>(),
            vec!["client", "produit", "commande", "contient"]
        );
    }

    #[test]
    fn test_convert_with_config() {
        let dir = TempDir::new().unwrap();
        let input = write_file(&dir, "shop.yaml", SHOP_YAML);
        let config = write_file(
            &dir,
            "merise.yaml",
            "export:\n  dialect: postgres\n  header: false\n  foreign_keys: alter_table\n",
        );

        let output = run(&[
            "convert",
            input.to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
        ]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));

        let sql = stdout(&output);
        assert!(sql.starts_with("CREATE TABLE client"));
        assert!(sql.contains("ALTER TABLE commande ADD CONSTRAINT fk_commande_client_id"));
    }

    #[test]
    fn test_convert_invalid_entity_fails() {
        let dir = TempDir::new().unwrap();
        let input = write_file(
            &dir,
            "bad.yaml",
            &SHOP_YAML.replace("{ name: id, type: INT, identifier: true }\n      - { name: nom", "{ name: id, type: INT }\n      - { name: nom"),
        );

        let output = run(&["convert", input.to_str().unwrap()]);
        assert!(!output.status.success());
        assert!(stderr(&output).contains("invalid entity 'client'"));
        assert!(stdout(&output).is_empty());
    }

    #[test]
    fn test_convert_rejects_logical_input() {
        let dir = TempDir::new().unwrap();
        let input = write_file(&dir, "shop.sql", SHOP_SQL);

        let output = run(&["convert", input.to_str().unwrap()]);
        assert!(!output.status.success());
        assert!(stderr(&output).contains("expected a conceptual schema"));
    }
}

mod order_tests {
    use super::*;

    #[test]
    fn test_order_text() {
        let dir = TempDir::new().unwrap();
        let input = write_file(&dir, "shop.sql", SHOP_SQL);

        let output = run(&["order", input.to_str().unwrap()]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert_eq!(
            stdout(&output).lines().collect::<Vec<_>>(),
            vec!["users", "products", "orders", "order_items"]
        );
    }

    #[test]
    fn test_order_reverse() {
        let dir = TempDir::new().unwrap();
        let input = write_file(&dir, "shop.sql", SHOP_SQL);

        let output = run(&["order", input.to_str().unwrap(), "--reverse"]);
        assert!(output.status.success());
        assert_eq!(stdout(&output).lines().next(), Some("order_items"));
    }

    #[test]
    fn test_order_json_matches_schema() {
        let dir = TempDir::new().unwrap();
        let input = write_file(&dir, "shop.sql", SHOP_SQL);

        let output = run(&["order", input.to_str().unwrap(), "--json"]);
        assert!(output.status.success());

        let json: Value = serde_json::from_str(&stdout(&output)).unwrap();
        assert_matches_schema(&json, "order");
        assert_eq!(json["levels"].as_array().unwrap().len(), 3);
        assert!(json.get("cycle").is_none());
    }

    #[test]
    fn test_order_cycle_fails() {
        let dir = TempDir::new().unwrap();
        let input = write_file(&dir, "cycle.sql", CYCLE_SQL);

        let output = run(&["order", input.to_str().unwrap()]);
        assert!(!output.status.success());
        assert!(stderr(&output).contains("circular foreign key reference among tables: a, b, c"));
        assert!(stdout(&output).is_empty());
    }

    #[test]
    fn test_order_cycle_json() {
        let dir = TempDir::new().unwrap();
        let input = write_file(&dir, "cycle.sql", CYCLE_SQL);

        let output = run(&["order", input.to_str().unwrap(), "--json"]);
        assert_eq!(output.status.code(), Some(1));

        let json: Value = serde_json::from_str(&stdout(&output)).unwrap();
        assert_matches_schema(&json, "order");
        assert_eq!(json["cycle"]["tables"], serde_json::json!(["a", "b", "c"]));
        assert_eq!(json["cycle"]["blocked"], serde_json::json!(["d"]));
    }

    #[test]
    fn test_order_missing_file() {
        let output = run(&["order", "/nonexistent/shop.sql"]);
        assert!(!output.status.success());
        assert!(stderr(&output).contains("input file does not exist"));
    }
}

mod export_tests {
    use super::*;

    #[test]
    fn test_export_orders_tables() {
        let dir = TempDir::new().unwrap();
        let input = write_file(&dir, "shop.sql", SHOP_SQL);
        let out = dir.path().join("ordered.sql");

        let output = run(&[
            "export",
            input.to_str().unwrap(),
            "--no-header",
            "--dialect",
            "sqlite",
            "-o",
            out.to_str().unwrap(),
        ]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));

        let sql = fs::read_to_string(&out).unwrap();
        assert!(sql.starts_with("CREATE TABLE users"));
        assert!(sql.contains("    PRIMARY KEY (order_id, product_id),\n"));
        assert!(sql.find("CREATE TABLE orders").unwrap() < sql.find("CREATE TABLE order_items").unwrap());
    }

    #[test]
    fn test_export_cycle_fails() {
        let dir = TempDir::new().unwrap();
        let input = write_file(&dir, "cycle.sql", CYCLE_SQL);

        let output = run(&["export", input.to_str().unwrap(), "--alter-constraints"]);
        assert!(!output.status.success());
        assert!(stderr(&output).contains("circular foreign key reference"));
    }

    #[test]
    fn test_export_unknown_dialect() {
        let dir = TempDir::new().unwrap();
        let input = write_file(&dir, "shop.sql", SHOP_SQL);

        let output = run(&["export", input.to_str().unwrap(), "--dialect", "oracle"]);
        assert!(!output.status.success());
        assert!(stderr(&output).contains("Unknown dialect: oracle"));
    }
}

mod reverse_tests {
    use super::*;

    #[test]
    fn test_reverse_to_yaml_and_back() {
        let dir = TempDir::new().unwrap();
        let input = write_file(&dir, "shop.sql", SHOP_SQL);
        let mcd = dir.path().join("shop.mcd.yaml");

        let output = run(&["reverse", input.to_str().unwrap(), "-o", mcd.to_str().unwrap()]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert!(stderr(&output).contains("into 4 entities and 3 associations"));

        let content = fs::read_to_string(&mcd).unwrap();
        assert!(content.contains("kind: conceptual"));

        // order_items has a composite identifier and cannot convert as-is
        let output = run(&["convert", mcd.to_str().unwrap()]);
        assert!(!output.status.success());
        assert!(stderr(&output).contains("invalid entity 'order_items'"));
    }

    #[test]
    fn test_reverse_mermaid() {
        let dir = TempDir::new().unwrap();
        let input = write_file(
            &dir,
            "users.sql",
            "CREATE TABLE users (id INT PRIMARY KEY);\n\
             CREATE TABLE orders (id INT PRIMARY KEY, user_id INT NOT NULL REFERENCES users(id));",
        );

        let output = run(&["reverse", input.to_str().unwrap(), "--format", "mermaid"]);
        assert!(output.status.success());
        assert!(stdout(&output).contains("orders }o--|| users : \"fk_orders_user_id\""));
    }
}

mod validate_tests {
    use super::*;

    #[test]
    fn test_validate_conceptual_json() {
        let dir = TempDir::new().unwrap();
        let input = write_file(&dir, "shop.yaml", SHOP_YAML);

        let output = run(&["validate", input.to_str().unwrap(), "--json"]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));

        let json: Value = serde_json::from_str(&stdout(&output)).unwrap();
        assert_matches_schema(&json, "validate");
        assert_eq!(json["kind"], "conceptual");
        assert_eq!(json["valid"], true);
        assert_eq!(json["summary"]["entities"], 3);
        assert_eq!(json["summary"]["tables"], 4);
    }

    #[test]
    fn test_validate_reports_dangling_reference() {
        let dir = TempDir::new().unwrap();
        let input = write_file(
            &dir,
            "dangling.sql",
            "CREATE TABLE orders (id INT PRIMARY KEY, user_id INT REFERENCES users(id));",
        );

        let output = run(&["validate", input.to_str().unwrap(), "--json"]);
        assert_eq!(output.status.code(), Some(1));

        let json: Value = serde_json::from_str(&stdout(&output)).unwrap();
        assert_matches_schema(&json, "validate");
        assert_eq!(json["valid"], false);
        assert_eq!(json["issues"][0]["code"], "DANGLING_FOREIGN_KEY");
    }

    #[test]
    fn test_validate_cycle_text() {
        let dir = TempDir::new().unwrap();
        let input = write_file(&dir, "cycle.sql", CYCLE_SQL);

        let output = run(&["validate", input.to_str().unwrap()]);
        assert!(!output.status.success());
        let err = stderr(&output);
        assert!(err.contains("ERROR [CIRCULAR_REFERENCE]"));
        assert!(err.contains("Result: FAILED"));
    }
}

mod graph_tests {
    use super::*;

    #[test]
    fn test_graph_conceptual_mermaid() {
        let dir = TempDir::new().unwrap();
        let input = write_file(&dir, "shop.yaml", SHOP_YAML);

        let output = run(&["graph", input.to_str().unwrap()]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));

        let mermaid = stdout(&output);
        assert!(mermaid.starts_with("erDiagram"));
        assert!(mermaid.contains("client ||--o{ commande : \"passe\""));
        assert!(mermaid.contains("    contient {\n"));
    }

    #[test]
    fn test_graph_logical_json_matches_schema() {
        let dir = TempDir::new().unwrap();
        let input = write_file(&dir, "shop.yaml", SHOP_YAML);

        let output = run(&["graph", input.to_str().unwrap(), "--logical", "--format", "json"]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));

        let json: Value = serde_json::from_str(&stdout(&output)).unwrap();
        assert_matches_schema(&json, "graph");
        assert_eq!(json["stats"]["table_count"], 4);
        assert_eq!(json["stats"]["relationship_count"], 3);
    }

    #[test]
    fn test_graph_dot_from_extension() {
        let dir = TempDir::new().unwrap();
        let input = write_file(&dir, "shop.sql", SHOP_SQL);
        let out = dir.path().join("shop.dot");

        let output = run(&["graph", input.to_str().unwrap(), "-o", out.to_str().unwrap()]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));

        let dot = fs::read_to_string(&out).unwrap();
        assert!(dot.contains("digraph ERD"));
        assert!(dot.contains("orders:user_id -> users:id"));
    }

    #[test]
    fn test_graph_cycles_only() {
        let dir = TempDir::new().unwrap();
        let input = write_file(&dir, "cycle.sql", CYCLE_SQL);

        let output = run(&["graph", input.to_str().unwrap(), "--cycles-only"]);
        assert!(output.status.success());

        let mermaid = stdout(&output);
        assert!(mermaid.contains("    a {"));
        assert!(!mermaid.contains("    d {"));
        assert!(stderr(&output).contains("a <-> b <-> c"));
    }

    #[test]
    fn test_graph_table_filter() {
        let dir = TempDir::new().unwrap();
        let input = write_file(&dir, "shop.sql", SHOP_SQL);

        let output = run(&["graph", input.to_str().unwrap(), "--tables", "order*"]);
        assert!(output.status.success());

        let mermaid = stdout(&output);
        assert!(mermaid.contains("order_items }o--|| orders"));
        assert!(!mermaid.contains("    users {"));
    }
}

mod schema_tests {
    use super::*;

    #[test]
    fn test_schema_lists_names() {
        let output = run(&["schema"]);
        assert!(output.status.success());
        assert_eq!(
            stdout(&output).lines().collect::<Vec<_>>(),
            vec!["config", "document", "graph", "order", "validate"]
        );
    }

    #[test]
    fn test_document_schema_accepts_documents() {
        let dir = TempDir::new().unwrap();
        let input = write_file(&dir, "shop.yaml", SHOP_YAML);
        let out = dir.path().join("shop.json");

        let output = run(&[
            "convert",
            input.to_str().unwrap(),
            "--format",
            "json",
            "-o",
            out.to_str().unwrap(),
        ]);
        assert!(output.status.success());

        let logical: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_matches_schema(&logical, "document");

        let conceptual: Value = serde_yaml_ng::from_str(SHOP_YAML).unwrap();
        assert_matches_schema(&conceptual, "document");
    }

    #[test]
    fn test_unknown_schema() {
        let output = run(&["schema", "nope"]);
        assert!(!output.status.success());
        assert!(stderr(&output).contains("Unknown schema: nope"));
    }
}
