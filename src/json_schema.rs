//! JSON Schema generation for documents and `--json` outputs.
//!
//! Schemas are generated with schemars and printed by the `schema` subcommand.

use schemars::{schema_for, Schema};
use std::collections::BTreeMap;

/// All JSON schemas, keyed by name.
/// Uses BTreeMap for deterministic ordering (important for diffable output).
pub fn all_schemas() -> BTreeMap<&'static str, Schema> {
    let mut schemas = BTreeMap::new();

    // schema documents (logical and conceptual)
    schemas.insert("document", schema_for!(crate::document::SchemaDocument));

    // --config file
    schemas.insert("config", schema_for!(crate::config::ProjectConfig));

    // graph --format json
    schemas.insert("graph", schema_for!(crate::graph::format::ErdJson));

    // order --json
    schemas.insert("order", schema_for!(crate::cmd::OrderJsonOutput));

    // validate --json
    schemas.insert("validate", schema_for!(crate::cmd::ValidateJsonOutput));

    schemas
}

/// Generate a single schema by name.
pub fn get_schema(name: &str) -> Option<Schema> {
    all_schemas().remove(name)
}

/// List all available schema names.
pub fn schema_names() -> Vec<&'static str> {
    all_schemas().keys().copied().collect()
}
