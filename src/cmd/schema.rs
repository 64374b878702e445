//! Schema command: print JSON schemas.

use crate::json_schema::{all_schemas, get_schema, schema_names};
use anyhow::{bail, Result};

pub fn run(name: Option<String>, all: bool) -> Result<()> {
    if all {
        println!("{}", serde_json::to_string_pretty(&all_schemas())?);
        return Ok(());
    }

    match name {
        Some(name) => match get_schema(&name) {
            Some(schema) => println!("{}", serde_json::to_string_pretty(&schema)?),
            None => bail!(
                "Unknown schema: {}. Available: {}",
                name,
                schema_names().join(", ")
            ),
        },
        None => {
            for name in schema_names() {
                println!("{}", name);
            }
        }
    }

    Ok(())
}
