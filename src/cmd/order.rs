//! Order command: tables in foreign key dependency order.

use super::io_util::load_logical;
use crate::config::ProjectConfig;
use crate::error::SchemaError;
use crate::schema::{DanglingReference, SchemaGraph, TopoOrder};
use anyhow::Result;
use schemars::JsonSchema;
use serde::Serialize;
use std::path::PathBuf;

/// JSON output of the order command
#[derive(Debug, Serialize, JsonSchema)]
pub struct OrderJsonOutput {
    pub schema: String,
    /// Whether `order` lists referencing tables first
    pub reversed: bool,
    pub order: Vec<String>,
    /// Tables grouped by dependency depth
    pub levels: Vec<Vec<String>>,
    pub unresolved: Vec<DanglingReference>,
    /// Set when no order exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle: Option<CycleJson>,
}

/// Tables preventing a dependency order
#[derive(Debug, Serialize, JsonSchema)]
pub struct CycleJson {
    /// Tables on a cycle
    pub tables: Vec<String>,
    /// Tables depending on a cycle
    pub blocked: Vec<String>,
}

pub fn run(file: PathBuf, reverse: bool, json: bool, config: Option<PathBuf>) -> Result<()> {
    let project = ProjectConfig::load_optional(config.as_deref())?;
    let schema = load_logical(&file, &project)?;
    let graph = SchemaGraph::from_schema(&schema);

    let result = graph.topo_sort();

    if json {
        let output = match result {
            Ok(topo) => json_output(schema.name(), reverse, topo, None),
            Err(SchemaError::CircularReference { tables, blocked }) => json_output(
                schema.name(),
                reverse,
                TopoOrder {
                    order: Vec::new(),
                    levels: Vec::new(),
                    unresolved: graph.unresolved.clone(),
                },
                Some(CycleJson { tables, blocked }),
            ),
            Err(e) => return Err(e.into()),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        if output.cycle.is_some() {
            std::process::exit(1);
        }
        return Ok(());
    }

    for dangling in &graph.unresolved {
        eprintln!("Warning: unresolved reference {}", dangling);
    }

    let mut topo = result?;
    if reverse {
        topo.order.reverse();
    }

    for table in &topo.order {
        println!("{}", table);
    }

    eprintln!(
        "\n{} tables in {} dependency levels{}",
        topo.order.len(),
        topo.levels.len(),
        if reverse { " (reversed)" } else { "" }
    );

    Ok(())
}

fn json_output(
    name: &str,
    reverse: bool,
    mut topo: TopoOrder,
    cycle: Option<CycleJson>,
) -> OrderJsonOutput {
    if reverse {
        topo.order.reverse();
        topo.levels.reverse();
    }
    OrderJsonOutput {
        schema: name.to_string(),
        reversed: reverse,
        order: topo.order,
        levels: topo.levels,
        unresolved: topo.unresolved,
        cycle,
    }
}
