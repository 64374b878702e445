//! Reverse command: logical schema to conceptual document.

use super::io_util::{load_input, write_output};
use crate::conceptual::ConceptualSchema;
use crate::document::{self, DocumentFormat, SchemaDocument};
use crate::graph::conceptual_to_mermaid;
use anyhow::{bail, Result};
use std::path::PathBuf;

pub fn run(file: PathBuf, output: Option<PathBuf>, format: String) -> Result<()> {
    let logical = load_input(&file)?.into_logical()?;
    let result = ConceptualSchema::from_database(&logical);

    let content = match format.to_lowercase().as_str() {
        "yaml" | "yml" => {
            document::render(&SchemaDocument::from(&result.schema), DocumentFormat::Yaml)?
        }
        "json" => document::render(&SchemaDocument::from(&result.schema), DocumentFormat::Json)?,
        "mermaid" | "mmd" => conceptual_to_mermaid(&result.schema),
        other => bail!("Unknown format: {}. Valid options: yaml, json, mermaid", other),
    };

    write_output(output.as_deref(), &content, "Conceptual schema")?;

    eprintln!(
        "Reverse-engineered {} tables into {} entities and {} associations ({} warnings)",
        logical.len(),
        result.schema.entity_count(),
        result.schema.association_count(),
        result.warnings.len()
    );

    Ok(())
}
