//! Convert command: conceptual document to logical schema.

use super::io_util::{load_input, parse_arg, write_output};
use crate::config::ProjectConfig;
use crate::convert::Converter;
use crate::document::{self, DocumentFormat, SchemaDocument};
use crate::export::DdlExporter;
use crate::graph::{to_mermaid, GraphView};
use anyhow::Result;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// What the converted schema is written as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConvertFormat {
    Sql,
    Json,
    Yaml,
    Mermaid,
}

impl FromStr for ConvertFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sql" | "ddl" => Ok(ConvertFormat::Sql),
            "json" => Ok(ConvertFormat::Json),
            "yaml" | "yml" => Ok(ConvertFormat::Yaml),
            "mermaid" | "mmd" => Ok(ConvertFormat::Mermaid),
            _ => Err(format!(
                "Unknown format: {}. Valid options: sql, json, yaml, mermaid",
                s
            )),
        }
    }
}

impl fmt::Display for ConvertFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertFormat::Sql => write!(f, "sql"),
            ConvertFormat::Json => write!(f, "json"),
            ConvertFormat::Yaml => write!(f, "yaml"),
            ConvertFormat::Mermaid => write!(f, "mermaid"),
        }
    }
}

pub fn run(
    file: PathBuf,
    output: Option<PathBuf>,
    format: String,
    dialect: Option<String>,
    fk_type: Option<String>,
    inherit_types: bool,
    config: Option<PathBuf>,
) -> Result<()> {
    let format: ConvertFormat = parse_arg(&format)?;

    let mut project = ProjectConfig::load_optional(config.as_deref())?;
    if let Some(fk_type) = fk_type {
        project.convert.foreign_key_type = fk_type;
    }
    if inherit_types {
        project.convert.inherit_identifier_type = true;
    }
    if let Some(dialect) = dialect {
        project.export.dialect = parse_arg(&dialect)?;
    }

    let source = load_input(&file)?.into_conceptual()?;
    let conversion = Converter::new(project.convert.clone()).convert(&source)?;
    let schema = &conversion.schema;

    let content = match format {
        ConvertFormat::Sql => DdlExporter::new(project.export.clone()).export(schema)?,
        ConvertFormat::Json => document::render(&SchemaDocument::from(schema), DocumentFormat::Json)?,
        ConvertFormat::Yaml => document::render(&SchemaDocument::from(schema), DocumentFormat::Yaml)?,
        ConvertFormat::Mermaid => to_mermaid(&GraphView::from_schema(schema)),
    };

    write_output(output.as_deref(), &content, "Logical schema")?;

    eprintln!(
        "Converted {} entities and {} associations into {} tables ({}, {} warnings)",
        source.entity_count(),
        source.association_count(),
        schema.len(),
        format,
        conversion.warnings.len()
    );

    Ok(())
}
