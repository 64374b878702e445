//! Export command: DDL generation in dependency order.

use super::io_util::{load_logical, parse_arg, write_output};
use crate::config::ProjectConfig;
use crate::export::{DdlExporter, ForeignKeyStyle};
use anyhow::Result;
use std::path::PathBuf;

#[allow(clippy::too_many_arguments)]
pub fn run(
    file: PathBuf,
    output: Option<PathBuf>,
    dialect: Option<String>,
    alter_constraints: bool,
    no_header: bool,
    create_database: bool,
    quote: bool,
    config: Option<PathBuf>,
) -> Result<()> {
    let mut project = ProjectConfig::load_optional(config.as_deref())?;
    let options = &mut project.export;
    if let Some(dialect) = dialect {
        options.dialect = parse_arg(&dialect)?;
    }
    if alter_constraints {
        options.foreign_keys = ForeignKeyStyle::AlterTable;
    }
    if no_header {
        options.header = false;
    }
    if create_database {
        options.create_database = true;
    }
    if quote {
        options.quote_identifiers = true;
    }

    let schema = load_logical(&file, &project)?;
    let exporter = DdlExporter::new(project.export.clone());
    let sql = exporter.export(&schema)?;

    write_output(output.as_deref(), &sql, "DDL")?;

    eprintln!(
        "Exported {} tables [dialect: {}, foreign keys: {}]",
        schema.len(),
        exporter.options().dialect,
        exporter.options().foreign_keys
    );

    Ok(())
}
