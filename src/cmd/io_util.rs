//! Input loading and output writing shared by the commands.

use crate::config::ProjectConfig;
use crate::convert::Converter;
use crate::document::{self, LoadedSchema};
use crate::schema::DatabaseSchema;
use anyhow::{bail, Context, Result};
use glob::Pattern;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Load any supported input file
pub fn load_input(file: &Path) -> Result<LoadedSchema> {
    if !file.exists() {
        bail!("input file does not exist: {}", file.display());
    }
    document::load(file).with_context(|| format!("failed to load {}", file.display()))
}

/// Load a logical schema, converting conceptual inputs first
pub fn load_logical(file: &Path, config: &ProjectConfig) -> Result<DatabaseSchema> {
    match load_input(file)? {
        LoadedSchema::Logical(schema) => Ok(schema),
        LoadedSchema::Conceptual(schema) => {
            let conversion = Converter::new(config.convert.clone()).convert(&schema)?;
            Ok(conversion.schema)
        }
    }
}

/// Write to `output`, or stdout when none is given
pub fn write_output(output: Option<&Path>, content: &str, what: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("{} written to: {}", what, path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            if !content.ends_with('\n') {
                writeln!(stdout)?;
            }
        }
    }
    Ok(())
}

/// Parse a comma-separated list of glob patterns
pub fn parse_patterns(list: Option<&str>) -> Result<Vec<Pattern>> {
    let Some(list) = list else {
        return Ok(Vec::new());
    };
    list.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| Pattern::new(p).map_err(|e| anyhow::anyhow!("invalid glob pattern '{}': {}", p, e)))
        .collect()
}

/// Parse a value with a `FromStr<Err = String>` implementation
pub fn parse_arg<T>(value: &str) -> Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    value.parse().map_err(|e: String| anyhow::anyhow!(e))
}
