//! Validate command: structural checks on either model.

use super::io_util::load_input;
use crate::conceptual::ConceptualSchema;
use crate::convert::convert;
use crate::document::LoadedSchema;
use crate::error::SchemaError;
use crate::schema::{DatabaseSchema, SchemaGraph};
use anyhow::Result;
use schemars::JsonSchema;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Severity of a validation issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One finding of the validate command
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ValidationIssue {
    pub code: String,
    pub severity: Severity,
    pub message: String,
}

impl ValidationIssue {
    fn error(err: &SchemaError) -> Self {
        Self {
            code: err.code().to_string(),
            severity: Severity::Error,
            message: err.to_string(),
        }
    }

    fn warning(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
        };
        write!(f, "{} [{}]: {}", label, self.code, self.message)
    }
}

/// JSON output of the validate command
#[derive(Debug, Serialize, JsonSchema)]
pub struct ValidateJsonOutput {
    pub file: String,
    /// `logical` or `conceptual`
    pub kind: String,
    pub valid: bool,
    pub issues: Vec<ValidationIssue>,
    pub summary: ValidateSummary,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ValidateSummary {
    pub tables: usize,
    pub entities: usize,
    pub associations: usize,
    pub errors: usize,
    pub warnings: usize,
}

pub fn run(file: PathBuf, json: bool) -> Result<()> {
    let loaded = load_input(&file)?;
    let kind = loaded.kind().to_string();

    let mut issues = Vec::new();
    let (mut tables, mut entities, mut associations) = (0, 0, 0);

    match &loaded {
        LoadedSchema::Logical(schema) => {
            tables = schema.len();
            check_logical(schema, &mut issues);
        }
        LoadedSchema::Conceptual(schema) => {
            entities = schema.entity_count();
            associations = schema.association_count();
            if let Some(converted) = check_conceptual(schema, &mut issues) {
                tables = converted.len();
                check_logical(&converted, &mut issues);
            }
        }
    }

    let errors = issues
        .iter()
        .filter(|i| i.severity == Severity::Error)
        .count();
    let warnings = issues.len() - errors;

    if json {
        let output = ValidateJsonOutput {
            file: file.display().to_string(),
            kind,
            valid: errors == 0,
            issues,
            summary: ValidateSummary {
                tables,
                entities,
                associations,
                errors,
                warnings,
            },
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for issue in &issues {
            eprintln!("{}", issue);
        }
        if !issues.is_empty() {
            eprintln!();
        }

        eprintln!("Validation summary:");
        eprintln!("  Schema kind: {}", kind);
        if kind == "conceptual" {
            eprintln!("  Entities: {}", entities);
            eprintln!("  Associations: {}", associations);
        }
        eprintln!("  Tables: {}", tables);
        eprintln!("  Total: {} errors, {} warnings", errors, warnings);
        eprintln!();

        if errors > 0 {
            eprintln!("Result: FAILED");
        } else if warnings > 0 {
            eprintln!("Result: PASSED (with warnings)");
        } else {
            eprintln!("Result: PASSED");
        }
    }

    if errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}

/// Entity and association checks, then conversion. Returns the converted
/// schema when conversion succeeds.
fn check_conceptual(
    schema: &ConceptualSchema,
    issues: &mut Vec<ValidationIssue>,
) -> Option<DatabaseSchema> {
    let before = issues.len();

    for entity in schema.entities() {
        if let Err(e) = entity.validate() {
            issues.push(ValidationIssue::error(&e));
        }
    }
    for (_, association) in schema.associations() {
        if let Err(e) = schema.validate_association(association) {
            issues.push(ValidationIssue::error(&e));
        }
    }
    if issues.len() > before {
        return None;
    }

    match convert(schema) {
        Ok(conversion) => {
            for w in &conversion.warnings {
                issues.push(ValidationIssue::warning("CONVERSION", w.to_string()));
            }
            Some(conversion.schema)
        }
        Err(e) => {
            issues.push(ValidationIssue::error(&e));
            None
        }
    }
}

fn check_logical(schema: &DatabaseSchema, issues: &mut Vec<ValidationIssue>) {
    for dangling in schema.unresolved_references() {
        issues.push(ValidationIssue::error(&dangling.into_error()));
    }

    if let Err(e) = SchemaGraph::from_schema(schema).topo_sort() {
        issues.push(ValidationIssue::error(&e));
    }

    for table in schema.tables() {
        if table.primary_key().is_empty() {
            issues.push(ValidationIssue::warning(
                "NO_PRIMARY_KEY",
                format!("table '{}' has no primary key", table.name),
            ));
        }
    }
}
