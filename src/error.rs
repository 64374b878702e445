//! Structured errors raised by the modeling engine.
//!
//! Every failure is reported to the caller as-is: the engine never picks an
//! identifier, breaks a cycle or drops a reference on the user's behalf.

use std::fmt;
use thiserror::Error;

/// Which end of a foreign key could not be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MissingTarget {
    /// The referenced table does not exist
    Table,
    /// The referenced table exists but has no such column
    Column,
    /// The owning table has no column with the FK's column name
    LocalColumn,
}

impl fmt::Display for MissingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingTarget::Table => write!(f, "referenced table"),
            MissingTarget::Column => write!(f, "referenced column"),
            MissingTarget::LocalColumn => write!(f, "owning column"),
        }
    }
}

/// Errors produced by validation, conversion and ordering
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Entity without exactly one identifier attribute
    #[error("invalid entity '{entity}': {}", describe_identifiers(.identifiers))]
    InvalidEntity {
        entity: String,
        /// Attributes currently flagged as identifier (empty when none)
        identifiers: Vec<String>,
    },

    /// Association that cannot be converted
    #[error("invalid association '{association}': {reason}")]
    InvalidAssociation { association: String, reason: String },

    /// Foreign key pointing at a table or column that does not exist
    #[error(
        "dangling foreign key '{foreign_key}' on table '{table}': {missing} {referenced_table}.{referenced_column} does not exist"
    )]
    DanglingForeignKey {
        table: String,
        foreign_key: String,
        referenced_table: String,
        referenced_column: String,
        missing: MissingTarget,
    },

    /// Foreign-key cycle among two or more distinct tables
    #[error("circular foreign key reference among tables: {}", .tables.join(", "))]
    CircularReference {
        /// Tables that sit on a cycle, in schema order
        tables: Vec<String>,
        /// Tables not on a cycle that cannot be placed because they depend on one
        blocked: Vec<String>,
    },
}

fn describe_identifiers(identifiers: &[String]) -> String {
    if identifiers.is_empty() {
        "no identifier attribute".to_string()
    } else {
        format!(
            "{} identifier attributes ({}), exactly one is required",
            identifiers.len(),
            identifiers.join(", ")
        )
    }
}

impl SchemaError {
    pub(crate) fn invalid_association(
        association: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        SchemaError::InvalidAssociation {
            association: association.into(),
            reason: reason.into(),
        }
    }

    /// Short machine-readable code, used in `--json` outputs
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::InvalidEntity { .. } => "INVALID_ENTITY",
            SchemaError::InvalidAssociation { .. } => "INVALID_ASSOCIATION",
            SchemaError::DanglingForeignKey { .. } => "DANGLING_FOREIGN_KEY",
            SchemaError::CircularReference { .. } => "CIRCULAR_REFERENCE",
        }
    }
}

pub type Result<T> = std::result::Result<T, SchemaError>;
