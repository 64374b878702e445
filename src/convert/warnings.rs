//! Warnings raised while converting a conceptual schema.
//!
//! Conversion never fails on these: the output is complete but something in
//! it deserves a second look.

use serde::Serialize;
use tracing::warn;

/// Warning types that can occur during conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConvertWarning {
    /// Attributes of a one-to-many or one-to-one association were moved onto
    /// the table that received the foreign key
    AttributesFolded {
        association: String,
        table: String,
        attributes: Vec<String>,
    },
    /// A derived column name was already taken and got a numeric suffix
    ColumnRenamed {
        table: String,
        requested: String,
        actual: String,
    },
}

impl std::fmt::Display for ConvertWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConvertWarning::AttributesFolded {
                association,
                table,
                attributes,
            } => write!(
                f,
                "attributes of association '{}' folded into table '{}': {}",
                association,
                table,
                attributes.join(", ")
            ),
            ConvertWarning::ColumnRenamed {
                table,
                requested,
                actual,
            } => write!(
                f,
                "column '{}' already exists in table '{}', using '{}'",
                requested, table, actual
            ),
        }
    }
}

/// Collects warnings during conversion
#[derive(Debug, Default)]
pub struct WarningCollector {
    warnings: Vec<ConvertWarning>,
}

impl WarningCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a warning, skipping exact duplicates
    pub fn add(&mut self, warning: ConvertWarning) {
        if !self.warnings.contains(&warning) {
            warn!("{}", warning);
            self.warnings.push(warning);
        }
    }

    /// Get warning count
    pub fn count(&self) -> usize {
        self.warnings.len()
    }

    pub fn into_warnings(self) -> Vec<ConvertWarning> {
        self.warnings
    }
}
