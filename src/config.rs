//! YAML project configuration.
//!
//! Every field is optional; command-line flags override what the file says.
//!
//! ```yaml
//! convert:
//!   foreign_key_type: BIGINT
//!   inherit_identifier_type: false
//! export:
//!   dialect: postgres
//!   foreign_keys: alter_table
//!   header: true
//!   create_database: false
//!   quote_identifiers: true
//! ```

use crate::convert::ConvertOptions;
use crate::export::ExportOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete YAML configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ProjectConfig {
    /// Conceptual to logical conversion settings
    pub convert: ConvertOptions,
    /// DDL export settings
    pub export: ExportOptions,
}

impl ProjectConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: ProjectConfig = serde_yaml_ng::from_str(content)?;
        Ok(config)
    }

    /// Load `path` when given, defaults otherwise
    pub fn load_optional(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path).map_err(|e| {
                anyhow::anyhow!("failed to load config {}: {}", path.display(), e)
            }),
            None => Ok(Self::default()),
        }
    }
}

