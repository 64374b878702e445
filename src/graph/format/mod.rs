//! Output format implementations for ERD visualization.

mod dot;
pub(crate) mod json;
mod mermaid;

pub use dot::to_dot;
pub use json::{build_erd_json, to_json, ColumnJson, ErdJson, ErdStats, RelationshipJson, TableJson};
pub use mermaid::{conceptual_to_mermaid, to_mermaid};

use std::fmt;
use std::str::FromStr;

/// Output format for ERD export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Mermaid erDiagram
    #[default]
    Mermaid,
    /// Graphviz DOT, one HTML-like table per node
    Dot,
    /// JSON for programmatic use
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mermaid" | "mmd" => Ok(OutputFormat::Mermaid),
            "dot" | "graphviz" => Ok(OutputFormat::Dot),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!(
                "Unknown format: {}. Valid options: mermaid, dot, json",
                s
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Mermaid => write!(f, "mermaid"),
            OutputFormat::Dot => write!(f, "dot"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl OutputFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mmd" | "mermaid" => Some(OutputFormat::Mermaid),
            "dot" | "gv" => Some(OutputFormat::Dot),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

/// Layout direction for DOT diagrams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// Left to right
    #[default]
    LR,
    /// Top to bottom
    TB,
}

impl FromStr for Layout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lr" | "left-right" => Ok(Layout::LR),
            "tb" | "td" | "top-bottom" => Ok(Layout::TB),
            _ => Err(format!("Unknown layout: {}. Valid options: lr, tb", s)),
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::LR => write!(f, "lr"),
            Layout::TB => write!(f, "tb"),
        }
    }
}
