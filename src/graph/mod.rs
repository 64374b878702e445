//! ERD (Entity-Relationship Diagram) rendering.
//!
//! Logical schemas render to Mermaid, Graphviz DOT or JSON through a
//! filterable [`GraphView`]. Conceptual schemas render to Mermaid directly.

pub mod format;
pub mod view;

pub use format::{conceptual_to_mermaid, to_dot, to_json, to_mermaid, Layout, OutputFormat};
pub use view::{ColumnInfo, EdgeCardinality, EdgeInfo, GraphView, TableInfo};
