//! JSON format output for ERD data.

use crate::graph::view::GraphView;
use schemars::JsonSchema;
use serde::Serialize;

/// JSON representation of the ERD
#[derive(Debug, Serialize, JsonSchema)]
pub struct ErdJson {
    pub tables: Vec<TableJson>,
    pub relationships: Vec<RelationshipJson>,
    pub stats: ErdStats,
}

/// JSON representation of a table with full column details
#[derive(Debug, Serialize, JsonSchema)]
pub struct TableJson {
    pub name: String,
    pub columns: Vec<ColumnJson>,
}

/// JSON representation of a column
#[derive(Debug, Serialize, JsonSchema)]
pub struct ColumnJson {
    pub name: String,
    #[serde(rename = "type")]
    pub col_type: String,
    pub is_primary_key: bool,
    pub is_foreign_key: bool,
    pub is_nullable: bool,
    pub is_unique: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references_table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references_column: Option<String>,
}

/// JSON representation of a relationship
#[derive(Debug, Serialize, JsonSchema)]
pub struct RelationshipJson {
    pub constraint: String,
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    pub cardinality: String,
}

/// ERD statistics
#[derive(Debug, Serialize, JsonSchema)]
pub struct ErdStats {
    pub table_count: usize,
    pub column_count: usize,
    pub relationship_count: usize,
}

/// Generate pretty-printed JSON from a graph view
pub fn to_json(view: &GraphView) -> String {
    serde_json::to_string_pretty(&build_erd_json(view)).unwrap_or_else(|_| "{}".to_string())
}

/// Build the JSON structure, tables sorted by name
pub fn build_erd_json(view: &GraphView) -> ErdJson {
    let tables: Vec<TableJson> = view
        .sorted_tables()
        .into_iter()
        .map(|table| TableJson {
            name: table.name.clone(),
            columns: table
                .columns
                .iter()
                .map(|col| ColumnJson {
                    name: col.name.clone(),
                    col_type: col.col_type.clone(),
                    is_primary_key: col.is_primary_key,
                    is_foreign_key: col.is_foreign_key,
                    is_nullable: col.is_nullable,
                    is_unique: col.is_unique,
                    references_table: col.references_table.clone(),
                    references_column: col.references_column.clone(),
                })
                .collect(),
        })
        .collect();

    let relationships: Vec<RelationshipJson> = view
        .edges
        .iter()
        .map(|e| RelationshipJson {
            constraint: e.constraint.clone(),
            from_table: e.from_table.clone(),
            from_column: e.from_column.clone(),
            to_table: e.to_table.clone(),
            to_column: e.to_column.clone(),
            cardinality: e.cardinality.as_str().to_string(),
        })
        .collect();

    let column_count = tables.iter().map(|t| t.columns.len()).sum();

    ErdJson {
        stats: ErdStats {
            table_count: tables.len(),
            column_count,
            relationship_count: relationships.len(),
        },
        tables,
        relationships,
    }
}
