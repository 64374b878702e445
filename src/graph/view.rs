//! Graph view with filtering for ERD generation.

use crate::schema::DatabaseSchema;
use ahash::{AHashMap, AHashSet};
use glob::Pattern;

/// Information about a column in a table
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    pub name: String,
    /// Column type as written in the schema
    pub col_type: String,
    pub is_primary_key: bool,
    pub is_foreign_key: bool,
    pub is_nullable: bool,
    pub is_unique: bool,
    /// If FK, which table it references
    pub references_table: Option<String>,
    /// If FK, which column it references
    pub references_column: Option<String>,
}

/// Information about a table for ERD rendering
#[derive(Debug, Clone)]
pub struct TableInfo {
    pub name: String,
    /// All columns in order
    pub columns: Vec<ColumnInfo>,
}

/// Information about an edge (FK relationship) in the graph
#[derive(Debug, Clone)]
pub struct EdgeInfo {
    /// Source table (child with FK)
    pub from_table: String,
    /// Source column (FK column)
    pub from_column: String,
    /// Target table (parent being referenced)
    pub to_table: String,
    /// Target column (referenced column, usually PK)
    pub to_column: String,
    /// FK constraint name
    pub constraint: String,
    pub cardinality: EdgeCardinality,
}

/// Relationship cardinality derived from the FK column's flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeCardinality {
    /// Plain FK, NOT NULL: every child has exactly one parent
    #[default]
    ManyToOne,
    /// Nullable FK
    ManyToZeroOrOne,
    /// Unique NOT NULL FK
    OneToOne,
    /// Unique nullable FK
    OneToZeroOrOne,
}

impl EdgeCardinality {
    pub fn from_flags(unique: bool, nullable: bool) -> Self {
        match (unique, nullable) {
            (false, false) => EdgeCardinality::ManyToOne,
            (false, true) => EdgeCardinality::ManyToZeroOrOne,
            (true, false) => EdgeCardinality::OneToOne,
            (true, true) => EdgeCardinality::OneToZeroOrOne,
        }
    }

    /// Mermaid ERD notation, child on the left
    pub fn as_mermaid(self) -> &'static str {
        match self {
            EdgeCardinality::ManyToOne => "}o--||",
            EdgeCardinality::ManyToZeroOrOne => "}o--o|",
            EdgeCardinality::OneToOne => "|o--||",
            EdgeCardinality::OneToZeroOrOne => "|o--o|",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EdgeCardinality::ManyToOne => "many_to_one",
            EdgeCardinality::ManyToZeroOrOne => "many_to_zero_or_one",
            EdgeCardinality::OneToOne => "one_to_one",
            EdgeCardinality::OneToZeroOrOne => "one_to_zero_or_one",
        }
    }
}

/// A filtered view of a schema for ERD visualization
#[derive(Debug)]
pub struct GraphView {
    /// Tables included in this view with full column info
    pub tables: AHashMap<String, TableInfo>,
    /// Edges between tables (FK relationships)
    pub edges: Vec<EdgeInfo>,
}

impl GraphView {
    /// Create a full view of a schema. Foreign keys to tables outside the
    /// schema produce no edge.
    pub fn from_schema(schema: &DatabaseSchema) -> Self {
        let mut tables = AHashMap::new();
        let mut edges = Vec::new();

        for table in schema.tables() {
            let columns = table
                .columns
                .iter()
                .map(|col| {
                    let fk = table.foreign_keys_for(&col.name).next();
                    ColumnInfo {
                        name: col.name.clone(),
                        col_type: col.col_type.clone(),
                        is_primary_key: col.primary_key,
                        is_foreign_key: fk.is_some(),
                        is_nullable: col.is_nullable(),
                        is_unique: col.unique,
                        references_table: fk.map(|fk| fk.referenced_table.clone()),
                        references_column: fk.map(|fk| fk.referenced_column.clone()),
                    }
                })
                .collect();

            tables.insert(
                table.name.clone(),
                TableInfo {
                    name: table.name.clone(),
                    columns,
                },
            );

            for fk in &table.foreign_keys {
                if !schema.contains_table(&fk.referenced_table) {
                    continue;
                }
                let (unique, nullable) = table
                    .get_column(&fk.column)
                    .map(|c| (c.unique, c.is_nullable()))
                    .unwrap_or((false, true));

                edges.push(EdgeInfo {
                    from_table: table.name.clone(),
                    from_column: fk.column.clone(),
                    to_table: fk.referenced_table.clone(),
                    to_column: fk.referenced_column.clone(),
                    constraint: fk.name.clone(),
                    cardinality: EdgeCardinality::from_flags(unique, nullable),
                });
            }
        }

        Self { tables, edges }
    }

    /// Filter to include only tables matching the given patterns
    pub fn filter_tables(&mut self, patterns: &[Pattern]) {
        if patterns.is_empty() {
            return;
        }

        let matching: AHashSet<String> = self
            .tables
            .keys()
            .filter(|name| patterns.iter().any(|p| p.matches(name)))
            .cloned()
            .collect();

        self.retain_tables(&matching);
    }

    /// Exclude tables matching the given patterns
    pub fn exclude_tables(&mut self, patterns: &[Pattern]) {
        if patterns.is_empty() {
            return;
        }

        let remaining: AHashSet<String> = self
            .tables
            .keys()
            .filter(|name| !patterns.iter().any(|p| p.matches(name)))
            .cloned()
            .collect();

        self.retain_tables(&remaining);
    }

    /// Keep only the named tables and the edges between them
    pub fn retain_tables(&mut self, keep: &AHashSet<String>) {
        self.tables.retain(|n, _| keep.contains(n));
        self.edges
            .retain(|e| keep.contains(&e.from_table) && keep.contains(&e.to_table));
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Get tables sorted alphabetically
    pub fn sorted_tables(&self) -> Vec<&TableInfo> {
        let mut tables: Vec<_> = self.tables.values().collect();
        tables.sort_by(|a, b| a.name.cmp(&b.name));
        tables
    }

    pub fn get_table(&self, name: &str) -> Option<&TableInfo> {
        self.tables.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, ForeignKey, Table};

    fn shop() -> DatabaseSchema {
        let mut schema = DatabaseSchema::new("shop");
        schema.add_table(
            Table::new("users")
                .with_column(Column::new("id", "INT").with_primary_key().with_not_null())
                .with_column(Column::new("email", "VARCHAR(255)").with_unique()),
        );
        schema.add_table(
            Table::new("orders")
                .with_column(Column::new("id", "INT").with_primary_key().with_not_null())
                .with_column(Column::new("user_id", "INT").with_not_null())
                .with_foreign_key(ForeignKey::new("fk_orders_user", "user_id", "users", "id")),
        );
        schema.add_table(
            Table::new("audit_log")
                .with_column(Column::new("id", "INT").with_primary_key())
                .with_column(Column::new("ghost_id", "INT"))
                .with_foreign_key(ForeignKey::new("fk_ghost", "ghost_id", "ghosts", "id")),
        );
        schema
    }

    #[test]
    fn test_view_from_schema() {
        let view = GraphView::from_schema(&shop());

        assert_eq!(view.table_count(), 3);
        assert_eq!(view.edge_count(), 1);

        let orders = view.get_table("orders").unwrap();
        let user_id = orders.columns.iter().find(|c| c.name == "user_id").unwrap();
        assert!(user_id.is_foreign_key);
        assert!(!user_id.is_nullable);
        assert_eq!(user_id.references_table.as_deref(), Some("users"));
        assert_eq!(view.edges[0].cardinality, EdgeCardinality::ManyToOne);
    }

    #[test]
    fn test_dangling_fk_has_no_edge() {
        let view = GraphView::from_schema(&shop());
        assert!(view.edges.iter().all(|e| e.from_table != "audit_log"));

        let log = view.get_table("audit_log").unwrap();
        assert!(log.columns.iter().any(|c| c.is_foreign_key));
    }

    #[test]
    fn test_filter_tables() {
        let mut view = GraphView::from_schema(&shop());
        let patterns = vec![Pattern::new("user*").unwrap()];
        view.filter_tables(&patterns);

        assert_eq!(view.table_count(), 1);
        assert!(view.get_table("users").is_some());
        assert_eq!(view.edge_count(), 0);
    }

    #[test]
    fn test_exclude_tables() {
        let mut view = GraphView::from_schema(&shop());
        let patterns = vec![Pattern::new("audit_*").unwrap()];
        view.exclude_tables(&patterns);

        assert_eq!(view.table_count(), 2);
        assert_eq!(view.edge_count(), 1);
    }

    #[test]
    fn test_sorted_tables() {
        let view = GraphView::from_schema(&shop());
        let names: Vec<_> = view.sorted_tables().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["audit_log", "orders", "users"]);
    }

    #[test]
    fn test_edge_cardinality_flags() {
        assert_eq!(
            EdgeCardinality::from_flags(true, false).as_mermaid(),
            "|o--||"
        );
        assert_eq!(
            EdgeCardinality::from_flags(false, true).as_mermaid(),
            "}o--o|"
        );
    }
}
