//! Logical schema model: tables, columns and foreign keys.
//!
//! This module provides:
//! - The engine-agnostic relational model (`DatabaseSchema`, `Table`, `Column`, `ForeignKey`)
//! - DDL parsing for importing `CREATE TABLE` statements
//! - Dependency graph construction with topological ordering and cycle reporting
//!
//! Referential consistency is never enforced eagerly. Dangling foreign keys are
//! tolerated while a schema is being edited and reported by
//! [`DatabaseSchema::unresolved_references`] and the dependency orderer.

mod ddl;
mod graph;

pub use ddl::*;
pub use graph::*;

use crate::error::{MissingTarget, Result, SchemaError};
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a table within a schema (insertion order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u32);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TableId({})", self.0)
    }
}

/// Column definition within a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Column {
    /// Column name, unique within its table
    pub name: String,
    /// Engine-agnostic type descriptor, copied verbatim on import and conversion
    #[serde(rename = "type")]
    pub col_type: String,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub not_null: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub auto_increment: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, col_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            col_type: col_type.into(),
            primary_key: false,
            not_null: false,
            unique: false,
            auto_increment: false,
        }
    }

    pub fn with_primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn with_not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn with_unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn with_auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// A column is nullable unless it is NOT NULL or part of the primary key
    pub fn is_nullable(&self) -> bool {
        !self.not_null && !self.primary_key
    }
}

/// Single-column foreign key constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ForeignKey {
    /// Constraint name
    pub name: String,
    /// Column of the owning table
    pub column: String,
    /// Referenced table name
    pub referenced_table: String,
    /// Referenced column name
    pub referenced_column: String,
}

impl ForeignKey {
    pub fn new(
        name: impl Into<String>,
        column: impl Into<String>,
        referenced_table: impl Into<String>,
        referenced_column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            column: column.into(),
            referenced_table: referenced_table.into(),
            referenced_column: referenced_column.into(),
        }
    }

    /// Whether this key points back at its own table
    pub fn is_self_reference(&self, owner: &str) -> bool {
        self.referenced_table == owner
    }
}

/// Complete table definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Table {
    /// Table name
    pub name: String,
    /// Column definitions in order
    #[serde(default)]
    pub columns: Vec<Column>,
    /// Foreign key constraints
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    /// Create a new empty table
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Builder-style column append, used heavily by tests and conversion
    pub fn with_column(mut self, column: Column) -> Self {
        self.add_column(column);
        self
    }

    pub fn with_foreign_key(mut self, fk: ForeignKey) -> Self {
        self.add_foreign_key(fk);
        self
    }

    /// Add a column. A column with the same name is replaced in place.
    pub fn add_column(&mut self, column: Column) {
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
    }

    /// Remove a column and every foreign key it owns
    pub fn remove_column(&mut self, name: &str) -> Option<Column> {
        let pos = self.columns.iter().position(|c| c.name == name)?;
        self.foreign_keys.retain(|fk| fk.column != name);
        Some(self.columns.remove(pos))
    }

    /// Get a column by name (case-sensitive)
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn get_column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.get_column(name).is_some()
    }

    /// Primary key columns in declaration order
    pub fn primary_key(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.primary_key).collect()
    }

    pub fn add_foreign_key(&mut self, fk: ForeignKey) {
        self.foreign_keys.push(fk);
    }

    /// Remove every foreign key with the given constraint name
    pub fn remove_foreign_key(&mut self, name: &str) -> Vec<ForeignKey> {
        let (removed, kept) = std::mem::take(&mut self.foreign_keys)
            .into_iter()
            .partition(|fk| fk.name == name);
        self.foreign_keys = kept;
        removed
    }

    /// Foreign keys owned by a given column
    pub fn foreign_keys_for<'a>(
        &'a self,
        column: &'a str,
    ) -> impl Iterator<Item = &'a ForeignKey> + 'a {
        self.foreign_keys.iter().filter(move |fk| fk.column == column)
    }

    pub fn is_foreign_key_column(&self, column: &str) -> bool {
        self.foreign_keys_for(column).next().is_some()
    }

    pub fn has_self_reference(&self) -> bool {
        self.foreign_keys
            .iter()
            .any(|fk| fk.is_self_reference(&self.name))
    }
}

/// A foreign key that cannot be resolved inside its schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct DanglingReference {
    pub table: String,
    pub foreign_key: String,
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
    pub missing: MissingTarget,
}

impl DanglingReference {
    pub fn into_error(self) -> SchemaError {
        SchemaError::DanglingForeignKey {
            table: self.table,
            foreign_key: self.foreign_key,
            referenced_table: self.referenced_table,
            referenced_column: self.referenced_column,
            missing: self.missing,
        }
    }
}

impl fmt::Display for DanglingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.missing {
            MissingTarget::LocalColumn => write!(
                f,
                "{}.{} ({}) is not a column of {}",
                self.table, self.column, self.foreign_key, self.table
            ),
            _ => write!(
                f,
                "{}.{} -> {}.{} ({}): {} not found",
                self.table,
                self.column,
                self.referenced_table,
                self.referenced_column,
                self.foreign_key,
                self.missing
            ),
        }
    }
}

/// Complete logical database schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSchema {
    name: String,
    tables: IndexMap<String, Table, ahash::RandomState>,
}

impl DatabaseSchema {
    /// Default name for schemas created without one
    pub const DEFAULT_NAME: &'static str = "db";

    /// Create a new empty schema. A blank name falls back to `db`.
    pub fn new(name: impl Into<String>) -> Self {
        let mut schema = Self {
            name: String::new(),
            tables: IndexMap::default(),
        };
        schema.set_name(name);
        schema
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.name = if name.trim().is_empty() {
            Self::DEFAULT_NAME.to_string()
        } else {
            name
        };
    }

    /// Add a table, replacing any table of the same name (last write wins).
    /// A replaced table keeps its original position.
    pub fn add_table(&mut self, table: Table) -> TableId {
        let (index, _) = self.tables.insert_full(table.name.clone(), table);
        TableId(index as u32)
    }

    /// Remove a table by name; absent names are a no-op
    pub fn remove_table(&mut self, name: &str) -> Option<Table> {
        self.tables.shift_remove(name)
    }

    /// Get table by name (case-sensitive)
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn get_table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Get table ID by name
    pub fn get_table_id(&self, name: &str) -> Option<TableId> {
        self.tables.get_index_of(name).map(|i| TableId(i as u32))
    }

    /// Get table by ID
    pub fn table(&self, id: TableId) -> Option<&Table> {
        self.tables.get_index(id.0 as usize).map(|(_, t)| t)
    }

    /// Iterate over all tables in insertion order
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(|k| k.as_str())
    }

    /// Get the number of tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Check if schema is empty
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Remove every table and reset the name
    pub fn clear(&mut self) {
        self.name = Self::DEFAULT_NAME.to_string();
        self.tables.clear();
    }

    /// Rename a table in place, rewriting every foreign key that references it.
    ///
    /// Returns `false` when `old` does not exist or `new` is already taken.
    pub fn rename_table(&mut self, old: &str, new: &str) -> bool {
        if old == new {
            return self.contains_table(old);
        }
        if self.contains_table(new) {
            return false;
        }
        let Some(index) = self.tables.get_index_of(old) else {
            return false;
        };
        let Some(mut table) = self.tables.shift_remove(old) else {
            return false;
        };
        table.name = new.to_string();
        self.tables.shift_insert(index, new.to_string(), table);

        for table in self.tables.values_mut() {
            for fk in &mut table.foreign_keys {
                if fk.referenced_table == old {
                    fk.referenced_table = new.to_string();
                }
            }
        }
        true
    }

    /// Rename a column, rewriting the owning table's foreign keys and every
    /// foreign key that references it.
    pub fn rename_column(&mut self, table: &str, old: &str, new: &str) -> bool {
        let Some(owner) = self.tables.get_mut(table) else {
            return false;
        };
        if old != new && owner.has_column(new) {
            return false;
        }
        let Some(column) = owner.get_column_mut(old) else {
            return false;
        };
        column.name = new.to_string();
        for fk in &mut owner.foreign_keys {
            if fk.column == old {
                fk.column = new.to_string();
            }
        }

        for other in self.tables.values_mut() {
            for fk in &mut other.foreign_keys {
                if fk.referenced_table == table && fk.referenced_column == old {
                    fk.referenced_column = new.to_string();
                }
            }
        }
        true
    }

    /// Every foreign key whose owning column, referenced table or referenced
    /// column does not exist, in table order.
    pub fn unresolved_references(&self) -> Vec<DanglingReference> {
        let mut dangling = Vec::new();

        for table in self.tables.values() {
            for fk in &table.foreign_keys {
                let missing = if !table.has_column(&fk.column) {
                    Some(MissingTarget::LocalColumn)
                } else {
                    match self.tables.get(&fk.referenced_table) {
                        None => Some(MissingTarget::Table),
                        Some(target) if !target.has_column(&fk.referenced_column) => {
                            Some(MissingTarget::Column)
                        }
                        Some(_) => None,
                    }
                };

                if let Some(missing) = missing {
                    dangling.push(DanglingReference {
                        table: table.name.clone(),
                        foreign_key: fk.name.clone(),
                        column: fk.column.clone(),
                        referenced_table: fk.referenced_table.clone(),
                        referenced_column: fk.referenced_column.clone(),
                        missing,
                    });
                }
            }
        }

        dangling
    }

    /// Check that the schema is closed: every foreign key resolves.
    pub fn validate(&self) -> Result<()> {
        match self.unresolved_references().into_iter().next() {
            Some(dangling) => Err(dangling.into_error()),
            None => Ok(()),
        }
    }
}

impl Default for DatabaseSchema {
    fn default() -> Self {
        Self::new(Self::DEFAULT_NAME)
    }
}
