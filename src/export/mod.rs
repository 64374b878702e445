//! DDL export for MySQL, PostgreSQL and SQLite.
//!
//! The schema is validated and ordered first, so the generated script never
//! creates a table before the tables it references. Column types are written
//! verbatim; only auto-increment handling differs per dialect.

use crate::error::Result;
use crate::schema::{dependency_order, Column, DatabaseSchema, Table};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::str::FromStr;
use tracing::debug;

/// Target SQL dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    #[default]
    MySql,
    Postgres,
    Sqlite,
}

impl FromStr for SqlDialect {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(SqlDialect::MySql),
            "postgres" | "postgresql" | "pg" => Ok(SqlDialect::Postgres),
            "sqlite" | "sqlite3" => Ok(SqlDialect::Sqlite),
            _ => Err(format!(
                "Unknown dialect: {}. Valid options: mysql, postgres, sqlite",
                s
            )),
        }
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlDialect::MySql => write!(f, "mysql"),
            SqlDialect::Postgres => write!(f, "postgres"),
            SqlDialect::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl SqlDialect {
    /// Quote an identifier based on dialect
    pub fn quote_identifier(&self, name: &str) -> String {
        match self {
            SqlDialect::MySql => format!("`{}`", name.replace('`', "``")),
            SqlDialect::Postgres | SqlDialect::Sqlite => {
                format!("\"{}\"", name.replace('"', "\"\""))
            }
        }
    }

    /// SQLite cannot add foreign keys to an existing table
    pub fn supports_alter_foreign_keys(&self) -> bool {
        !matches!(self, SqlDialect::Sqlite)
    }
}

/// Where foreign key constraints are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ForeignKeyStyle {
    /// Inside each `CREATE TABLE`
    #[default]
    Inline,
    /// Trailing `ALTER TABLE ... ADD CONSTRAINT` statements
    AlterTable,
}

impl FromStr for ForeignKeyStyle {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inline" => Ok(ForeignKeyStyle::Inline),
            "alter" | "alter_table" | "alter-table" => Ok(ForeignKeyStyle::AlterTable),
            _ => Err(format!(
                "Unknown foreign key style: {}. Valid options: inline, alter",
                s
            )),
        }
    }
}

impl fmt::Display for ForeignKeyStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForeignKeyStyle::Inline => write!(f, "inline"),
            ForeignKeyStyle::AlterTable => write!(f, "alter_table"),
        }
    }
}

/// Export settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ExportOptions {
    pub dialect: SqlDialect,
    pub foreign_keys: ForeignKeyStyle,
    /// Leading comment block with schema name and generation time
    pub header: bool,
    /// Drop and recreate the database (schema on PostgreSQL) before the tables
    pub create_database: bool,
    /// Quote every identifier
    pub quote_identifiers: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            dialect: SqlDialect::default(),
            foreign_keys: ForeignKeyStyle::default(),
            header: true,
            create_database: false,
            quote_identifiers: false,
        }
    }
}

/// A foreign key constraint as written, composite keys regrouped by name
#[derive(Debug, Clone, PartialEq, Eq)]
struct ConstraintDef<'a> {
    name: &'a str,
    columns: Vec<&'a str>,
    referenced_table: &'a str,
    referenced_columns: Vec<&'a str>,
}

/// DDL generator
#[derive(Debug, Clone, Default)]
pub struct DdlExporter {
    options: ExportOptions,
}

impl DdlExporter {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Generate the DDL script for `schema`.
    ///
    /// Fails with `DanglingForeignKey` or `CircularReference` without
    /// producing any output.
    pub fn export(&self, schema: &DatabaseSchema) -> Result<String> {
        schema.validate()?;
        let order = dependency_order(schema)?;

        let style = if self.options.foreign_keys == ForeignKeyStyle::AlterTable
            && !self.options.dialect.supports_alter_foreign_keys()
        {
            debug!(dialect = %self.options.dialect, "ALTER TABLE constraints unsupported, writing them inline");
            ForeignKeyStyle::Inline
        } else {
            self.options.foreign_keys
        };

        let mut out = String::new();
        if self.options.header {
            self.write_header(&mut out, schema);
        }
        if self.options.create_database {
            self.write_database_preamble(&mut out, schema.name());
        }

        let mut deferred = Vec::new();
        for name in &order {
            let Some(table) = schema.get_table(name) else {
                continue;
            };
            let constraints = group_foreign_keys(table);
            match style {
                ForeignKeyStyle::Inline => self.write_create_table(&mut out, table, &constraints),
                ForeignKeyStyle::AlterTable => {
                    self.write_create_table(&mut out, table, &[]);
                    deferred.push((table, constraints));
                }
            }
        }

        for (table, constraints) in deferred {
            for fk in constraints {
                let _ = writeln!(
                    out,
                    "ALTER TABLE {} ADD {};",
                    self.ident(&table.name),
                    self.constraint_clause(&fk)
                );
            }
        }

        debug!(tables = order.len(), dialect = %self.options.dialect, "schema exported");
        Ok(out)
    }

    fn write_header(&self, out: &mut String, schema: &DatabaseSchema) {
        let _ = writeln!(out, "-- Generated by merise {}", env!("CARGO_PKG_VERSION"));
        let _ = writeln!(out, "-- Schema: {}", schema.name());
        let _ = writeln!(out, "-- Dialect: {}", self.options.dialect);
        let _ = writeln!(
            out,
            "-- Date: {}",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        );
        out.push('\n');
    }

    fn write_database_preamble(&self, out: &mut String, name: &str) {
        let name = self.ident(name);
        match self.options.dialect {
            SqlDialect::MySql => {
                let _ = writeln!(out, "DROP DATABASE IF EXISTS {};", name);
                let _ = writeln!(out, "CREATE DATABASE {};", name);
                let _ = writeln!(out, "USE {};", name);
            }
            SqlDialect::Postgres => {
                let _ = writeln!(out, "DROP SCHEMA IF EXISTS {} CASCADE;", name);
                let _ = writeln!(out, "CREATE SCHEMA {};", name);
                let _ = writeln!(out, "SET search_path TO {};", name);
            }
            SqlDialect::Sqlite => {
                debug!("sqlite has no databases to create, skipping preamble");
                return;
            }
        }
        out.push('\n');
    }

    fn write_create_table(&self, out: &mut String, table: &Table, constraints: &[ConstraintDef]) {
        let pk = table.primary_key();
        let inline_pk = pk.len() == 1;

        let mut lines: Vec<String> = table
            .columns
            .iter()
            .map(|col| self.column_definition(col, inline_pk && col.primary_key))
            .collect();

        if pk.len() > 1 {
            let cols: Vec<String> = pk.iter().map(|c| self.ident(&c.name)).collect();
            lines.push(format!("PRIMARY KEY ({})", cols.join(", ")));
        }
        for fk in constraints {
            lines.push(self.constraint_clause(fk));
        }

        let _ = writeln!(out, "CREATE TABLE {} (", self.ident(&table.name));
        for (i, line) in lines.iter().enumerate() {
            let sep = if i + 1 < lines.len() { "," } else { "" };
            let _ = writeln!(out, "    {}{}", line, sep);
        }
        out.push_str(");\n\n");
    }

    fn column_definition(&self, col: &Column, inline_pk: bool) -> String {
        let mut def = format!("{} ", self.ident(&col.name));

        match (self.options.dialect, col.auto_increment) {
            (SqlDialect::MySql, true) => {
                let _ = write!(def, "{} AUTO_INCREMENT", col.col_type);
            }
            (SqlDialect::Postgres, true) => match serial_type(&col.col_type) {
                Some(serial) => def.push_str(serial),
                None => {
                    let _ = write!(def, "{} GENERATED BY DEFAULT AS IDENTITY", col.col_type);
                }
            },
            (SqlDialect::Sqlite, true) if inline_pk => {
                // Only an INTEGER PRIMARY KEY can autoincrement
                def.push_str("INTEGER PRIMARY KEY AUTOINCREMENT");
                if col.not_null {
                    def.push_str(" NOT NULL");
                }
                return def;
            }
            _ => def.push_str(&col.col_type),
        }

        if inline_pk {
            def.push_str(" PRIMARY KEY");
        }
        if col.not_null {
            def.push_str(" NOT NULL");
        }
        if col.unique && !col.primary_key {
            def.push_str(" UNIQUE");
        }
        def
    }

    fn constraint_clause(&self, fk: &ConstraintDef) -> String {
        let cols: Vec<String> = fk.columns.iter().map(|c| self.ident(c)).collect();
        let refs: Vec<String> = fk.referenced_columns.iter().map(|c| self.ident(c)).collect();
        format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            self.ident(fk.name),
            cols.join(", "),
            self.ident(fk.referenced_table),
            refs.join(", ")
        )
    }

    fn ident(&self, name: &str) -> String {
        if self.options.quote_identifiers {
            self.options.dialect.quote_identifier(name)
        } else {
            name.to_string()
        }
    }
}

/// Export with the given options
pub fn export_ddl(schema: &DatabaseSchema, options: &ExportOptions) -> Result<String> {
    DdlExporter::new(options.clone()).export(schema)
}

/// Regroup single-column keys sharing a name and target into one constraint
fn group_foreign_keys(table: &Table) -> Vec<ConstraintDef<'_>> {
    let mut groups: Vec<ConstraintDef> = Vec::new();
    for fk in &table.foreign_keys {
        match groups
            .iter_mut()
            .find(|g| g.name == fk.name && g.referenced_table == fk.referenced_table)
        {
            Some(group) => {
                group.columns.push(fk.column.as_str());
                group.referenced_columns.push(fk.referenced_column.as_str());
            }
            None => groups.push(ConstraintDef {
                name: fk.name.as_str(),
                columns: vec![fk.column.as_str()],
                referenced_table: fk.referenced_table.as_str(),
                referenced_columns: vec![fk.referenced_column.as_str()],
            }),
        }
    }
    groups
}

fn serial_type(col_type: &str) -> Option<&'static str> {
    match col_type.trim().to_uppercase().as_str() {
        "INT" | "INTEGER" | "INT4" => Some("SERIAL"),
        "BIGINT" | "INT8" => Some("BIGSERIAL"),
        "SMALLINT" | "INT2" => Some("SMALLSERIAL"),
        _ => None,
    }
}
