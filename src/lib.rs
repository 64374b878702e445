//! Merise schema modeling engine.
//!
//! - [`schema`]: logical model (tables, columns, foreign keys), DDL import and
//!   dependency ordering
//! - [`conceptual`]: conceptual model (entities, associations, cardinalities)
//!   and reverse engineering from a logical schema
//! - [`convert`]: conceptual to logical conversion
//! - [`export`]: DDL generation per dialect
//! - [`graph`]: ERD rendering
//! - [`document`]: JSON / YAML schema documents

pub mod conceptual;
pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod export;
pub mod graph;
pub mod schema;

pub use error::{Result, SchemaError};
