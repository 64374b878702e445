//! Reverse engineering: logical schema to conceptual schema.
//!
//! Foreign keys only pin down the referencing side of a relationship, so the
//! referenced side is always given the conservative `0,n` and a warning says so.

use super::{Association, Attribute, Cardinality, ConceptualSchema, Entity, Participation};
use crate::schema::{DatabaseSchema, ForeignKey, Table};
use ahash::AHashSet;
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// Something the reverse mapping could not express exactly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReverseWarning {
    /// Table without primary key: the entity has no identifier
    MissingIdentifier { entity: String },
    /// Table with a composite primary key: every key column is flagged
    CompositeIdentifier { entity: String, columns: Vec<String> },
    /// Optionality of the referenced side was assumed to be `0,n`
    AssumedOptionalReferencedSide { association: String, entity: String },
    /// Primary key column that is also a foreign key: it stays the
    /// identifier, and converting back derives a second column for the
    /// association
    IdentifyingForeignKey {
        association: String,
        entity: String,
        column: String,
    },
    /// Foreign key to a table that is not part of the schema
    DanglingReference {
        table: String,
        foreign_key: String,
        referenced_table: String,
    },
}

impl fmt::Display for ReverseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReverseWarning::MissingIdentifier { entity } => {
                write!(f, "entity '{}' has no identifier (no primary key)", entity)
            }
            ReverseWarning::CompositeIdentifier { entity, columns } => write!(
                f,
                "entity '{}' has a composite primary key ({}); pick one identifier before converting",
                entity,
                columns.join(", ")
            ),
            ReverseWarning::AssumedOptionalReferencedSide {
                association,
                entity,
            } => write!(
                f,
                "association '{}': cardinality of '{}' assumed 0,n",
                association, entity
            ),
            ReverseWarning::IdentifyingForeignKey {
                association,
                entity,
                column,
            } => write!(
                f,
                "association '{}': '{}.{}' is both identifier and foreign key; conversion adds a separate column for it",
                association, entity, column
            ),
            ReverseWarning::DanglingReference {
                table,
                foreign_key,
                referenced_table,
            } => write!(
                f,
                "foreign key '{}' on '{}' references missing table '{}', no association created",
                foreign_key, table, referenced_table
            ),
        }
    }
}

/// Result of reverse engineering a logical schema
#[derive(Debug, Clone)]
pub struct ReverseEngineering {
    pub schema: ConceptualSchema,
    pub warnings: Vec<ReverseWarning>,
}

impl ConceptualSchema {
    /// Build a conceptual schema from a logical one.
    ///
    /// Tables become entities and foreign keys become binary associations
    /// named after the key. Never fails: anything that cannot be mapped
    /// exactly is reported as a [`ReverseWarning`].
    pub fn from_database(db: &DatabaseSchema) -> ReverseEngineering {
        let mut schema = ConceptualSchema::new(db.name());
        let mut warnings = Vec::new();

        for table in db.tables() {
            let (entity, warning) = entity_from_table(db, table);
            if let Some(w) = warning {
                warnings.push(w);
            }
            schema.add_entity(entity);
        }

        for table in db.tables() {
            // Composite keys are stored as one FK per column under a shared name
            let mut seen: AHashSet<(&str, &str)> = AHashSet::new();

            for fk in &table.foreign_keys {
                if !db.contains_table(&fk.referenced_table) {
                    warnings.push(ReverseWarning::DanglingReference {
                        table: table.name.clone(),
                        foreign_key: fk.name.clone(),
                        referenced_table: fk.referenced_table.clone(),
                    });
                    continue;
                }
                if !seen.insert((fk.name.as_str(), fk.referenced_table.as_str())) {
                    continue;
                }

                let association = association_from_fk(table, fk);
                debug!(
                    association = %association.name,
                    owner = %table.name,
                    referenced = %fk.referenced_table,
                    "foreign key mapped to association"
                );
                warnings.push(ReverseWarning::AssumedOptionalReferencedSide {
                    association: association.name.clone(),
                    entity: fk.referenced_table.clone(),
                });
                if table.get_column(&fk.column).is_some_and(|c| c.primary_key) {
                    warnings.push(ReverseWarning::IdentifyingForeignKey {
                        association: association.name.clone(),
                        entity: table.name.clone(),
                        column: fk.column.clone(),
                    });
                }
                schema.add_association(association);
            }
        }

        for w in &warnings {
            warn!("{}", w);
        }

        ReverseEngineering { schema, warnings }
    }
}

fn entity_from_table(db: &DatabaseSchema, table: &Table) -> (Entity, Option<ReverseWarning>) {
    let mut entity = Entity::new(&table.name);

    for column in &table.columns {
        // Resolved FK columns are carried by their association instead
        let carried_by_association = !column.primary_key
            && table
                .foreign_keys_for(&column.name)
                .any(|fk| db.contains_table(&fk.referenced_table));
        if carried_by_association {
            continue;
        }

        let mut attribute = Attribute::new(&column.name, &column.col_type);
        attribute.identifier = column.primary_key;
        entity.add_attribute(attribute);
    }

    let pk: Vec<String> = table
        .primary_key()
        .into_iter()
        .map(|c| c.name.clone())
        .collect();
    let warning = match pk.len() {
        0 => Some(ReverseWarning::MissingIdentifier {
            entity: table.name.clone(),
        }),
        1 => None,
        _ => Some(ReverseWarning::CompositeIdentifier {
            entity: table.name.clone(),
            columns: pk,
        }),
    };

    (entity, warning)
}

fn association_from_fk(table: &Table, fk: &ForeignKey) -> Association {
    let mandatory = table
        .get_column(&fk.column)
        .is_some_and(|c| c.not_null || c.primary_key);
    let owner = if mandatory {
        Cardinality::ONE_ONE
    } else {
        Cardinality::ZERO_ONE
    };

    let mut referenced = Participation::new(&fk.referenced_table, Cardinality::ZERO_MANY);
    if let Some(role) = role_for_column(&fk.column, &fk.referenced_table) {
        referenced = referenced.with_role(role);
    }

    let mut association = Association::new(&fk.name);
    association
        .participants
        .push(Participation::new(&table.name, owner));
    association.participants.push(referenced);
    association
}

/// Role that makes conversion derive `column` again, when the column is not
/// simply `<referenced>_id`.
fn role_for_column(column: &str, referenced_table: &str) -> Option<String> {
    let stem = column.strip_suffix("_id")?;
    if stem.is_empty() || stem == referenced_table.to_lowercase() {
        None
    } else {
        Some(stem.to_string())
    }
}
