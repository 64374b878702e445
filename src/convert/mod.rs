//! Conceptual to logical conversion.
//!
//! Entities become tables first, in insertion order. Associations are then
//! applied in insertion order:
//! - n-ary, or binary with both maxima `n`: a table named after the association
//! - binary with exactly one maximum `1`: a foreign key on the table of the
//!   participant whose maximum is `1`
//! - binary with both maxima `1`: a unique foreign key on the optional side,
//!   or on the first participant when that does not decide
//!
//! The source schema is validated up front and never modified.

mod warnings;

pub use warnings::{ConvertWarning, WarningCollector};

use crate::conceptual::{
    Association, Attribute, ConceptualSchema, Degree, Participation,
};
use crate::error::{Result, SchemaError};
use crate::schema::{default_fk_name, Column, DatabaseSchema, ForeignKey, Table};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default type of derived foreign key columns
pub const DEFAULT_FK_TYPE: &str = "INT";

/// Configuration for the converter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(default)]
pub struct ConvertOptions {
    /// Type given to derived foreign key columns
    pub foreign_key_type: String,
    /// Copy the referenced identifier's type instead of `foreign_key_type`
    pub inherit_identifier_type: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            foreign_key_type: DEFAULT_FK_TYPE.to_string(),
            inherit_identifier_type: false,
        }
    }
}

/// Output of a successful conversion
#[derive(Debug, Clone)]
pub struct Conversion {
    pub schema: DatabaseSchema,
    pub warnings: Vec<ConvertWarning>,
}

/// Which rule an association was converted with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Degree 3 or more
    NAryTable,
    /// Binary, both maxima `n`
    ManyToManyTable,
    /// Binary, exactly one maximum `1`
    OneToMany,
    /// Binary, both maxima `1`
    OneToOne,
}

impl Rule {
    /// Rule applied to a validated association
    pub fn for_association(association: &Association) -> Option<Rule> {
        match association.degree()? {
            Degree::NAry(_) => Some(Rule::NAryTable),
            Degree::Binary => {
                let a = association.participants[0].cardinality;
                let b = association.participants[1].cardinality;
                Some(match (a.is_one(), b.is_one()) {
                    (false, false) => Rule::ManyToManyTable,
                    (true, true) => Rule::OneToOne,
                    _ => Rule::OneToMany,
                })
            }
        }
    }
}

/// Conceptual to logical converter
#[derive(Debug, Clone, Default)]
pub struct Converter {
    options: ConvertOptions,
}

impl Converter {
    pub fn new(options: ConvertOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Convert `source` into a new logical schema.
    ///
    /// Fails with [`SchemaError::InvalidEntity`] or
    /// [`SchemaError::InvalidAssociation`] before producing any output.
    pub fn convert(&self, source: &ConceptualSchema) -> Result<Conversion> {
        source.validate()?;

        let mut warnings = WarningCollector::new();
        let mut schema = DatabaseSchema::new(source.name());

        for entity in source.entities() {
            let mut table = Table::new(&entity.name);
            for attr in &entity.attributes {
                let mut column = Column::new(&attr.name, &attr.attr_type);
                if attr.identifier {
                    column.primary_key = true;
                    column.not_null = true;
                }
                table.add_column(column);
            }
            schema.add_table(table);
        }

        for (_, association) in source.associations() {
            let rule = Rule::for_association(association).ok_or_else(|| {
                SchemaError::invalid_association(&association.name, "fewer than 2 participants")
            })?;
            debug!(association = %association.name, ?rule, "converting association");

            match rule {
                Rule::NAryTable | Rule::ManyToManyTable => {
                    let table = self.association_table(source, &schema, association, &mut warnings)?;
                    schema.add_table(table);
                }
                Rule::OneToMany | Rule::OneToOne => {
                    self.fold_foreign_key(source, &mut schema, association, rule, &mut warnings)?;
                }
            }
        }

        debug!(
            tables = schema.len(),
            warnings = warnings.count(),
            "conversion complete"
        );

        Ok(Conversion {
            schema,
            warnings: warnings.into_warnings(),
        })
    }

    /// Rules 1 and 2: one composite-key table per association
    fn association_table(
        &self,
        source: &ConceptualSchema,
        schema: &DatabaseSchema,
        association: &Association,
        warnings: &mut WarningCollector,
    ) -> Result<Table> {
        if schema.contains_table(&association.name) {
            return Err(SchemaError::invalid_association(
                &association.name,
                format!("a table named '{}' already exists", association.name),
            ));
        }

        let mut table = Table::new(&association.name);

        for slot in &association.participants {
            let identifier = identifier_of(source, slot, association)?;
            let column_name = claim_column_name(&table, &slot.column_stem(), warnings);

            table.add_column(
                Column::new(&column_name, self.fk_type(identifier))
                    .with_primary_key()
                    .with_not_null(),
            );
            table.add_foreign_key(ForeignKey::new(
                default_fk_name(&table.name, &column_name),
                &column_name,
                &slot.entity,
                &identifier.name,
            ));
        }

        for attr in &association.attributes {
            let name = unique_column_name(&table, &attr.name);
            if name != attr.name {
                warnings.add(ConvertWarning::ColumnRenamed {
                    table: table.name.clone(),
                    requested: attr.name.clone(),
                    actual: name.clone(),
                });
            }
            table.add_column(Column::new(name, &attr.attr_type));
        }

        Ok(table)
    }

    /// Rules 3 and 4: a foreign key on one participant's table
    fn fold_foreign_key(
        &self,
        source: &ConceptualSchema,
        schema: &mut DatabaseSchema,
        association: &Association,
        rule: Rule,
        warnings: &mut WarningCollector,
    ) -> Result<()> {
        let (holder, target) = split_binary(association, rule);
        let identifier = identifier_of(source, target, association)?;
        let fk_type = self.fk_type(identifier);

        let table = schema.get_table_mut(&holder.entity).ok_or_else(|| {
            SchemaError::invalid_association(
                &association.name,
                format!("unknown entity '{}'", holder.entity),
            )
        })?;

        let column_name = claim_column_name(table, &target.column_stem(), warnings);
        let mut column = Column::new(&column_name, fk_type);
        column.not_null = holder.cardinality.is_mandatory();
        column.unique = rule == Rule::OneToOne;

        debug!(
            association = %association.name,
            table = %table.name,
            column = %column_name,
            references = %target.entity,
            not_null = column.not_null,
            "foreign key placed"
        );

        table.add_column(column);
        table.add_foreign_key(ForeignKey::new(
            default_fk_name(&table.name, &column_name),
            &column_name,
            &target.entity,
            &identifier.name,
        ));

        if !association.attributes.is_empty() {
            let mut folded = Vec::with_capacity(association.attributes.len());
            for attr in &association.attributes {
                let name = unique_column_name(table, &attr.name);
                table.add_column(Column::new(&name, &attr.attr_type));
                folded.push(name);
            }
            warnings.add(ConvertWarning::AttributesFolded {
                association: association.name.clone(),
                table: table.name.clone(),
                attributes: folded,
            });
        }

        Ok(())
    }

    fn fk_type(&self, identifier: &Attribute) -> String {
        if self.options.inherit_identifier_type {
            identifier.attr_type.clone()
        } else {
            self.options.foreign_key_type.clone()
        }
    }
}

/// Convert with default options
pub fn convert(source: &ConceptualSchema) -> Result<Conversion> {
    Converter::default().convert(source)
}

/// Pick (holder, target) for a binary association converted by rule 3 or 4
fn split_binary(association: &Association, rule: Rule) -> (&Participation, &Participation) {
    let first = &association.participants[0];
    let second = &association.participants[1];

    let first_holds = match rule {
        Rule::OneToMany => first.cardinality.is_one(),
        // Optional side holds the key; ties go to the first participant
        _ => !(second.cardinality.is_optional() && first.cardinality.is_mandatory()),
    };

    if first_holds {
        (first, second)
    } else {
        (second, first)
    }
}

fn identifier_of<'a>(
    source: &'a ConceptualSchema,
    slot: &Participation,
    association: &Association,
) -> Result<&'a Attribute> {
    let entity = source.get_entity(&slot.entity).ok_or_else(|| {
        SchemaError::invalid_association(
            &association.name,
            format!("unknown entity '{}'", slot.entity),
        )
    })?;
    entity.identifier().ok_or_else(|| SchemaError::InvalidEntity {
        entity: entity.name.clone(),
        identifiers: entity.identifiers().map(|a| a.name.clone()).collect(),
    })
}

/// `<stem>_id`, suffixed when the table already has such a column
fn claim_column_name(table: &Table, stem: &str, warnings: &mut WarningCollector) -> String {
    let requested = format!("{}_id", stem);
    let actual = unique_column_name(table, &requested);
    if actual != requested {
        warnings.add(ConvertWarning::ColumnRenamed {
            table: table.name.clone(),
            requested,
            actual: actual.clone(),
        });
    }
    actual
}

fn unique_column_name(table: &Table, base: &str) -> String {
    if !table.has_column(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{}_{}", base, n))
        .find(|candidate| !table.has_column(candidate))
        .unwrap_or_else(|| base.to_string())
}
