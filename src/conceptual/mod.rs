//! Conceptual (Merise) schema model: entities, attributes and associations.
//!
//! Entities are keyed by name in insertion order. Associations are kept in
//! insertion order as well and are addressed by the [`AssociationId`] handed
//! out when they are added, so two associations may share a name.
//!
//! The model never holds an association whose participants are missing from
//! the schema through the mutation API: removing an entity removes every
//! association it takes part in.

mod cardinality;
mod reverse;

pub use cardinality::{Cardinality, MaxBound, MinBound};
pub use reverse::{ReverseEngineering, ReverseWarning};

use crate::error::{Result, SchemaError};
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity or association attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Attribute {
    pub name: String,
    /// Conceptual type, copied verbatim into the column type on conversion
    #[serde(rename = "type")]
    pub attr_type: String,
    /// Whether this attribute identifies the entity
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub identifier: bool,
}

impl Attribute {
    pub fn new(name: impl Into<String>, attr_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attr_type: attr_type.into(),
            identifier: false,
        }
    }

    pub fn identifier(name: impl Into<String>, attr_type: impl Into<String>) -> Self {
        Self {
            identifier: true,
            ..Self::new(name, attr_type)
        }
    }
}

/// Entity with ordered attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Entity {
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.add_attribute(attribute);
        self
    }

    /// Add an attribute. An attribute with the same name is replaced in place.
    pub fn add_attribute(&mut self, attribute: Attribute) {
        match self.attributes.iter_mut().find(|a| a.name == attribute.name) {
            Some(existing) => *existing = attribute,
            None => self.attributes.push(attribute),
        }
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<Attribute> {
        let pos = self.attributes.iter().position(|a| a.name == name)?;
        Some(self.attributes.remove(pos))
    }

    pub fn get_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn get_attribute_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.attributes.iter_mut().find(|a| a.name == name)
    }

    /// Make `name` the only identifier attribute.
    ///
    /// Returns `false`, leaving the flags untouched, when there is no such attribute.
    pub fn set_identifier(&mut self, name: &str) -> bool {
        if self.get_attribute(name).is_none() {
            return false;
        }
        for attr in &mut self.attributes {
            attr.identifier = attr.name == name;
        }
        true
    }

    /// Every attribute flagged as identifier
    pub fn identifiers(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().filter(|a| a.identifier)
    }

    /// The identifier attribute, when exactly one is flagged
    pub fn identifier(&self) -> Option<&Attribute> {
        let mut ids = self.identifiers();
        match (ids.next(), ids.next()) {
            (Some(id), None) => Some(id),
            _ => None,
        }
    }

    /// Fails with [`SchemaError::InvalidEntity`] unless exactly one attribute
    /// is an identifier.
    pub fn validate(&self) -> Result<()> {
        if self.identifier().is_some() {
            return Ok(());
        }
        Err(SchemaError::InvalidEntity {
            entity: self.name.clone(),
            identifiers: self.identifiers().map(|a| a.name.clone()).collect(),
        })
    }
}

/// One slot of an association
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participation {
    /// Name of the participating entity
    pub entity: String,
    pub cardinality: Cardinality,
    /// Distinguishes the slots of a reflexive association; also names the
    /// derived column (`<role>_id`)
    pub role: Option<String>,
}

impl Participation {
    pub fn new(entity: impl Into<String>, cardinality: Cardinality) -> Self {
        Self {
            entity: entity.into(),
            cardinality,
            role: None,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Base name of the column derived from this slot
    pub fn column_stem(&self) -> String {
        match &self.role {
            Some(role) => role.to_lowercase(),
            None => self.entity.to_lowercase(),
        }
    }
}

impl fmt::Display for Participation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.role {
            Some(role) => write!(f, "{} as {} ({})", self.entity, role, self.cardinality),
            None => write!(f, "{} ({})", self.entity, self.cardinality),
        }
    }
}

/// Number of slots of an association
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degree {
    Binary,
    NAry(usize),
}

impl fmt::Display for Degree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degree::Binary => write!(f, "binary"),
            Degree::NAry(n) => write!(f, "{}-ary", n),
        }
    }
}

/// Association between two or more entity slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    pub name: String,
    pub participants: Vec<Participation>,
    /// Attributes owned by the association
    pub attributes: Vec<Attribute>,
}

impl Association {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            participants: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn with_participant(mut self, entity: impl Into<String>, cardinality: Cardinality) -> Self {
        self.participants
            .push(Participation::new(entity, cardinality));
        self
    }

    pub fn with_role(
        mut self,
        entity: impl Into<String>,
        cardinality: Cardinality,
        role: impl Into<String>,
    ) -> Self {
        self.participants
            .push(Participation::new(entity, cardinality).with_role(role));
        self
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// `None` for associations with fewer than two slots
    pub fn degree(&self) -> Option<Degree> {
        match self.participants.len() {
            0 | 1 => None,
            2 => Some(Degree::Binary),
            n => Some(Degree::NAry(n)),
        }
    }

    /// Whether `entity` occupies at least one slot
    pub fn involves(&self, entity: &str) -> bool {
        self.participants.iter().any(|p| p.entity == entity)
    }

    /// Whether the same entity occupies several slots
    pub fn is_reflexive(&self) -> bool {
        self.participants
            .iter()
            .enumerate()
            .any(|(i, p)| self.participants[..i].iter().any(|q| q.entity == p.entity))
    }
}

/// Identity of an association within its schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssociationId(pub u32);

impl fmt::Display for AssociationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssociationId({})", self.0)
    }
}

/// Complete conceptual schema
#[derive(Debug, Clone)]
pub struct ConceptualSchema {
    name: String,
    entities: IndexMap<String, Entity, ahash::RandomState>,
    associations: Vec<(AssociationId, Association)>,
    next_id: u32,
}

impl ConceptualSchema {
    /// Default name for schemas created without one
    pub const DEFAULT_NAME: &'static str = "schema";

    /// Create a new empty schema. A blank name falls back to `schema`.
    pub fn new(name: impl Into<String>) -> Self {
        let mut schema = Self {
            name: String::new(),
            entities: IndexMap::default(),
            associations: Vec::new(),
            next_id: 0,
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

    /// Add an entity, replacing any entity of the same name in place
    pub fn add_entity(&mut self, entity: Entity) {
        self.entities.insert(entity.name.clone(), entity);
    }

    /// Remove an entity together with every association it takes part in
    pub fn remove_entity(&mut self, name: &str) -> Option<Entity> {
        let entity = self.entities.shift_remove(name)?;
        self.associations.retain(|(_, a)| !a.involves(name));
        Some(entity)
    }

    pub fn get_entity(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }

    pub fn get_entity_mut(&mut self, name: &str) -> Option<&mut Entity> {
        self.entities.get_mut(name)
    }

    pub fn contains_entity(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    /// Entities in insertion order
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Rename an entity in place and rewrite every participation naming it.
    ///
    /// Returns `false` when `old` does not exist or `new` is already taken.
    pub fn rename_entity(&mut self, old: &str, new: &str) -> bool {
        if old == new {
            return self.contains_entity(old);
        }
        if self.contains_entity(new) {
            return false;
        }
        let Some(index) = self.entities.get_index_of(old) else {
            return false;
        };
        let Some(mut entity) = self.entities.shift_remove(old) else {
            return false;
        };
        entity.name = new.to_string();
        self.entities.shift_insert(index, new.to_string(), entity);

        for (_, assoc) in &mut self.associations {
            for slot in &mut assoc.participants {
                if slot.entity == old {
                    slot.entity = new.to_string();
                }
            }
        }
        true
    }

    /// Add an association and return its identity
    pub fn add_association(&mut self, association: Association) -> AssociationId {
        let id = AssociationId(self.next_id);
        self.next_id += 1;
        self.associations.push((id, association));
        id
    }

    /// Remove an association by identity; unknown ids are a no-op
    pub fn remove_association(&mut self, id: AssociationId) -> Option<Association> {
        let pos = self.associations.iter().position(|(a, _)| *a == id)?;
        Some(self.associations.remove(pos).1)
    }

    pub fn association(&self, id: AssociationId) -> Option<&Association> {
        self.associations
            .iter()
            .find(|(a, _)| *a == id)
            .map(|(_, assoc)| assoc)
    }

    pub fn association_mut(&mut self, id: AssociationId) -> Option<&mut Association> {
        self.associations
            .iter_mut()
            .find(|(a, _)| *a == id)
            .map(|(_, assoc)| assoc)
    }

    /// First association with the given name
    pub fn association_named(&self, name: &str) -> Option<(AssociationId, &Association)> {
        self.associations
            .iter()
            .find(|(_, a)| a.name == name)
            .map(|(id, a)| (*id, a))
    }

    /// Associations in insertion order
    pub fn associations(&self) -> impl Iterator<Item = (AssociationId, &Association)> {
        self.associations.iter().map(|(id, a)| (*id, a))
    }

    pub fn association_count(&self) -> usize {
        self.associations.len()
    }

    /// Associations in which `entity` occupies at least one slot
    pub fn associations_for<'a>(
        &'a self,
        entity: &'a str,
    ) -> impl Iterator<Item = (AssociationId, &'a Association)> + 'a {
        self.associations()
            .filter(move |(_, a)| a.involves(entity))
    }

    /// Check an association against this schema: at least two slots, every
    /// participant present.
    pub fn validate_association(&self, association: &Association) -> Result<()> {
        if association.participants.len() < 2 {
            return Err(SchemaError::invalid_association(
                &association.name,
                format!(
                    "{} participant(s), at least 2 are required",
                    association.participants.len()
                ),
            ));
        }
        for slot in &association.participants {
            if !self.contains_entity(&slot.entity) {
                return Err(SchemaError::invalid_association(
                    &association.name,
                    format!("unknown entity '{}'", slot.entity),
                ));
            }
        }
        Ok(())
    }

    /// Every check conversion relies on: entities first, then associations,
    /// each in insertion order.
    pub fn validate(&self) -> Result<()> {
        for entity in self.entities() {
            entity.validate()?;
        }
        for (_, assoc) in self.associations() {
            self.validate_association(assoc)?;
        }
        Ok(())
    }
}

impl Default for ConceptualSchema {
    fn default() -> Self {
        Self::new(Self::DEFAULT_NAME)
    }
}
