//! Schema documents: JSON / YAML files holding either model, and `.sql`
//! inputs (optionally compressed) read through DDL import.
//!
//! A document names its model with a `kind` tag:
//!
//! ```yaml
//! kind: conceptual
//! name: shop
//! entities:
//!   - name: CLIENT
//!     attributes:
//!       - { name: id, type: INT, identifier: true }
//! associations: []
//! ```

use crate::conceptual::{Association, Attribute, ConceptualSchema, Entity, Participation};
use crate::error::SchemaError;
use crate::schema::{parse_ddl, DatabaseSchema, Table};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Errors raised while reading or writing schema documents
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML document: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("cannot tell the format of {}: expected .sql, .json, .yaml or .yml", .0.display())]
    UnknownFormat(PathBuf),

    #[error("expected a {expected} schema, got a {found} schema")]
    WrongKind {
        expected: &'static str,
        found: &'static str,
    },

    #[error("{0} is an input-only format")]
    NotWritable(DocumentFormat),
}

/// Compression format detected from file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Xz,
    Zstd,
}

impl Compression {
    /// Detect compression format from file extension
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("gz" | "gzip") => Compression::Gzip,
            Some("bz2" | "bzip2") => Compression::Bzip2,
            Some("xz" | "lzma") => Compression::Xz,
            Some("zst" | "zstd") => Compression::Zstd,
            _ => Compression::None,
        }
    }

    /// Wrap a reader with the appropriate decompressor
    pub fn wrap_reader<'a>(&self, reader: Box<dyn Read + 'a>) -> std::io::Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Compression::None => reader,
            Compression::Gzip => Box::new(flate2::read::GzDecoder::new(reader)),
            Compression::Bzip2 => Box::new(bzip2::read::BzDecoder::new(reader)),
            Compression::Xz => Box::new(xz2::read::XzDecoder::new(reader)),
            Compression::Zstd => Box::new(zstd::stream::read::Decoder::new(reader)?),
        })
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            Compression::Gzip => write!(f, "gzip"),
            Compression::Bzip2 => write!(f, "bzip2"),
            Compression::Xz => write!(f, "xz"),
            Compression::Zstd => write!(f, "zstd"),
        }
    }
}

/// On-disk format of a schema file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
    /// DDL script, read through the DDL importer
    Sql,
}

impl DocumentFormat {
    /// Detect the format from the extension, looking past a compression suffix
    pub fn from_path(path: &Path) -> Option<Self> {
        let inner = match Compression::from_path(path) {
            Compression::None => path.to_path_buf(),
            _ => path.with_extension(""),
        };
        let ext = inner.extension()?.to_str()?.to_lowercase();
        ext.parse().ok()
    }
}

impl FromStr for DocumentFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(DocumentFormat::Json),
            "yaml" | "yml" => Ok(DocumentFormat::Yaml),
            "sql" | "ddl" => Ok(DocumentFormat::Sql),
            _ => Err(format!(
                "Unknown document format: {}. Valid options: json, yaml, sql",
                s
            )),
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Json => write!(f, "json"),
            DocumentFormat::Yaml => write!(f, "yaml"),
            DocumentFormat::Sql => write!(f, "sql"),
        }
    }
}

/// Serialized logical schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LogicalDocument {
    #[serde(default)]
    pub name: String,
    /// Tables in insertion order
    #[serde(default)]
    pub tables: Vec<Table>,
}

impl From<&DatabaseSchema> for LogicalDocument {
    fn from(schema: &DatabaseSchema) -> Self {
        Self {
            name: schema.name().to_string(),
            tables: schema.tables().cloned().collect(),
        }
    }
}

impl LogicalDocument {
    /// Build the schema. Duplicate table names follow `add_table`: last wins.
    pub fn into_schema(self) -> DatabaseSchema {
        let mut schema = DatabaseSchema::new(self.name);
        for table in self.tables {
            schema.add_table(table);
        }
        schema
    }
}

/// Serialized association slot; the cardinality is kept as text (`"0,n"`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ParticipationDocument {
    pub entity: String,
    /// One of `0,1`, `1,1`, `0,n`, `1,n`
    pub cardinality: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Serialized association
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AssociationDocument {
    pub name: String,
    pub participants: Vec<ParticipationDocument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
}

/// Serialized conceptual schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ConceptualDocument {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub associations: Vec<AssociationDocument>,
}

impl From<&ConceptualSchema> for ConceptualDocument {
    fn from(schema: &ConceptualSchema) -> Self {
        Self {
            name: schema.name().to_string(),
            entities: schema.entities().cloned().collect(),
            associations: schema
                .associations()
                .map(|(_, a)| AssociationDocument {
                    name: a.name.clone(),
                    participants: a
                        .participants
                        .iter()
                        .map(|p| ParticipationDocument {
                            entity: p.entity.clone(),
                            cardinality: p.cardinality.to_string(),
                            role: p.role.clone(),
                        })
                        .collect(),
                    attributes: a.attributes.clone(),
                })
                .collect(),
        }
    }
}

impl ConceptualDocument {
    /// Build the schema, rejecting associations with fewer than two slots or
    /// an unparseable cardinality with [`SchemaError::InvalidAssociation`].
    ///
    /// Associations are not checked against the entity list here: that is
    /// what [`ConceptualSchema::validate`] is for.
    pub fn into_schema(self) -> Result<ConceptualSchema, SchemaError> {
        let mut schema = ConceptualSchema::new(self.name);
        for entity in self.entities {
            schema.add_entity(entity);
        }

        for doc in self.associations {
            if doc.participants.len() < 2 {
                return Err(SchemaError::invalid_association(
                    &doc.name,
                    format!(
                        "{} participant(s), at least 2 are required",
                        doc.participants.len()
                    ),
                ));
            }

            let mut association = Association::new(&doc.name);
            association.attributes = doc.attributes;
            for slot in doc.participants {
                let cardinality = slot.cardinality.parse().map_err(|reason: String| {
                    SchemaError::InvalidAssociation {
                        association: doc.name.clone(),
                        reason,
                    }
                })?;
                association.participants.push(Participation {
                    entity: slot.entity,
                    cardinality,
                    role: slot.role,
                });
            }
            schema.add_association(association);
        }

        Ok(schema)
    }
}

/// A schema document of either kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SchemaDocument {
    Logical(LogicalDocument),
    Conceptual(ConceptualDocument),
}

impl From<&DatabaseSchema> for SchemaDocument {
    fn from(schema: &DatabaseSchema) -> Self {
        SchemaDocument::Logical(schema.into())
    }
}

impl From<&ConceptualSchema> for SchemaDocument {
    fn from(schema: &ConceptualSchema) -> Self {
        SchemaDocument::Conceptual(schema.into())
    }
}

/// A loaded schema of either kind
#[derive(Debug, Clone)]
pub enum LoadedSchema {
    Logical(DatabaseSchema),
    Conceptual(ConceptualSchema),
}

impl LoadedSchema {
    pub fn kind(&self) -> &'static str {
        match self {
            LoadedSchema::Logical(_) => "logical",
            LoadedSchema::Conceptual(_) => "conceptual",
        }
    }

    pub fn into_logical(self) -> Result<DatabaseSchema, DocumentError> {
        match self {
            LoadedSchema::Logical(schema) => Ok(schema),
            other => Err(DocumentError::WrongKind {
                expected: "logical",
                found: other.kind(),
            }),
        }
    }

    pub fn into_conceptual(self) -> Result<ConceptualSchema, DocumentError> {
        match self {
            LoadedSchema::Conceptual(schema) => Ok(schema),
            other => Err(DocumentError::WrongKind {
                expected: "conceptual",
                found: other.kind(),
            }),
        }
    }
}

/// Read a whole file, decompressing it when its extension says so
pub fn read_to_string(path: &Path) -> Result<String, DocumentError> {
    let io_err = |source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(io_err)?;
    let compression = Compression::from_path(path);
    let mut reader = compression.wrap_reader(Box::new(file)).map_err(io_err)?;

    let mut content = String::new();
    reader.read_to_string(&mut content).map_err(io_err)?;
    debug!(path = %path.display(), %compression, bytes = content.len(), "input read");
    Ok(content)
}

/// Load a schema file of any supported format
pub fn load(path: &Path) -> Result<LoadedSchema, DocumentError> {
    let format =
        DocumentFormat::from_path(path).ok_or_else(|| DocumentError::UnknownFormat(path.to_path_buf()))?;
    let content = read_to_string(path)?;
    parse(&content, format)
}

/// Parse schema text in the given format
pub fn parse(content: &str, format: DocumentFormat) -> Result<LoadedSchema, DocumentError> {
    let document: SchemaDocument = match format {
        DocumentFormat::Sql => return Ok(LoadedSchema::Logical(parse_ddl(content))),
        DocumentFormat::Json => serde_json::from_str(content)?,
        DocumentFormat::Yaml => serde_yaml_ng::from_str(content)?,
    };

    Ok(match document {
        SchemaDocument::Logical(doc) => LoadedSchema::Logical(doc.into_schema()),
        SchemaDocument::Conceptual(doc) => LoadedSchema::Conceptual(doc.into_schema()?),
    })
}

/// Serialize a document to JSON or YAML text
pub fn render(document: &SchemaDocument, format: DocumentFormat) -> Result<String, DocumentError> {
    match format {
        DocumentFormat::Json => {
            let mut out = serde_json::to_string_pretty(document)?;
            out.push('\n');
            Ok(out)
        }
        DocumentFormat::Yaml => Ok(serde_yaml_ng::to_string(document)?),
        DocumentFormat::Sql => Err(DocumentError::NotWritable(format)),
    }
}
