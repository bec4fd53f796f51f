//! Structural contract for canonical documents.
//!
//! A [`Schema`] is loaded, not computed: it names every block tag the
//! pipeline accepts and, per tag, the required and optional attributes with
//! their expected [`Shape`]. The built-in [`Schema::default`] covers the
//! block types this crate models.
//!
//! # Example
//!
//! ```
//! use texpipe::model::{ContentBlock, Document};
//! use texpipe::schema::{validate, Schema};
//!
//! let mut doc = Document::with_title("Notes");
//! doc.push(ContentBlock::paragraph("See \\formula{eq1.png}."));
//! assert!(validate(&doc, &Schema::default()));
//! ```

mod validator;

pub use validator::{check, ensure_valid, validate, Violation, ViolationKind};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// Expected shape of an attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    /// JSON string
    String,
    /// Integral JSON number
    Integer,
    /// Any JSON number
    Number,
    /// JSON boolean
    Boolean,
    /// String drawn from a fixed set
    Enum(Vec<String>),
    /// Array whose every element has the inner shape
    Array(Box<Shape>),
    /// JSON object with arbitrary members
    Object,
    /// Anything except null
    Any,
}

impl Shape {
    /// Shorthand for an enum shape.
    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Shape::Enum(values.into_iter().map(Into::into).collect())
    }

    /// Shorthand for an array shape.
    pub fn array_of(inner: Shape) -> Self {
        Shape::Array(Box::new(inner))
    }

    /// Check a value against this shape without descending into arrays.
    pub(crate) fn matches_scalar(&self, value: &Value) -> bool {
        match self {
            Shape::String => value.is_string(),
            Shape::Integer => value.is_i64() || value.is_u64(),
            Shape::Number => value.is_number(),
            Shape::Boolean => value.is_boolean(),
            Shape::Enum(allowed) => value
                .as_str()
                .map(|s| allowed.iter().any(|a| a == s))
                .unwrap_or(false),
            Shape::Array(_) => value.is_array(),
            Shape::Object => value.is_object(),
            Shape::Any => !value.is_null(),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::String => f.write_str("string"),
            Shape::Integer => f.write_str("integer"),
            Shape::Number => f.write_str("number"),
            Shape::Boolean => f.write_str("boolean"),
            Shape::Enum(values) => write!(f, "one of [{}]", values.join(", ")),
            Shape::Array(inner) => write!(f, "array of {}", inner),
            Shape::Object => f.write_str("object"),
            Shape::Any => f.write_str("any non-null value"),
        }
    }
}

/// Attribute contract for one block tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSchema {
    /// Attributes that must be present
    #[serde(default)]
    pub required: BTreeMap<String, Shape>,

    /// Attributes that may be present
    #[serde(default)]
    pub optional: BTreeMap<String, Shape>,
}

impl BlockSchema {
    /// Create an empty block contract.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a required attribute.
    pub fn required(mut self, name: impl Into<String>, shape: Shape) -> Self {
        self.required.insert(name.into(), shape);
        self
    }

    /// Declare an optional attribute.
    pub fn optional(mut self, name: impl Into<String>, shape: Shape) -> Self {
        self.optional.insert(name.into(), shape);
        self
    }
}

/// Contract for document metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataSchema {
    /// Keys that must be present
    #[serde(default)]
    pub required: Vec<String>,

    /// Keys that are recognized but may be absent
    #[serde(default)]
    pub optional: Vec<String>,
}

/// Declared structural contract for documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Schema version, owned by whoever publishes the schema
    #[serde(default)]
    pub version: String,

    /// Metadata contract
    #[serde(default)]
    pub metadata: MetadataSchema,

    /// Block contracts keyed by tag
    pub blocks: BTreeMap<String, BlockSchema>,
}

impl Schema {
    /// Create a schema that accepts no block tags.
    pub fn empty(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            metadata: MetadataSchema::default(),
            blocks: BTreeMap::new(),
        }
    }

    /// Register a block tag.
    pub fn with_block(mut self, tag: impl Into<String>, block: BlockSchema) -> Self {
        self.blocks.insert(tag.into(), block);
        self
    }

    /// Require a metadata key.
    pub fn with_required_metadata(mut self, key: impl Into<String>) -> Self {
        self.metadata.required.push(key.into());
        self
    }

    /// Parse a schema from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let schema: Schema =
            serde_json::from_str(json).map_err(|e| Error::InvalidSchema(e.to_string()))?;
        schema.check_consistency()?;
        Ok(schema)
    }

    /// Load a schema from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Serialize the schema to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Look up the contract for a tag.
    pub fn block(&self, tag: &str) -> Option<&BlockSchema> {
        self.blocks.get(tag)
    }

    /// Check if a tag is declared.
    pub fn recognizes(&self, tag: &str) -> bool {
        self.blocks.contains_key(tag)
    }

    /// Declared tags in sorted order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.blocks.keys().map(String::as_str)
    }

    fn check_consistency(&self) -> Result<()> {
        for (tag, block) in &self.blocks {
            if tag.is_empty() {
                return Err(Error::InvalidSchema("empty block tag".into()));
            }
            if let Some(name) = block.required.keys().find(|k| block.optional.contains_key(*k)) {
                return Err(Error::InvalidSchema(format!(
                    "attribute '{}' of '{}' is both required and optional",
                    name, tag
                )));
            }
            if block.required.contains_key("type") || block.optional.contains_key("type") {
                return Err(Error::InvalidSchema(format!(
                    "'type' is reserved for the block tag ('{}')",
                    tag
                )));
            }
        }
        Ok(())
    }
}

impl Default for Schema {
    fn default() -> Self {
        Schema::empty("1")
            .with_block("paragraph", BlockSchema::new().required("text", Shape::String))
            .with_block(
                "equation",
                BlockSchema::new()
                    .required("image_path", Shape::String)
                    .optional("format", Shape::one_of(["display", "inline"])),
            )
            .with_block(
                "heading",
                BlockSchema::new()
                    .required("text", Shape::String)
                    .required("level", Shape::Integer),
            )
            .with_block(
                "image",
                BlockSchema::new()
                    .required("path", Shape::String)
                    .optional("caption", Shape::String),
            )
            .with_block(
                "table",
                BlockSchema::new()
                    .required("rows", Shape::array_of(Shape::array_of(Shape::String)))
                    .optional("caption", Shape::String),
            )
            .with_block(
                "list",
                BlockSchema::new()
                    .required("items", Shape::array_of(Shape::String))
                    .optional("ordered", Shape::Boolean),
            )
            .with_block(
                "code",
                BlockSchema::new()
                    .required("text", Shape::String)
                    .optional("language", Shape::String),
            )
    }
}
