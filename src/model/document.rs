//! Document-level types.

use super::ContentBlock;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Canonical representation of one source file.
///
/// A `Document` handed out by the dispatcher has always passed schema
/// validation; one built by hand or loaded from JSON has not.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document-level attributes (title, etc.)
    #[serde(default)]
    pub metadata: Metadata,

    /// Content blocks in reading order
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a document with the given title.
    pub fn with_title(title: impl Into<String>) -> Self {
        let mut doc = Self::new();
        doc.metadata.set("title", title);
        doc
    }

    /// Append a block.
    pub fn push(&mut self, block: ContentBlock) {
        self.content.push(block);
    }

    /// Number of content blocks.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Check if the document has no content.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Get a block by position.
    pub fn get(&self, index: usize) -> Option<&ContentBlock> {
        self.content.get(index)
    }

    /// Parse a document from its JSON wire form.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a document from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Serialize the document to JSON.
    pub fn to_json(&self, format: JsonFormat) -> Result<String> {
        let json = match format {
            JsonFormat::Pretty => serde_json::to_string_pretty(self)?,
            JsonFormat::Compact => serde_json::to_string(self)?,
        };
        Ok(json)
    }

    /// Plain text of every text-bearing block, separated by blank lines.
    pub fn plain_text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentBlock::plain_text)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Document-level attributes.
///
/// Keys are defined by the schema. Values are expected to be scalar text;
/// the validator enforces this, so the map itself stays untyped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(Map<String, Value>);

impl Metadata {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a text attribute, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), Value::String(value.into()));
    }

    /// Get a raw attribute value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Get an attribute as text.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Document title.
    pub fn title(&self) -> Option<&str> {
        self.text("title")
    }

    /// Check whether an attribute is present.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Iterate over attributes in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no attributes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
