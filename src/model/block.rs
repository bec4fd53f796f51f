//! Content block types.

use super::FormulaFormat;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A tagged unit of document content.
///
/// On the wire every block is a JSON object with a `"type"` tag plus its
/// attributes. Deserialization never fails on unknown tags or misshapen
/// attributes: such blocks become [`ContentBlock::Unrecognized`], keeping the
/// raw attributes for the validator to report on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawBlock", into = "RawBlock")]
pub enum ContentBlock {
    /// Running text, possibly with `\formula{...}` markers
    Paragraph(Paragraph),

    /// A formula given as an image
    Equation(Equation),

    /// A section heading
    Heading(Heading),

    /// A figure or standalone image
    Image(Figure),

    /// A table of text cells
    Table(Table),

    /// A bulleted or numbered list
    List(List),

    /// A verbatim code listing
    Code(Code),

    /// A block whose tag or attributes do not fit any known variant
    Unrecognized(RawBlock),
}

impl ContentBlock {
    /// Create a paragraph block.
    pub fn paragraph(text: impl Into<String>) -> Self {
        ContentBlock::Paragraph(Paragraph {
            text: text.into(),
            extra: Map::new(),
        })
    }

    /// Create an equation block.
    pub fn equation(image_path: impl Into<String>, format: FormulaFormat) -> Self {
        ContentBlock::Equation(Equation {
            image_path: image_path.into(),
            format,
            extra: Map::new(),
        })
    }

    /// Create a heading block. The level is clamped to 1..=6.
    pub fn heading(text: impl Into<String>, level: u8) -> Self {
        ContentBlock::Heading(Heading {
            text: text.into(),
            level: level.clamp(1, 6),
            extra: Map::new(),
        })
    }

    /// Create an image block.
    pub fn image(path: impl Into<String>, caption: Option<String>) -> Self {
        ContentBlock::Image(Figure {
            path: path.into(),
            caption,
            extra: Map::new(),
        })
    }

    /// Create a table block.
    pub fn table(rows: Vec<Vec<String>>) -> Self {
        ContentBlock::Table(Table {
            rows,
            caption: None,
            extra: Map::new(),
        })
    }

    /// Create a list block.
    pub fn list(items: Vec<String>, ordered: bool) -> Self {
        ContentBlock::List(List {
            items,
            ordered,
            extra: Map::new(),
        })
    }

    /// Create a code block.
    pub fn code(text: impl Into<String>, language: Option<String>) -> Self {
        ContentBlock::Code(Code {
            text: text.into(),
            language,
            extra: Map::new(),
        })
    }

    /// Create a block from a raw tag and attribute map.
    ///
    /// Known tags with well-formed attributes become typed variants.
    pub fn from_raw(tag: impl Into<String>, attributes: Map<String, Value>) -> Self {
        ContentBlock::from(RawBlock {
            tag: tag.into(),
            attributes,
        })
    }

    /// The block's type tag.
    pub fn tag(&self) -> &str {
        match self {
            ContentBlock::Paragraph(_) => "paragraph",
            ContentBlock::Equation(_) => "equation",
            ContentBlock::Heading(_) => "heading",
            ContentBlock::Image(_) => "image",
            ContentBlock::Table(_) => "table",
            ContentBlock::List(_) => "list",
            ContentBlock::Code(_) => "code",
            ContentBlock::Unrecognized(raw) => &raw.tag,
        }
    }

    /// The block's attributes as they appear on the wire, without the tag.
    pub fn attributes(&self) -> Map<String, Value> {
        match self {
            ContentBlock::Paragraph(b) => object_of(b),
            ContentBlock::Equation(b) => object_of(b),
            ContentBlock::Heading(b) => object_of(b),
            ContentBlock::Image(b) => object_of(b),
            ContentBlock::Table(b) => object_of(b),
            ContentBlock::List(b) => object_of(b),
            ContentBlock::Code(b) => object_of(b),
            ContentBlock::Unrecognized(raw) => raw.attributes.clone(),
        }
    }

    /// Check whether a tag has a typed variant in this model.
    pub fn is_modeled_tag(tag: &str) -> bool {
        MODELED_TAGS.contains(&tag)
    }

    /// Check if this block fell through to the unrecognized case.
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, ContentBlock::Unrecognized(_))
    }

    /// Plain text carried by the block, if any.
    pub fn plain_text(&self) -> Option<String> {
        match self {
            ContentBlock::Paragraph(p) => Some(p.text.clone()),
            ContentBlock::Heading(h) => Some(h.text.clone()),
            ContentBlock::List(l) => Some(l.items.join("\n")),
            ContentBlock::Code(c) => Some(c.text.clone()),
            ContentBlock::Table(t) => Some(
                t.rows
                    .iter()
                    .map(|row| row.join("\t"))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            ContentBlock::Image(f) => f.caption.clone(),
            ContentBlock::Equation(_) | ContentBlock::Unrecognized(_) => None,
        }
    }
}

const MODELED_TAGS: [&str; 7] = [
    "paragraph",
    "equation",
    "heading",
    "image",
    "table",
    "list",
    "code",
];

fn object_of<T: Serialize>(value: &T) -> Map<String, Value> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

fn typed<T: for<'de> Deserialize<'de>>(attributes: &Map<String, Value>) -> Option<T> {
    serde_json::from_value(Value::Object(attributes.clone())).ok()
}

/// Wire form of a block: a tag plus untyped attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBlock {
    /// Type tag (empty when the source omitted it)
    #[serde(rename = "type", default)]
    pub tag: String,

    /// Every other key of the block object
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl From<RawBlock> for ContentBlock {
    fn from(raw: RawBlock) -> Self {
        let attrs = &raw.attributes;
        let block = match raw.tag.as_str() {
            "paragraph" => typed(attrs).map(ContentBlock::Paragraph),
            "equation" => typed(attrs).map(ContentBlock::Equation),
            "heading" => typed(attrs).map(ContentBlock::Heading),
            "image" => typed(attrs).map(ContentBlock::Image),
            "table" => typed(attrs).map(ContentBlock::Table),
            "list" => typed(attrs).map(ContentBlock::List),
            "code" => typed(attrs).map(ContentBlock::Code),
            _ => None,
        };
        block.unwrap_or(ContentBlock::Unrecognized(raw))
    }
}

impl From<ContentBlock> for RawBlock {
    fn from(block: ContentBlock) -> Self {
        match block {
            ContentBlock::Unrecognized(raw) => raw,
            typed => RawBlock {
                tag: typed.tag().to_string(),
                attributes: typed.attributes(),
            },
        }
    }
}

/// Paragraph attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    /// Paragraph text
    pub text: String,

    /// Attributes this crate does not model
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Equation attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equation {
    /// Image holding the rendered formula
    pub image_path: String,

    /// Layout role; `display` when the source omits it
    #[serde(default)]
    pub format: FormulaFormat,

    /// Attributes this crate does not model
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Heading attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heading {
    /// Heading text
    pub text: String,

    /// Heading level (1-6)
    pub level: u8,

    /// Attributes this crate does not model
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Image attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    /// Image location
    pub path: String,

    /// Optional caption
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,

    /// Attributes this crate does not model
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Table attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Rows of cell text; the first row is the header when present
    pub rows: Vec<Vec<String>>,

    /// Optional caption
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,

    /// Attributes this crate does not model
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// List attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct List {
    /// Item text in order
    pub items: Vec<String>,

    /// Numbered list
    #[serde(default)]
    pub ordered: bool,

    /// Attributes this crate does not model
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Code listing attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Code {
    /// Verbatim source
    pub text: String,

    /// Language hint from the source document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Attributes this crate does not model
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
