//! Formula reference types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Layout role of a formula.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormulaFormat {
    /// Set on its own line
    #[default]
    Display,
    /// Set within running text
    Inline,
}

impl FormulaFormat {
    /// Wire name of the format.
    pub fn as_str(&self) -> &'static str {
        match self {
            FormulaFormat::Display => "display",
            FormulaFormat::Inline => "inline",
        }
    }
}

impl fmt::Display for FormulaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A formula occurrence located in a document.
///
/// References point back into the document by index; they do not own the
/// block they came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormulaReference {
    /// Position of the originating block in `Document::content`
    pub content_index: usize,

    /// Image resource; a bare filename or a path, never rewritten
    pub image_path: String,

    /// Layout role
    pub format: FormulaFormat,
}

impl FormulaReference {
    /// Create a new formula reference.
    pub fn new(content_index: usize, image_path: impl Into<String>, format: FormulaFormat) -> Self {
        Self {
            content_index,
            image_path: image_path.into(),
            format,
        }
    }

    /// Check whether the image path names a bare file (no directory part).
    pub fn is_bare_filename(&self) -> bool {
        !self.image_path.contains(['/', '\\'])
    }
}
