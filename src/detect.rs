//! Source format detection by file extension.
//!
//! The accepted set is closed: an extension outside it is rejected rather
//! than sniffed.

use crate::error::{Error, Result};
use std::fmt;
use std::path::Path;

/// Source document formats accepted by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    /// Word-processor documents (docx, doc, odt)
    WordProcessor,
    /// Markdown
    Markdown,
    /// Plain text
    PlainText,
}

/// Extension table; lowercase, without the leading dot.
const EXTENSIONS: &[(&str, SourceFormat)] = &[
    ("docx", SourceFormat::WordProcessor),
    ("doc", SourceFormat::WordProcessor),
    ("odt", SourceFormat::WordProcessor),
    ("md", SourceFormat::Markdown),
    ("markdown", SourceFormat::Markdown),
    ("txt", SourceFormat::PlainText),
    ("text", SourceFormat::PlainText),
];

impl SourceFormat {
    /// All formats, in dispatch-table order.
    pub const ALL: [SourceFormat; 3] = [
        SourceFormat::WordProcessor,
        SourceFormat::Markdown,
        SourceFormat::PlainText,
    ];

    /// Look up a format by extension, case-insensitively.
    ///
    /// # Example
    /// ```
    /// use texpipe::detect::SourceFormat;
    ///
    /// assert_eq!(SourceFormat::from_extension("MD"), Some(SourceFormat::Markdown));
    /// assert_eq!(SourceFormat::from_extension("pdf"), None);
    /// ```
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_lowercase();
        EXTENSIONS
            .iter()
            .find(|(e, _)| *e == ext)
            .map(|(_, format)| *format)
    }

    /// Determine the format of a path from its extension.
    ///
    /// # Returns
    /// * `Ok(SourceFormat)` for an accepted extension
    /// * `Err(Error::UnsupportedFormat)` for any other extension, or none
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| {
                Error::UnsupportedFormat(format!("{} has no extension", path.display()))
            })?;
        Self::from_extension(ext).ok_or_else(|| Error::UnsupportedFormat(format!(".{}", ext)))
    }

    /// Extensions mapped to this format.
    pub fn extensions(&self) -> Vec<&'static str> {
        EXTENSIONS
            .iter()
            .filter(|(_, f)| f == self)
            .map(|(e, _)| *e)
            .collect()
    }

    /// Short name used in logs and messages.
    pub fn name(&self) -> &'static str {
        match self {
            SourceFormat::WordProcessor => "word-processor",
            SourceFormat::Markdown => "markdown",
            SourceFormat::PlainText => "plain-text",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Check if a path has an accepted extension.
pub fn is_supported<P: AsRef<Path>>(path: P) -> bool {
    SourceFormat::from_path(path).is_ok()
}
