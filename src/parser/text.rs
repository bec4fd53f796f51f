//! Plain-text extractor.

use super::Extractor;
use crate::error::Result;
use crate::model::{ContentBlock, Document};
use regex::Regex;
use std::fs;
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

/// Extracts paragraphs from plain text.
///
/// Paragraphs are separated by blank lines; the lines of one paragraph are
/// joined with single spaces. The file stem becomes the title.
#[derive(Debug, Clone)]
pub struct TextExtractor {
    normalize: bool,
    blank_line: Regex,
}

impl TextExtractor {
    /// Create a text extractor with Unicode normalization enabled.
    pub fn new() -> Self {
        Self {
            normalize: true,
            blank_line: Regex::new(r"\n[ \t]*\n").unwrap(),
        }
    }

    /// Enable or disable NFC normalization.
    pub fn with_normalization(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Build a document from text already in memory.
    pub fn extract_str(&self, text: &str) -> Document {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        let text: String = if self.normalize {
            text.nfc().collect()
        } else {
            text
        };

        let mut doc = Document::new();
        for chunk in self.blank_line.split(&text) {
            let paragraph = chunk
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            if !paragraph.is_empty() {
                doc.push(ContentBlock::paragraph(paragraph));
            }
        }
        doc
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for TextExtractor {
    fn name(&self) -> &str {
        "text"
    }

    fn extract(&self, path: &Path) -> Result<Document> {
        let bytes = fs::read(path)?;
        let mut doc = self.extract_str(&String::from_utf8_lossy(&bytes));
        if let Some(stem) = path.file_stem() {
            doc.metadata.set("title", stem.to_string_lossy());
        }
        Ok(doc)
    }
}
