//! Formula reference scanning.

use crate::model::{ContentBlock, Document, FormulaFormat, FormulaReference};
use regex::Regex;
use std::sync::OnceLock;

/// Marker embedded in paragraph text: `\formula{<image path>}`.
///
/// The captured path is one or more characters other than `}`, so adjacent
/// markers never merge into a single match.
pub const MARKER_PATTERN: &str = r"\\formula\{([^}]+)\}";

fn marker_regex() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(MARKER_PATTERN).expect("marker pattern is a valid regex"))
}

/// Image paths of every marker in `text`, left to right.
///
/// # Example
/// ```
/// use texpipe::formula::scan_markers;
///
/// let paths: Vec<_> = scan_markers(r"\formula{a}\formula{b}").collect();
/// assert_eq!(paths, vec!["a", "b"]);
/// ```
pub fn scan_markers(text: &str) -> impl Iterator<Item = &str> {
    marker_regex()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Collect formula references from a document in reading order.
///
/// `equation` blocks with a non-empty image path yield one reference with
/// their own format. Paragraph markers yield one reference each, always
/// `display`: the marker carries no layout hint. Every other block is
/// skipped. Paths are reported exactly as written.
pub fn extract(doc: &Document) -> Vec<FormulaReference> {
    let mut references = Vec::new();

    for (index, block) in doc.content.iter().enumerate() {
        match block {
            ContentBlock::Equation(eq) if !eq.image_path.is_empty() => {
                references.push(FormulaReference::new(index, eq.image_path.clone(), eq.format));
            }
            ContentBlock::Paragraph(p) => {
                references.extend(
                    scan_markers(&p.text)
                        .map(|path| FormulaReference::new(index, path, FormulaFormat::Display)),
                );
            }
            _ => {}
        }
    }

    references
}
