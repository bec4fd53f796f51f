//! Formula reference extraction.
//!
//! Formulas appear in a document two ways: as `equation` blocks carrying an
//! image path, and as `\formula{<image path>}` markers inside paragraph
//! text. Both are collected in reading order and persisted as
//! `output/intermediate/formula_images_list.json` under the project root.

mod extractor;
mod recognize;
mod root;
mod scanner;

pub use extractor::{ExtractError, FormulaExtractor, FormulaList};
pub use recognize::{recognize_all, RecognizedFormula, Recognizer};
pub use root::{resolve_project_root, ProjectRoot, FALLBACK_ANCESTOR_STEPS, SENTINEL};
pub use scanner::{extract, scan_markers, MARKER_PATTERN};
