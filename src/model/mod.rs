//! Document model types.
//!
//! This module defines the canonical representation that every per-format
//! extractor produces and every downstream stage consumes. Blocks are a
//! closed sum type; anything that does not fit a known variant is kept as
//! [`ContentBlock::Unrecognized`] so the schema validator can reject it.

mod block;
mod document;
mod formula;

pub use block::{Code, ContentBlock, Equation, Figure, Heading, List, Paragraph, RawBlock, Table};
pub use document::{Document, JsonFormat, Metadata};
pub use formula::{FormulaFormat, FormulaReference};
