//! Source document parsing: format dispatch, per-format extractors and the
//! validation gate.

mod dispatcher;
mod extractor;
mod markdown;
mod options;
mod text;

pub use dispatcher::Dispatcher;
pub use extractor::{CommandExtractor, Extractor};
pub use markdown::MarkdownExtractor;
pub use options::ParseOptions;
pub use text::TextExtractor;
