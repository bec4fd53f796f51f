//! # texpipe
//!
//! Document canonicalization and sandboxed LaTeX compilation.
//!
//! Source documents (word-processor, markdown, plain text) are extracted
//! into one canonical [`Document`] shape and validated against a
//! [`Schema`]. Formula references are collected from validated documents
//! and persisted for recognition, and generated LaTeX is compiled inside an
//! isolated, per-call working directory.
//!
//! ## Quick Start
//!
//! ```no_run
//! use texpipe::{parse_file, FormulaExtractor, ProjectRoot};
//!
//! fn main() -> texpipe::Result<()> {
//!     // Parse and validate a source document
//!     let doc = parse_file("paper.md")?;
//!
//!     // Persist its formula references under the project root
//!     let extractor = FormulaExtractor::new(ProjectRoot::discover());
//!     match extractor.extract_and_persist(&doc) {
//!         Ok(list) => println!("{} formulas", list.len()),
//!         Err(e) => eprintln!("{}", e),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Fail-closed parsing**: invalid extractions never leave the dispatcher
//! - **Closed format set**: word-processor, markdown and plain text by extension
//! - **Ordered formula references**: document order, persisted as JSON
//! - **Sandboxed compilation**: fresh directory per call, bounded run time
//! - **Parallel batches**: Rayon for multi-document extraction and compilation

pub mod compile;
pub mod detect;
pub mod error;
pub mod formula;
pub mod model;
pub mod parser;
pub mod schema;

// Re-export commonly used types
pub use compile::{
    compile, compile_with_options, Compilation, CompilationResult, CompileOptions,
    CompileOutcome, Isolation, Sandbox,
};
pub use detect::{is_supported, SourceFormat};
pub use error::{Error, Result};
pub use formula::{
    ExtractError, FormulaExtractor, FormulaList, ProjectRoot, RecognizedFormula, Recognizer,
};
pub use model::{
    ContentBlock, Document, FormulaFormat, FormulaReference, JsonFormat, Metadata,
};
pub use parser::{Dispatcher, Extractor, ParseOptions};
pub use schema::{Schema, Violation, ViolationKind};

use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Parse a source file into a validated document.
///
/// # Arguments
///
/// * `path` - Path to a `.md`, `.markdown`, `.txt` or `.text` file
///
/// Word-processor files need an extractor command; see
/// [`parse_file_with_options`].
///
/// # Example
///
/// ```no_run
/// use texpipe::parse_file;
///
/// let doc = parse_file("notes.md").unwrap();
/// println!("Blocks: {}", doc.len());
/// ```
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Document> {
    Dispatcher::with_defaults().parse(path)
}

/// Parse a source file with custom options.
///
/// # Example
///
/// ```no_run
/// use texpipe::{parse_file_with_options, ParseOptions};
///
/// let options = ParseOptions::new().with_word_command("docx2json");
/// let doc = parse_file_with_options("paper.docx", &options).unwrap();
/// ```
pub fn parse_file_with_options<P: AsRef<Path>>(path: P, options: &ParseOptions) -> Result<Document> {
    Dispatcher::from_options(options).parse(path)
}

/// Parse several source files in parallel.
///
/// Results line up with `paths`; one failure does not affect the others.
pub fn parse_files<P>(paths: &[P], options: &ParseOptions) -> Vec<Result<Document>>
where
    P: AsRef<Path> + Sync,
{
    let dispatcher = Dispatcher::from_options(options);
    paths.par_iter().map(|path| dispatcher.parse(path)).collect()
}

/// Check a document against the built-in schema.
pub fn validate(doc: &Document) -> bool {
    schema::validate(doc, &Schema::default())
}

/// Collect a document's formula references in reading order.
///
/// # Example
///
/// ```
/// use texpipe::{extract_formulas, ContentBlock, Document};
///
/// let mut doc = Document::new();
/// doc.push(ContentBlock::paragraph(r"\formula{e1.png} and \formula{e2.png}"));
/// let refs = extract_formulas(&doc);
/// assert_eq!(refs.len(), 2);
/// assert_eq!(refs[1].image_path, "e2.png");
/// ```
pub fn extract_formulas(doc: &Document) -> Vec<FormulaReference> {
    formula::extract(doc)
}

/// Builder for the parse-then-extract flow.
///
/// # Example
///
/// ```no_run
/// use texpipe::Texpipe;
///
/// let parsed = Texpipe::new()
///     .with_word_command("docx2json")
///     .with_project_root("/srv/paper")
///     .parse("paper.docx")?;
/// let list = parsed.persist_formulas()?;
/// println!("{}", list.path.display());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Texpipe {
    parse_options: ParseOptions,
    project_root: Option<PathBuf>,
}

impl Texpipe {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self {
            parse_options: ParseOptions::default(),
            project_root: None,
        }
    }

    /// Validate against a custom schema.
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.parse_options = self.parse_options.with_schema(schema);
        self
    }

    /// Configure the word-processor extractor program.
    pub fn with_word_command(mut self, program: impl Into<PathBuf>) -> Self {
        self.parse_options = self.parse_options.with_word_command(program);
        self
    }

    /// Disable Unicode normalization of plain text.
    pub fn raw_text(mut self) -> Self {
        self.parse_options = self.parse_options.with_normalization(false);
        self
    }

    /// Use an explicit project root instead of discovering one.
    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = Some(root.into());
        self
    }

    /// Parse a source file and return a result wrapper.
    pub fn parse<P: AsRef<Path>>(self, path: P) -> Result<TexpipeResult> {
        let document = Dispatcher::from_options(&self.parse_options).parse(path)?;
        let root = match self.project_root {
            Some(path) => ProjectRoot::new(path),
            None => ProjectRoot::discover(),
        };
        Ok(TexpipeResult {
            document,
            extractor: FormulaExtractor::new(root).with_schema(self.parse_options.schema),
        })
    }
}

impl Default for Texpipe {
    fn default() -> Self {
        Self::new()
    }
}

/// A validated document plus the formula extractor configured for it.
pub struct TexpipeResult {
    /// The parsed document
    pub document: Document,
    extractor: FormulaExtractor,
}

impl TexpipeResult {
    /// Formula references, without persisting.
    pub fn formulas(&self) -> Vec<FormulaReference> {
        self.extractor.extract(&self.document)
    }

    /// Persist formula references under the project root.
    pub fn persist_formulas(&self) -> std::result::Result<FormulaList, ExtractError> {
        self.extractor.extract_and_persist(&self.document)
    }

    /// Convert to JSON.
    pub fn to_json(&self, format: JsonFormat) -> Result<String> {
        self.document.to_json(format)
    }

    /// Get the document.
    pub fn document(&self) -> &Document {
        &self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_texpipe_builder() {
        let builder = Texpipe::new()
            .with_word_command("docx2json")
            .raw_text()
            .with_project_root("/proj");

        assert_eq!(
            builder.parse_options.word_command,
            Some(PathBuf::from("docx2json"))
        );
        assert!(!builder.parse_options.normalize_unicode);
        assert_eq!(builder.project_root, Some(PathBuf::from("/proj")));
    }

    #[test]
    fn test_texpipe_builder_default() {
        let builder = Texpipe::default();
        assert!(builder.parse_options.word_command.is_none());
        assert!(builder.project_root.is_none());
    }

    #[test]
    fn test_parse_file_missing() {
        assert!(matches!(
            parse_file("/definitely/not/here.md"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_parse_then_persist() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("paper.md");
        fs::write(
            &source,
            "# Paper\n\nMass-energy \\formula{emc2.png}.\n\nAnd \\formula{a.png}\\formula{b.png}\n",
        )
        .unwrap();

        let parsed = Texpipe::new()
            .with_project_root(dir.path())
            .parse(&source)
            .unwrap();
        let formulas = parsed.formulas();
        assert_eq!(
            formulas.iter().map(|f| f.content_index).collect::<Vec<_>>(),
            vec![1, 2, 2]
        );

        let list = parsed.persist_formulas().unwrap();
        assert!(list
            .path
            .ends_with("output/intermediate/formula_images_list.json"));
        assert_eq!(list.references, formulas);
    }

    #[test]
    fn test_parse_files_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("a.txt");
        let bad = dir.path().join("b.rtf");
        fs::write(&good, "one\n\ntwo").unwrap();
        fs::write(&bad, "{\\rtf1}").unwrap();

        let results = parse_files(&[&good, &bad], &ParseOptions::default());
        assert_eq!(results[0].as_ref().map(Document::len).ok(), Some(2));
        assert!(matches!(results[1], Err(Error::UnsupportedFormat(_))));
    }

    #[test]
    fn test_validate_default_schema() {
        let mut doc = Document::with_title("t");
        doc.push(ContentBlock::paragraph("x"));
        assert!(validate(&doc));
        doc.push(ContentBlock::from_raw("sidebar", Default::default()));
        assert!(!validate(&doc));
    }
}
