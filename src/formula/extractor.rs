//! Formula list persistence.

use super::root::ProjectRoot;
use super::scanner;
use crate::error::Error;
use crate::model::{Document, FormulaReference};
use crate::schema::{check, Schema, Violation};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error as ThisError;

/// Why a formula extraction run produced no list.
///
/// Runs report their failure as a value instead of unwinding; the CLI prints
/// it and the caller decides whether the pipeline continues.
#[derive(ThisError, Debug)]
pub enum ExtractError {
    /// The parsed document could not be read or decoded
    #[error("Error extracting formulas: cannot load {path}: {source}")]
    Load {
        /// Document that failed to load
        path: PathBuf,
        /// Underlying read or decode failure
        #[source]
        source: Error,
    },

    /// The document does not satisfy the schema
    #[error("Error extracting formulas: document is invalid: {}", crate::error::summarize(.0))]
    Invalid(Vec<Violation>),

    /// The list could not be written
    #[error("Error extracting formulas: cannot write {path}: {source}")]
    Write {
        /// Destination of the list
        path: PathBuf,
        /// Underlying filesystem failure
        #[source]
        source: std::io::Error,
    },
}

/// A persisted formula list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormulaList {
    /// Where the list was written.
    pub path: PathBuf,

    /// References in reading order.
    pub references: Vec<FormulaReference>,
}

impl FormulaList {
    /// Number of references.
    pub fn len(&self) -> usize {
        self.references.len()
    }

    /// Check if the document had no formulas.
    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}

/// Extracts formula references and persists them under the project root.
#[derive(Debug, Clone)]
pub struct FormulaExtractor {
    root: ProjectRoot,
    schema: Schema,
}

impl FormulaExtractor {
    /// Create an extractor writing under `root`, validating loaded documents
    /// against the default schema.
    pub fn new(root: ProjectRoot) -> Self {
        Self {
            root,
            schema: Schema::default(),
        }
    }

    /// Validate loaded documents against a different schema.
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Project root the list is written under.
    pub fn root(&self) -> &ProjectRoot {
        &self.root
    }

    /// Where [`extract_and_persist`](Self::extract_and_persist) writes.
    pub fn output_path(&self) -> PathBuf {
        self.root.formula_list_path()
    }

    /// Collect references without touching the filesystem.
    pub fn extract(&self, doc: &Document) -> Vec<FormulaReference> {
        scanner::extract(doc)
    }

    /// Collect references from many documents in parallel.
    ///
    /// Results line up with `docs`. Nothing is persisted, since every run
    /// shares one output path.
    pub fn extract_many(&self, docs: &[Document]) -> Vec<Vec<FormulaReference>> {
        docs.par_iter().map(scanner::extract).collect()
    }

    /// Collect references and replace the persisted list with them.
    ///
    /// Missing parent directories are created. The list is written to a
    /// sibling temp file and renamed into place, so readers never see a
    /// partial file. Identical documents produce byte-identical output.
    pub fn extract_and_persist(&self, doc: &Document) -> Result<FormulaList, ExtractError> {
        let references = self.extract(doc);
        let path = self.output_path();
        write_list(&path, &references).map_err(|source| ExtractError::Write {
            path: path.clone(),
            source,
        })?;
        log::info!(
            "Wrote {} formula reference(s) to {}",
            references.len(),
            path.display()
        );
        Ok(FormulaList { path, references })
    }

    /// Load a parsed-document JSON file, validate it, then extract and
    /// persist its formula references.
    pub fn run<P: AsRef<Path>>(&self, parsed_json: P) -> Result<FormulaList, ExtractError> {
        let path = parsed_json.as_ref();
        let doc = Document::load(path).map_err(|source| ExtractError::Load {
            path: path.to_path_buf(),
            source,
        })?;

        let violations = check(&doc, &self.schema);
        if !violations.is_empty() {
            return Err(ExtractError::Invalid(violations));
        }

        let list = self.extract_and_persist(&doc);
        if let Err(ref e) = list {
            log::error!("{}", e);
        }
        list
    }
}

fn write_list(path: &Path, references: &[FormulaReference]) -> std::io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let json = serde_json::to_string_pretty(references)?;
    let mut staged = tempfile::NamedTempFile::new_in(dir)?;
    staged.write_all(json.as_bytes())?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContentBlock, FormulaFormat, JsonFormat};
    use serde_json::Value;

    fn sample() -> Document {
        let mut doc = Document::with_title("Sample");
        doc.push(ContentBlock::paragraph("\\formula{a.png}"));
        doc.push(ContentBlock::equation("b.png", FormulaFormat::Inline));
        doc.push(ContentBlock::paragraph("\\formula{c.png}\\formula{d.png}"));
        doc
    }

    #[test]
    fn test_persisted_layout() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = FormulaExtractor::new(ProjectRoot::new(dir.path()));

        let list = extractor.extract_and_persist(&sample()).unwrap();
        assert_eq!(
            list.path,
            dir.path().join("output/intermediate/formula_images_list.json")
        );

        let json: Value = serde_json::from_str(&fs::read_to_string(&list.path).unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"content_index": 0, "image_path": "a.png", "format": "display"},
                {"content_index": 1, "image_path": "b.png", "format": "inline"},
                {"content_index": 2, "image_path": "c.png", "format": "display"},
                {"content_index": 2, "image_path": "d.png", "format": "display"}
            ])
        );
    }

    #[test]
    fn test_persist_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = FormulaExtractor::new(ProjectRoot::new(dir.path()));

        let first = extractor.extract_and_persist(&sample()).unwrap();
        let a = fs::read(&first.path).unwrap();
        let second = extractor.extract_and_persist(&sample()).unwrap();
        let b = fs::read(&second.path).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_document_writes_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = FormulaExtractor::new(ProjectRoot::new(dir.path()));
        let list = extractor.extract_and_persist(&Document::new()).unwrap();
        assert!(list.is_empty());
        assert_eq!(fs::read_to_string(&list.path).unwrap(), "[]");
    }

    #[test]
    fn test_run_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let parsed = dir.path().join("parsed.json");
        fs::write(&parsed, sample().to_json(JsonFormat::Compact).unwrap()).unwrap();

        let list = FormulaExtractor::new(ProjectRoot::new(dir.path()))
            .run(&parsed)
            .unwrap();
        assert_eq!(list.len(), 4);
    }

    #[test]
    fn test_run_missing_file_reports() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = FormulaExtractor::new(ProjectRoot::new(dir.path()));
        let err = extractor.run(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ExtractError::Load { .. }));
        assert!(err.to_string().starts_with("Error extracting formulas"));
        assert!(!extractor.output_path().exists());
    }

    #[test]
    fn test_run_rejects_invalid_document() {
        let dir = tempfile::tempdir().unwrap();
        let parsed = dir.path().join("parsed.json");
        fs::write(
            &parsed,
            r#"{"metadata":{"title":"t"},"content":[{"type":"equation"}]}"#,
        )
        .unwrap();

        let err = FormulaExtractor::new(ProjectRoot::new(dir.path()))
            .run(&parsed)
            .unwrap_err();
        assert!(matches!(err, ExtractError::Invalid(ref v) if !v.is_empty()));
    }

    #[test]
    fn test_extract_many_keeps_order() {
        let extractor = FormulaExtractor::new(ProjectRoot::new("/unused"));
        let mut other = Document::new();
        other.push(ContentBlock::equation("z.png", FormulaFormat::Display));

        let results = extractor.extract_many(&[sample(), Document::new(), other]);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].len(), 4);
        assert!(results[1].is_empty());
        assert_eq!(results[2][0].image_path, "z.png");
    }
}
