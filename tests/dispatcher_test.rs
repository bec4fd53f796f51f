//! Integration tests for format dispatch and the validation gate.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use texpipe::error::{Error, Result};
use texpipe::schema::{BlockSchema, Shape};
use texpipe::{ContentBlock, Dispatcher, Document, Extractor, ParseOptions, Schema, SourceFormat};

/// Mock extractor returning a canned document.
struct MockExtractor {
    name: &'static str,
    document: Document,
}

impl MockExtractor {
    fn new(name: &'static str, document: Document) -> Self {
        Self { name, document }
    }
}

impl Extractor for MockExtractor {
    fn name(&self) -> &str {
        self.name
    }

    fn extract(&self, path: &Path) -> Result<Document> {
        assert!(path.is_absolute(), "extractors receive absolute paths");
        Ok(self.document.clone())
    }
}

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_dispatch_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let md = write(dir.path(), "notes.markdown", "# Notes\n\n- a\n- b\n");
    let txt = write(dir.path(), "notes.TEXT", "first\n\nsecond\n");

    let dispatcher = Dispatcher::with_defaults();
    let md_doc = dispatcher.parse(&md).unwrap();
    let txt_doc = dispatcher.parse(&txt).unwrap();

    assert_eq!(md_doc.content[0].tag(), "heading");
    assert_eq!(md_doc.content[1].tag(), "list");
    assert!(txt_doc.content.iter().all(|b| b.tag() == "paragraph"));
    assert_eq!(txt_doc.len(), 2);
}

#[test]
fn test_unsupported_extensions() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = Dispatcher::with_defaults();

    for name in ["deck.pptx", "scan.pdf", "README"] {
        let path = write(dir.path(), name, "x");
        assert!(
            matches!(dispatcher.parse(&path), Err(Error::UnsupportedFormat(_))),
            "{} should be unsupported",
            name
        );
    }
}

#[test]
fn test_registered_extractor_replaces_builtin() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "paper.odt", "binary");

    let mut doc = Document::with_title("From mock");
    doc.push(ContentBlock::paragraph("mocked"));

    let mut dispatcher = Dispatcher::with_defaults();
    assert!(!dispatcher.supports(SourceFormat::WordProcessor));
    dispatcher.register(
        SourceFormat::WordProcessor,
        Arc::new(MockExtractor::new("mock-word", doc.clone())),
    );

    assert_eq!(dispatcher.parse(&path).unwrap(), doc);
}

#[test]
fn test_custom_schema_rejects_builtin_tags() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "a.md", "# Heading\n\nBody\n");

    let schema = Schema::empty("narrow")
        .with_block("paragraph", BlockSchema::new().required("text", Shape::String));
    let options = ParseOptions::new().with_schema(schema);

    match Dispatcher::from_options(&options).parse(&path) {
        Err(Error::SchemaViolation(violations)) => {
            assert_eq!(violations.len(), 1);
            assert_eq!(violations[0].location, "content[0]");
        }
        other => panic!("expected schema violation, got {:?}", other),
    }
}

#[test]
fn test_required_metadata_enforced() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "plain.md", "Just text.\n");

    let options =
        ParseOptions::new().with_schema(Schema::default().with_required_metadata("author"));
    assert!(matches!(
        Dispatcher::from_options(&options).parse(&path),
        Err(Error::SchemaViolation(_))
    ));
}

#[cfg(unix)]
#[test]
fn test_word_processor_via_command() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "paper.docx", "PK");

    let json = r#"{"metadata":{"title":"Paper"},"content":[{"type":"equation","image_path":"eq.png","format":"inline"}]}"#;
    let script = format!("printf '%s' '{}'", json);
    let options = ParseOptions::new()
        .with_word_command("sh")
        .with_word_args(["-c", script.as_str(), "docx2json"]);

    let doc = Dispatcher::from_options(&options).parse(&path).unwrap();
    assert_eq!(doc.metadata.title(), Some("Paper"));
    assert_eq!(texpipe::extract_formulas(&doc).len(), 1);
}

#[cfg(unix)]
#[test]
fn test_word_processor_command_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "paper.doc", "x");

    let options = ParseOptions::new()
        .with_word_command("sh")
        .with_word_args(["-c", "echo 'corrupt file' >&2; exit 2", "docx2json"]);

    assert!(matches!(
        Dispatcher::from_options(&options).parse(&path),
        Err(Error::Extraction(_))
    ));
}
