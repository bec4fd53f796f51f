//! Integration tests for formula reference extraction and persistence.

use std::fs;
use std::path::{Path, PathBuf};
use texpipe::formula::{resolve_project_root, ExtractError, FormulaExtractor, ProjectRoot};
use texpipe::{parse_file, ContentBlock, Document, FormulaFormat, FormulaReference, JsonFormat};

#[test]
fn test_markdown_to_formula_list() {
    let root = tempfile::tempdir().unwrap();
    let source = root.path().join("chapter.md");
    fs::write(
        &source,
        "# Chapter 1\n\n\
         The identity \\formula{euler.png} is famous.\n\n\
         ![Figure](figs/plot.png)\n\n\
         Two at once: \\formula{images/a.png}\\formula{images/b.png}\n",
    )
    .unwrap();

    let doc = parse_file(&source).unwrap();
    let list = FormulaExtractor::new(ProjectRoot::new(root.path()))
        .extract_and_persist(&doc)
        .unwrap();

    assert_eq!(
        list.references,
        vec![
            FormulaReference::new(1, "euler.png", FormulaFormat::Display),
            FormulaReference::new(3, "images/a.png", FormulaFormat::Display),
            FormulaReference::new(3, "images/b.png", FormulaFormat::Display),
        ]
    );
    assert!(list.path.starts_with(root.path()));
}

#[test]
fn test_parser_output_feeds_run() {
    let root = tempfile::tempdir().unwrap();
    let mut doc = Document::with_title("Stage handoff");
    doc.push(ContentBlock::equation("eq1.png", FormulaFormat::Display));
    doc.push(ContentBlock::paragraph("inline \\formula{eq2.png}"));
    doc.push(ContentBlock::equation("eq3.png", FormulaFormat::Inline));

    let parsed = root.path().join("output/intermediate/parsed.json");
    fs::create_dir_all(parsed.parent().unwrap()).unwrap();
    fs::write(&parsed, doc.to_json(JsonFormat::Pretty).unwrap()).unwrap();

    let extractor = FormulaExtractor::new(ProjectRoot::new(root.path()));
    let list = extractor.run(&parsed).unwrap();

    let formats: Vec<_> = list.references.iter().map(|r| r.format).collect();
    assert_eq!(
        formats,
        vec![
            FormulaFormat::Display,
            FormulaFormat::Display,
            FormulaFormat::Inline
        ]
    );

    let persisted: Vec<FormulaReference> =
        serde_json::from_str(&fs::read_to_string(extractor.output_path()).unwrap()).unwrap();
    assert_eq!(persisted, list.references);
}

#[test]
fn test_rerun_supersedes_previous_list() {
    let root = tempfile::tempdir().unwrap();
    let extractor = FormulaExtractor::new(ProjectRoot::new(root.path()));

    let mut first = Document::new();
    first.push(ContentBlock::paragraph("\\formula{old1.png} \\formula{old2.png}"));
    extractor.extract_and_persist(&first).unwrap();

    let mut second = Document::new();
    second.push(ContentBlock::equation("new.png", FormulaFormat::Inline));
    extractor.extract_and_persist(&second).unwrap();

    let persisted: Vec<FormulaReference> =
        serde_json::from_str(&fs::read_to_string(extractor.output_path()).unwrap()).unwrap();
    assert_eq!(
        persisted,
        vec![FormulaReference::new(0, "new.png", FormulaFormat::Inline)]
    );
}

#[test]
fn test_malformed_json_reported() {
    let root = tempfile::tempdir().unwrap();
    let parsed = root.path().join("parsed.json");
    fs::write(&parsed, "{ not json").unwrap();

    let result = FormulaExtractor::new(ProjectRoot::new(root.path())).run(&parsed);
    match result {
        Err(e @ ExtractError::Load { .. }) => {
            assert!(e.to_string().contains("parsed.json"));
        }
        other => panic!("expected load failure, got {:?}", other),
    }
}

#[test]
fn test_undecodable_equation_is_not_dropped() {
    let root = tempfile::tempdir().unwrap();
    let parsed = root.path().join("parsed.json");
    fs::write(
        &parsed,
        r#"{"content":[{"type":"equation","image_path":"eq1.png","format":null}]}"#,
    )
    .unwrap();

    let extractor = FormulaExtractor::new(ProjectRoot::new(root.path()));
    let result = extractor.run(&parsed);
    assert!(matches!(result, Err(ExtractError::Invalid(_))));
    assert!(!extractor.output_path().exists());
}

#[cfg(unix)]
#[test]
fn test_unwritable_root_reported() {
    let root = tempfile::tempdir().unwrap();
    let blocker = root.path().join("output");
    fs::write(&blocker, "a file where a directory should be").unwrap();

    let mut doc = Document::new();
    doc.push(ContentBlock::paragraph("\\formula{x.png}"));
    let result = FormulaExtractor::new(ProjectRoot::new(root.path())).extract_and_persist(&doc);
    assert!(matches!(result, Err(ExtractError::Write { .. })));
}

#[test]
fn test_root_resolution_examples() {
    let cwd = Path::new("/jobs/current");
    assert_eq!(
        resolve_project_root(Path::new("/src/texpipe/target/debug/deps/formula_test-1a2b"), cwd),
        PathBuf::from("/src/texpipe")
    );
    assert_eq!(
        resolve_project_root(Path::new("/usr/local/bin/texpipe"), cwd),
        PathBuf::from("/usr/local")
    );
    assert_eq!(resolve_project_root(Path::new("/texpipe"), cwd), cwd);
}
