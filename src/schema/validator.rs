//! Closed-world structural validation.

use super::{BlockSchema, Schema, Shape};
use crate::error::{Error, Result};
use crate::model::{ContentBlock, Document};
use serde_json::{Map, Value};
use std::fmt;

/// One way in which a document breaks its schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Where the problem is, e.g. `content[3].rows[1][0]`
    pub location: String,

    /// What the problem is
    pub kind: ViolationKind,
}

impl Violation {
    /// Create a violation at a location.
    pub fn new(location: impl Into<String>, kind: ViolationKind) -> Self {
        Self {
            location: location.into(),
            kind,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.kind)
    }
}

/// Kinds of schema violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    /// Block tag not declared by the schema
    UnknownTag(String),
    /// Required attribute absent
    MissingAttribute(String),
    /// Value does not have the declared shape
    WrongShape {
        /// Expected shape
        expected: Shape,
        /// JSON type actually found
        found: &'static str,
    },
    /// Required metadata key absent
    MissingMetadata(String),
    /// Metadata value that is not scalar text
    NonTextMetadata(String),
    /// Attributes pass the schema but do not fit the block's typed form
    Malformed(String),
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::UnknownTag(tag) if tag.is_empty() => f.write_str("block has no type tag"),
            ViolationKind::UnknownTag(tag) => write!(f, "unknown block type '{}'", tag),
            ViolationKind::MissingAttribute(name) => {
                write!(f, "missing required attribute '{}'", name)
            }
            ViolationKind::WrongShape { expected, found } => {
                write!(f, "expected {}, found {}", expected, found)
            }
            ViolationKind::MissingMetadata(key) => write!(f, "missing required metadata '{}'", key),
            ViolationKind::NonTextMetadata(key) => {
                write!(f, "metadata '{}' is not scalar text", key)
            }
            ViolationKind::Malformed(tag) => {
                write!(f, "'{}' block attributes do not fit its typed form", tag)
            }
        }
    }
}

/// Check whether a document satisfies the schema.
pub fn validate(doc: &Document, schema: &Schema) -> bool {
    check(doc, schema).is_empty()
}

/// Validate a document, turning violations into [`Error::SchemaViolation`].
pub fn ensure_valid(doc: &Document, schema: &Schema) -> Result<()> {
    let violations = check(doc, schema);
    if violations.is_empty() {
        Ok(())
    } else {
        log::debug!(
            "Document rejected with {} violation(s): {}",
            violations.len(),
            violations[0]
        );
        Err(Error::SchemaViolation(violations))
    }
}

/// Collect every violation in the document.
///
/// Validation is a single descent over metadata and content. It never
/// repairs or coerces anything.
pub fn check(doc: &Document, schema: &Schema) -> Vec<Violation> {
    let mut violations = Vec::new();

    for key in &schema.metadata.required {
        if !doc.metadata.contains(key) {
            violations.push(Violation::new(
                "metadata",
                ViolationKind::MissingMetadata(key.clone()),
            ));
        }
    }
    for (key, value) in doc.metadata.iter() {
        if !value.is_string() {
            violations.push(Violation::new(
                format!("metadata.{}", key),
                ViolationKind::NonTextMetadata(key.clone()),
            ));
        }
    }

    for (index, block) in doc.content.iter().enumerate() {
        check_block(block, schema, &format!("content[{}]", index), &mut violations);
    }

    violations
}

fn check_block(block: &ContentBlock, schema: &Schema, location: &str, out: &mut Vec<Violation>) {
    let Some(contract) = schema.block(block.tag()) else {
        out.push(Violation::new(
            location,
            ViolationKind::UnknownTag(block.tag().to_string()),
        ));
        return;
    };
    let before = out.len();
    check_attributes(&block.attributes(), contract, location, out);

    // A declared, modeled tag that still failed typed decoding would be
    // invisible to every later stage.
    if out.len() == before && block.is_unrecognized() && ContentBlock::is_modeled_tag(block.tag())
    {
        out.push(Violation::new(
            location,
            ViolationKind::Malformed(block.tag().to_string()),
        ));
    }
}

fn check_attributes(
    attributes: &Map<String, Value>,
    contract: &BlockSchema,
    location: &str,
    out: &mut Vec<Violation>,
) {
    for (name, shape) in &contract.required {
        match attributes.get(name) {
            None | Some(Value::Null) => out.push(Violation::new(
                location,
                ViolationKind::MissingAttribute(name.clone()),
            )),
            Some(value) => check_value(value, shape, &format!("{}.{}", location, name), out),
        }
    }
    for (name, shape) in &contract.optional {
        if let Some(value) = attributes.get(name).filter(|v| !v.is_null()) {
            check_value(value, shape, &format!("{}.{}", location, name), out);
        }
    }
}

fn check_value(value: &Value, shape: &Shape, location: &str, out: &mut Vec<Violation>) {
    if !shape.matches_scalar(value) {
        out.push(Violation::new(
            location,
            ViolationKind::WrongShape {
                expected: shape.clone(),
                found: json_type(value),
            },
        ));
        return;
    }
    if let (Shape::Array(inner), Value::Array(items)) = (shape, value) {
        for (i, item) in items.iter().enumerate() {
            check_value(item, inner, &format!("{}[{}]", location, i), out);
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FormulaFormat;
    use crate::schema::BlockSchema;
    use serde_json::json;

    fn doc_from(value: Value) -> Document {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_valid_document() {
        let mut doc = Document::with_title("Valid");
        doc.push(ContentBlock::heading("Intro", 1));
        doc.push(ContentBlock::paragraph("Text \\formula{a.png}"));
        doc.push(ContentBlock::equation("b.png", FormulaFormat::Inline));
        doc.push(ContentBlock::table(vec![vec!["a".into(), "b".into()]]));
        doc.push(ContentBlock::list(vec!["x".into()], true));
        doc.push(ContentBlock::image("fig.png", Some("Figure".into())));
        doc.push(ContentBlock::code("fn main() {}", Some("rust".into())));

        assert!(validate(&doc, &Schema::default()));
        assert!(ensure_valid(&doc, &Schema::default()).is_ok());
    }

    #[test]
    fn test_empty_document_is_valid() {
        assert!(validate(&Document::new(), &Schema::default()));
    }

    #[test]
    fn test_unknown_tag_rejects_whole_document() {
        let doc = doc_from(json!({
            "content": [
                {"type": "paragraph", "text": "fine"},
                {"type": "sidebar", "text": "not declared"}
            ]
        }));
        let violations = check(&doc, &Schema::default());
        assert_eq!(
            violations,
            vec![Violation::new(
                "content[1]",
                ViolationKind::UnknownTag("sidebar".into())
            )]
        );
        assert!(!validate(&doc, &Schema::default()));
    }

    #[test]
    fn test_missing_required_attribute() {
        let doc = doc_from(json!({"content": [{"type": "equation", "format": "inline"}]}));
        let violations = check(&doc, &Schema::default());
        assert_eq!(
            violations[0].kind,
            ViolationKind::MissingAttribute("image_path".into())
        );
    }

    #[test]
    fn test_null_required_attribute_counts_as_missing() {
        let doc = doc_from(json!({"content": [{"type": "paragraph", "text": null}]}));
        assert!(matches!(
            check(&doc, &Schema::default())[0].kind,
            ViolationKind::MissingAttribute(_)
        ));
    }

    #[test]
    fn test_wrong_shape() {
        let doc = doc_from(json!({"content": [{"type": "heading", "text": "H", "level": "two"}]}));
        let violations = check(&doc, &Schema::default());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].location, "content[0].level");
        assert_eq!(
            violations[0].kind,
            ViolationKind::WrongShape {
                expected: Shape::Integer,
                found: "string"
            }
        );
    }

    #[test]
    fn test_nested_array_descent() {
        let doc = doc_from(json!({
            "content": [{"type": "table", "rows": [["a", "b"], ["c", 4]]}]
        }));
        let violations = check(&doc, &Schema::default());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].location, "content[0].rows[1][1]");
    }

    #[test]
    fn test_optional_attribute_shape_checked_when_present() {
        let doc = doc_from(json!({
            "content": [{"type": "equation", "image_path": "e.png", "format": "block"}]
        }));
        let violations = check(&doc, &Schema::default());
        assert_eq!(violations[0].location, "content[0].format");
    }

    #[test]
    fn test_undeclared_attributes_tolerated() {
        let doc = doc_from(json!({
            "content": [{"type": "paragraph", "text": "t", "style": "quote"}]
        }));
        assert!(validate(&doc, &Schema::default()));
    }

    #[test]
    fn test_loaded_schema_sees_extra_attributes() {
        let schema = Schema::default().with_block(
            "paragraph",
            BlockSchema::new()
                .required("text", Shape::String)
                .required("style", Shape::String),
        );
        let with_style = doc_from(json!({
            "content": [{"type": "paragraph", "text": "t", "style": "quote"}]
        }));
        let without_style = doc_from(json!({"content": [{"type": "paragraph", "text": "t"}]}));
        assert!(validate(&with_style, &schema));
        assert!(!validate(&without_style, &schema));
    }

    #[test]
    fn test_undecodable_modeled_block_rejected() {
        let null_format = doc_from(json!({
            "content": [{"type": "equation", "image_path": "eq1.png", "format": null}]
        }));
        assert!(null_format.content[0].is_unrecognized());
        assert_eq!(
            check(&null_format, &Schema::default()),
            vec![Violation::new(
                "content[0]",
                ViolationKind::Malformed("equation".into())
            )]
        );

        let huge_level = doc_from(json!({
            "content": [{"type": "heading", "text": "H", "level": 300}]
        }));
        assert!(!validate(&huge_level, &Schema::default()));
    }

    #[test]
    fn test_custom_tag_stays_unrecognized_but_valid() {
        let schema = Schema::default()
            .with_block("sidebar", BlockSchema::new().required("text", Shape::String));
        let doc = doc_from(json!({"content": [{"type": "sidebar", "text": "aside"}]}));
        assert!(doc.content[0].is_unrecognized());
        assert!(validate(&doc, &schema));
    }

    #[test]
    fn test_metadata_rules() {
        let schema = Schema::default().with_required_metadata("title");
        let doc = doc_from(json!({"metadata": {"author": 7}, "content": []}));
        let violations = check(&doc, &schema);
        assert_eq!(violations.len(), 2);
        assert_eq!(
            violations[0].kind,
            ViolationKind::MissingMetadata("title".into())
        );
        assert_eq!(
            violations[1].kind,
            ViolationKind::NonTextMetadata("author".into())
        );
    }

    #[test]
    fn test_ensure_valid_error() {
        let doc = doc_from(json!({"content": [{"text": "untagged"}]}));
        match ensure_valid(&doc, &Schema::default()) {
            Err(Error::SchemaViolation(v)) => {
                assert_eq!(v[0].to_string(), "content[0]: block has no type tag");
            }
            other => panic!("expected schema violation, got {:?}", other),
        }
    }
}
