//! Error types for texpipe library.

use crate::schema::Violation;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for texpipe operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while canonicalizing or compiling documents.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed JSON input or output.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An input file or template directory does not exist.
    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file extension is outside the accepted set.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The format is accepted but no extractor is configured for it.
    #[error("No extractor configured for {0} documents")]
    ExtractorUnavailable(String),

    /// A per-format extractor failed to produce a document.
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// The document does not satisfy the schema.
    #[error("Schema violation: {}", summarize(.0))]
    SchemaViolation(Vec<Violation>),

    /// The schema definition itself is malformed.
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// A precondition on call arguments was not met.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The engine exit status and the files it left behind disagree.
    #[error("Artifact missing: {0}")]
    ArtifactMissing(String),

    /// The engine did not finish within the allotted time.
    #[error("Compilation timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    /// The engine reported a compile error; carries the full log.
    #[error("Compilation failed:\n{0}")]
    CompileFailed(String),

    /// Formula recognition failed.
    #[error("Recognition error: {0}")]
    Recognition(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

pub(crate) fn summarize(violations: &[Violation]) -> String {
    match violations {
        [] => "document rejected".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{} (and {} more)", first, rest.len()),
    }
}
