//! Per-format extractor contract and the process-backed extractor.

use crate::error::{Error, Result};
use crate::model::Document;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Turns one source file into an (unvalidated) document.
///
/// Implementations may use any parsing strategy. Their output is untrusted:
/// the dispatcher validates it before anything downstream sees it.
pub trait Extractor: Send + Sync {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// Extract a document from an absolute file path.
    fn extract(&self, path: &Path) -> Result<Document>;
}

/// Extractor that delegates to an external program.
///
/// The program is invoked as `program [args..] <path>` and must print the
/// document's JSON form on stdout.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    program: PathBuf,
    args: Vec<String>,
    name: String,
}

impl CommandExtractor {
    /// Create an extractor for the given program.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let name = program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.display().to_string());
        Self {
            program,
            args: Vec::new(),
            name,
        }
    }

    /// Set arguments placed before the file path.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// The configured program.
    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Extractor for CommandExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    fn extract(&self, path: &Path) -> Result<Document> {
        log::debug!("Running {} on {}", self.program.display(), path.display());

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                Error::Extraction(format!("failed to run {}: {}", self.program.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Extraction(format!(
                "{} exited with {}: {}",
                self.name,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Document::from_json(&stdout).map_err(|e| {
            Error::Extraction(format!("{} produced malformed output: {}", self.name, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_extractor_name() {
        let extractor = CommandExtractor::new("/opt/tools/docx2json").with_args(["--flat"]);
        assert_eq!(extractor.name(), "docx2json");
        assert_eq!(extractor.program(), Path::new("/opt/tools/docx2json"));
    }

    #[test]
    fn test_command_extractor_missing_program() {
        let extractor = CommandExtractor::new("/nonexistent/texpipe-extractor");
        let result = extractor.extract(Path::new("/tmp/input.docx"));
        assert!(matches!(result, Err(Error::Extraction(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_extractor_reads_stdout() {
        let extractor = CommandExtractor::new("sh").with_args([
            "-c",
            r#"printf '{"metadata":{"title":"%s"},"content":[{"type":"paragraph","text":"hi"}]}' "$0""#,
        ]);
        let doc = extractor.extract(Path::new("report.docx")).unwrap();
        assert_eq!(doc.metadata.title(), Some("report.docx"));
        assert_eq!(doc.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_extractor_nonzero_exit() {
        let extractor = CommandExtractor::new("sh").with_args(["-c", "echo broken >&2; exit 3"]);
        match extractor.extract(Path::new("x.docx")) {
            Err(Error::Extraction(msg)) => assert!(msg.contains("broken")),
            other => panic!("expected extraction error, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_command_extractor_malformed_output() {
        let extractor = CommandExtractor::new("sh").with_args(["-c", "echo not-json"]);
        assert!(matches!(
            extractor.extract(Path::new("x.docx")),
            Err(Error::Extraction(_))
        ));
    }
}
