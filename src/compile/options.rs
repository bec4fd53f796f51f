//! Compilation options.

use crate::error::{Error, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Container image used when none is configured.
pub const DEFAULT_IMAGE: &str = "texlive/texlive:latest";

/// How the engine process is confined to its working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Isolation {
    /// Run inside a throwaway container with networking disabled, a
    /// read-only root filesystem and only the working directory mounted.
    Docker { image: String },

    /// Run on the host with a cleared environment and TeX's own write
    /// restrictions. Used where no container runtime is available.
    Host,
}

impl Isolation {
    /// Docker isolation with the given image.
    pub fn docker(image: impl Into<String>) -> Self {
        Isolation::Docker {
            image: image.into(),
        }
    }
}

impl Default for Isolation {
    fn default() -> Self {
        Isolation::docker(DEFAULT_IMAGE)
    }
}

/// Options for a compile run.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Engine executable
    pub program: String,

    /// Engine arguments; `{source}` and `{stem}` are substituted
    pub args: Vec<String>,

    /// File name the source text is written to
    pub source_name: String,

    /// Upper bound on engine run time
    pub timeout: Duration,

    /// Directory under which sandboxes are created
    pub work_root: PathBuf,

    /// Process confinement
    pub isolation: Isolation,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            program: "pdflatex".to_string(),
            args: vec![
                "-interaction=nonstopmode".to_string(),
                "-halt-on-error".to_string(),
                "-no-shell-escape".to_string(),
                "{source}".to_string(),
            ],
            source_name: "main.tex".to_string(),
            timeout: Duration::from_secs(120),
            work_root: env::temp_dir(),
            isolation: Isolation::default(),
        }
    }
}

impl CompileOptions {
    /// Create new compile options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the engine program.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Replace the engine arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the source file name.
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = name.into();
        self
    }

    /// Set the engine timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the directory sandboxes are created under.
    pub fn with_work_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.work_root = root.into();
        self
    }

    /// Set the isolation mode.
    pub fn with_isolation(mut self, isolation: Isolation) -> Self {
        self.isolation = isolation;
        self
    }

    /// Stem of the source file; the engine names its outputs after it.
    pub fn stem(&self) -> &str {
        Path::new(&self.source_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.source_name)
    }

    /// Engine arguments with placeholders filled in.
    pub fn expanded_args(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{source}", &self.source_name)
                    .replace("{stem}", self.stem())
            })
            .collect()
    }

    pub(crate) fn check(&self) -> Result<()> {
        if self.program.is_empty() {
            return Err(Error::InvalidArgument("engine program is empty".to_string()));
        }
        let name = Path::new(&self.source_name);
        let plain = name.file_name().map(|f| f == name.as_os_str()).unwrap_or(false);
        if !plain || self.stem().is_empty() || self.source_name.starts_with('.') {
            return Err(Error::InvalidArgument(format!(
                "source name must be a plain file name: {:?}",
                self.source_name
            )));
        }
        if self.timeout.is_zero() {
            return Err(Error::InvalidArgument("timeout must be positive".to_string()));
        }
        Ok(())
    }
}
