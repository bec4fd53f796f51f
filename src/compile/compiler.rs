//! Engine invocation and outcome classification.

use super::options::{CompileOptions, Isolation};
use super::sandbox::{copy_dir, Sandbox};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use crossbeam_channel::{after, select, tick};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(25);
const STDOUT_FILE: &str = "engine.stdout";
const STDERR_FILE: &str = "engine.stderr";
const CONTAINER_WORKDIR: &str = "/work";

/// How a compile attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    /// The engine exited cleanly and produced the artifact.
    Success { pdf_path: PathBuf },

    /// The engine reported an error; `log` is its log file, unmodified.
    Failed { log: String },

    /// Exit status and output files disagree.
    ArtifactMissing {
        /// Engine exit code, if it exited normally
        exit_code: Option<i32>,
        /// What was expected and not found
        detail: String,
    },

    /// The engine was killed after running too long.
    TimedOut {
        /// Timeout that expired
        after: Duration,
    },
}

/// Serializable record of one compile attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilationResult {
    /// Whether the engine produced the artifact
    pub success: bool,

    /// Produced PDF, on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_path: Option<PathBuf>,

    /// Working directory the engine ran in
    pub temp_dir: PathBuf,

    /// Full engine log or failure description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_log: Option<String>,

    /// When the attempt started
    pub started_at: DateTime<Utc>,

    /// Wall-clock duration in milliseconds
    pub elapsed_ms: u64,
}

/// A finished compile attempt and the working directory it ran in.
///
/// The sandbox belongs to the caller; it is returned for every outcome,
/// including failures and timeouts.
#[derive(Debug)]
pub struct Compilation {
    /// Working directory, owned by the caller
    pub sandbox: Sandbox,

    /// How the engine run ended
    pub outcome: CompileOutcome,

    /// When the attempt started
    pub started_at: DateTime<Utc>,

    /// Wall-clock duration
    pub elapsed: Duration,
}

impl Compilation {
    /// Check if the artifact was produced.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, CompileOutcome::Success { .. })
    }

    /// Artifact path, if the compile succeeded.
    pub fn pdf_path(&self) -> Option<&Path> {
        match &self.outcome {
            CompileOutcome::Success { pdf_path } => Some(pdf_path),
            _ => None,
        }
    }

    /// The outcome as an error, or `None` on success.
    pub fn error(&self) -> Option<Error> {
        match &self.outcome {
            CompileOutcome::Success { .. } => None,
            CompileOutcome::Failed { log } => Some(Error::CompileFailed(log.clone())),
            CompileOutcome::ArtifactMissing { detail, .. } => {
                Some(Error::ArtifactMissing(detail.clone()))
            }
            CompileOutcome::TimedOut { after } => Some(Error::Timeout(*after)),
        }
    }

    /// Summarize the attempt as a plain record.
    pub fn result(&self) -> CompilationResult {
        let error_log = match &self.outcome {
            CompileOutcome::Success { .. } => None,
            CompileOutcome::Failed { log } => Some(log.clone()),
            _ => self.error().map(|e| e.to_string()),
        };
        CompilationResult {
            success: self.is_success(),
            pdf_path: self.pdf_path().map(Path::to_path_buf),
            temp_dir: self.sandbox.path().to_path_buf(),
            error_log,
            started_at: self.started_at,
            elapsed_ms: self.elapsed.as_millis() as u64,
        }
    }
}

/// One independent compile request.
#[derive(Debug, Clone)]
pub struct CompileJob {
    /// LaTeX source to compile
    pub source_text: String,

    /// Absolute template directory
    pub template_dir: PathBuf,
}

impl CompileJob {
    /// Create a job.
    pub fn new(source_text: impl Into<String>, template_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_text: source_text.into(),
            template_dir: template_dir.into(),
        }
    }
}

/// Compile LaTeX source against a template directory with default options.
///
/// # Errors
/// * `InvalidArgument` if `template_dir` is empty or relative
/// * `NotFound` if `template_dir` does not exist or is not a directory
///
/// Engine failures are not errors here; they are reported through
/// [`Compilation::outcome`].
pub fn compile<P: AsRef<Path>>(source_text: &str, template_dir: P) -> Result<Compilation> {
    compile_with_options(source_text, template_dir, &CompileOptions::default())
}

/// Compile LaTeX source with explicit options.
pub fn compile_with_options<P: AsRef<Path>>(
    source_text: &str,
    template_dir: P,
    options: &CompileOptions,
) -> Result<Compilation> {
    let template_dir = check_template_dir(template_dir.as_ref())?;
    options.check()?;
    check_work_root(template_dir, &options.work_root)?;

    let sandbox = Sandbox::create(&options.work_root)?;
    if let Err(e) = prepare(&sandbox, source_text, template_dir, options) {
        return Err(discard(sandbox, e));
    }

    let started_at = Utc::now();
    let clock = Instant::now();
    let status = match run_engine(&sandbox, options) {
        Ok(status) => status,
        Err(e) => return Err(discard(sandbox, e)),
    };
    let elapsed = clock.elapsed();

    let outcome = match classify(&sandbox, status, options) {
        Ok(outcome) => outcome,
        Err(e) => return Err(discard(sandbox, e)),
    };
    match &outcome {
        CompileOutcome::Success { pdf_path } => {
            log::info!("Compiled {} in {:?}", pdf_path.display(), elapsed)
        }
        CompileOutcome::TimedOut { after } => {
            log::warn!("Engine timed out after {:?} in {}", after, sandbox.path().display())
        }
        other => log::info!("Compile in {} did not succeed: {:?}", sandbox.path().display(), other),
    }

    Ok(Compilation {
        sandbox,
        outcome,
        started_at,
        elapsed,
    })
}

/// Run independent compile jobs in parallel, each in its own sandbox.
///
/// Results line up with `jobs`.
pub fn compile_many(jobs: &[CompileJob], options: &CompileOptions) -> Vec<Result<Compilation>> {
    jobs.par_iter()
        .map(|job| compile_with_options(&job.source_text, &job.template_dir, options))
        .collect()
}

/// Compile on tokio's blocking pool.
#[cfg(feature = "async")]
pub async fn compile_async(
    source_text: String,
    template_dir: PathBuf,
    options: CompileOptions,
) -> Result<Compilation> {
    tokio::task::spawn_blocking(move || compile_with_options(&source_text, &template_dir, &options))
        .await
        .map_err(|e| Error::Other(format!("compile task failed: {}", e)))?
}

/// Release a sandbox that never produced a compilation.
fn discard(sandbox: Sandbox, error: Error) -> Error {
    log::warn!("Compile in {} aborted: {}", sandbox.path().display(), error);
    if let Err(e) = sandbox.release() {
        log::warn!("Failed to release sandbox: {}", e);
    }
    error
}

fn check_template_dir(dir: &Path) -> Result<&Path> {
    if dir.as_os_str().is_empty() {
        return Err(Error::InvalidArgument("template directory is empty".to_string()));
    }
    if !dir.is_absolute() {
        return Err(Error::InvalidArgument(format!(
            "template directory must be absolute: {}",
            dir.display()
        )));
    }
    if !dir.is_dir() {
        return Err(Error::NotFound(dir.to_path_buf()));
    }
    Ok(dir)
}

/// The template copy must not reach the sandbox it is copied into.
fn check_work_root(template_dir: &Path, work_root: &Path) -> Result<()> {
    let template = fs::canonicalize(template_dir)?;
    if resolved(work_root)?.starts_with(&template) {
        return Err(Error::InvalidArgument(format!(
            "work root {} lies inside template directory {}",
            work_root.display(),
            template_dir.display()
        )));
    }
    Ok(())
}

/// Canonical form of a path that may not exist yet.
fn resolved(path: &Path) -> Result<PathBuf> {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()?.join(path)
    };
    for ancestor in path.ancestors() {
        if let Ok(real) = fs::canonicalize(ancestor) {
            let rest = path.strip_prefix(ancestor).unwrap_or(Path::new(""));
            return Ok(real.join(rest));
        }
    }
    Ok(path)
}

fn prepare(
    sandbox: &Sandbox,
    source_text: &str,
    template_dir: &Path,
    options: &CompileOptions,
) -> Result<()> {
    copy_dir(template_dir, sandbox.path())?;
    fs::write(sandbox.join(&options.source_name), source_text)?;
    Ok(())
}

fn engine_command(sandbox: &Sandbox, options: &CompileOptions) -> Command {
    match &options.isolation {
        Isolation::Docker { image } => {
            let mut cmd = Command::new("docker");
            cmd.arg("run")
                .args(["--rm", "--network", "none", "--read-only", "--tmpfs", "/tmp"])
                .arg("-v")
                .arg(format!("{}:{}", sandbox.path().display(), CONTAINER_WORKDIR))
                .args(["-w", CONTAINER_WORKDIR])
                .args(["--name", sandbox.name()])
                .arg("-e")
                .arg(format!("HOME={}", CONTAINER_WORKDIR));
            if let Some(user) = container_user(sandbox.path()) {
                cmd.arg("--user").arg(user);
            }
            cmd.arg(image)
                .arg(&options.program)
                .args(options.expanded_args());
            cmd
        }
        Isolation::Host => {
            let mut cmd = Command::new(&options.program);
            cmd.args(options.expanded_args())
                .current_dir(sandbox.path())
                .env_clear()
                .env("HOME", sandbox.path())
                .env("TEXMFOUTPUT", sandbox.path())
                .env("openout_any", "p");
            if let Some(path) = env::var_os("PATH") {
                cmd.env("PATH", path);
            }
            cmd
        }
    }
}

/// Owner of the sandbox, so files the engine writes stay releasable.
#[cfg(unix)]
fn container_user(dir: &Path) -> Option<String> {
    use std::os::unix::fs::MetadataExt;
    fs::metadata(dir)
        .ok()
        .map(|meta| format!("{}:{}", meta.uid(), meta.gid()))
}

#[cfg(not(unix))]
fn container_user(_dir: &Path) -> Option<String> {
    None
}

/// Run the engine; `None` means it was killed at the deadline.
fn run_engine(sandbox: &Sandbox, options: &CompileOptions) -> Result<Option<ExitStatus>> {
    let mut cmd = engine_command(sandbox, options);
    cmd.stdin(Stdio::null())
        .stdout(File::create(sandbox.join(STDOUT_FILE))?)
        .stderr(File::create(sandbox.join(STDERR_FILE))?);

    log::debug!("Running {:?}", cmd);
    let mut child = cmd.spawn().map_err(|e| {
        Error::Io(io::Error::new(
            e.kind(),
            format!("cannot start {}: {}", cmd.get_program().to_string_lossy(), e),
        ))
    })?;

    match wait_bounded(&mut child, options.timeout)? {
        Some(status) => {
            log::debug!("Engine exited with {}", status);
            Ok(Some(status))
        }
        None => {
            stop(&mut child, sandbox, &options.isolation);
            Ok(None)
        }
    }
}

fn wait_bounded(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let deadline = after(timeout);
    let ticker = tick(POLL_INTERVAL);
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        select! {
            recv(deadline) -> _ => return Ok(child.try_wait()?),
            recv(ticker) -> _ => {}
        }
    }
}

fn stop(child: &mut Child, sandbox: &Sandbox, isolation: &Isolation) {
    if let Isolation::Docker { .. } = isolation {
        let killed = Command::new("docker")
            .args(["kill", sandbox.name()])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if let Err(e) = killed {
            log::warn!("docker kill {} failed: {}", sandbox.name(), e);
        }
    }
    if let Err(e) = child.kill() {
        log::debug!("Engine already gone: {}", e);
    }
    if let Err(e) = child.wait() {
        log::warn!("Failed to reap engine process: {}", e);
    }
}

fn classify(
    sandbox: &Sandbox,
    status: Option<ExitStatus>,
    options: &CompileOptions,
) -> Result<CompileOutcome> {
    let Some(status) = status else {
        return Ok(CompileOutcome::TimedOut {
            after: options.timeout,
        });
    };

    let stem = options.stem();
    let pdf_path = sandbox.join(format!("{}.pdf", stem));
    let log_path = sandbox.join(format!("{}.log", stem));

    if status.success() {
        if pdf_path.is_file() {
            return Ok(CompileOutcome::Success { pdf_path });
        }
        return Ok(CompileOutcome::ArtifactMissing {
            exit_code: status.code(),
            detail: with_stderr(
                format!("engine exited successfully but wrote no {}.pdf", stem),
                sandbox,
            ),
        });
    }

    if log_path.is_file() {
        let bytes = fs::read(&log_path)?;
        return Ok(CompileOutcome::Failed {
            log: String::from_utf8_lossy(&bytes).into_owned(),
        });
    }
    Ok(CompileOutcome::ArtifactMissing {
        exit_code: status.code(),
        detail: with_stderr(format!("engine {} and wrote no {}.log", status, stem), sandbox),
    })
}

fn with_stderr(detail: String, sandbox: &Sandbox) -> String {
    match fs::read(sandbox.join(STDERR_FILE)) {
        Ok(bytes) if !bytes.is_empty() => {
            format!("{}\n{}", detail, String::from_utf8_lossy(&bytes).trim_end())
        }
        _ => detail,
    }
}
