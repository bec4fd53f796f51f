//! Per-compile working directories.

use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

const PREFIX: &str = "texpipe-";

/// A uniquely named working directory owned by the caller.
///
/// Nothing deletes the directory implicitly. Call [`release`](Self::release)
/// to remove it, [`scoped`](Self::scoped) to remove it after a closure, or
/// [`persist`](Self::persist) to keep it. Dropping a sandbox that was
/// neither released nor persisted leaves it on disk and logs a warning.
#[derive(Debug)]
pub struct Sandbox {
    path: PathBuf,
    armed: bool,
}

impl Sandbox {
    /// Create a fresh directory under `work_root` with an unpredictable name.
    pub(crate) fn create(work_root: &Path) -> Result<Self> {
        fs::create_dir_all(work_root)?;
        let dir = tempfile::Builder::new()
            .prefix(PREFIX)
            .tempdir_in(work_root)?;
        let path = dir.keep();
        log::debug!("Created sandbox {}", path.display());
        Ok(Self { path, armed: true })
    }

    /// The working directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a file inside the working directory.
    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }

    /// Final path component, unique among live sandboxes.
    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(PREFIX)
    }

    /// Delete the working directory and everything in it.
    pub fn release(mut self) -> Result<()> {
        self.remove()
    }

    // Stays armed when removal fails, so the leftover directory is reported.
    fn remove(&mut self) -> Result<()> {
        fs::remove_dir_all(&self.path)?;
        self.armed = false;
        log::debug!("Released sandbox {}", self.path.display());
        Ok(())
    }

    /// Run `f` with the working directory, then release it.
    ///
    /// The directory is removed whether `f` returns or panics. A release
    /// failure after `f` returns is reported as the error.
    pub fn scoped<T, F>(self, f: F) -> Result<T>
    where
        F: FnOnce(&Path) -> T,
    {
        let path = self.path.clone();
        let guard = ReleaseGuard(Some(self));
        let value = f(&path);
        guard.finish()?;
        Ok(value)
    }

    /// Keep the working directory and hand over its path.
    pub fn persist(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        if self.armed {
            log::warn!(
                "Sandbox {} dropped without release; left on disk",
                self.path.display()
            );
        }
    }
}

struct ReleaseGuard(Option<Sandbox>);

impl ReleaseGuard {
    fn finish(mut self) -> Result<()> {
        match self.0.take() {
            Some(sandbox) => sandbox.release(),
            None => Ok(()),
        }
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        if let Some(sandbox) = self.0.take() {
            let path = sandbox.path().to_path_buf();
            if let Err(e) = sandbox.release() {
                log::warn!("Failed to release sandbox {}: {}", path.display(), e);
            }
        }
    }
}

/// Copy a directory tree. Symbolic links are skipped so the copy never
/// points outside the destination.
pub(crate) fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let target = to.join(entry.file_name());
        if file_type.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &target)?;
        } else {
            log::debug!("Skipping non-regular template entry {}", entry.path().display());
        }
    }
    Ok(())
}
