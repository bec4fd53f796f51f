//! Project root discovery.
//!
//! The formula list lives under the project root, which has to be found both
//! when the tool runs from a build tree and when it is installed elsewhere.
//! Discovery runs once at startup and the result is passed around as
//! configuration.

use std::env;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

/// Path segment marking the build-output directory inside a project.
pub const SENTINEL: &str = "target";

/// Ancestor steps taken from the running executable when no sentinel is
/// present: `<root>/bin/<exe>` resolves to `<root>`.
pub const FALLBACK_ANCESTOR_STEPS: usize = 2;

/// Resolve the project root from the running executable's path.
///
/// Three tiers, first match wins:
/// 1. the path contains the [`SENTINEL`] segment: everything before it;
/// 2. otherwise the ancestor [`FALLBACK_ANCESTOR_STEPS`] levels up;
/// 3. otherwise `cwd`.
///
/// Never fails.
pub fn resolve_project_root(running_path: &Path, cwd: &Path) -> PathBuf {
    if let Some(root) = before_sentinel(running_path) {
        return root;
    }
    if let Some(root) = running_path
        .ancestors()
        .nth(FALLBACK_ANCESTOR_STEPS)
        .filter(|p| !p.as_os_str().is_empty())
    {
        return root.to_path_buf();
    }
    cwd.to_path_buf()
}

fn before_sentinel(path: &Path) -> Option<PathBuf> {
    let components: Vec<Component<'_>> = path.components().collect();
    let position = components
        .iter()
        .position(|c| matches!(c, Component::Normal(name) if *name == OsStr::new(SENTINEL)))?;
    if position == 0 {
        return None;
    }
    Some(components[..position].iter().collect())
}

/// Root directory of the project the pipeline writes into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRoot {
    path: PathBuf,
}

impl ProjectRoot {
    /// Use an explicit root.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Discover the root from the running executable.
    ///
    /// See [`resolve_project_root`] for the fallback chain.
    pub fn discover() -> Self {
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let path = match env::current_exe() {
            Ok(exe) => resolve_project_root(&exe, &cwd),
            Err(e) => {
                log::debug!("Executable path unavailable ({}), using working directory", e);
                cwd
            }
        };
        log::debug!("Project root: {}", path.display());
        Self { path }
    }

    /// The root directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<root>/output/intermediate`.
    pub fn intermediate_dir(&self) -> PathBuf {
        self.path.join("output").join("intermediate")
    }

    /// `<root>/output/intermediate/formula_images_list.json`.
    pub fn formula_list_path(&self) -> PathBuf {
        self.intermediate_dir().join("formula_images_list.json")
    }
}
