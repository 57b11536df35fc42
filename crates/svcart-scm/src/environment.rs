//! Read-only view of the process environment and working directory.
//!
//! Handlers never touch `std::env` directly; everything they read comes
//! through an [`Environment`] supplied once at entry, which keeps the probe
//! surface auditable and lets tests describe a whole run with one value.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Immutable environment mapping plus the working directory handlers probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
    work_dir: PathBuf,
}

impl Environment {
    /// Empty environment rooted at `work_dir`. Relative paths are taken
    /// against the current directory and `.`/`..` are folded away.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            vars: BTreeMap::new(),
            work_dir: absolute(work_dir.into()),
        }
    }

    /// Snapshot of the current process: every variable whose name and value
    /// are valid UTF-8 (others are skipped) and the current directory.
    pub fn from_process() -> Self {
        let work_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let vars = std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)));
        Self::new(work_dir).with_vars(vars)
    }

    /// Same variables, different working directory.
    pub fn at(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = absolute(work_dir.into());
        self
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn with_vars<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.vars
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Look up a variable. Empty or whitespace-only values count as unset,
    /// which is how CI systems usually "clear" an injected variable.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Resolve `path` against the working directory (absolute paths pass through).
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.work_dir.join(path)
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.resolve(path).exists()
    }

    pub fn is_dir(&self, path: impl AsRef<Path>) -> bool {
        self.resolve(path).is_dir()
    }

    pub fn is_file(&self, path: impl AsRef<Path>) -> bool {
        self.resolve(path).is_file()
    }

    /// Read a file as UTF-8. Missing or unreadable files are `None`.
    pub fn read_to_string(&self, path: impl AsRef<Path>) -> Option<String> {
        std::fs::read_to_string(self.resolve(path)).ok()
    }

    /// Walk from the working directory towards the root and return the first
    /// `<ancestor>/<marker>` that exists (file or directory).
    pub fn find_upwards(&self, marker: &str) -> Option<PathBuf> {
        self.find_upwards_bounded(marker, &[])
    }

    /// Like [`find_upwards`](Self::find_upwards), but the walk never enters a
    /// directory listed in `ceilings`. The working directory itself is always
    /// checked.
    pub fn find_upwards_bounded(&self, marker: &str, ceilings: &[PathBuf]) -> Option<PathBuf> {
        let mut dirs = self.work_dir.ancestors();
        let start = dirs.next()?;
        std::iter::once(start)
            .chain(dirs.take_while(|dir| !ceilings.iter().any(|c| c.as_path() == *dir)))
            .map(|dir| dir.join(marker))
            .find(|candidate| candidate.exists())
    }
}

/// Anchor `path` at the current directory and fold `.`/`..` lexically.
pub(crate) fn absolute(path: PathBuf) -> PathBuf {
    let path = if path.is_absolute() {
        path
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path,
        }
    };

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }

    if out.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        out
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::from_process()
    }
}
