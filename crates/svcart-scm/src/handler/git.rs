//! Git handler.
//!
//! The revision is read straight from the control directory (`HEAD`, loose
//! refs, `packed-refs`), so a checkout is recognised even on build agents
//! without a git binary. The `git` tool is only needed for the dirty-tree
//! check and as a fallback when the metadata cannot be interpreted.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use super::{is_full_revision, is_revision_id, sanitize_identifier, ScmHandler, ScmKind};
use crate::config::ScmConfig;
use crate::environment::Environment;
use crate::error::{Result, ScmError};
use crate::obs;
use crate::tool::ScmTool;

pub const GIT_DIR_VAR: &str = "GIT_DIR";
pub const GIT_WORK_TREE_VAR: &str = "GIT_WORK_TREE";
pub const GIT_CEILING_DIRECTORIES_VAR: &str = "GIT_CEILING_DIRECTORIES";
const MARKER: &str = ".git";

/// The variables this handler reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitEnv {
    /// Explicit control directory, resolved against the working directory
    pub git_dir: Option<PathBuf>,
    /// Explicit work tree; only meaningful together with `git_dir`
    pub work_tree: Option<PathBuf>,
    /// Directories the upward `.git` search never enters
    pub ceiling_dirs: Vec<PathBuf>,
}

impl GitEnv {
    pub fn from_env(env: &Environment) -> Self {
        GitEnv {
            git_dir: env.get(GIT_DIR_VAR).map(|dir| env.resolve(dir)),
            work_tree: env.get(GIT_WORK_TREE_VAR).map(|dir| env.resolve(dir)),
            ceiling_dirs: env
                .get(GIT_CEILING_DIRECTORIES_VAR)
                .map(|raw| {
                    std::env::split_paths(raw)
                        .filter(|dir| dir.is_absolute())
                        .map(crate::environment::absolute)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// A located repository: where its metadata lives and which tree it
/// describes. Every `git` subprocess is pinned to both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkout {
    pub git_dir: PathBuf,
    pub work_tree: PathBuf,
}

impl Checkout {
    /// `GIT_DIR` (with `GIT_WORK_TREE` or the working directory as its tree),
    /// else the nearest `.git` above `work_dir`, stopping at the ceilings.
    /// A `.git` file is a `gitdir:` pointer.
    pub fn locate(vars: &GitEnv, work_dir: &Path) -> Result<Checkout> {
        if let Some(dir) = &vars.git_dir {
            if !dir.is_dir() {
                return Err(ScmError::NotARepository(dir.clone()));
            }
            return Ok(Checkout {
                git_dir: dir.clone(),
                work_tree: vars.work_tree.clone().unwrap_or_else(|| work_dir.to_path_buf()),
            });
        }

        let marker = Environment::new(work_dir)
            .find_upwards_bounded(MARKER, &vars.ceiling_dirs)
            .ok_or_else(|| ScmError::NotARepository(work_dir.to_path_buf()))?;
        let work_tree = marker.parent().unwrap_or(work_dir).to_path_buf();

        if marker.is_dir() {
            return Ok(Checkout {
                git_dir: marker,
                work_tree,
            });
        }

        let content = std::fs::read_to_string(&marker)?;
        let target = content
            .lines()
            .find_map(|line| line.strip_prefix("gitdir:"))
            .map(str::trim)
            .ok_or_else(|| {
                ScmError::MalformedOutput(format!("{} has no gitdir line", marker.display()))
            })?;

        let git_dir = work_tree.join(target);
        if git_dir.is_dir() {
            Ok(Checkout { git_dir, work_tree })
        } else {
            Err(ScmError::NotARepository(git_dir))
        }
    }

    /// Run `git` against this checkout regardless of the current directory
    /// or any repository enclosing it.
    pub fn git(&self, tool: &dyn ScmTool, args: &[&str]) -> Result<String> {
        let git_dir = format!("--git-dir={}", self.git_dir.display());
        let work_tree = format!("--work-tree={}", self.work_tree.display());
        let mut full = vec![git_dir.as_str(), work_tree.as_str()];
        full.extend_from_slice(args);
        tool.run(&self.work_tree, &full)
    }

    /// `git rev-parse HEAD`, accepting abbreviated ids.
    pub fn rev_parse_head(&self, tool: &dyn ScmTool) -> Result<String> {
        let rev = self.git(tool, &["rev-parse", "HEAD"])?;
        if is_revision_id(&rev) {
            Ok(rev)
        } else {
            Err(ScmError::MalformedOutput(format!(
                "git rev-parse HEAD returned {rev:?}"
            )))
        }
    }
}

/// Repository state captured by a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitState {
    pub checkout: Checkout,
    pub revision: String,
    /// Short branch name, `None` for a detached HEAD
    pub branch: Option<String>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Head {
    Symbolic(String),
    Detached(String),
}

#[derive(Debug)]
pub struct GitHandler {
    vars: GitEnv,
    work_dir: PathBuf,
    config: ScmConfig,
    tool: Arc<dyn ScmTool>,
    state: OnceLock<Option<GitState>>,
}

impl GitHandler {
    pub fn new(
        vars: GitEnv,
        work_dir: impl Into<PathBuf>,
        config: ScmConfig,
        tool: Arc<dyn ScmTool>,
    ) -> Self {
        Self {
            vars,
            work_dir: work_dir.into(),
            config,
            tool,
            state: OnceLock::new(),
        }
    }

    pub fn from_env(env: &Environment, config: &ScmConfig, tool: Arc<dyn ScmTool>) -> Self {
        Self::new(GitEnv::from_env(env), env.work_dir(), config.clone(), tool)
    }

    /// Repository state, probed once.
    pub fn state(&self) -> Option<&GitState> {
        self.state
            .get_or_init(|| match self.probe() {
                Ok(state) => Some(state),
                Err(e) => {
                    obs::emit_probe_failed(ScmKind::DistributedVcs, &e);
                    None
                }
            })
            .as_ref()
    }

    fn probe(&self) -> Result<GitState> {
        let checkout = Checkout::locate(&self.vars, &self.work_dir)?;
        let head = read_head(&checkout.git_dir);

        let revision = match head.as_ref() {
            Ok(head) => resolve_head(&checkout.git_dir, head),
            Err(_) => Err(ScmError::NoRevision("HEAD unreadable".to_string())),
        };
        let revision = match revision {
            Ok(rev) => rev,
            Err(metadata_err) => {
                tracing::debug!(error = %metadata_err, "falling back to git rev-parse");
                match checkout.rev_parse_head(self.tool.as_ref()) {
                    Ok(rev) => rev,
                    Err(e @ ScmError::MalformedOutput(_)) => return Err(e),
                    Err(_) => return Err(metadata_err),
                }
            }
        };

        let branch = match head {
            Ok(Head::Symbolic(refname)) => Some(short_branch(&refname).to_string()),
            _ => None,
        };
        let dirty = self.config.dirty_check && self.is_dirty(&checkout);

        Ok(GitState {
            checkout,
            revision: revision.to_ascii_lowercase(),
            branch,
            dirty,
        })
    }

    fn is_dirty(&self, checkout: &Checkout) -> bool {
        match checkout.git(
            self.tool.as_ref(),
            &["status", "--porcelain", "--untracked-files=no"],
        ) {
            Ok(out) => !out.is_empty(),
            Err(e) => {
                obs::emit_probe_failed(ScmKind::DistributedVcs, &e);
                false
            }
        }
    }
}

fn read_head(git_dir: &Path) -> Result<Head> {
    let raw = std::fs::read_to_string(git_dir.join("HEAD"))?;
    let raw = raw.trim();
    match raw.strip_prefix("ref:") {
        Some(refname) => Ok(Head::Symbolic(refname.trim().to_string())),
        None if is_full_revision(raw) => Ok(Head::Detached(raw.to_string())),
        None => Err(ScmError::MalformedOutput(format!("unexpected HEAD: {raw:?}"))),
    }
}

fn resolve_head(git_dir: &Path, head: &Head) -> Result<String> {
    match head {
        Head::Detached(sha) => Ok(sha.clone()),
        Head::Symbolic(refname) => resolve_ref(git_dir, refname),
    }
}

/// Loose ref in the (worktree) git dir, then in the common dir, then
/// `packed-refs`.
fn resolve_ref(git_dir: &Path, refname: &str) -> Result<String> {
    let common = common_dir(git_dir);

    for dir in [git_dir, common.as_path()] {
        if let Ok(raw) = std::fs::read_to_string(dir.join(refname)) {
            let sha = raw.trim();
            if !is_full_revision(sha) {
                return Err(ScmError::MalformedOutput(format!(
                    "{refname} contains {sha:?}"
                )));
            }
            return Ok(sha.to_string());
        }
    }

    if let Ok(packed) = std::fs::read_to_string(common.join("packed-refs")) {
        let hit = packed
            .lines()
            .filter(|line| !line.starts_with('#') && !line.starts_with('^'))
            .filter_map(|line| line.split_once(' '))
            .find(|(_, name)| name.trim() == refname);
        if let Some((sha, _)) = hit {
            if is_full_revision(sha) {
                return Ok(sha.to_string());
            }
            return Err(ScmError::MalformedOutput(format!(
                "packed-refs entry for {refname} is {sha:?}"
            )));
        }
    }

    Err(ScmError::NoRevision(format!("{refname} has no commits")))
}

/// Linked worktrees keep shared refs in the directory named by `commondir`.
fn common_dir(git_dir: &Path) -> PathBuf {
    std::fs::read_to_string(git_dir.join("commondir"))
        .map(|raw| git_dir.join(raw.trim()))
        .unwrap_or_else(|_| git_dir.to_path_buf())
}

fn short_branch(refname: &str) -> &str {
    refname.strip_prefix("refs/heads/").unwrap_or(refname)
}

impl ScmHandler for GitHandler {
    fn kind(&self) -> ScmKind {
        ScmKind::DistributedVcs
    }

    fn name(&self) -> &str {
        "git"
    }

    fn is_available(&self) -> bool {
        self.state().is_some()
    }

    fn revision(&self) -> Option<String> {
        self.state().map(|s| s.revision.clone())
    }

    /// `{base}+{short}` on a default branch or detached HEAD,
    /// `{base}-{branch}+{short}` elsewhere, `.dirty` appended for a modified
    /// tree.
    fn annotated_version(&self, base: &str) -> String {
        let Some(state) = self.state() else {
            return base.to_string();
        };

        let short = self.config.short_revision(&state.revision);
        let dirty = if state.dirty { ".dirty" } else { "" };

        match state.branch.as_deref() {
            Some(branch) if !self.config.is_default_branch(branch) => {
                format!("{base}-{}+{short}{dirty}", sanitize_identifier(branch))
            }
            _ => format!("{base}+{short}{dirty}"),
        }
    }
}
