//! Gerrit review-system handler.
//!
//! CI jobs triggered by Gerrit (e.g. the Jenkins Gerrit Trigger) inject the
//! change under review through `GERRIT_*` variables. When those are present
//! the artifact is built from an unmerged patch set, and the version says so.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use super::git::{Checkout, GitEnv};
use super::{is_revision_id, ScmHandler, ScmKind};
use crate::config::ScmConfig;
use crate::environment::Environment;
use crate::error::{Result, ScmError};
use crate::obs;
use crate::tool::ScmTool;

pub const CHANGE_NUMBER_VAR: &str = "GERRIT_CHANGE_NUMBER";
pub const PATCHSET_NUMBER_VAR: &str = "GERRIT_PATCHSET_NUMBER";
pub const PATCHSET_REVISION_VAR: &str = "GERRIT_PATCHSET_REVISION";

/// The `GERRIT_*` variables this handler reads, and nothing else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GerritEnv {
    pub change_number: Option<String>,
    pub patchset_number: Option<String>,
    pub patchset_revision: Option<String>,
}

impl GerritEnv {
    pub fn from_env(env: &Environment) -> Self {
        let var = |key: &str| env.get(key).map(str::to_string);
        GerritEnv {
            change_number: var(CHANGE_NUMBER_VAR),
            patchset_number: var(PATCHSET_NUMBER_VAR),
            patchset_revision: var(PATCHSET_REVISION_VAR),
        }
    }
}

/// Resolved review state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GerritChange {
    pub change: u64,
    pub patchset: u64,
    pub revision: String,
}

#[derive(Debug)]
pub struct GerritHandler {
    vars: GerritEnv,
    /// Locates the checkout when the patch set revision has to come from HEAD
    git: GitEnv,
    work_dir: PathBuf,
    config: ScmConfig,
    tool: Arc<dyn ScmTool>,
    state: OnceLock<Option<GerritChange>>,
}

impl GerritHandler {
    pub fn new(
        vars: GerritEnv,
        git: GitEnv,
        work_dir: impl Into<PathBuf>,
        config: ScmConfig,
        tool: Arc<dyn ScmTool>,
    ) -> Self {
        Self {
            vars,
            git,
            work_dir: work_dir.into(),
            config,
            tool,
            state: OnceLock::new(),
        }
    }

    pub fn from_env(env: &Environment, config: &ScmConfig, tool: Arc<dyn ScmTool>) -> Self {
        Self::new(
            GerritEnv::from_env(env),
            GitEnv::from_env(env),
            env.work_dir(),
            config.clone(),
            tool,
        )
    }

    pub fn vars(&self) -> &GerritEnv {
        &self.vars
    }

    /// The change under review, probed once.
    pub fn change(&self) -> Option<&GerritChange> {
        self.state
            .get_or_init(|| match self.probe() {
                Ok(change) => change,
                Err(e) => {
                    obs::emit_probe_failed(ScmKind::ReviewSystem, &e);
                    None
                }
            })
            .as_ref()
    }

    fn probe(&self) -> Result<Option<GerritChange>> {
        let (Some(change), Some(patchset)) = (
            self.vars.change_number.as_deref(),
            self.vars.patchset_number.as_deref(),
        ) else {
            return Ok(None);
        };

        let change = parse_number(CHANGE_NUMBER_VAR, change)?;
        let patchset = parse_number(PATCHSET_NUMBER_VAR, patchset)?;

        let revision = match self.vars.patchset_revision.as_deref() {
            Some(rev) => rev.to_string(),
            None => {
                Checkout::locate(&self.git, &self.work_dir)?.rev_parse_head(self.tool.as_ref())?
            }
        };
        if !is_revision_id(&revision) {
            return Err(ScmError::MalformedOutput(format!(
                "patch set revision is not a hex commit id: {revision:?}"
            )));
        }

        Ok(Some(GerritChange {
            change,
            patchset,
            revision: revision.to_ascii_lowercase(),
        }))
    }
}

fn parse_number(var: &str, raw: &str) -> Result<u64> {
    raw.parse()
        .map_err(|_| ScmError::MalformedOutput(format!("{var} is not a number: {raw:?}")))
}

impl ScmHandler for GerritHandler {
    fn kind(&self) -> ScmKind {
        ScmKind::ReviewSystem
    }

    fn name(&self) -> &str {
        "gerrit"
    }

    fn is_available(&self) -> bool {
        self.change().is_some()
    }

    fn revision(&self) -> Option<String> {
        self.change().map(|c| c.revision.clone())
    }

    /// `{base}-review.{change}.{patchset}+{short revision}`
    fn annotated_version(&self, base: &str) -> String {
        match self.change() {
            Some(c) => format!(
                "{base}-review.{}.{}+{}",
                c.change,
                c.patchset,
                self.config.short_revision(&c.revision)
            ),
            None => base.to_string(),
        }
    }
}
