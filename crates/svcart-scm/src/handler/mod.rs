//! SCM handlers.
//!
//! A handler detects one kind of source-control system and, when present,
//! reports its revision and derives an annotated version from a base version.
//! Handlers are probed in priority order by [`crate::selector::ScmResolver`].

pub mod gerrit;
pub mod git;

use serde::{Deserialize, Serialize};

pub use gerrit::{GerritEnv, GerritHandler};
pub use git::{Checkout, GitEnv, GitHandler, GitState};

/// Kind of source-control system a handler understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScmKind {
    /// Code-review front-end layered on a VCS (Gerrit change under review)
    ReviewSystem,
    /// Plain distributed VCS checkout (git)
    DistributedVcs,
}

impl ScmKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScmKind::ReviewSystem => "review-system",
            ScmKind::DistributedVcs => "distributed-vcs",
        }
    }
}

impl std::fmt::Display for ScmKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability set shared by every handler.
///
/// Implementations memoize their probes: whichever of these methods runs
/// first performs the external work, later calls reuse the result. None of
/// them may fail; probe errors become `false` / `None`.
pub trait ScmHandler: Send + Sync + std::fmt::Debug {
    fn kind(&self) -> ScmKind;

    /// Human-readable handler name for logs and `svcart info`.
    fn name(&self) -> &str;

    /// Whether this SCM is present. A handler is only available when it can
    /// also produce a revision.
    fn is_available(&self) -> bool;

    /// Full revision identifier, `None` when unavailable.
    fn revision(&self) -> Option<String>;

    /// `base` with SCM qualifiers appended. Returns `base` unchanged when the
    /// handler is unavailable.
    fn annotated_version(&self, base: &str) -> String;
}

/// Replace every character outside `[0-9A-Za-z-]` with `-` so the value can
/// be used as a semver pre-release or build identifier.
pub(crate) fn sanitize_identifier(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect()
}

/// A commit id as git prints it: full SHA-1/SHA-256 or an abbreviation of at
/// least four hex characters.
pub(crate) fn is_revision_id(candidate: &str) -> bool {
    (4..=64).contains(&candidate.len()) && is_hex(candidate)
}

/// A full object id (SHA-1 or SHA-256), as stored in `HEAD` and refs.
pub(crate) fn is_full_revision(candidate: &str) -> bool {
    matches!(candidate.len(), 40 | 64) && is_hex(candidate)
}

fn is_hex(candidate: &str) -> bool {
    candidate.chars().all(|c| c.is_ascii_hexdigit())
}
