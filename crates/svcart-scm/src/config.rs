//! Version derivation settings.

use serde::{Deserialize, Serialize};

use crate::environment::Environment;

pub const SHORT_REVISION_LENGTH_VAR: &str = "SVCART_SHORT_REVISION_LENGTH";
pub const DIRTY_CHECK_VAR: &str = "SVCART_DIRTY_CHECK";
pub const DEFAULT_BRANCHES_VAR: &str = "SVCART_DEFAULT_BRANCHES";
pub const GIT_PROGRAM_VAR: &str = "SVCART_GIT";

const MIN_SHORT_REVISION: usize = 4;
const MAX_SHORT_REVISION: usize = 64;

/// Settings shared by all handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScmConfig {
    /// Number of revision characters embedded in annotated versions
    pub short_revision_length: usize,
    /// Whether the git handler checks for uncommitted changes
    pub dirty_check: bool,
    /// Branches that do not add a qualifier to the version
    pub default_branches: Vec<String>,
    /// Git executable
    pub git_program: String,
}

impl Default for ScmConfig {
    fn default() -> Self {
        ScmConfig {
            short_revision_length: 7,
            dirty_check: true,
            default_branches: vec!["main".to_string(), "master".to_string()],
            git_program: "git".to_string(),
        }
    }
}

impl ScmConfig {
    /// Read overrides from `SVCART_*` variables; anything unset or
    /// unparseable keeps its default.
    pub fn from_env(env: &Environment) -> Self {
        let mut config = Self::default();

        if let Some(raw) = env.get(SHORT_REVISION_LENGTH_VAR) {
            match raw.parse::<usize>() {
                Ok(len) => config = config.with_short_revision_length(len),
                Err(_) => tracing::warn!(
                    var = SHORT_REVISION_LENGTH_VAR,
                    value = %raw,
                    "ignoring non-numeric value"
                ),
            }
        }

        if let Some(raw) = env.get(DIRTY_CHECK_VAR) {
            config.dirty_check = parse_flag(raw);
        }

        if let Some(raw) = env.get(DEFAULT_BRANCHES_VAR) {
            config.default_branches = raw
                .split(',')
                .map(str::trim)
                .filter(|b| !b.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(program) = env.get(GIT_PROGRAM_VAR) {
            config.git_program = program.to_string();
        }

        config
    }

    pub fn with_short_revision_length(mut self, len: usize) -> Self {
        self.short_revision_length = len.clamp(MIN_SHORT_REVISION, MAX_SHORT_REVISION);
        self
    }

    pub fn with_dirty_check(mut self, enabled: bool) -> Self {
        self.dirty_check = enabled;
        self
    }

    pub fn is_default_branch(&self, branch: &str) -> bool {
        self.default_branches.iter().any(|b| b == branch)
    }

    /// Truncate a revision to the configured short form.
    pub fn short_revision<'a>(&self, revision: &'a str) -> &'a str {
        let end = self.short_revision_length.min(revision.len());
        revision.get(..end).unwrap_or(revision)
    }
}

fn parse_flag(raw: &str) -> bool {
    !matches!(
        raw.to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_overrides() {
        let config = ScmConfig::from_env(&Environment::new("/tmp"));
        assert_eq!(config, ScmConfig::default());
        assert!(config.is_default_branch("main"));
        assert!(config.is_default_branch("master"));
        assert!(!config.is_default_branch("develop"));
    }

    #[test]
    fn overrides_from_env() {
        let env = Environment::new("/tmp")
            .with_var(SHORT_REVISION_LENGTH_VAR, "10")
            .with_var(DIRTY_CHECK_VAR, "off")
            .with_var(DEFAULT_BRANCHES_VAR, "trunk, release ,")
            .with_var(GIT_PROGRAM_VAR, "/usr/local/bin/git");

        let config = ScmConfig::from_env(&env);
        assert_eq!(config.short_revision_length, 10);
        assert!(!config.dirty_check);
        assert_eq!(config.default_branches, vec!["trunk", "release"]);
        assert_eq!(config.git_program, "/usr/local/bin/git");
    }

    #[test]
    fn invalid_length_keeps_default() {
        let env = Environment::new("/tmp").with_var(SHORT_REVISION_LENGTH_VAR, "seven");
        assert_eq!(ScmConfig::from_env(&env).short_revision_length, 7);
    }

    #[test]
    fn length_is_clamped() {
        assert_eq!(
            ScmConfig::default()
                .with_short_revision_length(1)
                .short_revision_length,
            4
        );
        assert_eq!(
            ScmConfig::default()
                .with_short_revision_length(500)
                .short_revision_length,
            64
        );
    }

    #[test]
    fn short_revision_truncates() {
        let config = ScmConfig::default();
        assert_eq!(
            config.short_revision("0123456789abcdef0123456789abcdef01234567"),
            "0123456"
        );
        assert_eq!(config.short_revision("abc"), "abc");
    }

    #[test]
    fn dirty_flag_accepts_truthy_values() {
        for raw in ["1", "true", "yes", "on", "TRUE"] {
            assert!(parse_flag(raw), "{raw} should enable");
        }
        for raw in ["0", "false", "no", "OFF"] {
            assert!(!parse_flag(raw), "{raw} should disable");
        }
    }
}
