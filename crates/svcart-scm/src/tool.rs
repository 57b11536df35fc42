//! External SCM tool invocation.

use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;

use crate::error::{Result, ScmError};
use crate::metrics::METRICS;

/// Runs an SCM command-line tool and returns its trimmed stdout.
///
/// Handlers go through this seam rather than `std::process` so that tests can
/// script responses and count invocations.
pub trait ScmTool: Send + Sync + std::fmt::Debug {
    fn run(&self, dir: &Path, args: &[&str]) -> Result<String>;
}

/// `git` executed as a child process.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
}

impl GitCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Full SHA of `HEAD` in the repository containing `dir`.
    pub fn head_sha(&self, dir: &Path) -> Result<String> {
        let sha = self.run(dir, &["rev-parse", "HEAD"])?;
        if sha.is_empty() {
            return Err(ScmError::MalformedOutput(
                "git rev-parse HEAD returned empty output".to_string(),
            ));
        }
        Ok(sha)
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git")
    }
}

impl ScmTool for GitCli {
    fn run(&self, dir: &Path, args: &[&str]) -> Result<String> {
        METRICS.inc_tool_invocations();
        tracing::debug!(tool = %self.program, args = ?args, dir = %dir.display(), "running");

        let output = Command::new(&self.program)
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ScmError::ToolNotFound {
                    tool: self.program.clone(),
                },
                _ => ScmError::Io(e),
            })?;

        if !output.status.success() {
            return Err(ScmError::ToolFailed {
                tool: self.program.clone(),
                args: args.join(" "),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
