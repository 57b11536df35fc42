//! In-memory fakes for the tool and handler seams (testing only)
//!
//! `ScriptedTool` answers SCM commands from a table and counts invocations;
//! `CountingHandler` is a handler with a fixed outcome that records how often
//! each capability was queried.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::{Result, ScmError};
use crate::handler::{ScmHandler, ScmKind};
use crate::tool::ScmTool;

// ---------------------------------------------------------------------------
// ScriptedTool
// ---------------------------------------------------------------------------

/// Tool whose responses are keyed by the space-joined argument list, minus
/// leading `--git-dir=`/`--work-tree=` options. Unscripted commands fail like
/// a missing binary.
#[derive(Debug, Default)]
pub struct ScriptedTool {
    responses: HashMap<String, Option<String>>,
    calls: AtomicUsize,
    invocations: Mutex<Vec<String>>,
}

impl ScriptedTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Succeed with `stdout` for `args`.
    pub fn respond(mut self, args: &str, stdout: &str) -> Self {
        self.responses
            .insert(args.to_string(), Some(stdout.to_string()));
        self
    }

    /// Fail with a non-zero exit for `args`.
    pub fn fail(mut self, args: &str) -> Self {
        self.responses.insert(args.to_string(), None);
        self
    }

    /// Number of commands run so far, scripted or not.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every command run so far, with its full argument list.
    pub fn invocations(&self) -> Vec<String> {
        self.invocations
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }
}

fn command_key(args: &[&str]) -> String {
    args.iter()
        .skip_while(|arg| arg.starts_with("--git-dir=") || arg.starts_with("--work-tree="))
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

impl ScmTool for ScriptedTool {
    fn run(&self, _dir: &Path, args: &[&str]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut log) = self.invocations.lock() {
            log.push(args.join(" "));
        }
        let key = command_key(args);
        match self.responses.get(&key) {
            Some(Some(stdout)) => Ok(stdout.trim().to_string()),
            Some(None) => Err(ScmError::ToolFailed {
                tool: "git".to_string(),
                args: key,
                status: "exit status: 128".to_string(),
                stderr: "fatal: scripted failure".to_string(),
            }),
            None => Err(ScmError::ToolNotFound {
                tool: "git".to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// CountingHandler
// ---------------------------------------------------------------------------

/// Handler with a fixed outcome. `is_available` calls are counted so tests
/// can assert short-circuiting and memoization.
#[derive(Debug)]
pub struct CountingHandler {
    kind: ScmKind,
    name: String,
    revision: Option<String>,
    probes: AtomicUsize,
}

impl CountingHandler {
    /// Available handler reporting `revision`.
    pub fn available(kind: ScmKind, revision: &str) -> Self {
        Self {
            kind,
            name: format!("counting-{kind}"),
            revision: Some(revision.to_string()),
            probes: AtomicUsize::new(0),
        }
    }

    pub fn unavailable(kind: ScmKind) -> Self {
        Self {
            kind,
            name: format!("counting-{kind}"),
            revision: None,
            probes: AtomicUsize::new(0),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// How many times `is_available` was called.
    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

impl ScmHandler for CountingHandler {
    fn kind(&self) -> ScmKind {
        self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.revision.is_some()
    }

    fn revision(&self) -> Option<String> {
        self.revision.clone()
    }

    fn annotated_version(&self, base: &str) -> String {
        match &self.revision {
            Some(rev) => format!("{base}+{rev}"),
            None => base.to_string(),
        }
    }
}
