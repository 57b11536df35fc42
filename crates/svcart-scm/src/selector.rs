//! Handler selection.
//!
//! [`ScmResolver`] walks its handlers in priority order and keeps the first
//! available one. The outcome lives in a `OnceLock`: the first caller runs the
//! probes, concurrent callers wait for it, and everyone afterwards gets the
//! same [`ScmContext`] without probing again.

use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use crate::config::ScmConfig;
use crate::environment::Environment;
use crate::handler::{GerritHandler, GitHandler, ScmHandler, ScmKind};
use crate::metrics::METRICS;
use crate::obs;
use crate::tool::{GitCli, ScmTool};

/// Outcome of handler selection for one run.
#[derive(Debug, Clone, Default)]
pub struct ScmContext {
    selected: Option<Arc<dyn ScmHandler>>,
}

impl ScmContext {
    /// Context with no SCM information; versions pass through unchanged.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_handler(handler: Arc<dyn ScmHandler>) -> Self {
        Self {
            selected: Some(handler),
        }
    }

    pub fn handler(&self) -> Option<&Arc<dyn ScmHandler>> {
        self.selected.as_ref()
    }

    pub fn kind(&self) -> Option<ScmKind> {
        self.selected.as_ref().map(|h| h.kind())
    }

    pub fn has_scm(&self) -> bool {
        self.selected.is_some()
    }

    /// Revision of the selected handler; `None` exactly when no handler was
    /// available.
    pub fn revision(&self) -> Option<String> {
        self.selected.as_ref().and_then(|h| h.revision())
    }

    /// Annotated version, or `base` unchanged without SCM context.
    pub fn version(&self, base: &str) -> String {
        match &self.selected {
            Some(handler) => handler.annotated_version(base),
            None => base.to_string(),
        }
    }

    pub fn info(&self) -> ScmInfo {
        ScmInfo {
            kind: self.kind(),
            handler: self.selected.as_ref().map(|h| h.name().to_string()),
            revision: self.revision(),
        }
    }
}

/// Serializable summary of a resolved context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScmInfo {
    pub kind: Option<ScmKind>,
    pub handler: Option<String>,
    pub revision: Option<String>,
}

/// Ordered handler chain with a memoized selection.
#[derive(Debug)]
pub struct ScmResolver {
    handlers: Vec<Arc<dyn ScmHandler>>,
    context: OnceLock<ScmContext>,
}

impl ScmResolver {
    /// Handlers are probed in the order given.
    pub fn new(handlers: Vec<Arc<dyn ScmHandler>>) -> Self {
        Self {
            handlers,
            context: OnceLock::new(),
        }
    }

    /// Standard chain: Gerrit review first, then plain git.
    pub fn with_defaults(env: &Environment, config: &ScmConfig) -> Self {
        let tool: Arc<dyn ScmTool> = Arc::new(GitCli::new(config.git_program.clone()));
        Self::with_tool(env, config, tool)
    }

    /// Standard chain sharing a custom tool.
    pub fn with_tool(env: &Environment, config: &ScmConfig, tool: Arc<dyn ScmTool>) -> Self {
        let review: Arc<dyn ScmHandler> =
            Arc::new(GerritHandler::from_env(env, config, tool.clone()));
        let vcs: Arc<dyn ScmHandler> = Arc::new(GitHandler::from_env(env, config, tool));
        Self::new(vec![review, vcs])
    }

    pub fn handlers(&self) -> &[Arc<dyn ScmHandler>] {
        &self.handlers
    }

    pub fn is_resolved(&self) -> bool {
        self.context.get().is_some()
    }

    /// Select a handler on first call; return the cached context afterwards.
    pub fn resolve(&self) -> &ScmContext {
        if let Some(context) = self.context.get() {
            METRICS.inc_cache_hits();
            return context;
        }
        self.context.get_or_init(|| self.select())
    }

    /// Shorthand for `resolve().version(base)`.
    pub fn version(&self, base: &str) -> String {
        self.resolve().version(base)
    }

    fn select(&self) -> ScmContext {
        METRICS.inc_resolutions();

        for (priority, handler) in self.handlers.iter().enumerate() {
            METRICS.inc_handlers_probed();
            let available = handler.is_available();
            obs::emit_handler_probed(handler.kind(), priority, available);

            if available {
                obs::emit_handler_selected(handler.kind(), handler.revision().as_deref());
                return ScmContext::with_handler(Arc::clone(handler));
            }
        }

        obs::emit_no_context(self.handlers.len());
        ScmContext::none()
    }
}
