//! Structured events for the SCM resolution lifecycle.
//!
//! Probe outcomes are emitted at `debug!`, the selection result at `info!`.
//! Set `RUST_LOG=svcart_scm=debug` to see every probe.

use tracing::{debug, info, warn};

use crate::handler::ScmKind;

/// RAII guard that enters a resolution-scoped span.
///
/// ```ignore
/// let _span = ResolutionSpan::enter(env.work_dir());
/// // every probe event below is tagged with work_dir
/// ```
pub struct ResolutionSpan {
    _span: tracing::span::EnteredSpan,
}

impl ResolutionSpan {
    pub fn enter(work_dir: &std::path::Path) -> Self {
        let span = tracing::info_span!("svcart.resolve", work_dir = %work_dir.display());
        Self {
            _span: span.entered(),
        }
    }
}

/// A handler finished its availability probe.
pub fn emit_handler_probed(kind: ScmKind, priority: usize, available: bool) {
    debug!(
        event = "scm.handler_probed",
        kind = %kind,
        priority = priority,
        available = available,
    );
}

pub fn emit_handler_selected(kind: ScmKind, revision: Option<&str>) {
    info!(
        event = "scm.handler_selected",
        kind = %kind,
        revision = revision.unwrap_or("-"),
    );
}

pub fn emit_no_context(handlers_tried: usize) {
    info!(event = "scm.no_context", handlers_tried = handlers_tried);
}

/// A probe failed. Routine absence is logged at `debug!`, unexpected
/// faults (malformed tool output) at `warn!`.
pub fn emit_probe_failed(kind: ScmKind, error: &crate::error::ScmError) {
    if error.is_routine() {
        debug!(event = "scm.probe_failed", kind = %kind, error = %error);
    } else {
        warn!(event = "scm.probe_failed", kind = %kind, error = %error);
    }
}

pub fn emit_metadata_written(path: &std::path::Path, version: &str) {
    info!(event = "metadata.written", path = %path.display(), version = %version);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_span_create() {
        let _span = ResolutionSpan::enter(std::path::Path::new("/tmp"));
        emit_handler_probed(ScmKind::DistributedVcs, 1, false);
        emit_no_context(2);
    }
}
