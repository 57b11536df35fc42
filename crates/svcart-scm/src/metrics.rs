//! Global atomic counters for SCM probing.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. when the CLI exits).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    handlers_probed: AtomicU64,
    tool_invocations: AtomicU64,
    resolutions: AtomicU64,
    cache_hits: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            handlers_probed: AtomicU64::new(0),
            tool_invocations: AtomicU64::new(0),
            resolutions: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
        }
    }

    /// A handler's availability was evaluated by the selector.
    pub fn inc_handlers_probed(&self) {
        self.handlers_probed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "handlers_probed", "counter incremented");
    }

    /// An external SCM process was spawned.
    pub fn inc_tool_invocations(&self) {
        self.tool_invocations.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "tool_invocations", "counter incremented");
    }

    /// A resolver ran its handler chain.
    pub fn inc_resolutions(&self) {
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "resolutions", "counter incremented");
    }

    /// A caller was served the memoized context.
    pub fn inc_cache_hits(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            handlers_probed = self.handlers_probed(),
            tool_invocations = self.tool_invocations(),
            resolutions = self.resolutions(),
            cache_hits = self.cache_hits(),
        );
    }

    pub fn handlers_probed(&self) -> u64 {
        self.handlers_probed.load(Ordering::Relaxed)
    }

    pub fn tool_invocations(&self) -> u64 {
        self.tool_invocations.load(Ordering::Relaxed)
    }

    pub fn resolutions(&self) -> u64 {
        self.resolutions.load(Ordering::Relaxed)
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.handlers_probed.store(0, Ordering::Relaxed);
        self.tool_invocations.store(0, Ordering::Relaxed);
        self.resolutions.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
    }
}
