//! svcart SCM core
//!
//! Detects the source-control context of a project and derives annotated
//! versions and build metadata for service artifacts.
//!
//! A host build tool needs two calls:
//!
//! ```no_run
//! use svcart_scm::{annotate_version, resolve_scm_context, Environment};
//!
//! let context = resolve_scm_context(&Environment::from_process());
//! let version = annotate_version("1.2.3", context);
//! ```

pub mod config;
pub mod environment;
pub mod error;
pub mod fakes;
pub mod handler;
pub mod metrics;
pub mod obs;
pub mod selector;
pub mod telemetry;
pub mod tool;
pub mod version;

use std::sync::OnceLock;

pub use config::ScmConfig;
pub use environment::Environment;
pub use error::{Result, ScmError};
pub use handler::{
    Checkout, GerritEnv, GerritHandler, GitEnv, GitHandler, GitState, ScmHandler, ScmKind,
};
pub use metrics::METRICS;
pub use obs::ResolutionSpan;
pub use selector::{ScmContext, ScmInfo, ScmResolver};
pub use telemetry::init_tracing;
pub use tool::{GitCli, ScmTool};
pub use version::{
    annotate_version, local_host_name, read_version_metadata, write_version_metadata,
    VersionMetadata, DEFAULT_METADATA_PATH,
};

static PROCESS_RESOLVER: OnceLock<ScmResolver> = OnceLock::new();

/// Process-wide SCM context.
///
/// The first call builds the default handler chain from `env` and resolves
/// it; every later call returns that same context, whatever environment it
/// passes. Hosts that need more than one context per process should own a
/// [`ScmResolver`] instead.
pub fn resolve_scm_context(env: &Environment) -> &'static ScmContext {
    let resolver = PROCESS_RESOLVER
        .get_or_init(|| ScmResolver::with_defaults(env, &ScmConfig::from_env(env)));
    if !resolver.is_resolved() {
        let _span = ResolutionSpan::enter(env.work_dir());
        return resolver.resolve();
    }
    resolver.resolve()
}

/// svcart version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
