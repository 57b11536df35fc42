//! Version formatting and the build metadata record written next to a
//! packaged distribution.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::environment::Environment;
use crate::obs;
use crate::selector::ScmContext;

/// Default metadata location, relative to the project directory.
pub const DEFAULT_METADATA_PATH: &str = "build/version.json";

/// Annotate `base` with the context's SCM qualifiers. Without SCM context
/// the base version is returned unchanged.
pub fn annotate_version(base: &str, context: &ScmContext) -> String {
    context.version(base)
}

/// Snapshot describing one packaging pass.
///
/// Serialized as `{buildDate, version, name, revision, builtOn}`; `revision`
/// is `null` when the build had no SCM context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VersionMetadata {
    pub build_date: DateTime<Utc>,
    pub version: String,
    pub name: String,
    pub revision: Option<String>,
    pub built_on: String,
}

impl VersionMetadata {
    /// Record for `name` at `version`, stamped now on this host.
    pub fn build(name: &str, version: &str, context: &ScmContext, env: &Environment) -> Self {
        Self::build_at(
            name,
            version,
            context.revision(),
            local_host_name(env),
            Utc::now(),
        )
    }

    pub fn build_at(
        name: &str,
        version: &str,
        revision: Option<String>,
        built_on: String,
        build_date: DateTime<Utc>,
    ) -> Self {
        VersionMetadata {
            build_date,
            version: version.to_string(),
            name: name.to_string(),
            revision,
            built_on,
        }
    }
}

/// Write the record as pretty JSON, creating parent directories.
pub fn write_version_metadata(path: &Path, metadata: &VersionMetadata) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
    }
    let content = serde_json::to_string_pretty(metadata).context("serialize version metadata")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    obs::emit_metadata_written(path, &metadata.version);
    Ok(())
}

pub fn read_version_metadata(path: &Path) -> Result<VersionMetadata> {
    let content = std::fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("parse {:?}", path))
}

/// Host name from the OS, then `HOSTNAME` in `env`, then `"unknown"`.
pub fn local_host_name(env: &Environment) -> String {
    host_name_from(sysinfo::System::host_name(), env)
}

fn host_name_from(system: Option<String>, env: &Environment) -> String {
    system
        .filter(|name| !name.trim().is_empty())
        .or_else(|| env.get("HOSTNAME").map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string())
}
