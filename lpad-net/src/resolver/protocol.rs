// lpad-net/src/resolver/protocol.rs
//! Decoding of the resolver's structured output.
//!
//! Both known shapes are accepted:
//!
//! ```text
//! v1: { "pkgs": [ { "path": ..., "project": ..., "version": ... } ], "env": {...}, "runtime_env": {...} }
//! v2: { "pkgs": { "<project>": { "path": ..., "project": ..., "version": ... } }, ... }
//! ```
//!
//! Env values may be a string or a list of strings. Everything is normalized
//! into [`ResolverOutput`] here; nothing past this module sees raw JSON.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lpad_common::error::{LpadError, Result};
use lpad_common::model::{EnvironmentMap, ResolvedInstallation, ResolverOutput, SemanticVersion};
use serde::Deserialize;
use tracing::{debug, warn};

/// Output formats to request, most capable first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    V2,
    V1,
    /// No structured output; installations are synthesized.
    Plain,
}

impl ProtocolVersion {
    pub const LADDER: [ProtocolVersion; 3] =
        [ProtocolVersion::V2, ProtocolVersion::V1, ProtocolVersion::Plain];

    pub fn flag(self) -> Option<&'static str> {
        match self {
            ProtocolVersion::V2 => Some("--json=v2"),
            ProtocolVersion::V1 => Some("--json=v1"),
            ProtocolVersion::Plain => None,
        }
    }
}

/// Stderr fragments resolvers print when they do not know the json flag.
const UNSUPPORTED_MARKERS: &[&str] = &[
    "unknown flag: --json",
    "unknown option: --json",
    "unrecognized option '--json",
    "unrecognized option: --json",
    "invalid value for --json",
    "unknown json version",
];

/// True when the resolver's stderr says it cannot produce the requested format.
pub fn is_unsupported_format(stderr: &str) -> bool {
    let lower = stderr.to_ascii_lowercase();
    UNSUPPORTED_MARKERS.iter().any(|m| lower.contains(m))
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    pkgs: RawPackages,
    #[serde(default)]
    env: BTreeMap<String, RawEnvValue>,
    #[serde(default)]
    runtime_env: BTreeMap<String, BTreeMap<String, RawEnvValue>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPackages {
    List(Vec<RawPackage>),
    Keyed(BTreeMap<String, RawPackage>),
}

#[derive(Debug, Deserialize)]
struct RawPackage {
    path: PathBuf,
    #[serde(default)]
    project: Option<String>,
    #[serde(default)]
    pkg: Option<RawPkgRef>,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPkgRef {
    project: String,
    version: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEnvValue {
    One(String),
    Many(Vec<String>),
}

impl RawEnvValue {
    fn joined(&self) -> String {
        match self {
            RawEnvValue::One(v) => v.clone(),
            RawEnvValue::Many(vs) => vs.join(":"),
        }
    }
}

/// Decodes resolver stdout into the normalized model.
pub fn decode(stdout: &[u8]) -> Result<ResolverOutput> {
    let raw: RawResponse = serde_json::from_slice(stdout).map_err(|e| {
        LpadError::ResolverFailure(format!("resolver returned malformed JSON: {e}"))
    })?;

    let entries: Vec<(Option<String>, RawPackage)> = match raw.pkgs {
        RawPackages::List(list) => list.into_iter().map(|p| (None, p)).collect(),
        RawPackages::Keyed(map) => map.into_iter().map(|(k, p)| (Some(k), p)).collect(),
    };

    let mut installations = Vec::with_capacity(entries.len());
    for (key, pkg) in entries {
        match normalize_package(key, pkg) {
            Ok(installation) => installations.push(installation),
            Err(e) => warn!("Ignoring resolver entry: {}", e),
        }
    }

    let mut env = BTreeMap::new();
    for installation in &installations {
        let mut map = EnvironmentMap::new();
        // Aggregate variables are attributed to the package whose tree they name.
        for (name, value) in &raw.env {
            let joined = value.joined();
            let own: Vec<&str> = joined
                .split(':')
                .filter(|entry| Path::new(entry).starts_with(&installation.path))
                .collect();
            if !own.is_empty() {
                map.merge_value(name, &own.join(":"));
            }
        }
        if let Some(runtime) = raw.runtime_env.get(&installation.project) {
            for (name, value) in runtime {
                map.merge_value(name, &value.joined());
            }
        }
        env.entry(installation.project.clone())
            .or_insert_with(EnvironmentMap::new)
            .merge(&map);
    }

    debug!(
        "Decoded {} installation(s) for {} project(s)",
        installations.len(),
        env.len()
    );
    Ok(ResolverOutput {
        installations,
        env,
        degraded: false,
    })
}

fn normalize_package(key: Option<String>, pkg: RawPackage) -> Result<ResolvedInstallation> {
    let (project, version) = match (pkg.project, pkg.version, pkg.pkg) {
        (Some(project), Some(version), _) => (project, version),
        (_, _, Some(inner)) => (inner.project, inner.version),
        (None, Some(version), None) => match key {
            Some(project) => (project, version),
            None => {
                return Err(LpadError::ResolverFailure(format!(
                    "entry for {} has no project",
                    pkg.path.display()
                )))
            }
        },
        (_, None, None) => {
            return Err(LpadError::ResolverFailure(format!(
                "entry for {} has no version",
                pkg.path.display()
            )))
        }
    };

    if !pkg.path.is_absolute() {
        return Err(LpadError::ResolverFailure(format!(
            "{project}: path {} is not absolute",
            pkg.path.display()
        )));
    }

    Ok(ResolvedInstallation {
        path: pkg.path,
        project,
        version: SemanticVersion::parse_loose(&version)?,
    })
}
