// lpad-common/src/model/installation.rs
use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::env::EnvironmentMap;
use super::version::SemanticVersion;

/// One package tree the resolver produced for a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedInstallation {
    pub path: PathBuf,
    pub project: String,
    pub version: SemanticVersion,
}

impl ResolvedInstallation {
    /// `project@version`, used in logs and reports.
    pub fn id(&self) -> String {
        format!("{}@{}", self.project, self.version)
    }
}

/// Normalized result of one resolver query, whatever protocol produced it.
#[derive(Debug, Clone, Default)]
pub struct ResolverOutput {
    pub installations: Vec<ResolvedInstallation>,
    /// Runtime environment per project.
    pub env: BTreeMap<String, EnvironmentMap>,
    /// Set when the resolver could not answer in a structured format and
    /// the installations were synthesized from the request. Paths may not exist.
    pub degraded: bool,
}

impl ResolverOutput {
    pub fn env_for(&self, project: &str) -> EnvironmentMap {
        self.env.get(project).cloned().unwrap_or_default()
    }
}
