// lpad-common/src/model/environment.rs
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::env::EnvironmentMap;
use crate::installed::InstalledPackageRecord;

/// An isolated install tree owned by one project directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectEnvironment {
    pub hash: String,
    pub root_path: PathBuf,
    /// Recorded on first install; absent for trees created by older tools.
    pub project_dir: Option<PathBuf>,
    pub packages: Vec<InstalledPackageRecord>,
    pub created_at: DateTime<Utc>,
}

/// Persisted next to an environment's `pkgs/` as `.lpad-env.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentMetadata {
    pub project_dir: PathBuf,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub env: EnvironmentMap,
}

/// Advisory signals for cleanup tooling. Nothing enforces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentHealth {
    pub has_binaries: bool,
    pub has_packages: bool,
}

impl EnvironmentHealth {
    pub fn is_healthy(&self) -> bool {
        self.has_binaries && self.has_packages
    }
}
