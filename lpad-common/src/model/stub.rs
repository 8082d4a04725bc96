// lpad-common/src/model/stub.rs
use std::path::PathBuf;

use super::env::EnvironmentMap;

/// Everything needed to render one stub script.
#[derive(Debug, Clone)]
pub struct StubScript {
    pub binary_name: String,
    pub target: PathBuf,
    pub env: EnvironmentMap,
    pub dev_aware: bool,
    /// Pins the on-demand resolver fallback to the exact package.
    pub project: String,
    pub version: String,
}
