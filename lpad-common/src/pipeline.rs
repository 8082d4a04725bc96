// lpad-common/src/pipeline.rs
use std::path::PathBuf;

use serde::Serialize;

use crate::error::LpadError;
use crate::model::EnvironmentMap;

/// What happened to one resolved package during an install run.
#[derive(Debug, Clone)]
pub enum PackageOutcome {
    Installed {
        id: String,
        path: PathBuf,
        stubs: Vec<PathBuf>,
    },
    Skipped {
        id: String,
        path: PathBuf,
    },
    Failed {
        id: String,
        error: LpadError,
    },
}

impl PackageOutcome {
    pub fn id(&self) -> &str {
        match self {
            PackageOutcome::Installed { id, .. }
            | PackageOutcome::Skipped { id, .. }
            | PackageOutcome::Failed { id, .. } => id,
        }
    }
}

/// Aggregate of one `install` call.
#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    pub outcomes: Vec<PackageOutcome>,
    /// Set when the resolver answered in degraded mode.
    pub degraded: bool,
    /// Union of every resolved package's runtime variables, pointing into
    /// the install root.
    pub env: EnvironmentMap,
}

impl InstallReport {
    /// Stub paths written during this run.
    pub fn stubs(&self) -> Vec<PathBuf> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                PackageOutcome::Installed { stubs, .. } => Some(stubs.iter().cloned()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn installed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, PackageOutcome::Installed { .. }))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, PackageOutcome::Skipped { .. }))
            .count()
    }

    pub fn failures(&self) -> Vec<(&str, &LpadError)> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                PackageOutcome::Failed { id, error } => Some((id.as_str(), error)),
                _ => None,
            })
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures().is_empty()
    }

    pub fn summary(&self) -> InstallSummary {
        InstallSummary {
            installed: self.installed_count(),
            skipped: self.skipped_count(),
            failed: self.failures().len(),
            stubs: self.stubs().len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InstallSummary {
    pub installed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub stubs: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_each_outcome() {
        let report = InstallReport {
            outcomes: vec![
                PackageOutcome::Installed {
                    id: "curl.se@8.0.1".into(),
                    path: PathBuf::from("/p/curl"),
                    stubs: vec![PathBuf::from("/p/bin/curl")],
                },
                PackageOutcome::Skipped {
                    id: "zlib.net@1.3.0".into(),
                    path: PathBuf::from("/p/zlib"),
                },
                PackageOutcome::Failed {
                    id: "openssl.org@3.1.0".into(),
                    error: LpadError::PackageNotFound("openssl.org".into()),
                },
            ],
            ..Default::default()
        };
        assert_eq!(
            report.summary(),
            InstallSummary {
                installed: 1,
                skipped: 1,
                failed: 1,
                stubs: 1
            }
        );
        assert_eq!(report.failures()[0].0, "openssl.org@3.1.0");
        assert!(report.has_failures());
        assert!(!InstallReport::default().has_failures());
    }
}
