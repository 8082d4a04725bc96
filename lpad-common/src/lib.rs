// lpad-common/src/lib.rs
pub mod config;
pub mod dependency;
pub mod error;
pub mod installed;
pub mod model;
pub mod pipeline;

// Re-export key types
pub use config::Config;
pub use dependency::PackageRequirement;
pub use error::{LpadError, Result};
pub use installed::{InstalledPackageRecord, PackageRegistry};
pub use model::{EnvironmentMap, ResolvedInstallation, ResolverOutput, SemanticVersion};
pub use pipeline::{InstallReport, PackageOutcome};
