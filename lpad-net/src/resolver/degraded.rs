// lpad-net/src/resolver/degraded.rs
//! Best-effort results for resolvers without structured output.
//!
//! The installations built here come from the request strings alone. Their
//! paths follow the resolver's usual `<data dir>/<project>/v<version>` layout
//! but nothing checks that the trees exist; the install engine fails any
//! package whose path is missing.
use std::path::Path;

use lpad_common::dependency::PackageRequirement;
use lpad_common::model::{ResolvedInstallation, ResolverOutput, SemanticVersion};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

static VERSION_IN_CONSTRAINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d+(?:\.\d+){0,2}(?:-[0-9A-Za-z.-]+)?").expect("static version regex")
});

/// Synthesizes one installation per spec that names a concrete version.
pub fn synthesize(specs: &[String], data_dir: &Path) -> ResolverOutput {
    let mut installations = Vec::new();
    for spec in specs {
        let requirement = match PackageRequirement::parse(spec) {
            Ok(req) => req,
            Err(e) => {
                warn!("Degraded mode: cannot parse '{}': {}", spec, e);
                continue;
            }
        };
        let Some(found) = VERSION_IN_CONSTRAINT.find(&requirement.constraint) else {
            warn!(
                "Degraded mode: '{}' has no version to pin, skipping",
                spec
            );
            continue;
        };
        let version = match SemanticVersion::parse_loose(found.as_str()) {
            Ok(v) => v,
            Err(e) => {
                warn!("Degraded mode: '{}': {}", spec, e);
                continue;
            }
        };
        let path = data_dir
            .join(&requirement.project)
            .join(version.dir_name());
        installations.push(ResolvedInstallation {
            path,
            project: requirement.project,
            version,
        });
    }

    ResolverOutput {
        installations,
        env: Default::default(),
        degraded: true,
    }
}
