// lpad-common/src/dependency/requirement.rs
use std::fmt;
use std::str::FromStr;

use semver::VersionReq;
use serde::{Deserialize, Serialize};

use crate::error::{LpadError, Result};

const CONSTRAINT_START: [char; 6] = ['@', '^', '~', '>', '<', '='];

/// A project plus the version range requested for it, e.g. `nodejs.org^20`.
///
/// Versions are point requests handed to the resolver untouched; the
/// constraint is only validated here so obvious typos fail before any
/// subprocess is spawned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageRequirement {
    pub project: String,
    pub constraint: String,
}

impl PackageRequirement {
    pub fn new(project: impl Into<String>, constraint: impl Into<String>) -> Result<Self> {
        let project = project.into();
        let constraint = normalize_constraint(&constraint.into())?;
        validate_project(&project)?;
        Ok(Self {
            project,
            constraint,
        })
    }

    /// Parses `project`, `project@20`, `project^1.2`, `project>=3 <4` and friends.
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim().trim_start_matches('+');
        match spec.find(&CONSTRAINT_START[..]) {
            Some(0) => Err(LpadError::InvalidConstraint(format!(
                "'{spec}' has a version but no project"
            ))),
            Some(idx) => Self::new(&spec[..idx], &spec[idx..]),
            None => Self::new(spec, "*"),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.constraint == "*"
    }

    /// The argument form understood by the resolver.
    pub fn to_spec(&self) -> String {
        if self.is_wildcard() {
            self.project.clone()
        } else {
            format!("{}{}", self.project, self.constraint)
        }
    }
}

impl FromStr for PackageRequirement {
    type Err = LpadError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for PackageRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_spec())
    }
}

fn validate_project(project: &str) -> Result<()> {
    let valid = !project.is_empty()
        && project
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '/'));
    if valid {
        Ok(())
    } else {
        Err(LpadError::InvalidConstraint(format!(
            "'{project}' is not a valid project name"
        )))
    }
}

/// `@20` means `^20`, `@20.1` means `~20.1` and `@20.1.3` pins exactly.
fn normalize_constraint(raw: &str) -> Result<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "*" || raw == "@latest" {
        return Ok("*".to_string());
    }

    let normalized = match raw.strip_prefix('@') {
        Some(version) => match version.split('.').count() {
            1 => format!("^{version}"),
            2 => format!("~{version}"),
            _ => format!("={version}"),
        },
        None => raw.to_string(),
    };

    for alternative in normalized.split("||") {
        let alternative = alternative.trim();
        VersionReq::parse(alternative).map_err(|e| {
            LpadError::InvalidConstraint(format!("'{raw}' ({alternative}): {e}"))
        })?;
    }
    Ok(normalized)
}
