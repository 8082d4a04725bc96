// lpad-common/src/model/version.rs
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{LpadError, Result};

static STRICT_VERSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^v?(\d+)\.(\d+)\.(\d+)(?:-([0-9A-Za-z.-]+))?(?:\+[0-9A-Za-z.-]+)?$")
        .expect("static version regex")
});

static LOOSE_VERSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^v?(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:-([0-9A-Za-z.-]+))?(?:\+[0-9A-Za-z.-]+)?$")
        .expect("static version regex")
});

/// A `major.minor.patch[-prerelease]` version.
///
/// Ordering compares the numeric triple first; at an equal triple a release
/// outranks any prerelease, and prereleases compare as plain strings.
/// Build metadata is kept in `raw` but ignored for ordering and equality.
#[derive(Debug, Clone)]
pub struct SemanticVersion {
    pub raw: String,
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
}

impl SemanticVersion {
    /// Requires all three numeric components. A leading `v` is accepted.
    pub fn parse(input: &str) -> Result<Self> {
        Self::from_captures(input, &STRICT_VERSION)
    }

    /// Like [`parse`](Self::parse) but pads missing minor/patch with zero.
    pub fn parse_loose(input: &str) -> Result<Self> {
        Self::from_captures(input, &LOOSE_VERSION)
    }

    fn from_captures(input: &str, pattern: &Regex) -> Result<Self> {
        let trimmed = input.trim();
        let caps = pattern
            .captures(trimmed)
            .ok_or_else(|| LpadError::VersionError(format!("'{input}' is not a version")))?;

        let number = |idx: usize| -> Result<u64> {
            match caps.get(idx) {
                Some(m) => m.as_str().parse::<u64>().map_err(|e| {
                    LpadError::VersionError(format!("'{input}' component out of range: {e}"))
                }),
                None => Ok(0),
            }
        };

        let (major, minor, patch) = (number(1)?, number(2)?, number(3)?);
        let prerelease = caps.get(4).map(|m| m.as_str().to_string());
        // Padded versions get a canonical raw form so shelf names stay strict.
        let raw = if caps.get(2).is_some() && caps.get(3).is_some() {
            trimmed.trim_start_matches('v').to_string()
        } else {
            match &prerelease {
                Some(pre) => format!("{major}.{minor}.{patch}-{pre}"),
                None => format!("{major}.{minor}.{patch}"),
            }
        };

        Ok(Self {
            raw,
            major,
            minor,
            patch,
            prerelease,
        })
    }

    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    /// Directory name used on a shelf, e.g. `v1.2.3`.
    pub fn dir_name(&self) -> String {
        format!("v{}", self.raw)
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SemanticVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SemanticVersion {}

impl Hash for SemanticVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.major, self.minor, self.patch, &self.prerelease).hash(state);
    }
}

impl Serialize for SemanticVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for SemanticVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        SemanticVersion::parse_loose(&raw).map_err(serde::de::Error::custom)
    }
}
