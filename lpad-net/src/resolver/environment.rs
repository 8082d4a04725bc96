// lpad-net/src/resolver/environment.rs
//! The environment a resolver subprocess is allowed to see.
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Variables copied from the caller. Anything else is dropped so ambient
/// shell state cannot change what gets resolved.
pub const FORWARDED_VARS: &[&str] = &[
    "HOME",
    "PKGX_DIR",
    "PKGX_PANTRY_PATH",
    "PKGX_PANTRY_DIR",
    "PKGX_DIST_URL",
    "XDG_CACHE_HOME",
    "XDG_DATA_HOME",
];

const FALLBACK_PATH: &str = "/usr/local/bin:/usr/bin:/bin:/usr/sbin:/sbin";

/// Builds the child environment from the current process.
pub fn resolver_env(exclude_dirs: &[PathBuf]) -> HashMap<String, String> {
    build_env(|name| env::var(name).ok(), exclude_dirs)
}

pub(crate) fn build_env<F>(lookup: F, exclude_dirs: &[PathBuf]) -> HashMap<String, String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut vars = HashMap::new();
    for name in FORWARDED_VARS {
        if let Some(value) = lookup(name).filter(|v| !v.is_empty()) {
            vars.insert((*name).to_string(), value);
        }
    }
    let path = sanitize_path(lookup("PATH").as_deref().unwrap_or(""), exclude_dirs);
    vars.insert("PATH".to_string(), path);

    debug!(
        "Resolver environment: {:?}",
        vars.keys().collect::<Vec<_>>()
    );
    vars
}

/// Keeps absolute, existing, de-duplicated entries and drops `exclude_dirs`
/// (our own stub directories, which would otherwise shadow real tools).
pub fn sanitize_path(raw: &str, exclude_dirs: &[PathBuf]) -> String {
    let mut kept: Vec<&str> = Vec::new();
    for entry in raw.split(':') {
        let path = Path::new(entry);
        if entry.is_empty() || !path.is_absolute() || !path.is_dir() {
            continue;
        }
        if exclude_dirs.iter().any(|ex| ex == path) || kept.contains(&entry) {
            continue;
        }
        kept.push(entry);
    }
    if kept.is_empty() {
        return FALLBACK_PATH.to_string();
    }
    kept.join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_allow_listed_variables_survive() {
        let tmp = tempfile::tempdir().unwrap();
        let bin = tmp.path().to_string_lossy().to_string();
        let lookup = |name: &str| match name {
            "HOME" => Some("/home/dev".to_string()),
            "PKGX_DIR" => Some("/home/dev/.pkgx".to_string()),
            "AWS_SECRET_ACCESS_KEY" => Some("nope".to_string()),
            "PATH" => Some(format!("{bin}:relative:{bin}:/does/not/exist")),
            _ => None,
        };
        let vars = build_env(lookup, &[]);
        assert_eq!(vars.get("HOME").map(String::as_str), Some("/home/dev"));
        assert_eq!(vars.get("PKGX_DIR").map(String::as_str), Some("/home/dev/.pkgx"));
        assert!(!vars.contains_key("AWS_SECRET_ACCESS_KEY"));
        assert_eq!(vars.get("PATH"), Some(&bin));
    }

    #[test]
    fn excluded_dirs_are_removed_from_path() {
        let tmp = tempfile::tempdir().unwrap();
        let ours = tmp.path().join("bin");
        let theirs = tmp.path().join("usr-bin");
        std::fs::create_dir_all(&ours).unwrap();
        std::fs::create_dir_all(&theirs).unwrap();
        let raw = format!("{}:{}", ours.display(), theirs.display());

        let sanitized = sanitize_path(&raw, &[ours]);
        assert_eq!(sanitized, theirs.to_string_lossy());
    }

    #[test]
    fn empty_path_falls_back_to_system_dirs() {
        assert_eq!(sanitize_path("", &[]), FALLBACK_PATH);
    }
}
