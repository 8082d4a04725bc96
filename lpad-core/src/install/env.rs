// lpad-core/src/install/env.rs
//! Turns resolver-reported environments into ones that point at mirrored trees.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lpad_common::model::env::is_list_variable;
use lpad_common::model::EnvironmentMap;

/// Rewrites every value (or list entry) that lies inside a mapped source
/// tree. `mapping` pairs each source tree with its mirrored destination.
pub fn rebase_env(env: &EnvironmentMap, mapping: &[(PathBuf, PathBuf)]) -> EnvironmentMap {
    let mut out = EnvironmentMap::new();
    for (key, value) in env {
        let rebased = if is_list_variable(key) {
            value
                .split(':')
                .map(|entry| rebase_value(entry, mapping))
                .collect::<Vec<_>>()
                .join(":")
        } else {
            rebase_value(value, mapping)
        };
        out.set(key.clone(), rebased);
    }
    out
}

fn rebase_value(value: &str, mapping: &[(PathBuf, PathBuf)]) -> String {
    let path = Path::new(value);
    for (source, dest) in mapping {
        if let Ok(rest) = path.strip_prefix(source) {
            return if rest.as_os_str().is_empty() {
                dest.to_string_lossy().to_string()
            } else {
                dest.join(rest).to_string_lossy().to_string()
            };
        }
    }
    value.to_string()
}

/// Per-project environment for stubs.
///
/// Each project gets its own variables, the search-list entries of every
/// package resolved alongside it (its dependencies), and its own `bin`/`sbin`
/// in front of `PATH`.
pub fn aggregate_env(
    per_project: &BTreeMap<String, EnvironmentMap>,
    destinations: &BTreeMap<String, PathBuf>,
    mapping: &[(PathBuf, PathBuf)],
) -> BTreeMap<String, EnvironmentMap> {
    let rebased: BTreeMap<&String, EnvironmentMap> = per_project
        .iter()
        .map(|(project, env)| (project, rebase_env(env, mapping)))
        .collect();

    let mut shared = EnvironmentMap::new();
    for env in rebased.values() {
        for (key, value) in env {
            if is_list_variable(key) {
                shared.merge_value(key, value);
            }
        }
    }

    let mut result = BTreeMap::new();
    for (project, dest) in destinations {
        let mut env = rebased.get(project).cloned().unwrap_or_default();
        env.merge(&shared);
        let bins: Vec<String> = ["bin", "sbin"]
            .iter()
            .map(|d| dest.join(d))
            .filter(|p| p.is_dir())
            .map(|p| p.to_string_lossy().to_string())
            .collect();
        let bin_refs: Vec<&str> = bins.iter().map(String::as_str).collect();
        if !bin_refs.is_empty() {
            env.prepend_entries("PATH", &bin_refs);
        }
        result.insert(project.clone(), env);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebases_list_entries_and_scalars() {
        let mut env = EnvironmentMap::new();
        env.set("PATH", "/src/curl/bin:/usr/bin");
        env.set("SSL_CERT_FILE", "/src/openssl/ssl/cert.pem");
        env.set("CURL_HOME", "/src/curl");
        let mapping = vec![
            (PathBuf::from("/src/curl"), PathBuf::from("/root/pkgs/curl.se/v8.0.1")),
            (PathBuf::from("/src/openssl"), PathBuf::from("/root/pkgs/openssl.org/v3.1.0")),
        ];
        let out = rebase_env(&env, &mapping);
        assert_eq!(out.get("PATH"), Some("/root/pkgs/curl.se/v8.0.1/bin:/usr/bin"));
        assert_eq!(
            out.get("SSL_CERT_FILE"),
            Some("/root/pkgs/openssl.org/v3.1.0/ssl/cert.pem")
        );
        assert_eq!(out.get("CURL_HOME"), Some("/root/pkgs/curl.se/v8.0.1"));
    }

    #[test]
    fn dependencies_share_search_lists_but_not_scalars() {
        let tmp = tempfile::tempdir().unwrap();
        let curl = tmp.path().join("curl");
        std::fs::create_dir_all(curl.join("bin")).unwrap();
        let ssl = tmp.path().join("ssl");

        let mut per_project = BTreeMap::new();
        let mut ssl_env = EnvironmentMap::new();
        ssl_env.set("LD_LIBRARY_PATH", format!("{}/lib", ssl.display()));
        ssl_env.set("SSL_CERT_FILE", "/etc/cert.pem");
        per_project.insert("openssl.org".to_string(), ssl_env);

        let mut destinations = BTreeMap::new();
        destinations.insert("curl.se".to_string(), curl.clone());
        destinations.insert("openssl.org".to_string(), ssl.clone());

        let envs = aggregate_env(&per_project, &destinations, &[]);
        let curl_env = &envs["curl.se"];
        assert_eq!(
            curl_env.get("LD_LIBRARY_PATH").map(str::to_string),
            Some(format!("{}/lib", ssl.display()))
        );
        assert!(curl_env.get("SSL_CERT_FILE").is_none());
        assert_eq!(
            curl_env.get("PATH").map(str::to_string),
            Some(curl.join("bin").to_string_lossy().to_string())
        );
        assert_eq!(envs["openssl.org"].get("SSL_CERT_FILE"), Some("/etc/cert.pem"));
    }
}
