//! Shared fixtures for lpad-core integration tests: a fake package store and
//! a shell script that plays the resolver.
#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lpad_common::config::Config;
use lpad_core::StubOptions;
use tempfile::TempDir;

pub struct Sandbox {
    pub tmp: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            tmp: tempfile::tempdir().expect("tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.tmp.path()
    }

    pub fn root(&self) -> PathBuf {
        self.path().join("root")
    }

    pub fn store(&self) -> PathBuf {
        self.path().join("store")
    }

    pub fn counter(&self) -> PathBuf {
        self.path().join("attempts")
    }

    pub fn attempts(&self) -> u32 {
        fs::read_to_string(self.counter())
            .map(|s| s.trim().parse().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Creates `store/<project>/v<version>` with one executable per name in
    /// `bins`, each printing `<name> <version>` and the PATH it saw.
    pub fn package(&self, project: &str, version: &str, bins: &[&str]) -> PathBuf {
        let dir = self.store().join(project).join(format!("v{version}"));
        fs::create_dir_all(dir.join("bin")).unwrap();
        fs::create_dir_all(dir.join("lib")).unwrap();
        fs::write(dir.join("lib").join(format!("lib{}.a", bins.first().unwrap_or(&"x"))), "ar").unwrap();
        for bin in bins {
            let exe = dir.join("bin").join(bin);
            fs::write(
                &exe,
                format!("#!/bin/sh\necho \"{bin} {version}\"\necho \"PATH=$PATH\"\n"),
            )
            .unwrap();
            fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();
        }
        dir
    }

    /// v2 JSON naming every `(project, version)` under the store.
    pub fn v2_json(&self, packages: &[(&str, &str)]) -> String {
        let entries: Vec<String> = packages
            .iter()
            .map(|(project, version)| {
                format!(
                    r#""{project}":{{"path":"{}","project":"{project}","version":"{version}"}}"#,
                    self.store().join(project).join(format!("v{version}")).display()
                )
            })
            .collect();
        format!(r#"{{"pkgs":{{{}}}}}"#, entries.join(","))
    }

    /// Writes the resolver script. `body` runs after the attempt counter
    /// has been bumped; `$n` holds the current attempt number.
    pub fn resolver(&self, body: &str) -> PathBuf {
        let path = self.path().join("fake-pkgx");
        let counter = self.counter();
        let script = format!(
            "#!/bin/sh\nn=0\nif [ -f '{c}' ]; then read n < '{c}'; fi\nn=$((n + 1))\necho \"$n\" > '{c}'\n{body}\n",
            c = counter.display()
        );
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Resolver that answers every query with `json`.
    pub fn answering_resolver(&self, json: &str) -> PathBuf {
        self.resolver(&format!("printf '%s\\n' '{json}'"))
    }

    pub fn config(&self, resolver: &Path) -> Config {
        let mut config = Config::with_root(&self.root());
        config.envs_dir = self.path().join("envs");
        config.shim_dir = self.path().join("shims");
        config.resolver_bin = Some(resolver.to_path_buf());
        config.retry_delay = Duration::from_millis(10);
        config.timeout = Duration::from_secs(20);
        config
    }

    pub fn stub_options(&self, config: &Config) -> StubOptions {
        StubOptions {
            force: config.force_reinstall,
            dev_aware: false,
            resolver: config.resolver_command().to_string_lossy().to_string(),
            dev_marker_dir: self.path().join("dev"),
        }
    }
}
