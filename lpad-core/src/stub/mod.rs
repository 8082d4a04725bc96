// lpad-core/src/stub/mod.rs
//! Stub generation: one small shell script per packaged binary.
use std::path::{Path, PathBuf};

use lpad_aio::fs as lpad_fs;
use lpad_common::config::Config;
use lpad_common::error::{LpadError, Result};
use lpad_common::model::StubScript;
use tracing::debug;

pub mod script;

pub use script::{render, shell_quote, RenderContext};

const STUB_MODE: u32 = 0o755;

#[derive(Debug, Clone)]
pub struct StubOptions {
    pub force: bool,
    pub dev_aware: bool,
    pub resolver: String,
    pub dev_marker_dir: PathBuf,
}

impl StubOptions {
    /// Dev awareness also needs the dev command to exist right now.
    pub fn from_config(config: &Config) -> Self {
        let dev_aware = config.dev_aware && which::which(&config.dev_command).is_ok();
        if config.dev_aware && !dev_aware {
            debug!(
                "'{}' not found, stubs will not check for dev environments",
                config.dev_command
            );
        }
        Self {
            force: config.force_reinstall,
            dev_aware,
            resolver: config.resolver_command().to_string_lossy().to_string(),
            dev_marker_dir: config.dev_marker_dir.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StubOutcome {
    Created(PathBuf),
    /// Already present and not forcing.
    Skipped(PathBuf),
}

impl StubOutcome {
    pub fn path(&self) -> &Path {
        match self {
            StubOutcome::Created(p) | StubOutcome::Skipped(p) => p,
        }
    }
}

/// Writes `target_dir/<binary_name>`.
pub fn create_stub(stub: &StubScript, target_dir: &Path, opts: &StubOptions) -> Result<StubOutcome> {
    if stub.binary_name.is_empty() || stub.binary_name.contains('/') {
        return Err(LpadError::InstallError(format!(
            "'{}' is not a valid binary name",
            stub.binary_name
        )));
    }
    let stub_path = target_dir.join(&stub.binary_name);

    if lpad_fs::check_symlink_exists(&stub_path) {
        if !opts.force {
            debug!("Stub {} exists, leaving it", stub_path.display());
            return Ok(StubOutcome::Skipped(stub_path));
        }
        lpad_fs::remove_existing_link_target(&stub_path)?;
    }

    let mut stub = stub.clone();
    stub.dev_aware = stub.dev_aware && opts.dev_aware;
    let content = render(
        &stub,
        &RenderContext {
            stub_dir: target_dir,
            resolver: &opts.resolver,
            dev_marker_dir: &opts.dev_marker_dir,
        },
    );
    lpad_fs::atomic_write_file(&stub_path, content.as_bytes(), STUB_MODE)?;
    debug!(
        "Created stub {} -> {}",
        stub_path.display(),
        stub.target.display()
    );
    Ok(StubOutcome::Created(stub_path))
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::process::Command;

    use lpad_common::model::EnvironmentMap;

    use super::*;

    fn opts(force: bool) -> StubOptions {
        StubOptions {
            force,
            dev_aware: false,
            resolver: "lpad-test-no-such-resolver".to_string(),
            dev_marker_dir: PathBuf::from("/nonexistent"),
        }
    }

    fn write_exe(path: &Path, body: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn stub_for(target: &Path, env: EnvironmentMap) -> StubScript {
        StubScript {
            binary_name: "tool".to_string(),
            target: target.to_path_buf(),
            env,
            dev_aware: false,
            project: "example.com/tool".to_string(),
            version: "1.0.0".to_string(),
        }
    }

    #[test]
    fn stub_scopes_environment_to_one_invocation() {
        let tmp = tempfile::tempdir().unwrap();
        let pkg_bin = tmp.path().join("pkgs/example.com/tool/v1.0.0/bin");
        let observed = tmp.path().join("observed");
        write_exe(
            &pkg_bin.join("tool"),
            &format!(
                "printf '%s|%s|%s' \"$PATH\" \"$TOOL_HOME\" \"$1\" > '{}'",
                observed.display()
            ),
        );

        let mut env = EnvironmentMap::new();
        env.set("PATH", pkg_bin.to_string_lossy().to_string());
        env.set("TOOL_HOME", "/opt/tool");
        let bin_dir = tmp.path().join("bin");
        let outcome = create_stub(&stub_for(&pkg_bin.join("tool"), env), &bin_dir, &opts(false)).unwrap();
        assert!(matches!(outcome, StubOutcome::Created(_)));

        let out = Command::new("/bin/sh")
            .arg("-c")
            .arg("PATH=/x; export PATH; \"$0\" arg1; printf 'after:%s|%s' \"$PATH\" \"${TOOL_HOME-unset}\"")
            .arg(outcome.path())
            .env_remove("TOOL_HOME")
            .output()
            .unwrap();
        assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
        assert_eq!(String::from_utf8_lossy(&out.stdout), "after:/x|unset");

        let seen = fs::read_to_string(&observed).unwrap();
        assert_eq!(seen, format!("{}:/x|/opt/tool|arg1", pkg_bin.display()));
    }

    #[test]
    fn exit_status_of_the_binary_is_preserved() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("pkg/bin/tool");
        write_exe(&target, "exit 7");
        let outcome = create_stub(&stub_for(&target, EnvironmentMap::new()), &tmp.path().join("bin"), &opts(false)).unwrap();
        let status = Command::new(outcome.path()).status().unwrap();
        assert_eq!(status.code(), Some(7));
    }

    #[test]
    fn missing_target_falls_back_to_original_path() {
        let tmp = tempfile::tempdir().unwrap();
        let elsewhere = tmp.path().join("elsewhere");
        write_exe(&elsewhere.join("tool"), "echo from-elsewhere");
        let bin_dir = tmp.path().join("bin");
        let outcome = create_stub(
            &stub_for(&tmp.path().join("gone/bin/tool"), EnvironmentMap::new()),
            &bin_dir,
            &opts(false),
        )
        .unwrap();

        let path = format!("{}:{}:/usr/bin:/bin", bin_dir.display(), elsewhere.display());
        let out = Command::new(outcome.path()).env("PATH", path).output().unwrap();
        assert!(out.status.success());
        assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "from-elsewhere");
        assert!(String::from_utf8_lossy(&out.stderr).contains("warning"));
    }

    #[test]
    fn missing_target_without_fallback_exits_127() {
        let tmp = tempfile::tempdir().unwrap();
        let outcome = create_stub(
            &stub_for(&tmp.path().join("gone/bin/tool"), EnvironmentMap::new()),
            &tmp.path().join("bin"),
            &opts(false),
        )
        .unwrap();
        let out = Command::new(outcome.path()).env("PATH", "/usr/bin:/bin").output().unwrap();
        assert_eq!(out.status.code(), Some(127));
    }

    #[test]
    fn failing_resolver_still_reaches_the_path_fallback() {
        let tmp = tempfile::tempdir().unwrap();
        let resolver = tmp.path().join("resolver/pkgx");
        write_exe(&resolver, "echo 'pkg not found' >&2\nexit 1");
        let elsewhere = tmp.path().join("elsewhere");
        write_exe(&elsewhere.join("tool"), "echo from-elsewhere");
        let bin_dir = tmp.path().join("bin");
        let mut options = opts(false);
        options.resolver = resolver.to_string_lossy().to_string();
        let outcome = create_stub(
            &stub_for(&tmp.path().join("gone/bin/tool"), EnvironmentMap::new()),
            &bin_dir,
            &options,
        )
        .unwrap();

        let path = format!("{}:{}:/usr/bin:/bin", bin_dir.display(), elsewhere.display());
        let out = Command::new(outcome.path()).env("PATH", path).output().unwrap();
        assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
        assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "from-elsewhere");
    }

    #[test]
    fn missing_target_runs_through_the_resolver() {
        let tmp = tempfile::tempdir().unwrap();
        let provided = tmp.path().join("provided");
        write_exe(&provided.join("tool"), "echo \"from-resolver $*\"");
        let resolver = tmp.path().join("resolver/pkgx");
        write_exe(
            &resolver,
            &format!(
                "[ \"$1\" = '+example.com/tool=1.0.0' ] || exit 9\nshift\nPATH='{}':$PATH exec \"$@\"",
                provided.display()
            ),
        );
        let bin_dir = tmp.path().join("bin");
        let mut options = opts(false);
        options.resolver = resolver.to_string_lossy().to_string();
        let outcome = create_stub(
            &stub_for(&tmp.path().join("gone/bin/tool"), EnvironmentMap::new()),
            &bin_dir,
            &options,
        )
        .unwrap();

        let path = format!("{}:/usr/bin:/bin", bin_dir.display());
        let out = Command::new(outcome.path())
            .arg("x")
            .env("PATH", path)
            .output()
            .unwrap();
        assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
        assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "from-resolver x");
        assert!(String::from_utf8_lossy(&out.stderr).contains("running through"));
    }

    #[test]
    fn activated_dev_environment_wins_over_the_mirror() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("pkg/bin/tool");
        write_exe(&target, "echo from-mirror");
        let dev_bin = tmp.path().join("dev-bin");
        write_exe(&dev_bin.join("tool"), "echo from-dev");
        let project = tmp.path().join("proj");
        let nested = project.join("src");
        fs::create_dir_all(&nested).unwrap();
        let markers = tmp.path().join("dev");
        let marker = PathBuf::from(format!("{}{}", markers.display(), project.display()));
        fs::create_dir_all(&marker).unwrap();
        fs::write(marker.join("dev.pkgx.activated"), "").unwrap();

        let mut stub = stub_for(&target, EnvironmentMap::new());
        stub.dev_aware = true;
        let mut options = opts(false);
        options.dev_aware = true;
        options.dev_marker_dir = markers;
        let bin_dir = tmp.path().join("bin");
        let outcome = create_stub(&stub, &bin_dir, &options).unwrap();

        let run = |cwd: &Path, path: String| {
            let out = Command::new(outcome.path())
                .current_dir(cwd)
                .env("PWD", cwd)
                .env("PATH", path)
                .output()
                .unwrap();
            assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
            String::from_utf8_lossy(&out.stdout).trim().to_string()
        };
        let with_dev = format!("{}:{}:/usr/bin:/bin", bin_dir.display(), dev_bin.display());
        let without_dev = format!("{}:/usr/bin:/bin", bin_dir.display());

        assert_eq!(run(&nested, with_dev.clone()), "from-dev");
        assert_eq!(run(&nested, without_dev), "from-mirror");
        assert_eq!(run(tmp.path(), with_dev), "from-mirror");
    }

    #[test]
    fn existing_stub_is_kept_unless_forced() {
        let tmp = tempfile::tempdir().unwrap();
        let bin_dir = tmp.path().join("bin");
        fs::create_dir_all(&bin_dir).unwrap();
        fs::write(bin_dir.join("tool"), "old").unwrap();
        let stub = stub_for(Path::new("/pkg/bin/tool"), EnvironmentMap::new());

        let kept = create_stub(&stub, &bin_dir, &opts(false)).unwrap();
        assert!(matches!(kept, StubOutcome::Skipped(_)));
        assert_eq!(fs::read_to_string(bin_dir.join("tool")).unwrap(), "old");

        let replaced = create_stub(&stub, &bin_dir, &opts(true)).unwrap();
        assert!(matches!(replaced, StubOutcome::Created(_)));
        let content = fs::read_to_string(bin_dir.join("tool")).unwrap();
        assert!(content.starts_with("#!/bin/sh"));
        assert!(lpad_fs::is_executable(&bin_dir.join("tool")));
    }
}
