// lpad-net/src/resolver/pkgx.rs
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use lpad_aio::process::{is_root, run_command_async, CommandSpec, RunOutcome};
use lpad_common::config::Config;
use lpad_common::error::{LpadError, Result};
use lpad_common::model::ResolverOutput;
use tracing::{debug, warn};

use super::environment::{resolver_env, FORWARDED_VARS};
use super::protocol::{self, ProtocolVersion};
use super::{degraded, Resolve};

const ELEVATION_WRAPPER: &str = "sudo";

/// Stderr fragments that mean a spec could not be resolved at all.
const NOT_FOUND_MARKERS: &[&str] = &["not found", "no such package", "pkg not found"];

enum Attempt {
    Resolved(ResolverOutput),
    Unsupported(String),
}

/// Drives the `pkgx` binary as a subprocess.
#[derive(Debug, Clone)]
pub struct PkgxResolver {
    program: PathBuf,
    data_dir: PathBuf,
    install_root: PathBuf,
    system_root: bool,
    exclude_dirs: Vec<PathBuf>,
}

impl PkgxResolver {
    pub fn new(config: &Config) -> Self {
        let data_dir = env::var_os("PKGX_DIR")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| config.home_dir().join(".pkgx"));
        Self {
            program: config.resolver_command(),
            data_dir,
            install_root: config.install_root().to_path_buf(),
            system_root: config.is_system_root(),
            exclude_dirs: vec![config.bin_dir(), config.sbin_dir(), config.shim_dir.clone()],
        }
    }

    /// Where synthesized (degraded) installations are assumed to live.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Absolute path of the resolver binary.
    pub fn locate(&self) -> Result<PathBuf> {
        if self.program.components().count() > 1 {
            if self.program.is_file() {
                return Ok(self.program.clone());
            }
            return Err(LpadError::ResolverUnavailable(
                self.program.display().to_string(),
            ));
        }
        which::which(&self.program).map_err(|e| {
            debug!("which({}) failed: {}", self.program.display(), e);
            LpadError::ResolverUnavailable(self.program.display().to_string())
        })
    }

    fn needs_elevation(&self) -> bool {
        self.system_root && !is_root() && !is_writable(&self.install_root)
    }

    fn command_for(&self, program: &Path, specs: &[String], protocol: ProtocolVersion) -> CommandSpec {
        let mut args: Vec<OsString> = specs.iter().map(|s| OsString::from(format!("+{s}"))).collect();
        if let Some(flag) = protocol.flag() {
            args.push(flag.into());
        }

        let env = resolver_env(&self.exclude_dirs);
        if !self.needs_elevation() {
            return CommandSpec::new(program).args(args).clean_env(env);
        }

        // Keep the caller's identity so the resolver uses their home and caches.
        let mut wrapped: Vec<OsString> = vec![
            format!("--preserve-env={}", FORWARDED_VARS.join(",")).into(),
            "--".into(),
            "env".into(),
        ];
        if let Some(home) = env.get("HOME") {
            wrapped.push(format!("HOME={home}").into());
        }
        if let Some(user) = env::var("SUDO_USER").ok().or_else(|| env::var("USER").ok()) {
            wrapped.push(format!("USER={user}").into());
            wrapped.push(format!("SUDO_USER={user}").into());
        }
        wrapped.push(program.as_os_str().to_owned());
        wrapped.extend(args);
        debug!(
            "{} is not writable, elevating resolver with {}",
            self.install_root.display(),
            ELEVATION_WRAPPER
        );
        CommandSpec::new(ELEVATION_WRAPPER).args(wrapped).clean_env(env)
    }

    async fn attempt(
        &self,
        program: &Path,
        specs: &[String],
        protocol: ProtocolVersion,
        timeout: Duration,
    ) -> Result<Attempt> {
        let command = self.command_for(program, specs, protocol);
        let output = match run_command_async(&command, timeout).await {
            Ok(RunOutcome::Finished(output)) => output,
            Ok(RunOutcome::TimedOut) => {
                return Err(LpadError::ResolverTimeout {
                    specs: specs.to_vec(),
                    timeout,
                })
            }
            Err(LpadError::NotFound(what)) => return Err(LpadError::ResolverUnavailable(what)),
            Err(e) => return Err(LpadError::ResolverFailure(e.to_string())),
        };

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            if protocol.flag().is_some() && protocol::is_unsupported_format(&stderr) {
                return Ok(Attempt::Unsupported(stderr));
            }
            let lower = stderr.to_ascii_lowercase();
            if NOT_FOUND_MARKERS.iter().any(|m| lower.contains(m)) {
                return Err(LpadError::PackageNotFound(format!(
                    "[{}]: {}",
                    specs.join(", "),
                    stderr
                )));
            }
            return Err(LpadError::ResolverFailure(format!(
                "{} exited with {}: {}",
                command.display(),
                output.status,
                stderr
            )));
        }

        match protocol {
            ProtocolVersion::Plain => Ok(Attempt::Resolved(degraded::synthesize(
                specs,
                &self.data_dir,
            ))),
            _ => Ok(Attempt::Resolved(protocol::decode(&output.stdout)?)),
        }
    }
}

impl Resolve for PkgxResolver {
    async fn query(&self, specs: &[String], timeout: Duration) -> Result<ResolverOutput> {
        let program = self.locate()?;
        let deadline = Instant::now() + timeout;
        debug!(
            "Resolving [{}] with {} (timeout {:?})",
            specs.join(", "),
            program.display(),
            timeout
        );

        for protocol in ProtocolVersion::LADDER {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(LpadError::ResolverTimeout {
                    specs: specs.to_vec(),
                    timeout,
                });
            }
            match self.attempt(&program, specs, protocol, remaining).await {
                Ok(Attempt::Resolved(output)) => {
                    if output.degraded {
                        warn!(
                            "Resolver has no structured output; using DEGRADED mode. \
                             Package paths for [{}] were synthesized under {} and may not exist",
                            specs.join(", "),
                            self.data_dir.display()
                        );
                    }
                    return Ok(output);
                }
                Ok(Attempt::Unsupported(stderr)) => {
                    let mismatch = LpadError::ResolverProtocolMismatch(format!(
                        "{}: {}",
                        protocol.flag().unwrap_or("plain"),
                        stderr
                    ));
                    debug!("{}; trying next format", mismatch);
                }
                Err(e) => return Err(e),
            }
        }

        Err(LpadError::ResolverFailure(
            "resolver rejected every output format".to_string(),
        ))
    }
}

/// The nearest existing ancestor of `path` accepts new files.
fn is_writable(path: &Path) -> bool {
    let mut current = path;
    loop {
        if current.is_dir() {
            return tempfile::tempfile_in(current).is_ok();
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return false,
        }
    }
}
