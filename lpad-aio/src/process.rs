// lpad-aio/src/process.rs
use std::collections::HashMap;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Output as StdOutput;
use std::process::Stdio;
use std::time::Duration;

use lpad_common::error::{LpadError, Result};
use tokio::process::Command;
use tracing::{debug, error};

/// A fully described subprocess invocation.
#[derive(Debug, Clone, Default)]
pub struct CommandSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub cwd: Option<PathBuf>,
    /// When set, the child starts from an empty environment plus these.
    pub env: Option<HashMap<String, String>>,
}

impl CommandSpec {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn clean_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    pub fn display(&self) -> String {
        let mut parts = vec![self.program.to_string_lossy().to_string()];
        parts.extend(self.args.iter().map(|a| a.to_string_lossy().to_string()));
        parts.join(" ")
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    Finished(StdOutput),
    /// The deadline passed; the child has been killed.
    TimedOut,
}

/// Runs a command to completion, capturing stdout/stderr, killing it if it
/// outlives `timeout`. A missing program yields [`LpadError::NotFound`].
pub async fn run_command_async(spec: &CommandSpec, timeout: Duration) -> Result<RunOutcome> {
    debug!(
        "Async Running command: {} (cwd: {:?}, envs: {:?}, timeout: {:?})",
        spec.display(),
        spec.cwd,
        spec.env.as_ref().map(|e| e.keys().collect::<Vec<_>>()), // Log only keys for envs
        timeout
    );

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args);
    cmd.kill_on_drop(true); // Dropping the future on timeout kills the child

    if let Some(dir) = &spec.cwd {
        cmd.current_dir(dir);
    }
    if let Some(env_map) = &spec.env {
        cmd.env_clear();
        cmd.envs(env_map);
    }

    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.stdin(Stdio::null());

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(LpadError::NotFound(
                spec.program.to_string_lossy().to_string(),
            ));
        }
        Err(e) => {
            error!("Async Failed to execute command: {}", e);
            return Err(LpadError::CommandExecError(format!("{}: {e}", spec.display())));
        }
    };

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => {
            if !output.status.success() {
                debug!("Async Command failed with status: {}", output.status);
                let stderr = String::from_utf8_lossy(&output.stderr);
                if !stderr.trim().is_empty() {
                    debug!("Stderr:\n{}", stderr.trim());
                }
            } else {
                debug!("Async Command finished successfully.");
            }
            Ok(RunOutcome::Finished(output))
        }
        Ok(Err(e)) => {
            error!("Async Failed waiting on command: {}", e);
            Err(LpadError::CommandExecError(format!("{}: {e}", spec.display())))
        }
        Err(_) => {
            debug!("Command exceeded {:?}, killed: {}", timeout, spec.display());
            Ok(RunOutcome::TimedOut)
        }
    }
}

/// Effective uid is root.
#[cfg(unix)]
pub fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
pub fn is_root() -> bool {
    false
}
