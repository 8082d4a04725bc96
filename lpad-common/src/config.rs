// lpad-common/src/config.rs
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::{BaseDirs, ProjectDirs};
use tracing::debug;

use super::error::{LpadError, Result};

const SYSTEM_PREFIX: &str = "/usr/local";
const DEFAULT_RESOLVER_PROJECT: &str = "pkgx.sh";
const DEFAULT_RESOLVER_BIN: &str = "pkgx";
const DEFAULT_DEV_COMMAND: &str = "dev";
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const LOCK_FILENAME: &str = ".lpad.lock";

/// Every knob the installer reads. Built once and passed down explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    pub install_root: PathBuf,
    pub envs_dir: PathBuf,
    pub shim_dir: PathBuf,
    pub logs_dir: PathBuf,
    /// Explicit resolver binary. `None` means search PATH for `pkgx`.
    pub resolver_bin: Option<PathBuf>,
    /// The resolver's own package, never merged into an install root.
    pub resolver_project: String,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub timeout: Duration,
    pub symlink_versions: bool,
    pub force_reinstall: bool,
    pub auto_add_path: bool,
    pub verbose: bool,
    pub dev_aware: bool,
    pub dev_command: String,
    pub dev_marker_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        debug!("Loading lpad configuration");

        let home = home_dir();
        let data_dir = ProjectDirs::from("", "", "lpad")
            .map(|pd| pd.data_dir().to_path_buf())
            .unwrap_or_else(|| home.join(".local").join("share").join("lpad"));

        let install_root = match env::var_os("LPAD_PREFIX").filter(|s| !s.is_empty()) {
            Some(p) => PathBuf::from(p),
            None => default_install_root(&home),
        };
        debug!("Effective install root set to: {}", install_root.display());

        let envs_dir = env::var_os("LPAD_ENVS_DIR")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("envs"));
        let shim_dir = env::var_os("LPAD_SHIM_DIR")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join(".local").join("bin"));

        let resolver_bin = env::var_os("LPAD_RESOLVER")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let max_attempts = match env::var("LPAD_MAX_RETRIES") {
            Ok(raw) => raw.trim().parse::<u32>().map_err(|e| {
                LpadError::Config(format!("LPAD_MAX_RETRIES must be a number, got '{raw}': {e}"))
            })?,
            Err(_) => DEFAULT_MAX_ATTEMPTS,
        };

        let timeout = match env::var("LPAD_TIMEOUT") {
            Ok(raw) => humantime::parse_duration(raw.trim()).map_err(|e| {
                LpadError::Config(format!("LPAD_TIMEOUT is not a duration, got '{raw}': {e}"))
            })?,
            Err(_) => DEFAULT_TIMEOUT,
        };

        let dev_marker_dir = BaseDirs::new()
            .map(|bd| bd.data_dir().to_path_buf())
            .unwrap_or_else(|| home.join(".local").join("share"))
            .join("pkgx")
            .join("dev");

        let config = Self {
            install_root,
            envs_dir,
            shim_dir,
            logs_dir: data_dir.join("logs"),
            resolver_bin,
            resolver_project: DEFAULT_RESOLVER_PROJECT.to_string(),
            max_attempts: max_attempts.max(1),
            retry_delay: DEFAULT_RETRY_DELAY,
            timeout,
            symlink_versions: env_flag("LPAD_SYMLINK_VERSIONS", true)?,
            force_reinstall: env_flag("LPAD_FORCE_REINSTALL", false)?,
            auto_add_path: env_flag("LPAD_AUTO_ADD_PATH", true)?,
            verbose: false,
            dev_aware: env_flag("LPAD_DEV_AWARE", true)?,
            dev_command: DEFAULT_DEV_COMMAND.to_string(),
            dev_marker_dir,
        };

        debug!("Configuration loaded successfully.");
        Ok(config)
    }

    /// A configuration rooted entirely inside `root`, with no environment lookups.
    pub fn with_root(root: &Path) -> Self {
        Self {
            install_root: root.to_path_buf(),
            envs_dir: root.join("envs"),
            shim_dir: root.join("shims"),
            logs_dir: root.join("logs"),
            resolver_bin: None,
            resolver_project: DEFAULT_RESOLVER_PROJECT.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            timeout: DEFAULT_TIMEOUT,
            symlink_versions: true,
            force_reinstall: false,
            auto_add_path: true,
            verbose: false,
            dev_aware: false,
            dev_command: DEFAULT_DEV_COMMAND.to_string(),
            dev_marker_dir: root.join("dev"),
        }
    }

    /// Same settings, different install root (used for per-project environments).
    pub fn for_root(&self, root: &Path) -> Self {
        Self {
            install_root: root.to_path_buf(),
            ..self.clone()
        }
    }

    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    pub fn resolver_command(&self) -> PathBuf {
        self.resolver_bin
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RESOLVER_BIN))
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.install_root.join("bin")
    }

    pub fn sbin_dir(&self) -> PathBuf {
        self.install_root.join("sbin")
    }

    pub fn pkgs_dir(&self) -> PathBuf {
        self.install_root.join("pkgs")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.install_root.join(LOCK_FILENAME)
    }

    /// `<root>/pkgs/<project>`
    pub fn shelf_path(&self, project: &str) -> PathBuf {
        self.pkgs_dir().join(project)
    }

    /// `<root>/pkgs/<project>/v<version>`
    pub fn package_path(&self, project: &str, version: &str) -> PathBuf {
        self.shelf_path(project).join(format!("v{version}"))
    }

    pub fn env_root(&self, hash: &str) -> PathBuf {
        self.envs_dir.join(hash)
    }

    pub fn home_dir(&self) -> PathBuf {
        home_dir()
    }

    /// True for locations that normally need root to write, like `/usr/local`.
    pub fn is_system_root(&self) -> bool {
        let root = &self.install_root;
        root.starts_with("/usr") || root.starts_with("/opt") || root.starts_with("/nix")
    }
}

fn home_dir() -> PathBuf {
    BaseDirs::new().map_or_else(|| PathBuf::from("/"), |bd| bd.home_dir().to_path_buf())
}

fn default_install_root(home: &Path) -> PathBuf {
    let system = Path::new(SYSTEM_PREFIX);
    if system.is_dir() && tempfile::tempfile_in(system).is_ok() {
        debug!("{} is writable, using it as the install root", SYSTEM_PREFIX);
        return system.to_path_buf();
    }
    debug!(
        "{} is not writable, falling back to {}",
        SYSTEM_PREFIX,
        home.join(".local").display()
    );
    home.join(".local")
}

fn env_flag(name: &str, default: bool) -> Result<bool> {
    match env::var(name) {
        Ok(raw) => parse_flag(&raw)
            .ok_or_else(|| LpadError::Config(format!("{name} must be a boolean, got '{raw}'"))),
        Err(_) => Ok(default),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
