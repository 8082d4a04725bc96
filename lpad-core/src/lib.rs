// lpad-core/src/lib.rs

pub mod check;
pub mod environment;
pub mod install;
pub mod shim;
pub mod stub;

pub use check::{get_installed_packages, InstalledPackageInfo};
pub use environment::EnvironmentManager;
pub use install::Installer;
pub use shim::create_shims;
pub use stub::{create_stub, StubOptions, StubOutcome};
