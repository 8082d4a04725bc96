// lpad-core/src/check/mod.rs
pub mod installed;

pub use installed::{get_installed_packages, InstalledPackageInfo};
