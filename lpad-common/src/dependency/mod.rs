// lpad-common/src/dependency/mod.rs
pub mod requirement;

pub use requirement::PackageRequirement;
