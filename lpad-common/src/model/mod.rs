// lpad-common/src/model/mod.rs
// Declares the modules within the model directory.
pub mod env;
pub mod environment;
pub mod installation;
pub mod stub;
pub mod version;

// Re-export
pub use env::EnvironmentMap;
pub use environment::{EnvironmentHealth, EnvironmentMetadata, ProjectEnvironment};
pub use installation::{ResolvedInstallation, ResolverOutput};
pub use stub::StubScript;
pub use version::SemanticVersion;
