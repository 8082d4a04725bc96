// lpad-core/src/environment/mod.rs
//! Per-project environments: one install root per canonical project path.
pub mod activation;
pub mod hash;
pub mod manager;

pub use activation::{
    activation_script, deactivation_script, should_deactivate, ACTIVE_DIR_VAR, ACTIVE_VARS_VAR,
};
pub use hash::{hash_dir, project_hash};
pub use manager::{health_of, EnvironmentManager, METADATA_FILE};
