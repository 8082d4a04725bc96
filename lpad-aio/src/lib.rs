// lpad-aio/src/lib.rs
//! Filesystem and process plumbing for lpad: tree mirroring, atomic writes,
//! the install-root lock and subprocess execution with deadlines.

pub mod fs;
pub mod json_io;
pub mod lock;
pub mod mirror;
pub mod process;

pub use fs::*;
pub use json_io::{read_json, write_json};
pub use lock::InstallLock;
pub use mirror::{mirror_staged, mirror_tree, MirrorStats};
pub use process::{is_root, run_command_async, CommandSpec, RunOutcome};
