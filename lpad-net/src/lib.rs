// lpad-net/src/lib.rs
pub mod resolver;

pub use resolver::{PkgxResolver, ProtocolVersion, Resolve};
