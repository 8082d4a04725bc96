// lpad-net/src/resolver/mod.rs
//! Resolver adapter: turns package specs into resolved package trees by
//! asking an external resolver process.
use std::future::Future;
use std::time::Duration;

use lpad_common::error::Result;
use lpad_common::model::ResolverOutput;

pub mod degraded;
pub mod environment;
pub mod pkgx;
pub mod protocol;

pub use pkgx::PkgxResolver;
pub use protocol::ProtocolVersion;

/// Anything that can answer a resolution query.
///
/// `specs` are resolver-syntax package specs such as `curl.se@8.0.1`.
/// Implementations must give up after `timeout`.
pub trait Resolve: Send + Sync {
    fn query(
        &self,
        specs: &[String],
        timeout: Duration,
    ) -> impl Future<Output = Result<ResolverOutput>> + Send;
}
