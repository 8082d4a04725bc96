// lpad-core/src/install/retry.rs
use lpad_common::config::Config;
use lpad_common::error::{LpadError, Result};
use lpad_common::model::ResolverOutput;
use lpad_net::Resolve;
use tracing::{debug, warn};

/// Queries `resolver`, retrying transient failures with a fixed delay.
/// `config.max_attempts` counts every call, the first one included.
pub async fn resolve_with_retry<R: Resolve>(
    resolver: &R,
    specs: &[String],
    config: &Config,
) -> Result<ResolverOutput> {
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        debug!(
            "Resolving [{}], attempt {}/{}",
            specs.join(", "),
            attempt,
            max_attempts
        );
        match resolver.query(specs, config.timeout).await {
            Ok(output) => return Ok(output),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) if attempt >= max_attempts => {
                return Err(LpadError::ResolverRetriesExhausted {
                    specs: specs.to_vec(),
                    attempts: attempt,
                    last: Box::new(e),
                })
            }
            Err(e) => {
                warn!(
                    "Resolver attempt {}/{} failed: {}. Retrying in {:?}",
                    attempt, max_attempts, e, config.retry_delay
                );
                tokio::time::sleep(config.retry_delay).await;
            }
        }
    }
}
