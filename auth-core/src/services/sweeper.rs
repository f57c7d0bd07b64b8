//! Expired-token purge.
//!
//! Invoked by an external scheduler; this crate owns no timer.

use serde::Deserialize;
use std::sync::Arc;

use crate::services::error::CoreError;
use crate::store::{Clock, TokenStore};

#[derive(Debug, Clone, Deserialize)]
pub struct SweeperConfig {
    /// Tokens deleted per store round trip, bounding single-call latency.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    500
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

/// Deletes tokens past expiry, both purposes, consumed or not.
#[derive(Clone)]
pub struct ExpirationSweeper {
    tokens: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    config: SweeperConfig,
}

impl ExpirationSweeper {
    pub fn new(tokens: Arc<dyn TokenStore>, clock: Arc<dyn Clock>, config: SweeperConfig) -> Self {
        Self {
            tokens,
            clock,
            config,
        }
    }

    /// One sweep pass. Idempotent: a second run under an unchanged clock
    /// purges nothing. Safe to overlap with issue/consume; consumption never
    /// deletes, so nothing is double-reported.
    pub async fn purge_expired(&self) -> Result<u64, CoreError> {
        let cutoff = self.clock.now();
        let mut purged = 0u64;

        loop {
            let batch = self
                .tokens
                .delete_expired_before(cutoff, self.config.batch_size)
                .await
                .map_err(CoreError::Store)?;
            purged += batch;
            if batch < self.config.batch_size as u64 {
                break;
            }
        }

        if purged > 0 {
            tracing::info!(purged, "Expired tokens purged");
        } else {
            tracing::debug!("No expired tokens to purge");
        }
        Ok(purged)
    }
}
