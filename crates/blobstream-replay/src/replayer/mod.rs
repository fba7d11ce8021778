//! The synchronization core.
//!
//! The [`Replayer`] drives two engines against one source/target contract
//! pair: catch-up replays every commitment the target is missing in
//! ascending order, follow replicates new commitments live as the source
//! contract stores them. Both share the proof extractor and the retrying
//! transaction submitter.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, B256};
use anyhow::Result;
use blobstream_types::CommitmentEvent;
use tokio::sync::watch;
use tracing::info;

use crate::client::{CommitmentOracle, SourceChain, TargetChain};

pub mod catchup;
pub mod extract;
pub mod follow;
pub mod scanner;
pub mod submit;
pub mod verify;

#[cfg(test)]
pub(crate) mod mock;

pub use scanner::{scan_commitment_events, CommitmentIndex};

/// Settings shared by the catch-up and follow engines.
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    /// Address of the target BlobstreamX contract; written into every
    /// replayed payload as the verification callback.
    pub target_contract: Address,
    /// Function ID of the header-range circuit behind the target gateway.
    pub header_range_function_id: B256,
    /// Function ID of the next-header circuit behind the target gateway.
    pub next_header_function_id: B256,
    /// eth_getLogs window used when scanning the source history.
    pub filter_range: u64,
    /// How long to wait for inclusion of a submitted transaction.
    pub wait_timeout: Duration,
}

pub struct Replayer {
    source: Arc<dyn SourceChain>,
    target: Arc<dyn TargetChain>,
    oracle: Option<Arc<dyn CommitmentOracle>>,
    opts: ReplayOptions,
    shutdown: watch::Receiver<bool>,
}

impl Replayer {
    pub fn new(
        source: Arc<dyn SourceChain>,
        target: Arc<dyn TargetChain>,
        oracle: Option<Arc<dyn CommitmentOracle>>,
        opts: ReplayOptions,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            source,
            target,
            oracle,
            opts,
            shutdown,
        }
    }

    fn shutdown_requested(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Cross-checks a source event against the authoritative commitment when
    /// verification is enabled. A mismatch is fatal: an invalid proof must
    /// never be replayed.
    async fn verify_commitment(&self, event: &CommitmentEvent) -> Result<()> {
        let Some(oracle) = &self.oracle else {
            return Ok(());
        };
        verify::verify_event(oracle.as_ref(), event).await
    }

    /// Extracts the proof payload behind `event`, retargets it at the target
    /// deployment and submits it through the gateway.
    async fn replay_event(&self, event: &CommitmentEvent) -> Result<()> {
        let args = extract::extract_fulfill_call(
            self.source.as_ref(),
            event,
            self.opts.target_contract,
            self.opts.header_range_function_id,
            self.opts.next_header_function_id,
        )
        .await?;

        info!(
            nonce = event.proof_nonce,
            start_block = event.start_block,
            "replaying the proof"
        );
        submit::submit_with_retries(
            self.target.as_ref(),
            &args,
            event.proof_nonce,
            self.opts.wait_timeout,
        )
        .await
    }
}
