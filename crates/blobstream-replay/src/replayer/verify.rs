//! Cross-checks stored commitments against a celestia-core node.

use anyhow::{bail, Result};
use blobstream_types::CommitmentEvent;
use tracing::{error, info};

use crate::client::{CommitmentOracle, SourceChain};
use crate::replayer::scanner;

/// Recomputes the data commitment for the event's range via `oracle` and
/// compares it against what the source contract stored. A mismatch means the
/// source contract committed to data the Celestia chain never produced.
pub async fn verify_event(oracle: &dyn CommitmentOracle, event: &CommitmentEvent) -> Result<()> {
    info!(
        nonce = event.proof_nonce,
        start_block = event.start_block,
        end_block = event.end_block,
        "verifying data root tuple root"
    );
    let expected = oracle.data_commitment(event.start_block, event.end_block).await?;
    if expected != event.data_commitment {
        error!(
            nonce = event.proof_nonce,
            stored = %event.data_commitment,
            expected = %expected,
            "data commitment mismatch!! quitting"
        );
        bail!(
            "data commitment mismatch for nonce {}: contract stored {}, celestia-core computed {}",
            event.proof_nonce,
            event.data_commitment,
            expected
        );
    }
    Ok(())
}

/// Audits the whole commitment history of a BlobstreamX deployment: scans
/// every stored event, checks the nonce sequence is gapless from 1, and
/// verifies each commitment against `oracle`.
pub async fn verify_deployment(
    source: &dyn SourceChain,
    oracle: &dyn CommitmentOracle,
    page_size: u64,
) -> Result<()> {
    let height = source.chain_height().await?;
    let expected_count = source.proof_nonce().await?.saturating_sub(1);
    let index = scanner::scan_commitment_events(source, height, page_size, expected_count, 0).await?;

    let events = index.into_sorted_events();
    for (position, event) in events.iter().enumerate() {
        if event.proof_nonce != position as u64 + 1 {
            bail!(
                "commitment history has a hole: expected nonce {}, found {}",
                position + 1,
                event.proof_nonce
            );
        }
        verify_event(oracle, event).await?;
    }
    info!(commitments = events.len(), "contract verified");
    Ok(())
}
