//! Catch-up engine: replays the commitments the target is missing.

use anyhow::{bail, Result};
use tracing::{info, warn};

use crate::replayer::{scanner, Replayer};

impl Replayer {
    /// Replays every commitment between the target's latest committed block
    /// and the source's, in ascending order. Returns the target's watermark
    /// when the engines are level, which is where the follow engine picks up.
    ///
    /// The cursor is the next Celestia block the target needs a commitment
    /// for; each replayed commitment advances it to its own end block. The
    /// target contract is re-read around every submission so concurrent
    /// relayers are tolerated rather than raced.
    pub async fn catchup(&self) -> Result<u64> {
        let chain_height = self.source.chain_height().await?;
        let latest_source_block = self.source.latest_committed_block().await?;
        let latest_target_block = self.target.latest_committed_block().await?;
        let source_nonce = self.source.proof_nonce().await?;
        info!(
            latest_source_block,
            latest_target_block, "catching up the target contract"
        );

        let index = scanner::scan_commitment_events(
            self.source.as_ref(),
            chain_height,
            self.opts.filter_range,
            source_nonce.saturating_sub(1),
            latest_target_block,
        )
        .await?;

        let mut cursor = latest_target_block;
        while cursor < latest_source_block {
            if self.shutdown_requested() {
                info!("shutdown requested, stopping the catchup");
                return Ok(cursor);
            }

            let Some(event) = index.get(cursor) else {
                bail!("no commitment starting at block {cursor} in the scanned history");
            };
            self.verify_commitment(event).await?;

            let latest_source_block = self.source.latest_committed_block().await?;
            let latest_target_block = self.target.latest_committed_block().await?;
            if latest_target_block >= latest_source_block {
                info!("target contract is already up to date");
                return Ok(latest_target_block);
            }

            self.replay_event(event).await?;

            cursor = match self.target.latest_committed_block().await? {
                committed if committed == event.end_block => committed,
                committed => {
                    warn!(
                        nonce = event.proof_nonce,
                        committed, "target contract did not advance, retrying the same commitment"
                    );
                    cursor
                }
            };
        }
        info!(latest_block = cursor, "target contract up to date");
        Ok(cursor)
    }
}
