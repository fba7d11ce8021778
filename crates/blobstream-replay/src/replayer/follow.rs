//! Follow engine: replicates new commitments as the source stores them.

use anyhow::{bail, Result};
use tracing::info;

use crate::replayer::Replayer;

impl Replayer {
    /// Subscribes to the source contract's commitment events and replays each
    /// new one onto the target. Runs until shutdown is signalled; a broken
    /// subscription is an error so the caller can restart the process.
    ///
    /// Events whose range the target already covers are skipped. An event
    /// starting past the target's watermark means commitments were missed
    /// (a dropped subscription, a restart), so a catch-up pass closes the gap
    /// before the live stream resumes.
    pub async fn follow(&self) -> Result<()> {
        let mut shutdown = self.shutdown.clone();
        let mut events = self.source.watch_commitment_events().await?;
        info!("listening for new proofs on the source chain");

        loop {
            if self.shutdown_requested() {
                return Ok(());
            }
            let event = tokio::select! {
                _ = shutdown.changed() => return Ok(()),
                event = events.recv() => match event {
                    Some(event) => event,
                    None => bail!("commitment event subscription ended unexpectedly"),
                },
            };

            let latest_target_block = self.target.latest_committed_block().await?;
            if event.start_block < latest_target_block {
                info!(
                    nonce = event.proof_nonce,
                    start_block = event.start_block,
                    "commitment is already covered by the target contract"
                );
                continue;
            }
            if event.start_block > latest_target_block {
                info!(
                    nonce = event.proof_nonce,
                    start_block = event.start_block,
                    latest_target_block,
                    "commitment is ahead of the target contract, catching up first"
                );
                let watermark = self.catchup().await?;
                // Catch-up also stops early at its shutdown point, which
                // must not be mistaken for a closed gap.
                if self.shutdown_requested() {
                    return Ok(());
                }
                if watermark >= event.end_block {
                    info!(nonce = event.proof_nonce, "contract up to date");
                    continue;
                }
            }

            self.verify_commitment(&event).await?;
            self.replay_event(&event).await?;
            info!(nonce = event.proof_nonce, "successfully replayed proof");
        }
    }
}
