//! Retrying `fulfillCall` submitter with gas-price escalation.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use blobstream_types::FulfillCallArgs;
use tracing::{info, warn};

use crate::client::{SubmitError, TargetChain};

/// Gas limit set on every fulfillCall transaction. Proof verification plus
/// the BlobstreamX callback fits comfortably below this on every network the
/// contracts are deployed to.
pub const FULFILL_CALL_GAS_LIMIT: u64 = 25_000_000;

/// Default inclusion wait before a submission attempt is considered stuck.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(180);

const MAX_SUBMIT_ATTEMPTS: u32 = 10;

/// Submits `args` to the target gateway, retrying with a higher gas price
/// whenever the transaction fails to land within `wait_timeout`.
///
/// Each retry starts from the larger of the previous price and a fresh node
/// suggestion, then adds 20%, so the bid strictly increases. Before retrying,
/// the target's proof nonce is re-read: if it moved past `proof_nonce`, the
/// commitment landed through another path and there is nothing left to do.
/// Any non-timeout failure aborts immediately.
pub async fn submit_with_retries(
    target: &dyn TargetChain,
    args: &FulfillCallArgs,
    proof_nonce: u64,
    wait_timeout: Duration,
) -> Result<()> {
    let mut gas_price = target
        .suggest_gas_price()
        .await
        .context("failed to query the target gas price")?;

    for attempt in 1..=MAX_SUBMIT_ATTEMPTS {
        match target.fulfill_call(args, gas_price, wait_timeout).await {
            Ok(()) => return Ok(()),
            Err(SubmitError::InclusionTimeout) => {
                let target_nonce = target
                    .proof_nonce()
                    .await
                    .context("failed to read the target proof nonce")?;
                if target_nonce > proof_nonce {
                    info!(
                        nonce = proof_nonce,
                        "no need to replay this nonce, the contract has already committed to it"
                    );
                    return Ok(());
                }
                let suggested = target
                    .suggest_gas_price()
                    .await
                    .context("failed to query the target gas price")?;
                gas_price = gas_price.max(suggested);
                gas_price += gas_price / 5;
                warn!(
                    nonce = proof_nonce,
                    attempt,
                    gas_price,
                    "transaction not included in time, retrying with a higher gas price"
                );
            }
            Err(SubmitError::Fatal(err)) => {
                return Err(err)
                    .with_context(|| format!("failed to submit proof nonce {proof_nonce}"));
            }
        }
    }
    bail!("failed to submit proof nonce {proof_nonce} after {MAX_SUBMIT_ATTEMPTS} attempts")
}
