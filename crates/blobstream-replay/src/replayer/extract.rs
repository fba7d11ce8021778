//! Recovers a replayable `fulfillCall` payload from a stored commitment.

use alloy_primitives::{Address, B256};
use anyhow::{Context, Result};
use blobstream_types::{CommitmentEvent, FulfillCallArgs};
use tracing::debug;

use crate::client::SourceChain;

/// Fetches the transaction that stored `event` on the source chain, decodes
/// its `fulfillCall` payload and retargets it at the target deployment.
///
/// The proof bytes, circuit input and output are carried over untouched; only
/// the callback address changes, and the function ID is mapped to the circuit
/// registered on the target gateway for the event's block span.
pub async fn extract_fulfill_call(
    source: &dyn SourceChain,
    event: &CommitmentEvent,
    target_contract: Address,
    header_range_function_id: B256,
    next_header_function_id: B256,
) -> Result<FulfillCallArgs> {
    let calldata = source
        .transaction_calldata(event.source_tx_hash)
        .await
        .with_context(|| {
            format!(
                "failed to fetch the transaction behind commitment nonce {}",
                event.proof_nonce
            )
        })?;

    let mut args = FulfillCallArgs::decode_calldata(&calldata).with_context(|| {
        format!(
            "transaction {} does not carry a fulfillCall payload",
            event.source_tx_hash
        )
    })?;

    args.callback_address = target_contract;
    args.function_id = if event.is_header_range() {
        header_range_function_id
    } else {
        next_header_function_id
    };

    debug!(
        nonce = event.proof_nonce,
        function_id = %args.function_id,
        "extracted the proof payload"
    );
    Ok(args)
}
