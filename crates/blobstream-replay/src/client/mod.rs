//! Boundary collaborators consumed by the replay core.
//!
//! The core never talks to a chain directly; it goes through these traits so
//! the engines can be exercised against in-memory chains in tests. The
//! production implementations live in [`evm`] and [`core_rpc`].

use std::time::Duration;

use alloy_primitives::{Bytes, B256, TxHash};
use anyhow::Result;
use async_trait::async_trait;
use blobstream_types::{CommitmentEvent, FulfillCallArgs};
use thiserror::Error;
use tokio::sync::mpsc;

pub mod core_rpc;
pub mod evm;

pub use core_rpc::CoreClient;
pub use evm::{EvmSourceChain, EvmTargetChain};

/// Read access to the source contract and the chain hosting it.
#[async_trait]
pub trait SourceChain: Send + Sync {
    /// Current tip of the hosting EVM chain.
    async fn chain_height(&self) -> Result<u64>;

    /// Latest Celestia block committed by the source contract.
    async fn latest_committed_block(&self) -> Result<u64>;

    /// Nonce the source contract will assign to its next commitment.
    async fn proof_nonce(&self) -> Result<u64>;

    /// `DataCommitmentStored` events emitted in the EVM block range
    /// `[from_block, to_block]`, both bounds inclusive.
    async fn commitment_events(&self, from_block: u64, to_block: u64) -> Result<Vec<CommitmentEvent>>;

    /// Live feed of newly stored commitments. The channel closes if the
    /// underlying subscription ends.
    async fn watch_commitment_events(&self) -> Result<mpsc::Receiver<CommitmentEvent>>;

    /// Raw calldata of the transaction that stored a commitment.
    async fn transaction_calldata(&self, tx_hash: TxHash) -> Result<Bytes>;
}

/// Read and write access to the target contract through its proof gateway.
///
/// The implementation exclusively owns the signing key and the account's
/// pending-nonce sequence; no other component reads them.
#[async_trait]
pub trait TargetChain: Send + Sync {
    /// Latest Celestia block committed by the target contract.
    async fn latest_committed_block(&self) -> Result<u64>;

    /// Nonce the target contract will assign to its next commitment.
    async fn proof_nonce(&self) -> Result<u64>;

    /// Current gas price suggestion of the target chain.
    async fn suggest_gas_price(&self) -> Result<u128>;

    /// Submits a `fulfillCall` transaction at the given gas price and waits
    /// up to `wait_timeout` for it to be included with a successful status.
    async fn fulfill_call(
        &self,
        args: &FulfillCallArgs,
        gas_price: u128,
        wait_timeout: Duration,
    ) -> Result<(), SubmitError>;
}

/// Submission failure, split so the submitter can retry fee underpricing
/// without retrying anything else.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The transaction was accepted by the node but not mined within the
    /// wait window. The only failure mode worth a gas-price escalation.
    #[error("transaction was not included within the wait window")]
    InclusionTimeout,

    /// Any other failure: RPC errors, insufficient funds, reverted
    /// execution. Not attributable to fee underpricing, never retried.
    #[error(transparent)]
    Fatal(#[from] anyhow::Error),
}

/// Authoritative data commitments served by a celestia-core node, used to
/// cross-check source events before replaying them.
#[async_trait]
pub trait CommitmentOracle: Send + Sync {
    /// Data-root tuple root over `[start_block, end_block)`.
    async fn data_commitment(&self, start_block: u64, end_block: u64) -> Result<B256>;
}
