use alloy_primitives::{TxHash, B256};
use alloy_rpc_types::Log;
use alloy_sol_types::SolEvent;
use anyhow::{anyhow, Result};

use crate::BlobstreamX::DataCommitmentStored;

/// A `DataCommitmentStored` log decoded from the source contract.
///
/// For a well-formed contract these form a gapless chain indexed 1..N by
/// nonce, where the `end_block` of commitment k equals the `start_block` of
/// commitment k+1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitmentEvent {
    /// Sequence number assigned by the source contract.
    pub proof_nonce: u64,
    /// First Celestia block covered by the commitment (inclusive).
    pub start_block: u64,
    /// End of the covered Celestia block range (exclusive).
    pub end_block: u64,
    /// Data-root tuple root over the committed range.
    pub data_commitment: B256,
    /// Transaction that stored the commitment, carrying the proof payload.
    pub source_tx_hash: TxHash,
}

impl CommitmentEvent {
    pub fn from_log(log: &Log) -> Result<Self> {
        let decoded = DataCommitmentStored::decode_log(&log.inner)?;
        let tx_hash = log
            .transaction_hash
            .ok_or_else(|| anyhow!("commitment log is missing its transaction hash"))?;
        Ok(Self {
            proof_nonce: u64::try_from(decoded.data.proofNonce)
                .map_err(|_| anyhow!("proof nonce {} does not fit in u64", decoded.data.proofNonce))?,
            start_block: decoded.data.startBlock,
            end_block: decoded.data.endBlock,
            data_commitment: decoded.data.dataCommitment,
            source_tx_hash: tx_hash,
        })
    }

    /// Number of Celestia blocks the commitment covers.
    pub fn block_span(&self) -> u64 {
        self.end_block - self.start_block
    }

    /// A span wider than one block was proven by the header-range circuit,
    /// a single step by the next-header circuit.
    pub fn is_header_range(&self) -> bool {
        self.block_span() > 1
    }
}
