//! Contract surface and payload types shared by the Blobstream replay service.
//!
//! The `sol!` blocks mirror the deployed BlobstreamX read interface and the
//! SuccinctGateway entry point used to fulfill proof-carrying calls. Only the
//! pieces the replay service touches are declared here.

use alloy_primitives::{Address, Bytes, B256};
use alloy_sol_types::{sol, SolCall};
use anyhow::{bail, Result};

pub mod events;

pub use events::CommitmentEvent;

sol! {
    contract BlobstreamX {
        /// Latest Celestia block committed by the contract.
        function latestBlock() external view returns (uint64);

        /// Nonce the contract will assign to the next accepted commitment.
        function state_proofNonce() external view returns (uint256);

        event DataCommitmentStored(
            uint256 proofNonce,
            uint64 indexed startBlock,
            uint64 indexed endBlock,
            bytes32 indexed dataCommitment
        );
    }

    contract SuccinctGateway {
        function fulfillCall(
            bytes32 _functionId,
            bytes memory _input,
            bytes memory _output,
            bytes memory _proof,
            address _callbackAddress,
            bytes memory _callbackData
        ) external;
    }
}

/// Decoded payload of a `fulfillCall` transaction.
///
/// Everything except `function_id` and `callback_address` is transferred
/// byte-for-byte when a proof is replayed: the proof's validity does not
/// depend on which chain resubmits it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FulfillCallArgs {
    pub function_id: B256,
    pub input: Bytes,
    pub output: Bytes,
    pub proof: Bytes,
    pub callback_address: Address,
    pub callback_data: Bytes,
}

impl FulfillCallArgs {
    /// Decodes the calldata of a `fulfillCall` transaction, selector included.
    ///
    /// A selector mismatch or a mistyped field means the transaction was not
    /// produced against the gateway ABI this build understands, which is fatal
    /// for the caller.
    pub fn decode_calldata(calldata: &[u8]) -> Result<Self> {
        if calldata.len() < 4 {
            bail!("calldata too short to contain a function selector: {} bytes", calldata.len());
        }
        if calldata[..4] != SuccinctGateway::fulfillCallCall::SELECTOR {
            bail!(
                "calldata selector 0x{} does not match fulfillCall",
                alloy_primitives::hex::encode(&calldata[..4])
            );
        }
        let call = SuccinctGateway::fulfillCallCall::abi_decode_raw(&calldata[4..])?;
        Ok(Self {
            function_id: call._functionId,
            input: call._input,
            output: call._output,
            proof: call._proof,
            callback_address: call._callbackAddress,
            callback_data: call._callbackData,
        })
    }

    /// Encodes the payload back into full `fulfillCall` calldata.
    pub fn encode_calldata(&self) -> Vec<u8> {
        SuccinctGateway::fulfillCallCall {
            _functionId: self.function_id,
            _input: self.input.clone(),
            _output: self.output.clone(),
            _proof: self.proof.clone(),
            _callbackAddress: self.callback_address,
            _callbackData: self.callback_data.clone(),
        }
        .abi_encode()
    }
}
