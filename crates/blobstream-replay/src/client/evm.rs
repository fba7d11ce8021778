//! Alloy-backed implementations of the chain-facing traits.

use std::time::Duration;

use alloy_consensus::Transaction as _;
use alloy_network::{EthereumWallet, TransactionBuilder};
use alloy_primitives::{Address, Bytes, TxHash};
use alloy_provider::{
    DynProvider, PendingTransactionError, Provider, ProviderBuilder, WatchTxError,
};
use alloy_rpc_types::{Filter, TransactionRequest};
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::{SolCall, SolEvent};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use blobstream_types::{BlobstreamX, CommitmentEvent, FulfillCallArgs};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use super::{SourceChain, SubmitError, TargetChain};

/// Channel depth for the live commitment feed. Commitments are minutes apart
/// on any real deployment, so a small buffer suffices.
const EVENT_CHANNEL_CAPACITY: usize = 64;

async fn connect_provider(rpc_url: &str) -> Result<DynProvider> {
    let provider = ProviderBuilder::new()
        .connect(rpc_url)
        .await
        .with_context(|| format!("failed to connect to EVM rpc at {rpc_url}"))?;
    Ok(provider.erased())
}

async fn view_call<C: SolCall>(provider: &DynProvider, contract: Address, call: C) -> Result<C::Return> {
    let tx = TransactionRequest::default()
        .with_to(contract)
        .with_input(call.abi_encode());
    let raw = provider.call(tx).await?;
    Ok(C::abi_decode_returns(&raw)?)
}

async fn contract_latest_block(provider: &DynProvider, contract: Address) -> Result<u64> {
    view_call(provider, contract, BlobstreamX::latestBlockCall {}).await
}

async fn contract_proof_nonce(provider: &DynProvider, contract: Address) -> Result<u64> {
    let nonce = view_call(provider, contract, BlobstreamX::state_proofNonceCall {}).await?;
    u64::try_from(nonce).map_err(|_| anyhow!("contract proof nonce {nonce} does not fit in u64"))
}

/// Read-only view of the source BlobstreamX deployment.
pub struct EvmSourceChain {
    provider: DynProvider,
    contract: Address,
}

impl EvmSourceChain {
    /// Connects to the source chain. The rpc endpoint must support log
    /// subscriptions (websocket) for the follow engine to work.
    pub async fn connect(rpc_url: &str, contract: Address) -> Result<Self> {
        Ok(Self {
            provider: connect_provider(rpc_url).await?,
            contract,
        })
    }

    fn commitment_filter(&self) -> Filter {
        Filter::new()
            .address(self.contract)
            .event(BlobstreamX::DataCommitmentStored::SIGNATURE)
    }
}

#[async_trait]
impl SourceChain for EvmSourceChain {
    async fn chain_height(&self) -> Result<u64> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn latest_committed_block(&self) -> Result<u64> {
        contract_latest_block(&self.provider, self.contract).await
    }

    async fn proof_nonce(&self) -> Result<u64> {
        contract_proof_nonce(&self.provider, self.contract).await
    }

    async fn commitment_events(&self, from_block: u64, to_block: u64) -> Result<Vec<CommitmentEvent>> {
        let filter = self.commitment_filter().from_block(from_block).to_block(to_block);
        let logs = self.provider.get_logs(&filter).await.with_context(|| {
            format!("failed to query commitment events in EVM blocks [{from_block}, {to_block}]")
        })?;
        logs.iter().map(CommitmentEvent::from_log).collect()
    }

    async fn watch_commitment_events(&self) -> Result<mpsc::Receiver<CommitmentEvent>> {
        let sub = self
            .provider
            .subscribe_logs(&self.commitment_filter())
            .await
            .context("failed to subscribe to commitment events; the source rpc must support subscriptions")?;
        let mut stream = sub.into_stream();
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            while let Some(log) = stream.next().await {
                match CommitmentEvent::from_log(&log) {
                    Ok(event) => {
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => warn!(%err, "skipping an undecodable commitment log"),
                }
            }
        });
        Ok(rx)
    }

    async fn transaction_calldata(&self, tx_hash: TxHash) -> Result<Bytes> {
        let tx = self
            .provider
            .get_transaction_by_hash(tx_hash)
            .await?
            .ok_or_else(|| anyhow!("transaction {tx_hash} not found on the source chain"))?;
        Ok(tx.input().clone())
    }
}

/// Writable view of the target deployment: the BlobstreamX contract for
/// reads, its proof gateway for `fulfillCall` submissions.
pub struct EvmTargetChain {
    provider: DynProvider,
    contract: Address,
    gateway: Address,
    sender: Address,
    gas_limit: u64,
}

impl EvmTargetChain {
    pub async fn connect(
        rpc_url: &str,
        contract: Address,
        gateway: Address,
        signer: PrivateKeySigner,
        gas_limit: u64,
    ) -> Result<Self> {
        let sender = signer.address();
        let wallet = EthereumWallet::from(signer);
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect(rpc_url)
            .await
            .with_context(|| format!("failed to connect to target EVM rpc at {rpc_url}"))?
            .erased();
        Ok(Self {
            provider,
            contract,
            gateway,
            sender,
            gas_limit,
        })
    }
}

#[async_trait]
impl TargetChain for EvmTargetChain {
    async fn latest_committed_block(&self) -> Result<u64> {
        contract_latest_block(&self.provider, self.contract).await
    }

    async fn proof_nonce(&self) -> Result<u64> {
        contract_proof_nonce(&self.provider, self.contract).await
    }

    async fn suggest_gas_price(&self) -> Result<u128> {
        Ok(self.provider.get_gas_price().await?)
    }

    async fn fulfill_call(
        &self,
        args: &FulfillCallArgs,
        gas_price: u128,
        wait_timeout: Duration,
    ) -> Result<(), SubmitError> {
        let nonce = self
            .provider
            .get_transaction_count(self.sender)
            .pending()
            .await
            .map_err(|err| SubmitError::Fatal(err.into()))?;

        let tx = TransactionRequest::default()
            .with_to(self.gateway)
            .with_input(args.encode_calldata())
            .with_nonce(nonce)
            .with_gas_limit(self.gas_limit)
            .with_gas_price(gas_price);

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|err| SubmitError::Fatal(err.into()))?;
        let tx_hash = *pending.tx_hash();
        debug!(%tx_hash, "waiting for fulfillCall inclusion");

        match pending.with_timeout(Some(wait_timeout)).get_receipt().await {
            Ok(receipt) if receipt.status() => {
                debug!(%tx_hash, block = receipt.block_number, "fulfillCall confirmed");
                Ok(())
            }
            Ok(receipt) => Err(SubmitError::Fatal(anyhow!(
                "fulfillCall {tx_hash} reverted in block {:?}",
                receipt.block_number
            ))),
            Err(PendingTransactionError::TxWatcher(WatchTxError::Timeout)) => {
                Err(SubmitError::InclusionTimeout)
            }
            Err(err) => Err(SubmitError::Fatal(err.into())),
        }
    }
}
