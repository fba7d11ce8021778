//! In-memory source/target chain pair driving the engine tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy_primitives::{address, Address, Bytes, TxHash, B256};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use blobstream_types::{CommitmentEvent, FulfillCallArgs};
use tokio::sync::{mpsc, watch};

use crate::client::{CommitmentOracle, SourceChain, SubmitError, TargetChain};
use crate::replayer::{ReplayOptions, Replayer};

pub const SOURCE_CONTRACT: Address = address!("1111111111111111111111111111111111111111");
pub const TARGET_CONTRACT: Address = address!("2222222222222222222222222222222222222222");
pub const HEADER_RANGE_ID: B256 = B256::repeat_byte(0xaa);
pub const NEXT_HEADER_ID: B256 = B256::repeat_byte(0xbb);

/// How the mock target reacts to a `fulfillCall` submission.
#[derive(Debug, Clone, Copy)]
pub enum SubmitBehavior {
    /// Accept the transaction and advance the target contract when the
    /// submitted proof matches the commitment the target is waiting for.
    Apply,
    /// Time out the given number of submissions, then behave like `Apply`.
    TimeoutThenApply(u32),
    AlwaysTimeout,
    /// Accept every transaction but never advance the contract, as when the
    /// gateway callback keeps failing silently.
    AcceptWithoutApply,
    /// Fail every submission with a non-timeout error.
    Revert,
}

struct MockState {
    chain_height: u64,
    source_latest_block: u64,
    source_nonce: u64,
    target_latest_block: u64,
    target_nonce: u64,
    events: Vec<(u64, CommitmentEvent)>,
    calldata: HashMap<TxHash, Bytes>,
    oracle: HashMap<(u64, u64), B256>,
    gas_price: u128,
    submissions: Vec<(FulfillCallArgs, u128)>,
    pages_queried: usize,
    fail_log_queries: bool,
    behavior: SubmitBehavior,
    timeouts_left: u32,
    watch_rx: Option<mpsc::Receiver<CommitmentEvent>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            chain_height: 10_000,
            source_latest_block: 0,
            source_nonce: 1,
            target_latest_block: 0,
            target_nonce: 1,
            events: Vec::new(),
            calldata: HashMap::new(),
            oracle: HashMap::new(),
            gas_price: 1_000,
            submissions: Vec::new(),
            pages_queried: 0,
            fail_log_queries: false,
            behavior: SubmitBehavior::Apply,
            timeouts_left: 0,
            watch_rx: None,
        }
    }
}

impl MockState {
    /// Advances the target contract if the submitted proof matches the
    /// commitment it is waiting for, mirroring what the gateway callback
    /// does on success.
    fn apply_submission(&mut self, args: &FulfillCallArgs) {
        let matching = self
            .events
            .iter()
            .map(|(_, event)| event)
            .find(|event| event.start_block == self.target_latest_block)
            .filter(|event| {
                self.calldata
                    .get(&event.source_tx_hash)
                    .and_then(|raw| FulfillCallArgs::decode_calldata(raw).ok())
                    .is_some_and(|original| original.proof == args.proof)
            })
            .cloned();
        if let Some(event) = matching {
            self.target_latest_block = event.end_block;
            self.target_nonce += 1;
        }
    }
}

#[derive(Clone)]
pub struct MockChain(Arc<Mutex<MockState>>);

impl MockChain {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(MockState::default())))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.0.lock().unwrap()
    }

    /// Stores a commitment on the mock source chain at the given EVM block,
    /// along with its proof transaction and the oracle's view of the range.
    pub fn seed_commitment(&self, nonce: u64, start: u64, end: u64, evm_block: u64) -> CommitmentEvent {
        let tx_hash = TxHash::repeat_byte(nonce as u8);
        let event = CommitmentEvent {
            proof_nonce: nonce,
            start_block: start,
            end_block: end,
            data_commitment: B256::repeat_byte(0x40 + nonce as u8),
            source_tx_hash: tx_hash,
        };
        let payload = FulfillCallArgs {
            function_id: B256::repeat_byte(nonce as u8),
            input: Bytes::from(vec![nonce as u8; 8]),
            output: Bytes::from(vec![nonce as u8; 16]),
            proof: Bytes::from(vec![nonce as u8; 32]),
            callback_address: SOURCE_CONTRACT,
            callback_data: Bytes::new(),
        };

        let mut state = self.lock();
        state.calldata.insert(tx_hash, payload.encode_calldata().into());
        state.oracle.insert((start, end), event.data_commitment);
        state.events.push((evm_block, event.clone()));
        state.source_latest_block = state.source_latest_block.max(end);
        state.source_nonce = state.source_nonce.max(nonce + 1);
        event
    }

    pub fn seed_calldata(&self, tx_hash: TxHash, calldata: Bytes) {
        self.lock().calldata.insert(tx_hash, calldata);
    }

    pub fn corrupt_oracle(&self, start: u64, end: u64, commitment: B256) {
        self.lock().oracle.insert((start, end), commitment);
    }

    pub fn set_target_state(&self, latest_block: u64, nonce: u64) {
        let mut state = self.lock();
        state.target_latest_block = latest_block;
        state.target_nonce = nonce;
    }

    pub fn set_submit_behavior(&self, behavior: SubmitBehavior) {
        let mut state = self.lock();
        if let SubmitBehavior::TimeoutThenApply(count) = behavior {
            state.timeouts_left = count;
        }
        state.behavior = behavior;
    }

    pub fn fail_log_queries(&self) {
        self.lock().fail_log_queries = true;
    }

    /// Opens the live event channel `watch_commitment_events` will hand out.
    pub fn event_feed(&self) -> mpsc::Sender<CommitmentEvent> {
        let (tx, rx) = mpsc::channel(16);
        self.lock().watch_rx = Some(rx);
        tx
    }

    pub fn submissions(&self) -> Vec<(FulfillCallArgs, u128)> {
        self.lock().submissions.clone()
    }

    pub fn source_events(&self) -> Vec<CommitmentEvent> {
        self.lock().events.iter().map(|(_, event)| event.clone()).collect()
    }

    pub fn pages_queried(&self) -> usize {
        self.lock().pages_queried
    }

    pub fn target_latest_block(&self) -> u64 {
        self.lock().target_latest_block
    }
}

#[async_trait]
impl SourceChain for MockChain {
    async fn chain_height(&self) -> Result<u64> {
        Ok(self.lock().chain_height)
    }

    async fn latest_committed_block(&self) -> Result<u64> {
        Ok(self.lock().source_latest_block)
    }

    async fn proof_nonce(&self) -> Result<u64> {
        Ok(self.lock().source_nonce)
    }

    async fn commitment_events(&self, from_block: u64, to_block: u64) -> Result<Vec<CommitmentEvent>> {
        let mut state = self.lock();
        state.pages_queried += 1;
        if state.fail_log_queries {
            bail!("log query failed");
        }
        Ok(state
            .events
            .iter()
            .filter(|(evm_block, _)| (from_block..=to_block).contains(evm_block))
            .map(|(_, event)| event.clone())
            .collect())
    }

    async fn watch_commitment_events(&self) -> Result<mpsc::Receiver<CommitmentEvent>> {
        self.lock()
            .watch_rx
            .take()
            .ok_or_else(|| anyhow!("no event feed opened"))
    }

    async fn transaction_calldata(&self, tx_hash: TxHash) -> Result<Bytes> {
        self.lock()
            .calldata
            .get(&tx_hash)
            .cloned()
            .ok_or_else(|| anyhow!("transaction {tx_hash} not found"))
    }
}

#[async_trait]
impl TargetChain for MockChain {
    async fn latest_committed_block(&self) -> Result<u64> {
        Ok(self.lock().target_latest_block)
    }

    async fn proof_nonce(&self) -> Result<u64> {
        Ok(self.lock().target_nonce)
    }

    async fn suggest_gas_price(&self) -> Result<u128> {
        Ok(self.lock().gas_price)
    }

    async fn fulfill_call(
        &self,
        args: &FulfillCallArgs,
        gas_price: u128,
        _wait_timeout: Duration,
    ) -> Result<(), SubmitError> {
        let mut state = self.lock();
        state.submissions.push((args.clone(), gas_price));
        match state.behavior {
            SubmitBehavior::Apply => {
                state.apply_submission(args);
                Ok(())
            }
            SubmitBehavior::TimeoutThenApply(_) if state.timeouts_left > 0 => {
                state.timeouts_left -= 1;
                Err(SubmitError::InclusionTimeout)
            }
            SubmitBehavior::TimeoutThenApply(_) => {
                state.apply_submission(args);
                Ok(())
            }
            SubmitBehavior::AlwaysTimeout => Err(SubmitError::InclusionTimeout),
            SubmitBehavior::AcceptWithoutApply => Ok(()),
            SubmitBehavior::Revert => Err(SubmitError::Fatal(anyhow!("execution reverted"))),
        }
    }
}

#[async_trait]
impl CommitmentOracle for MockChain {
    async fn data_commitment(&self, start_block: u64, end_block: u64) -> Result<B256> {
        self.lock()
            .oracle
            .get(&(start_block, end_block))
            .copied()
            .ok_or_else(|| anyhow!("no data commitment for [{start_block}, {end_block})"))
    }
}

pub fn test_options() -> ReplayOptions {
    ReplayOptions {
        target_contract: TARGET_CONTRACT,
        header_range_function_id: HEADER_RANGE_ID,
        next_header_function_id: NEXT_HEADER_ID,
        filter_range: 5_000,
        wait_timeout: Duration::from_millis(10),
    }
}

/// A [`Replayer`] wired entirely to `chain`, plus the handle that signals it
/// to shut down.
pub fn replayer_over(chain: &MockChain) -> (Replayer, watch::Sender<bool>) {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let replayer = Replayer::new(
        Arc::new(chain.clone()),
        Arc::new(chain.clone()),
        Some(Arc::new(chain.clone())),
        test_options(),
        shutdown_rx,
    );
    (replayer, shutdown_tx)
}
