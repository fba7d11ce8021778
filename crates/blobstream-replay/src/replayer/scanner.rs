//! Backward-paging scan of the source contract's commitment history.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use anyhow::Result;
use blobstream_types::CommitmentEvent;
use tracing::{debug, info};

use crate::client::SourceChain;

/// In-memory index of commitment events keyed by their start block. Built
/// once per catch-up pass, never shared across passes.
#[derive(Debug, Default)]
pub struct CommitmentIndex {
    events: HashMap<u64, CommitmentEvent>,
}

impl CommitmentIndex {
    /// Idempotent insert: log pages can overlap, so a repeated start block is
    /// a duplicate delivery and skipped. Returns whether the event was new.
    fn insert(&mut self, event: CommitmentEvent) -> bool {
        match self.events.entry(event.start_block) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(event);
                true
            }
        }
    }

    /// The commitment whose covered range starts at `start_block`.
    pub fn get(&self, start_block: u64) -> Option<&CommitmentEvent> {
        self.events.get(&start_block)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Consumes the index, returning the events in ascending nonce order.
    pub fn into_sorted_events(self) -> Vec<CommitmentEvent> {
        let mut events: Vec<_> = self.events.into_values().collect();
        events.sort_by_key(|event| event.proof_nonce);
        events
    }
}

/// Scans the source contract's commitment logs backward from `upto_height`
/// in windows of `page_size` blocks.
///
/// Stops as soon as the index holds `required_count` entries, or once it
/// reaches an event older than `target_watermark` (everything needed to close
/// the gap is then present), or at chain genesis. Page query failures are
/// surfaced to the caller unretried.
pub async fn scan_commitment_events(
    source: &dyn SourceChain,
    upto_height: u64,
    page_size: u64,
    required_count: u64,
    target_watermark: u64,
) -> Result<CommitmentIndex> {
    info!("querying the data commitment stored events of the source contract");
    let mut index = CommitmentIndex::default();
    let mut covers_watermark = false;
    let mut page_end = upto_height;

    loop {
        let page_start = page_end.saturating_sub(page_size);
        debug!(
            evm_block_start = page_start,
            evm_block_end = page_end,
            "querying a page of commitment events"
        );
        for event in source.commitment_events(page_start, page_end).await? {
            let start_block = event.start_block;
            if index.insert(event) && start_block < target_watermark {
                covers_watermark = true;
            }
        }

        if index.len() as u64 >= required_count {
            info!(count = index.len(), "found all events");
            break;
        }
        if covers_watermark {
            info!(count = index.len(), "found enough events to cover the needed range");
            break;
        }
        if page_start == 0 {
            info!(count = index.len(), "reached chain genesis");
            break;
        }
        page_end = page_start;
    }
    Ok(index)
}
