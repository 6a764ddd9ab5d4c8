// Mock chain clients for testing. Each serves a fixed in-memory swap set
// with real offset/limit slicing and records every call it receives.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::chains::bnb::derive_swap_id;
use crate::chains::models::*;
use crate::chains::traits::{AccountChainClient, DualChainClient};
use crate::error::{AppError, AppResult};

fn slice<T: Clone>(items: &[T], offset: u64, limit: u64) -> Vec<T> {
    items
        .iter()
        .skip(offset as usize)
        .take(limit as usize)
        .cloned()
        .collect()
}

/// Build `count` expired HTLTs created by `sender`
pub fn expired_htlts(sender: &str, count: usize) -> Vec<HtltRecord> {
    (0..count)
        .map(|i| HtltRecord {
            random_number_hash: format!("{:064x}", i + 1),
            sender: sender.to_string(),
            sender_other_chain: format!("0x{:040x}", i),
            status: SwapStatus::Expired,
        })
        .collect()
}

pub struct MockBnbClient {
    pub address: String,
    pub swaps: Vec<HtltRecord>,
    pub sequence: u64,
    pub account_unavailable: bool,
    pub fail_query_at_offset: Option<u64>,
    pub failing_swaps: HashSet<SwapId>,
    pub queried_offsets: Mutex<Vec<u64>>,
    pub submissions: Mutex<Vec<(SwapId, u64)>>,
}

impl MockBnbClient {
    pub fn new(address: &str, swaps: Vec<HtltRecord>) -> Self {
        Self {
            address: address.to_string(),
            swaps,
            sequence: 0,
            account_unavailable: false,
            fail_query_at_offset: None,
            failing_swaps: HashSet::new(),
            queried_offsets: Mutex::new(Vec::new()),
            submissions: Mutex::new(Vec::new()),
        }
    }

    pub fn submitted_sequences(&self) -> Vec<u64> {
        self.submissions.lock().iter().map(|(_, seq)| *seq).collect()
    }
}

#[async_trait]
impl AccountChainClient for MockBnbClient {
    fn address(&self) -> &str {
        &self.address
    }

    async fn list_swaps(
        &self,
        status: SwapStatus,
        offset: u64,
        limit: u64,
        _timeout: Duration,
    ) -> AppResult<Vec<HtltRecord>> {
        self.queried_offsets.lock().push(offset);

        if self.fail_query_at_offset == Some(offset) {
            return Err(AppError::connection(Chain::Bnb, "Mock timeout"));
        }

        let matching: Vec<HtltRecord> = self
            .swaps
            .iter()
            .filter(|swap| swap.status == status)
            .cloned()
            .collect();
        Ok(slice(&matching, offset, limit))
    }

    async fn submit_refund(&self, swap_id: &SwapId, _fee: u64, sequence: u64) -> AppResult<String> {
        self.submissions.lock().push((swap_id.clone(), sequence));

        if self.failing_swaps.contains(swap_id) {
            return Err(AppError::submission(Chain::Bnb, swap_id, "Mock rejection"));
        }
        Ok(format!("BNBTX{}", sequence))
    }

    async fn load_account(&self, _address: &str) -> AppResult<AccountMetadata> {
        if self.account_unavailable {
            return Err(AppError::connection(Chain::Bnb, "Mock account lookup failure"));
        }
        Ok(AccountMetadata {
            account_number: 42,
            sequence: self.sequence,
        })
    }

    fn compute_swap_id(
        &self,
        random_number_hash: &str,
        sender: &str,
        sender_other_chain: &str,
    ) -> AppResult<SwapId> {
        derive_swap_id(random_number_hash, sender, sender_other_chain)
    }
}

/// Build `count` open Kava swaps expiring at `expire_height`, ids prefixed by `tag`
pub fn open_swaps(tag: &str, direction: SwapDirection, count: usize, expire_height: u64) -> Vec<SwapRecord> {
    (0..count)
        .map(|i| SwapRecord {
            swap_id: SwapId::new(format!("{}{:04}", tag, i)),
            status: SwapStatus::Open,
            expire_height,
            direction,
        })
        .collect()
}

pub struct MockKavaClient {
    pub address: String,
    pub height: u64,
    pub height_unavailable: bool,
    pub swaps: HashMap<(String, SwapDirection), Vec<SwapRecord>>,
    pub failing_directions: HashSet<SwapDirection>,
    pub failing_swaps: HashSet<SwapId>,
    /// HTTP status reported on receipts for swaps that are not failing
    pub receipt_status: u16,
    pub queries: Mutex<Vec<(String, SwapDirection, u64)>>,
    pub submissions: Mutex<Vec<SwapId>>,
}

impl MockKavaClient {
    pub fn new(address: &str, height: u64) -> Self {
        Self {
            address: address.to_string(),
            height,
            height_unavailable: false,
            swaps: HashMap::new(),
            failing_directions: HashSet::new(),
            failing_swaps: HashSet::new(),
            receipt_status: 200,
            queries: Mutex::new(Vec::new()),
            submissions: Mutex::new(Vec::new()),
        }
    }

    pub fn with_swaps(mut self, deputy: &str, direction: SwapDirection, swaps: Vec<SwapRecord>) -> Self {
        self.swaps.insert((deputy.to_string(), direction), swaps);
        self
    }

    fn serve(&self, direction: SwapDirection, address: &str, limit: u64, offset: u64) -> AppResult<Vec<SwapRecord>> {
        self.queries.lock().push((address.to_string(), direction, offset));

        if self.failing_directions.contains(&direction) {
            return Err(AppError::connection(Chain::Kava, "Mock timeout"));
        }

        Ok(self
            .swaps
            .get(&(address.to_string(), direction))
            .map(|swaps| slice(swaps, offset, limit))
            .unwrap_or_default())
    }
}

#[async_trait]
impl DualChainClient for MockKavaClient {
    fn address(&self) -> &str {
        &self.address
    }

    async fn latest_block_height(&self) -> AppResult<u64> {
        if self.height_unavailable {
            return Err(AppError::connection(Chain::Kava, "Mock node down"));
        }
        Ok(self.height)
    }

    async fn list_swaps_by_creator(&self, address: &str, limit: u64, offset: u64) -> AppResult<Vec<SwapRecord>> {
        self.serve(SwapDirection::Outgoing, address, limit, offset)
    }

    async fn list_swaps_by_recipient(&self, address: &str, limit: u64, offset: u64) -> AppResult<Vec<SwapRecord>> {
        self.serve(SwapDirection::Incoming, address, limit, offset)
    }

    async fn submit_refund(&self, swap_id: &SwapId) -> AppResult<RefundReceipt> {
        self.submissions.lock().push(swap_id.clone());

        if self.failing_swaps.contains(swap_id) {
            return Err(AppError::submission(Chain::Kava, swap_id, "HTTP 500"));
        }
        Ok(RefundReceipt {
            status: self.receipt_status,
            tx_hash: format!("KAVATX-{}", swap_id),
        })
    }
}
