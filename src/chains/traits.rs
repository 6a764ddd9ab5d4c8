use async_trait::async_trait;
use std::time::Duration;

use crate::chains::models::*;
use crate::error::AppResult;

/// Account-model chain client (BNB).
///
/// Refunds carry an explicit account sequence, so callers can pre-compute a
/// whole batch without waiting for confirmations.
#[async_trait]
pub trait AccountChainClient: Send + Sync {
    /// Address of the signing identity this client refunds from
    fn address(&self) -> &str;

    /// List swaps created by `address()` with the given status
    async fn list_swaps(
        &self,
        status: SwapStatus,
        offset: u64,
        limit: u64,
        timeout: Duration,
    ) -> AppResult<Vec<HtltRecord>>;

    /// Broadcast a refund. Returns the transaction hash.
    async fn submit_refund(&self, swap_id: &SwapId, fee: u64, sequence: u64) -> AppResult<String>;

    async fn load_account(&self, address: &str) -> AppResult<AccountMetadata>;

    fn compute_swap_id(
        &self,
        random_number_hash: &str,
        sender: &str,
        sender_other_chain: &str,
    ) -> AppResult<SwapId>;
}

/// Dual-direction chain client (Kava).
///
/// Swaps are listed per deputy address, once as creator and once as recipient.
/// Sequence handling is left to the signing client.
#[async_trait]
pub trait DualChainClient: Send + Sync {
    fn address(&self) -> &str;

    async fn latest_block_height(&self) -> AppResult<u64>;

    async fn list_swaps_by_creator(
        &self,
        address: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<SwapRecord>>;

    async fn list_swaps_by_recipient(
        &self,
        address: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<SwapRecord>>;

    async fn submit_refund(&self, swap_id: &SwapId) -> AppResult<RefundReceipt>;

    /// Dispatch on direction: the deputy creates outgoing swaps and receives incoming ones.
    async fn list_swaps(
        &self,
        direction: SwapDirection,
        address: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<SwapRecord>> {
        match direction {
            SwapDirection::Outgoing => self.list_swaps_by_creator(address, limit, offset).await,
            SwapDirection::Incoming => self.list_swaps_by_recipient(address, limit, offset).await,
        }
    }
}
