// Refund Submitter - one refund transaction per swap, strictly in order
//
// BNB: the account sequence is read once per batch and the i-th refund uses
// `base + i`, whether or not earlier refunds landed. Kava leaves sequencing to
// the signing client. A failed refund is reported and the loop moves on; there
// is no retry inside a cycle, the swap is picked up again next cycle.
//
// Pacing: the per-chain interval is slept between two broadcasts only, never
// after the last refund of a batch. n refunds cost n-1 intervals.

use std::sync::Arc;
use std::time::Duration;
use tokio::time;

use crate::chains::models::{Chain, SwapId};
use crate::chains::traits::{AccountChainClient, DualChainClient};
use crate::error::{AppError, AppResult};
use crate::refund::observer::RefundObserver;

#[derive(Debug, Clone, Copy)]
pub struct SubmitSettings {
    pub bnb_pacing: Duration,
    pub kava_pacing: Duration,
    pub bnb_fee: u64,
}

impl Default for SubmitSettings {
    fn default() -> Self {
        Self {
            bnb_pacing: Duration::from_secs(25),
            kava_pacing: Duration::from_secs(5),
            bnb_fee: 0,
        }
    }
}

/// BNB swap ids collected in one cycle, paired with the account sequence the
/// first refund uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundPlan {
    pub swap_ids: Vec<SwapId>,
    pub base_sequence: u64,
}

impl RefundPlan {
    pub fn new(swap_ids: Vec<SwapId>, base_sequence: u64) -> Self {
        Self {
            swap_ids,
            base_sequence,
        }
    }

    /// Sequence for the i-th refund in the plan
    pub fn sequence_for(&self, index: usize) -> u64 {
        self.base_sequence + index as u64
    }

    /// Swap ids with their precomputed sequences, in submission order
    pub fn sequenced(&self) -> impl Iterator<Item = (&SwapId, u64)> + '_ {
        self.swap_ids
            .iter()
            .enumerate()
            .map(|(index, swap_id)| (swap_id, self.sequence_for(index)))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmissionSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl SubmissionSummary {
    fn record<T>(&mut self, result: &AppResult<T>) {
        self.attempted += 1;
        match result {
            Ok(_) => self.succeeded += 1,
            Err(_) => self.failed += 1,
        }
    }
}

pub struct RefundSubmitter {
    settings: SubmitSettings,
    observer: Arc<dyn RefundObserver>,
}

impl RefundSubmitter {
    pub fn new(settings: SubmitSettings, observer: Arc<dyn RefundObserver>) -> Self {
        Self { settings, observer }
    }

    /// Fetches the base sequence, then refunds every swap with a precomputed sequence.
    ///
    /// If the sequence cannot be read nothing is attempted; the error is returned
    /// so the caller can count it as a failed pass for this chain.
    pub async fn submit_bnb(
        &self,
        client: &dyn AccountChainClient,
        swap_ids: Vec<SwapId>,
    ) -> AppResult<SubmissionSummary> {
        if swap_ids.is_empty() {
            return Ok(SubmissionSummary::default());
        }

        let account = match client.load_account(client.address()).await {
            Ok(account) => account,
            Err(e) => {
                self.observer.query_failed(Chain::Bnb, None, &e);
                return Err(e);
            }
        };

        let plan = RefundPlan::new(swap_ids, account.sequence);
        let mut summary = SubmissionSummary::default();

        for (index, (swap_id, sequence)) in plan.sequenced().enumerate() {
            if index > 0 {
                time::sleep(self.settings.bnb_pacing).await;
            }

            let result = client
                .submit_refund(swap_id, self.settings.bnb_fee, sequence)
                .await;

            match &result {
                Ok(tx_hash) => self.observer.refund_submitted(Chain::Bnb, swap_id, tx_hash),
                Err(e) => self.observer.refund_failed(Chain::Bnb, swap_id, e),
            }
            summary.record(&result);
        }

        Ok(summary)
    }

    pub async fn submit_kava(
        &self,
        client: &dyn DualChainClient,
        swap_ids: Vec<SwapId>,
    ) -> SubmissionSummary {
        let mut summary = SubmissionSummary::default();

        for (index, swap_id) in swap_ids.iter().enumerate() {
            if index > 0 {
                time::sleep(self.settings.kava_pacing).await;
            }

            let result = match client.submit_refund(swap_id).await {
                Ok(receipt) if !receipt.accepted() => Err(AppError::submission(
                    Chain::Kava,
                    swap_id,
                    format!("broadcast answered HTTP {}", receipt.status),
                )),
                other => other,
            };

            match &result {
                Ok(receipt) => self
                    .observer
                    .refund_submitted(Chain::Kava, swap_id, &receipt.tx_hash),
                Err(e) => self.observer.refund_failed(Chain::Kava, swap_id, e),
            }
            summary.record(&result);
        }

        summary
    }
}
