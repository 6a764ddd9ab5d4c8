use tracing::{debug, error, info, warn};

use crate::chains::models::{Chain, SwapDirection, SwapId};
use crate::error::AppError;
use crate::refund::cursor::PageCursor;
use crate::refund::orchestrator::CycleReport;

/// Sink for everything a refund cycle reports.
///
/// Scanner, submitter and orchestrator never log directly; production wires
/// in `TracingObserver`, tests a recording one.
pub trait RefundObserver: Send + Sync {
    fn swaps_found(&self, chain: Chain, count: usize);

    /// A query (listing, height, account sequence) failed; that chain or
    /// direction is skipped until the next cycle.
    fn query_failed(&self, chain: Chain, direction: Option<SwapDirection>, error: &AppError);

    /// A listed swap could not be turned into a refundable id and was skipped
    fn record_rejected(&self, chain: Chain, error: &AppError);

    fn refund_submitted(&self, chain: Chain, swap_id: &SwapId, tx_hash: &str);

    fn refund_failed(&self, chain: Chain, swap_id: &SwapId, error: &AppError);

    fn cycle_skipped(&self);

    fn cycle_completed(&self, report: &CycleReport);

    fn offsets(&self, cursors: &[PageCursor]);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RefundObserver for TracingObserver {
    fn swaps_found(&self, chain: Chain, count: usize) {
        info!(%chain, count, "📊 Found {} refundable {} swaps", count, chain);
    }

    fn query_failed(&self, chain: Chain, direction: Option<SwapDirection>, error: &AppError) {
        match direction {
            Some(direction) => {
                warn!(%chain, %direction, "⚠️ {} {} scan aborted: {}", chain, direction, error)
            }
            None => warn!(%chain, "⚠️ {} query aborted: {}", chain, error),
        }
    }

    fn record_rejected(&self, chain: Chain, error: &AppError) {
        warn!(%chain, "⚠️ Skipping unusable {} swap record: {}", chain, error);
    }

    fn refund_submitted(&self, chain: Chain, swap_id: &SwapId, tx_hash: &str) {
        info!(%chain, %swap_id, tx_hash, "✓ Refund submitted (tx: {})", tx_hash);
    }

    fn refund_failed(&self, chain: Chain, swap_id: &SwapId, error: &AppError) {
        error!(%chain, %swap_id, "❌ Refund failed: {}", error);
    }

    fn cycle_skipped(&self) {
        warn!("⏭️ Previous refund cycle still running, skipping");
    }

    fn cycle_completed(&self, report: &CycleReport) {
        info!(
            bnb_found = report.bnb.found,
            bnb_submitted = report.bnb.submitted,
            bnb_failed = report.bnb.failed,
            kava_found = report.kava.found,
            kava_submitted = report.kava.submitted,
            kava_failed = report.kava.failed,
            "✓ Refund cycle completed"
        );
    }

    fn offsets(&self, cursors: &[PageCursor]) {
        if cursors.is_empty() {
            debug!("No cursors recorded yet");
        }
        for cursor in cursors {
            let direction = cursor
                .direction
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string());
            info!(
                chain = %cursor.chain,
                direction = %direction,
                offset = cursor.offset,
                high_water = cursor.high_water,
                "📍 Cursor"
            );
        }
    }
}

#[cfg(test)]
pub use recording::{Observed, RecordingObserver};
