use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::chains::models::Chain;
use crate::chains::traits::{AccountChainClient, DualChainClient};
use crate::error::{AppError, AppResult};
use crate::refund::cursor::{CursorStore, PageCursor};
use crate::refund::observer::RefundObserver;
use crate::refund::scanner::{ScanSettings, SwapScanner};
use crate::refund::submitter::{RefundSubmitter, SubmitSettings};

/// Where a chain's pass currently is. Every cycle starts and ends in `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainPhase {
    Idle,
    Scanning,
    Submitting,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChainReport {
    /// Refundable swaps discovered
    pub found: usize,
    /// Refunds broadcast successfully
    pub submitted: usize,
    /// Refunds that failed, plus 1 when the pass itself was cut short by a query error
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub bnb: ChainReport,
    pub kava: ChainReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// Another cycle held the lock
    Skipped,
}

/// Composes scanner and submitter per chain. BNB is processed fully, then Kava;
/// nothing that goes wrong on one chain stops the other.
pub struct RefundOrchestrator {
    bnb: Arc<dyn AccountChainClient>,
    kava: Arc<dyn DualChainClient>,
    deputies: Vec<String>,
    cursors: Arc<CursorStore>,
    scanner: SwapScanner,
    submitter: RefundSubmitter,
    observer: Arc<dyn RefundObserver>,
    phases: Mutex<HashMap<Chain, ChainPhase>>,
    cycle_lock: tokio::sync::Mutex<()>,
}

impl RefundOrchestrator {
    pub fn new(
        bnb: Arc<dyn AccountChainClient>,
        kava: Arc<dyn DualChainClient>,
        deputies: Vec<String>,
        cursors: Arc<CursorStore>,
        scan: ScanSettings,
        submit: SubmitSettings,
        observer: Arc<dyn RefundObserver>,
    ) -> AppResult<Self> {
        if deputies.is_empty() {
            return Err(AppError::Config(
                "At least one Kava deputy address is required".to_string(),
            ));
        }

        if scan.limit == 0 {
            return Err(AppError::Config("Query limit must be positive".to_string()));
        }

        let phases = Chain::all()
            .into_iter()
            .map(|chain| (chain, ChainPhase::Idle))
            .collect();

        Ok(Self {
            bnb,
            kava,
            deputies,
            scanner: SwapScanner::new(cursors.clone(), scan, observer.clone()),
            submitter: RefundSubmitter::new(submit, observer.clone()),
            cursors,
            observer,
            phases: Mutex::new(phases),
            cycle_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn phase(&self, chain: Chain) -> ChainPhase {
        self.phases
            .lock()
            .get(&chain)
            .copied()
            .unwrap_or(ChainPhase::Idle)
    }

    fn enter(&self, chain: Chain, phase: ChainPhase) {
        debug!("{} -> {:?}", chain, phase);
        self.phases.lock().insert(chain, phase);
    }

    /// One refund cycle. Safe to call on a timer: an invocation that overlaps a
    /// running cycle is skipped rather than queued.
    #[instrument(skip(self), fields(cycle_id = %Uuid::new_v4()))]
    pub async fn run(&self) -> CycleOutcome {
        let _guard = match self.cycle_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                self.observer.cycle_skipped();
                return CycleOutcome::Skipped;
            }
        };

        let report = CycleReport {
            bnb: self.run_bnb().await,
            kava: self.run_kava().await,
        };

        self.observer.cycle_completed(&report);
        CycleOutcome::Completed(report)
    }

    async fn run_bnb(&self) -> ChainReport {
        let mut report = ChainReport::default();

        self.enter(Chain::Bnb, ChainPhase::Scanning);
        let swap_ids = match self.scanner.scan_bnb(self.bnb.as_ref()).await {
            Ok(ids) => ids,
            Err(_) => {
                report.failed += 1;
                self.enter(Chain::Bnb, ChainPhase::Idle);
                return report;
            }
        };
        report.found = swap_ids.len();

        self.enter(Chain::Bnb, ChainPhase::Submitting);
        match self.submitter.submit_bnb(self.bnb.as_ref(), swap_ids).await {
            Ok(summary) => {
                report.submitted = summary.succeeded;
                report.failed = summary.failed;
            }
            Err(_) => report.failed += 1,
        }

        self.enter(Chain::Bnb, ChainPhase::Idle);
        report
    }

    async fn run_kava(&self) -> ChainReport {
        let mut report = ChainReport::default();

        self.enter(Chain::Kava, ChainPhase::Scanning);
        let swap_ids = match self.scanner.scan_kava(self.kava.as_ref(), &self.deputies).await {
            Ok(ids) => ids,
            Err(_) => {
                report.failed += 1;
                self.enter(Chain::Kava, ChainPhase::Idle);
                return report;
            }
        };
        report.found = swap_ids.len();

        self.enter(Chain::Kava, ChainPhase::Submitting);
        let summary = self.submitter.submit_kava(self.kava.as_ref(), swap_ids).await;
        report.submitted = summary.succeeded;
        report.failed = summary.failed;

        self.enter(Chain::Kava, ChainPhase::Idle);
        report
    }

    /// Current cursor offsets, also pushed to the observer
    pub fn report_offsets(&self) -> Vec<PageCursor> {
        let cursors = self.cursors.snapshot();
        self.observer.offsets(&cursors);
        cursors
    }
}
