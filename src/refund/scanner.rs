// Swap Scanner - page-until-short discovery of refundable swaps
//
// Continuation policy ("full-page continuation, partial/empty-page reset"):
// - a page holding exactly `limit` raw items means there may be more, so the
//   cursor advances by `limit` and the next page is requested;
// - a short or empty page ends the scan for this cycle, and the cursor goes
//   back to the value it had before the scan started;
// - a query error discards whatever that scan collected and also restores
//   the cursor. The next cycle rescans from the same point.
//
// Swaps cross the refundable threshold between cycles, so the whole range is
// revisited every cycle instead of resuming from the deepest offset reached.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::chains::models::*;
use crate::chains::traits::{AccountChainClient, DualChainClient};
use crate::error::{AppError, AppResult};
use crate::refund::cursor::{CursorKey, CursorStore, ScanSession};
use crate::refund::observer::RefundObserver;

#[derive(Debug, Clone, Copy)]
pub struct ScanSettings {
    /// Page size
    pub limit: u64,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            limit: 100,
            timeout: Duration::from_secs(5),
        }
    }
}

/// One fetched page: the refundable matches plus how many raw items came back
#[derive(Debug)]
struct Page<T> {
    matches: Vec<T>,
    fetched: u64,
}

/// Walk pages from the session's offset until a short page or an error.
async fn page_until_short<T, F, Fut>(
    mut session: ScanSession<'_>,
    limit: u64,
    mut fetch: F,
) -> AppResult<Vec<T>>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = AppResult<Page<T>>>,
{
    let mut found = Vec::new();
    if limit == 0 {
        return Ok(found);
    }

    loop {
        let page = fetch(session.offset()).await?;
        found.extend(page.matches);

        if page.fetched < limit {
            break;
        }
        session.advance(limit);
    }

    Ok(found)
}

pub struct SwapScanner {
    cursors: Arc<CursorStore>,
    settings: ScanSettings,
    observer: Arc<dyn RefundObserver>,
}

impl SwapScanner {
    pub fn new(
        cursors: Arc<CursorStore>,
        settings: ScanSettings,
        observer: Arc<dyn RefundObserver>,
    ) -> Self {
        Self {
            cursors,
            settings,
            observer,
        }
    }

    /// Expired HTLTs created by the BNB deputy. The status filter is applied by
    /// the API; ids are derived locally since the listing does not carry them.
    pub async fn scan_bnb(&self, client: &dyn AccountChainClient) -> AppResult<Vec<SwapId>> {
        let ScanSettings { limit, timeout } = self.settings;
        let session = self.cursors.begin(CursorKey::bnb());

        let records = page_until_short(session, limit, move |offset| async move {
            let page = client
                .list_swaps(SwapStatus::Expired, offset, limit, timeout)
                .await?;
            let fetched = page.len() as u64;
            let matches: Vec<HtltRecord> = page
                .into_iter()
                .filter(|record| record.status == SwapStatus::Expired)
                .collect();
            Ok::<_, AppError>(Page { matches, fetched })
        })
        .await;

        let records = match records {
            Ok(records) => records,
            Err(e) => {
                self.observer.query_failed(Chain::Bnb, None, &e);
                return Err(e);
            }
        };

        // A record that cannot be turned into an id is skipped on its own
        let ids: Vec<SwapId> = records
            .iter()
            .filter_map(|record| {
                match client.compute_swap_id(
                    &record.random_number_hash,
                    &record.sender,
                    &record.sender_other_chain,
                ) {
                    Ok(id) => Some(id),
                    Err(e) => {
                        self.observer.record_rejected(Chain::Bnb, &e);
                        None
                    }
                }
            })
            .collect();

        self.observer.swaps_found(Chain::Bnb, ids.len());
        Ok(ids)
    }

    /// Kava swaps that are `Expired`, or still `Open` past their expiry height,
    /// in both directions for every deputy.
    ///
    /// Fails only when the chain height cannot be read. A failing direction is
    /// reported and contributes nothing; the other direction still counts.
    pub async fn scan_kava(
        &self,
        client: &dyn DualChainClient,
        deputies: &[String],
    ) -> AppResult<Vec<SwapId>> {
        let height = match client.latest_block_height().await {
            Ok(height) => height,
            Err(e) => {
                self.observer.query_failed(Chain::Kava, None, &e);
                return Err(e);
            }
        };

        let mut ids = Vec::new();
        let mut seen = HashSet::new();

        for direction in SwapDirection::all() {
            match self.scan_kava_direction(client, deputies, direction, height).await {
                Ok(found) => {
                    for id in found {
                        if seen.insert(id.clone()) {
                            ids.push(id);
                        }
                    }
                }
                Err(e) => self.observer.query_failed(Chain::Kava, Some(direction), &e),
            }
        }

        self.observer.swaps_found(Chain::Kava, ids.len());
        Ok(ids)
    }

    /// All deputies share the (Kava, direction) cursor: each iteration asks every
    /// deputy for the page at the same offset, and the scan continues while at
    /// least one of them returned a full page.
    async fn scan_kava_direction(
        &self,
        client: &dyn DualChainClient,
        deputies: &[String],
        direction: SwapDirection,
        height: u64,
    ) -> AppResult<Vec<SwapId>> {
        if deputies.is_empty() {
            return Err(AppError::Config("No deputy addresses configured".to_string()));
        }

        let limit = self.settings.limit;
        let session = self.cursors.begin(CursorKey::kava(direction));

        page_until_short(session, limit, move |offset| async move {
            let mut matches = Vec::new();
            let mut fetched = 0u64;

            for deputy in deputies {
                let page = client.list_swaps(direction, deputy, limit, offset).await?;
                fetched = fetched.max(page.len() as u64);
                matches.extend(
                    page.into_iter()
                        .filter(|swap| swap.is_refundable_at(height))
                        .map(|swap| swap.swap_id),
                );
            }

            Ok::<_, AppError>(Page { matches, fetched })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::mock::*;
    use crate::refund::observer::{Observed, RecordingObserver};

    const BNB_DEPUTY: &str = "tbnb1zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3dvp2ns";
    const DEPUTY_A: &str = "kava1deputya";
    const DEPUTY_B: &str = "kava1deputyb";

    fn scanner(cursors: Arc<CursorStore>) -> (SwapScanner, Arc<RecordingObserver>) {
        let observer = Arc::new(RecordingObserver::default());
        let scanner = SwapScanner::new(cursors, ScanSettings::default(), observer.clone());
        (scanner, observer)
    }

    #[tokio::test]
    async fn test_bnb_two_full_pages_then_short_page() {
        let cursors = Arc::new(CursorStore::new());
        let (scanner, observer) = scanner(cursors.clone());
        let client = MockBnbClient::new(BNB_DEPUTY, expired_htlts(BNB_DEPUTY, 230));

        let ids = scanner.scan_bnb(&client).await.unwrap();

        assert_eq!(ids.len(), 230);
        assert_eq!(*client.queried_offsets.lock(), vec![0, 100, 200]);
        assert_eq!(cursors.offset(CursorKey::bnb()), 0);
        assert!(observer.events().contains(&Observed::Found(Chain::Bnb, 230)));
    }

    #[tokio::test]
    async fn test_short_page_leaves_cursor_at_start() {
        let cursors = Arc::new(CursorStore::with_offsets([(CursorKey::bnb(), 100)]));
        let (scanner, _) = scanner(cursors.clone());
        let client = MockBnbClient::new(BNB_DEPUTY, expired_htlts(BNB_DEPUTY, 130));

        let ids = scanner.scan_bnb(&client).await.unwrap();

        assert_eq!(ids.len(), 30);
        assert_eq!(*client.queried_offsets.lock(), vec![100]);
        assert_eq!(cursors.offset(CursorKey::bnb()), 100);
    }

    #[tokio::test]
    async fn test_exact_full_last_page_costs_one_empty_round_trip() {
        let cursors = Arc::new(CursorStore::new());
        let (scanner, _) = scanner(cursors.clone());
        let client = MockBnbClient::new(BNB_DEPUTY, expired_htlts(BNB_DEPUTY, 100));

        let ids = scanner.scan_bnb(&client).await.unwrap();

        assert_eq!(ids.len(), 100);
        assert_eq!(*client.queried_offsets.lock(), vec![0, 100]);
        assert_eq!(cursors.offset(CursorKey::bnb()), 0);
        assert_eq!(cursors.snapshot()[0].high_water, 100);
    }

    #[tokio::test]
    async fn test_bnb_query_error_discards_partial_results() {
        let cursors = Arc::new(CursorStore::new());
        let (scanner, observer) = scanner(cursors.clone());
        let mut client = MockBnbClient::new(BNB_DEPUTY, expired_htlts(BNB_DEPUTY, 250));
        client.fail_query_at_offset = Some(200);

        let result = scanner.scan_bnb(&client).await;

        assert!(matches!(result, Err(AppError::Connection { chain: Chain::Bnb, .. })));
        assert_eq!(cursors.offset(CursorKey::bnb()), 0);
        assert!(observer.events().contains(&Observed::QueryFailed(Chain::Bnb, None)));
    }

    #[tokio::test]
    async fn test_bnb_ids_are_derived_from_swap_contents() {
        let cursors = Arc::new(CursorStore::new());
        let (scanner, _) = scanner(cursors);
        let swaps = expired_htlts(BNB_DEPUTY, 1);
        let expected = crate::chains::bnb::derive_swap_id(
            &swaps[0].random_number_hash,
            &swaps[0].sender,
            &swaps[0].sender_other_chain,
        )
        .unwrap();
        let client = MockBnbClient::new(BNB_DEPUTY, swaps);

        let ids = scanner.scan_bnb(&client).await.unwrap();
        assert_eq!(ids, vec![expected]);
    }

    #[tokio::test]
    async fn test_bnb_bad_record_is_skipped_and_reported() {
        let cursors = Arc::new(CursorStore::new());
        let (scanner, observer) = scanner(cursors);
        let mut swaps = expired_htlts(BNB_DEPUTY, 5);
        swaps[2].random_number_hash = "zz".to_string();
        let client = MockBnbClient::new(BNB_DEPUTY, swaps);

        let ids = scanner.scan_bnb(&client).await.unwrap();

        assert_eq!(ids.len(), 4);
        let events = observer.events();
        assert!(events.contains(&Observed::Rejected(Chain::Bnb)));
        assert!(events.contains(&Observed::Found(Chain::Bnb, 4)));
    }

    #[tokio::test]
    async fn test_kava_filters_on_height_client_side() {
        let cursors = Arc::new(CursorStore::new());
        let (scanner, _) = scanner(cursors);
        let mut swaps = open_swaps("ee", SwapDirection::Incoming, 3, 900);
        swaps.extend(open_swaps("ff", SwapDirection::Incoming, 2, 1_100));
        swaps[0].status = SwapStatus::Completed;
        let client = MockKavaClient::new(DEPUTY_A, 1_000).with_swaps(DEPUTY_A, SwapDirection::Incoming, swaps);

        let ids = scanner.scan_kava(&client, &[DEPUTY_A.to_string()]).await.unwrap();

        assert_eq!(ids, vec![SwapId::new("ee0001"), SwapId::new("ee0002")]);
    }

    #[tokio::test]
    async fn test_kava_expired_status_is_refundable() {
        let cursors = Arc::new(CursorStore::new());
        let (scanner, _) = scanner(cursors);
        let mut swaps = open_swaps("dd", SwapDirection::Outgoing, 2, 1_500);
        swaps[1].status = SwapStatus::Expired;
        let client = MockKavaClient::new(DEPUTY_A, 1_000).with_swaps(DEPUTY_A, SwapDirection::Outgoing, swaps);

        let ids = scanner.scan_kava(&client, &[DEPUTY_A.to_string()]).await.unwrap();

        assert_eq!(ids, vec![SwapId::new("dd0001")]);
    }

    #[tokio::test]
    async fn test_kava_no_swaps_in_either_direction() {
        let cursors = Arc::new(CursorStore::new());
        let (scanner, observer) = scanner(cursors);
        let client = MockKavaClient::new(DEPUTY_A, 1_000);

        let ids = scanner.scan_kava(&client, &[DEPUTY_A.to_string()]).await.unwrap();

        assert!(ids.is_empty());
        assert!(observer.events().contains(&Observed::Found(Chain::Kava, 0)));
        assert_eq!(client.queries.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_kava_directions_scan_independently() {
        let cursors = Arc::new(CursorStore::new());
        let (scanner, observer) = scanner(cursors.clone());
        let mut client = MockKavaClient::new(DEPUTY_A, 1_000)
            .with_swaps(DEPUTY_A, SwapDirection::Incoming, open_swaps("aa", SwapDirection::Incoming, 150, 10))
            .with_swaps(DEPUTY_A, SwapDirection::Outgoing, open_swaps("bb", SwapDirection::Outgoing, 5, 10));
        client.failing_directions.insert(SwapDirection::Outgoing);

        let ids = scanner.scan_kava(&client, &[DEPUTY_A.to_string()]).await.unwrap();

        assert_eq!(ids.len(), 150);
        assert!(observer
            .events()
            .contains(&Observed::QueryFailed(Chain::Kava, Some(SwapDirection::Outgoing))));
        assert_eq!(cursors.offset(CursorKey::kava(SwapDirection::Incoming)), 0);
        assert_eq!(cursors.offset(CursorKey::kava(SwapDirection::Outgoing)), 0);
    }

    #[tokio::test]
    async fn test_kava_height_failure_aborts_scan() {
        let cursors = Arc::new(CursorStore::new());
        let (scanner, _) = scanner(cursors);
        let mut client = MockKavaClient::new(DEPUTY_A, 1_000);
        client.height_unavailable = true;

        assert!(scanner.scan_kava(&client, &[DEPUTY_A.to_string()]).await.is_err());
        assert!(client.queries.lock().is_empty());
    }

    // Deputies share one cursor per direction. Deputy B has a single short page,
    // but deputy A's full page keeps the shared scan going, so B is asked for
    // offset 100 as well (and answers empty).
    #[tokio::test]
    async fn test_kava_deputies_share_direction_cursor() {
        let cursors = Arc::new(CursorStore::new());
        let (scanner, _) = scanner(cursors.clone());
        let client = MockKavaClient::new(DEPUTY_A, 1_000)
            .with_swaps(DEPUTY_A, SwapDirection::Outgoing, open_swaps("aa", SwapDirection::Outgoing, 100, 10))
            .with_swaps(DEPUTY_B, SwapDirection::Outgoing, open_swaps("bb", SwapDirection::Outgoing, 10, 10));

        let deputies = vec![DEPUTY_A.to_string(), DEPUTY_B.to_string()];
        let ids = scanner.scan_kava(&client, &deputies).await.unwrap();

        assert_eq!(ids.len(), 110);
        let outgoing: Vec<_> = client
            .queries
            .lock()
            .iter()
            .filter(|(_, direction, _)| *direction == SwapDirection::Outgoing)
            .map(|(deputy, _, offset)| (deputy.clone(), *offset))
            .collect();
        assert_eq!(
            outgoing,
            vec![
                (DEPUTY_A.to_string(), 0),
                (DEPUTY_B.to_string(), 0),
                (DEPUTY_A.to_string(), 100),
                (DEPUTY_B.to_string(), 100),
            ]
        );
        assert_eq!(cursors.offset(CursorKey::kava(SwapDirection::Outgoing)), 0);
    }

    #[tokio::test]
    async fn test_kava_dedupes_swaps_seen_twice() {
        let cursors = Arc::new(CursorStore::new());
        let (scanner, _) = scanner(cursors);
        let shared = open_swaps("cc", SwapDirection::Incoming, 1, 10);
        let client = MockKavaClient::new(DEPUTY_A, 1_000)
            .with_swaps(DEPUTY_A, SwapDirection::Incoming, shared.clone())
            .with_swaps(DEPUTY_B, SwapDirection::Outgoing, shared);

        let deputies = vec![DEPUTY_A.to_string(), DEPUTY_B.to_string()];
        let ids = scanner.scan_kava(&client, &deputies).await.unwrap();
        assert_eq!(ids.len(), 1);
    }

    #[tokio::test]
    async fn test_rescan_without_chain_change_is_stable() {
        let cursors = Arc::new(CursorStore::new());
        let (scanner, _) = scanner(cursors.clone());
        let client = MockBnbClient::new(BNB_DEPUTY, expired_htlts(BNB_DEPUTY, 120));

        let first = scanner.scan_bnb(&client).await.unwrap();
        let second = scanner.scan_bnb(&client).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(cursors.offset(CursorKey::bnb()), 0);
    }
}
