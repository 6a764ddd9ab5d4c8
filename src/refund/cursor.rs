// Cursor Store - per (chain, direction) pagination offsets
//
// Offsets live for the process lifetime only. A scan borrows its cursor
// through a `ScanSession`: the session advances the stored offset page by
// page and puts the pre-scan value back when it ends, whether the scan ran
// out of pages, hit a query error, or was cancelled.

use parking_lot::Mutex;
use std::collections::BTreeMap;

use crate::chains::models::{Chain, SwapDirection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CursorKey {
    pub chain: Chain,
    /// `None` for single-direction chains
    pub direction: Option<SwapDirection>,
}

impl CursorKey {
    pub fn bnb() -> Self {
        Self {
            chain: Chain::Bnb,
            direction: None,
        }
    }

    pub fn kava(direction: SwapDirection) -> Self {
        Self {
            chain: Chain::Kava,
            direction: Some(direction),
        }
    }
}

/// Observable cursor state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub chain: Chain,
    pub direction: Option<SwapDirection>,
    pub offset: u64,
    /// Deepest offset the last scan requested
    pub high_water: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct CursorState {
    offset: u64,
    high_water: u64,
}

#[derive(Debug, Default)]
pub struct CursorStore {
    cursors: Mutex<BTreeMap<CursorKey, CursorState>>,
}

impl CursorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed cursors from externally supplied values
    pub fn with_offsets(initial: impl IntoIterator<Item = (CursorKey, u64)>) -> Self {
        let cursors = initial
            .into_iter()
            .map(|(key, offset)| {
                (
                    key,
                    CursorState {
                        offset,
                        high_water: offset,
                    },
                )
            })
            .collect();

        Self {
            cursors: Mutex::new(cursors),
        }
    }

    pub fn offset(&self, key: CursorKey) -> u64 {
        self.cursors
            .lock()
            .get(&key)
            .map(|state| state.offset)
            .unwrap_or(0)
    }

    /// Start a scan over `key`, pinning its current offset as the reset point
    pub fn begin(&self, key: CursorKey) -> ScanSession<'_> {
        let start = self.offset(key);
        ScanSession {
            store: self,
            key,
            start,
            current: start,
        }
    }

    pub fn snapshot(&self) -> Vec<PageCursor> {
        self.cursors
            .lock()
            .iter()
            .map(|(key, state)| PageCursor {
                chain: key.chain,
                direction: key.direction,
                offset: state.offset,
                high_water: state.high_water,
            })
            .collect()
    }

    fn store(&self, key: CursorKey, offset: u64) {
        let mut cursors = self.cursors.lock();
        let state = cursors.entry(key).or_default();
        state.offset = offset;
    }

    fn finish(&self, key: CursorKey, start: u64, reached: u64) {
        let mut cursors = self.cursors.lock();
        let state = cursors.entry(key).or_default();
        state.offset = start;
        state.high_water = reached;
    }
}

/// A single scan's hold on one cursor. Dropping it restores the pre-scan offset.
#[derive(Debug)]
pub struct ScanSession<'a> {
    store: &'a CursorStore,
    key: CursorKey,
    start: u64,
    current: u64,
}

impl ScanSession<'_> {
    pub fn offset(&self) -> u64 {
        self.current
    }

    /// Move past a full page. Offsets never go backwards inside a session.
    pub fn advance(&mut self, by: u64) {
        self.current = self.current.saturating_add(by);
        self.store.store(self.key, self.current);
    }
}

impl Drop for ScanSession<'_> {
    fn drop(&mut self) {
        self.store.finish(self.key, self.start, self.current);
    }
}
