//! Memory accounting for marshalling storage
//!
//! Every owned [`Storage`](crate::storage::Storage) block reports its
//! allocation and release here. Counters are kept per thread: storage is
//! `!Send`, so a block is always released on the thread that allocated it.

use std::cell::Cell;

/// Counters for the current thread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AllocationStats {
    /// Owned blocks not yet released.
    pub live_allocations: usize,
    /// Bytes held by live blocks.
    pub live_bytes: usize,
    /// Blocks allocated since the thread started.
    pub total_allocations: usize,
}

thread_local! {
    static STATS: Cell<AllocationStats> = const {
        Cell::new(AllocationStats {
            live_allocations: 0,
            live_bytes: 0,
            total_allocations: 0,
        })
    };
}

/// Per-thread allocation tracker.
pub struct AllocationTracker;

impl AllocationTracker {
    /// Current counters for this thread.
    pub fn snapshot() -> AllocationStats {
        STATS.with(Cell::get)
    }

    pub fn live_allocations() -> usize {
        Self::snapshot().live_allocations
    }

    pub(crate) fn record_allocation(size: usize) {
        STATS.with(|stats| {
            let mut s = stats.get();
            s.live_allocations += 1;
            s.live_bytes = s.live_bytes.saturating_add(size);
            s.total_allocations += 1;
            stats.set(s);
        });
    }

    pub(crate) fn record_release(size: usize) {
        STATS.with(|stats| {
            let mut s = stats.get();
            debug_assert!(s.live_allocations > 0, "release without allocation");
            s.live_allocations = s.live_allocations.saturating_sub(1);
            s.live_bytes = s.live_bytes.saturating_sub(size);
            stats.set(s);
        });
    }
}
