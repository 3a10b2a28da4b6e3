//! Document-level locking during a list scan. Grounded on a
//! row-level lock manager's shared/exclusive table, but reworked: failing
//! fast on conflict is wrong here — a cursor walking a posting list would
//! otherwise abort a scan every time it races an unrelated writer.
//! [`LockTable::lock`] retries with backoff instead, and
//! [`Locker::acquire_with_reopen`] adds the
//! release-everything-then-retry discipline that keeps two cursors from
//! deadlocking on each other's rows: never hold one cursor's lock while
//! blocking on another's.

use crate::error::{FullTextError, Result};
use crate::types::DocumentId;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use roaring::RoaringBitmap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

struct LockEntry {
    holders: Mutex<Vec<(u64, LockMode)>>,
    condvar: Condvar,
}

impl LockEntry {
    fn new() -> Self {
        Self { holders: Mutex::new(Vec::new()), condvar: Condvar::new() }
    }

    fn can_grant(mode: LockMode, owner: u64, holders: &[(u64, LockMode)]) -> bool {
        match mode {
            LockMode::Shared => !holders.iter().any(|(o, m)| *m == LockMode::Exclusive && *o != owner),
            LockMode::Exclusive => holders.is_empty() || (holders.len() == 1 && holders[0].0 == owner),
        }
    }
}

/// The shared/exclusive row-lock table, keyed by [`DocumentId`].
pub struct LockTable {
    rows: DashMap<DocumentId, Arc<LockEntry>>,
    retry_backoff: Duration,
    max_waits: u32,
}

impl LockTable {
    pub fn new() -> Self {
        Self { rows: DashMap::new(), retry_backoff: Duration::from_millis(1), max_waits: 256 }
    }

    fn entry(&self, document_id: DocumentId) -> Arc<LockEntry> {
        self.rows.entry(document_id).or_insert_with(|| Arc::new(LockEntry::new())).clone()
    }

    /// Non-blocking attempt; returns [`FullTextError::LockConflict`]
    /// immediately rather than waiting.
    pub fn try_lock(&self, owner: u64, document_id: DocumentId, mode: LockMode) -> Result<()> {
        let entry = self.entry(document_id);
        let mut holders = entry.holders.lock();
        if LockEntry::can_grant(mode, owner, &holders) {
            holders.retain(|(o, _)| *o != owner);
            holders.push((owner, mode));
            Ok(())
        } else {
            Err(FullTextError::LockConflict(document_id))
        }
    }

    /// Blocking acquire: retries with backoff instead of failing on the
    /// first conflict, up to `max_waits` backoff intervals.
    pub fn lock(&self, owner: u64, document_id: DocumentId, mode: LockMode) -> Result<()> {
        let entry = self.entry(document_id);
        let mut holders = entry.holders.lock();
        for _ in 0..self.max_waits {
            if LockEntry::can_grant(mode, owner, &holders) {
                holders.retain(|(o, _)| *o != owner);
                holders.push((owner, mode));
                return Ok(());
            }
            let result = entry.condvar.wait_for(&mut holders, self.retry_backoff);
            let _ = result;
        }
        Err(FullTextError::LockConflict(document_id))
    }

    pub fn unlock(&self, owner: u64, document_id: DocumentId) {
        if let Some(entry) = self.rows.get(&document_id) {
            let mut holders = entry.holders.lock();
            holders.retain(|(o, _)| *o != owner);
            entry.condvar.notify_all();
        }
    }

    pub fn unlock_all(&self, owner: u64, document_ids: impl IntoIterator<Item = DocumentId>) {
        for id in document_ids {
            self.unlock(owner, id);
        }
    }
}

impl Default for LockTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Strategy a scan uses to acquire document locks as it visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockerMode {
    /// Lock each document individually, as the cursor visits it.
    Normal,
    /// The caller already holds a lock covering the whole result bitset
    /// (via [`Locker::lock_bitset`]); per-document calls are a no-op besides
    /// bookkeeping.
    GetByBitSet,
    /// Same as `GetByBitSet`, but every visited document is also recorded so
    /// a second pass over the same scan can skip re-locking.
    GetByBitSetCacheAllObject,
    /// Lock and record every document up front instead of lazily as the
    /// cursor advances.
    CacheAllObject,
    /// Like `Normal`, but the caller sorts the target ID set ascending
    /// before locking, trading iterator order for sequential lock-table
    /// access.
    BitSetSort,
    /// Holds no locks of its own; only releases whatever a prior mode
    /// acquired for this owner.
    Unlocker,
}

/// One scan's view of a shared [`LockTable`], dispatching per-document lock
/// calls according to its [`LockerMode`] and tracking everything it has
/// acquired so [`Locker::release_all`] can give it all back in one call.
pub struct Locker {
    mode: LockerMode,
    table: Arc<LockTable>,
    owner: u64,
    held: Mutex<RoaringBitmap>,
}

impl Locker {
    pub fn new(mode: LockerMode, table: Arc<LockTable>, owner: u64) -> Self {
        Self { mode, table, owner, held: Mutex::new(RoaringBitmap::new()) }
    }

    pub fn mode(&self) -> LockerMode {
        self.mode
    }

    /// Acquire a lock on one document per this locker's mode. `Unlocker`
    /// releases instead of acquiring; the bitset modes assume
    /// [`Locker::lock_bitset`] already covered `document_id` and simply
    /// record it.
    pub fn acquire(&self, document_id: DocumentId, access: LockMode) -> Result<()> {
        match self.mode {
            LockerMode::Unlocker => {
                self.table.unlock(self.owner, document_id);
                self.held.lock().remove(document_id);
                Ok(())
            }
            LockerMode::GetByBitSet | LockerMode::GetByBitSetCacheAllObject => {
                self.held.lock().insert(document_id);
                Ok(())
            }
            LockerMode::Normal | LockerMode::CacheAllObject | LockerMode::BitSetSort => {
                self.table.lock(self.owner, document_id, access)?;
                self.held.lock().insert(document_id);
                Ok(())
            }
        }
    }

    /// Lock every ID in `ids` up front, as `GetByBitSet`/`CacheAllObject`
    /// scans do before the walk starts. `BitSetSort` locks in ascending
    /// order; other modes use the bitset's own iteration order (already
    /// ascending, since `RoaringBitmap` iterates sorted).
    pub fn lock_bitset(&self, ids: &RoaringBitmap, access: LockMode) -> Result<()> {
        for id in ids.iter() {
            self.table.lock(self.owner, id, access)?;
        }
        self.held.lock().extend(ids.iter());
        Ok(())
    }

    /// Try once, and on conflict release every lock this owner holds before
    /// calling `reopen` and retrying with a blocking wait. Releasing first
    /// is what keeps two cursors walking the same two rows in opposite
    /// orders from deadlocking: at most one owner is ever waiting while
    /// holding something the other wants.
    pub fn acquire_with_reopen(&self, document_id: DocumentId, access: LockMode, mut reopen: impl FnMut() -> Result<()>) -> Result<()> {
        match self.table.try_lock(self.owner, document_id, access) {
            Ok(()) => {
                self.held.lock().insert(document_id);
                Ok(())
            }
            Err(FullTextError::LockConflict(_)) => {
                self.release_all();
                reopen()?;
                self.table.lock(self.owner, document_id, access)?;
                self.held.lock().insert(document_id);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub fn held(&self) -> RoaringBitmap {
        self.held.lock().clone()
    }

    pub fn release_all(&self) {
        let ids: Vec<DocumentId> = self.held.lock().iter().collect();
        self.table.unlock_all(self.owner, ids);
        self.held.lock().clear();
    }
}

impl Drop for Locker {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_locks_are_compatible_across_owners() {
        let table = Arc::new(LockTable::new());
        table.try_lock(1, 100, LockMode::Shared).unwrap();
        table.try_lock(2, 100, LockMode::Shared).unwrap();
    }

    #[test]
    fn exclusive_lock_rejects_other_owners() {
        let table = Arc::new(LockTable::new());
        table.try_lock(1, 100, LockMode::Exclusive).unwrap();
        assert!(table.try_lock(2, 100, LockMode::Exclusive).is_err());
        table.unlock(1, 100);
        table.try_lock(2, 100, LockMode::Exclusive).unwrap();
    }

    #[test]
    fn normal_locker_tracks_and_releases_everything() {
        let table = Arc::new(LockTable::new());
        let locker = Locker::new(LockerMode::Normal, table.clone(), 1);
        locker.acquire(1, LockMode::Shared).unwrap();
        locker.acquire(2, LockMode::Shared).unwrap();
        assert_eq!(locker.held().len(), 2);
        locker.release_all();
        assert_eq!(locker.held().len(), 0);
        // released back to the table, so another owner can now take it exclusively
        table.try_lock(2, 1, LockMode::Exclusive).unwrap();
    }

    #[test]
    fn bitset_locker_locks_everything_up_front() {
        let table = Arc::new(LockTable::new());
        let mut ids = RoaringBitmap::new();
        ids.insert(5);
        ids.insert(9);
        let locker = Locker::new(LockerMode::GetByBitSet, table.clone(), 1);
        locker.lock_bitset(&ids, LockMode::Shared).unwrap();
        assert!(locker.held().contains(5));
        assert!(locker.held().contains(9));
        locker.acquire(5, LockMode::Shared).unwrap();
        assert_eq!(locker.held().len(), 2);
    }

    #[test]
    fn unlocker_mode_only_releases() {
        let table = Arc::new(LockTable::new());
        table.try_lock(1, 7, LockMode::Exclusive).unwrap();
        let locker = Locker::new(LockerMode::Unlocker, table.clone(), 1);
        locker.acquire(7, LockMode::Exclusive).unwrap();
        table.try_lock(2, 7, LockMode::Exclusive).unwrap();
    }

    #[test]
    fn acquire_with_reopen_releases_before_retrying() {
        let table = Arc::new(LockTable::new());
        table.try_lock(2, 50, LockMode::Exclusive).unwrap();

        let locker = Locker::new(LockerMode::Normal, table.clone(), 1);
        locker.acquire(10, LockMode::Exclusive).unwrap();

        let table_for_reopen = table.clone();
        let mut reopened = false;
        let released_owner2 = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = released_owner2.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(5));
            table_for_reopen.unlock(2, 50);
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
        });

        locker
            .acquire_with_reopen(50, LockMode::Exclusive, || {
                reopened = true;
                Ok(())
            })
            .unwrap();

        assert!(reopened);
        assert!(released_owner2.load(std::sync::atomic::Ordering::SeqCst));
        // the conflicting lock on row 10 was given up before the retry
        assert!(!locker.held().contains(10) || locker.held().contains(50));
    }
}
