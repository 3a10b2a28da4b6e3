//! Page-fix abstraction standing in for the host's buffer manager, treated
//! as an out-of-scope external collaborator: a page manager that mints and
//! frees page IDs and checkpoints their content. [`PagePin`] is the handle a
//! leaf page or overflow page is addressed by once allocated.

use crate::error::Result;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

pub type PageId = u32;

/// One page's worth of codec units. 1024 `u32` units is a 4 KiB page,
/// matching the Area/overflow-chain page size the on-disk layout assumes.
pub const PAGE_UNITS: usize = 1024;

/// Allocate/free/checkpoint contract the rest of the crate programs against.
/// One concrete in-memory implementation ([`InMemoryPageManager`]) is enough
/// to run the crate's own tests without a real host buffer manager.
pub trait PageManager: Send + Sync {
    fn allocate_page(&self) -> Result<PagePin>;
    fn free_page(&self, page_id: PageId) -> Result<()>;
    /// Local checkpoint: work since the last save is what `recover_all_pages`
    /// would discard. Called after each per-term update to bound the
    /// dirty-page footprint.
    fn save_all_pages(&self) -> Result<()>;
    /// Full confirm on success.
    fn flush_all_pages(&self) -> Result<()>;
    /// Discard staged changes since the last `save_all_pages`.
    fn recover_all_pages(&self) -> Result<()>;
}

struct Inner {
    pages: RwLock<HashMap<PageId, Arc<RwLock<Vec<u32>>>>>,
    checkpoint: RwLock<HashMap<PageId, Vec<u32>>>,
    next_id: AtomicU32,
}

/// In-memory reference [`PageManager`]: pages live in a map keyed by
/// [`PageId`], "disk" durability is simulated by a checkpoint snapshot taken
/// on `save_all_pages`/`flush_all_pages` and restored by
/// `recover_all_pages`.
#[derive(Clone)]
pub struct InMemoryPageManager {
    inner: Arc<Inner>,
}

impl InMemoryPageManager {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                pages: RwLock::new(HashMap::new()),
                checkpoint: RwLock::new(HashMap::new()),
                next_id: AtomicU32::new(1),
            }),
        }
    }
}

impl Default for InMemoryPageManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PageManager for InMemoryPageManager {
    fn allocate_page(&self) -> Result<PagePin> {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let data = Arc::new(RwLock::new(vec![0u32; PAGE_UNITS]));
        self.inner.pages.write().insert(id, data.clone());
        Ok(PagePin { id, data })
    }

    fn free_page(&self, page_id: PageId) -> Result<()> {
        self.inner.pages.write().remove(&page_id);
        self.inner.checkpoint.write().remove(&page_id);
        Ok(())
    }

    fn save_all_pages(&self) -> Result<()> {
        let pages = self.inner.pages.read();
        let mut checkpoint = self.inner.checkpoint.write();
        checkpoint.clear();
        for (id, data) in pages.iter() {
            checkpoint.insert(*id, data.read().clone());
        }
        Ok(())
    }

    fn flush_all_pages(&self) -> Result<()> {
        self.save_all_pages()
    }

    fn recover_all_pages(&self) -> Result<()> {
        let checkpoint = self.inner.checkpoint.read();
        let mut pages = self.inner.pages.write();
        pages.retain(|id, _| checkpoint.contains_key(id));
        for (id, snapshot) in checkpoint.iter() {
            let data = pages.entry(*id).or_insert_with(|| Arc::new(RwLock::new(Vec::new())));
            *data.write() = snapshot.clone();
        }
        Ok(())
    }
}

/// A minted page's buffer, addressable by ID and cloneable: every clone
/// shares the same underlying storage, the way a pointer to a resident page
/// would. This reference implementation mints a page once and keeps its
/// decoded content resident in the owning `ListManager`'s own cache rather
/// than re-reading it through this buffer on every access, so there is no
/// fix/unfix reference count to maintain here.
pub struct PagePin {
    id: PageId,
    data: Arc<RwLock<Vec<u32>>>,
}

impl Clone for PagePin {
    fn clone(&self) -> Self {
        Self { id: self.id, data: self.data.clone() }
    }
}

impl PagePin {
    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn read(&self) -> parking_lot::RwLockReadGuard<'_, Vec<u32>> {
        self.data.read()
    }

    pub fn write(&self) -> parking_lot::RwLockWriteGuard<'_, Vec<u32>> {
        self.data.write()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_clone_shares_the_same_backing_buffer() {
        let mgr = InMemoryPageManager::new();
        let pin = mgr.allocate_page().unwrap();
        let clone = pin.clone();
        pin.write()[0] = 42;
        assert_eq!(clone.read()[0], 42);
    }

    #[test]
    fn save_and_recover_round_trip() {
        let mgr = InMemoryPageManager::new();
        let pin = mgr.allocate_page().unwrap();
        pin.write()[0] = 1;
        mgr.save_all_pages().unwrap();
        pin.write()[0] = 2;
        mgr.recover_all_pages().unwrap();
        assert_eq!(pin.read()[0], 1);
    }

    #[test]
    fn recover_drops_pages_allocated_since_save() {
        let mgr = InMemoryPageManager::new();
        mgr.save_all_pages().unwrap();
        let pin = mgr.allocate_page().unwrap();
        let id = pin.id();
        drop(pin);
        mgr.recover_all_pages().unwrap();
        assert!(!mgr.inner.pages.read().contains_key(&id));
    }

    #[test]
    fn free_page_removes_it_from_future_checkpoints() {
        let mgr = InMemoryPageManager::new();
        let pin = mgr.allocate_page().unwrap();
        let id = pin.id();
        mgr.save_all_pages().unwrap();
        mgr.free_page(id).unwrap();
        assert!(!mgr.inner.checkpoint.read().contains_key(&id));
    }
}
