use std::ops::Deref;

use parking_lot::{RawRwLock, RwLockReadGuard, RwLockWriteGuard};
use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};

use crate::common::types::{Page, PageId, PagePtr};
use crate::storage::buffer::error::BufferPoolError;
use crate::storage::buffer::manager::BufferPoolManager;

/// Owned shared latch on a page's data
pub type PageReadLatch = ArcRwLockReadGuard<RawRwLock, Page>;
/// Owned exclusive latch on a page's data
pub type PageWriteLatch = ArcRwLockWriteGuard<RawRwLock, Page>;

/// Scoped pin on a buffer pool page
///
/// The guard keeps the page pinned and unpins it exactly once, when the
/// guard is dropped, passing along whatever dirty state was recorded
/// through `write` or `mark_dirty`. Dropping the guard is the only way to
/// release the pin, so early returns and error paths unpin correctly.
pub struct PageGuard<'a> {
    bpm: &'a BufferPoolManager,
    page: PagePtr,
    page_id: PageId,
    is_dirty: bool,
}

impl<'a> PageGuard<'a> {
    pub(crate) fn new(bpm: &'a BufferPoolManager, page: PagePtr, page_id: PageId) -> Self {
        Self {
            bpm,
            page,
            page_id,
            is_dirty: false,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub(crate) fn page(&self) -> &PagePtr {
        &self.page
    }

    /// Latch the page for reading
    pub fn read(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read()
    }

    /// Latch the page for writing; the eventual unpin reports it dirty
    pub fn write(&mut self) -> RwLockWriteGuard<'_, Page> {
        self.is_dirty = true;
        self.page.write()
    }

    /// Record that the page was modified without latching it
    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }
}

impl Drop for PageGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.bpm.unpin_page(self.page_id, self.is_dirty) {
            log::warn!("failed to unpin page {} on guard drop: {}", self.page_id, e);
        }
    }
}

impl std::fmt::Debug for PageGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageGuard")
            .field("page_id", &self.page_id)
            .field("is_dirty", &self.is_dirty)
            .finish()
    }
}

/// Pinned page held under a shared latch
///
/// Field order releases the latch before the pin, so the guard never
/// holds a page latch across the unpin call.
pub struct ReadPageGuard<'a> {
    latch: PageReadLatch,
    guard: PageGuard<'a>,
}

impl ReadPageGuard<'_> {
    pub fn page_id(&self) -> PageId {
        self.guard.page_id()
    }

    /// The page's data bytes
    pub fn data(&self) -> &[u8] {
        &self.latch.data
    }
}

impl Deref for ReadPageGuard<'_> {
    type Target = Page;

    fn deref(&self) -> &Self::Target {
        &self.latch
    }
}

impl std::fmt::Debug for ReadPageGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadPageGuard")
            .field("page_id", &self.guard.page_id)
            .finish()
    }
}

/// Pinned page held under an exclusive latch
pub struct WritePageGuard<'a> {
    latch: PageWriteLatch,
    guard: PageGuard<'a>,
}

impl WritePageGuard<'_> {
    pub fn page_id(&self) -> PageId {
        self.guard.page_id()
    }

    pub fn data(&self) -> &[u8] {
        &self.latch.data
    }

    /// Mutable access to the page's data bytes; records the modification
    /// so the eventual unpin reports the page dirty
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.guard.mark_dirty();
        &mut self.latch.data
    }

    pub fn mark_dirty(&mut self) {
        self.guard.mark_dirty();
    }
}

impl Deref for WritePageGuard<'_> {
    type Target = Page;

    fn deref(&self) -> &Self::Target {
        &self.latch
    }
}

impl std::fmt::Debug for WritePageGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WritePageGuard")
            .field("page_id", &self.guard.page_id)
            .finish()
    }
}

impl BufferPoolManager {
    /// Fetch a page wrapped in a guard that unpins on drop
    pub fn fetch_page_guarded(&self, page_id: PageId) -> Result<PageGuard<'_>, BufferPoolError> {
        let page = self.fetch_page(page_id)?;
        Ok(PageGuard::new(self, page, page_id))
    }

    /// Fetch a page and take a shared latch on its data
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<ReadPageGuard<'_>, BufferPoolError> {
        let guard = self.fetch_page_guarded(page_id)?;
        let latch = guard.page().read_arc();
        Ok(ReadPageGuard { latch, guard })
    }

    /// Fetch a page and take an exclusive latch on its data
    ///
    /// Mutations go through `data_mut` (or `mark_dirty`) so the unpin
    /// records them.
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<WritePageGuard<'_>, BufferPoolError> {
        let guard = self.fetch_page_guarded(page_id)?;
        let latch = guard.page().write_arc();
        Ok(WritePageGuard { latch, guard })
    }

    /// Create a new page wrapped in a guard that unpins on drop
    pub fn new_page_guarded(&self) -> Result<PageGuard<'_>, BufferPoolError> {
        let (page, page_id) = self.new_page()?;
        Ok(PageGuard::new(self, page, page_id))
    }
}
