use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;
use parking_lot::{Mutex, RwLock};

use crate::common::types::{Frame, FrameId, Page, PageId, PagePtr};
use crate::storage::disk::DiskManager;
use crate::storage::buffer::error::BufferPoolError;
use crate::storage::buffer::replacer::{AccessType, LruKReplacer};

/// Cache bookkeeping guarded by the pool mutex: page table, free list,
/// frame metadata, the replacer, and the page id counter. Disk I/O runs
/// while this is held, which serializes the cache but keeps victim frames
/// from racing with their own writeback.
struct PoolState {
    frames: Vec<Frame>,
    page_table: HashMap<PageId, FrameId>,
    free_list: VecDeque<FrameId>,
    replacer: LruKReplacer,
    next_page_id: PageId,
}

/// BufferPoolManager mediates every page read and write between access
/// methods and the disk, keeping hot pages resident and writing back
/// modified pages lazily.
pub struct BufferPoolManager {
    pool_size: usize,
    state: Mutex<PoolState>,
    disk_manager: Arc<DiskManager>,
}

impl BufferPoolManager {
    /// Create a buffer pool over its own disk manager for `db_path`
    pub fn new(
        pool_size: usize,
        replacer_k: usize,
        db_path: impl AsRef<Path>,
    ) -> Result<Self, BufferPoolError> {
        let disk_manager = Arc::new(DiskManager::new(db_path)?);
        Ok(Self::with_disk_manager(pool_size, replacer_k, disk_manager))
    }

    /// Create a buffer pool over an externally managed disk manager
    pub fn with_disk_manager(
        pool_size: usize,
        replacer_k: usize,
        disk_manager: Arc<DiskManager>,
    ) -> Self {
        let mut frames = Vec::with_capacity(pool_size);
        let mut free_list = VecDeque::with_capacity(pool_size);

        for i in 0..pool_size {
            let frame_id = i as FrameId;
            frames.push(Frame::new(frame_id, Arc::new(RwLock::new(Page::new(0)))));
            free_list.push_back(frame_id);
        }

        Self {
            pool_size,
            state: Mutex::new(PoolState {
                frames,
                page_table: HashMap::new(),
                free_list,
                replacer: LruKReplacer::new(pool_size, replacer_k),
                next_page_id: 0,
            }),
            disk_manager,
        }
    }

    /// Number of frames in the pool
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Create a new page, pinned in a frame
    ///
    /// The fresh page's bytes are zeroed; callers lay out their own
    /// content before unpinning dirty.
    pub fn new_page(&self) -> Result<(PagePtr, PageId), BufferPoolError> {
        let mut state = self.state.lock();
        let state = &mut *state;

        let frame_id = self.allocate_frame(state)?;
        let page_id = state.next_page_id;
        state.next_page_id += 1;

        let frame = &mut state.frames[frame_id as usize];
        frame.page_id = Some(page_id);
        frame.pin_count = 1;
        frame.is_dirty = false;
        {
            let mut page = frame.page.write();
            *page = Page::new(page_id);
        }
        let page_ptr = frame.page.clone();

        state.page_table.insert(page_id, frame_id);
        state.replacer.record_access(frame_id, AccessType::default())?;
        state.replacer.set_evictable(frame_id, false)?;

        Ok((page_ptr, page_id))
    }

    /// Fetch a page from the buffer pool or disk
    pub fn fetch_page(&self, page_id: PageId) -> Result<PagePtr, BufferPoolError> {
        self.fetch_page_with(page_id, AccessType::default())
    }

    /// Fetch a page, recording the kind of access for the replacer
    pub fn fetch_page_with(
        &self,
        page_id: PageId,
        access_type: AccessType,
    ) -> Result<PagePtr, BufferPoolError> {
        let mut state = self.state.lock();
        let state = &mut *state;

        // Resident page: pin it and touch the replacer, no I/O
        if let Some(&frame_id) = state.page_table.get(&page_id) {
            let frame = &mut state.frames[frame_id as usize];
            frame.pin_count += 1;
            let page_ptr = frame.page.clone();

            state.replacer.record_access(frame_id, access_type)?;
            state.replacer.set_evictable(frame_id, false)?;
            return Ok(page_ptr);
        }

        let frame_id = self.allocate_frame(state)?;

        let frame = &mut state.frames[frame_id as usize];
        {
            let mut page = frame.page.write();
            if let Err(e) = self.disk_manager.read_page(page_id, &mut page) {
                // Hand the frame back rather than leaking it
                drop(page);
                frame.page_id = None;
                frame.is_dirty = false;
                state.free_list.push_back(frame_id);
                return Err(e.into());
            }
        }
        frame.page_id = Some(page_id);
        frame.pin_count = 1;
        frame.is_dirty = false;
        let page_ptr = frame.page.clone();

        state.page_table.insert(page_id, frame_id);
        state.replacer.record_access(frame_id, access_type)?;
        state.replacer.set_evictable(frame_id, false)?;

        Ok(page_ptr)
    }

    /// Unpin a page, potentially marking it as dirty
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> Result<(), BufferPoolError> {
        self.unpin_page_with(page_id, is_dirty, AccessType::default())
    }

    /// Unpin a page, recording the kind of access that is ending
    pub fn unpin_page_with(
        &self,
        page_id: PageId,
        is_dirty: bool,
        _access_type: AccessType,
    ) -> Result<(), BufferPoolError> {
        let mut state = self.state.lock();
        let state = &mut *state;

        let frame_id = *state
            .page_table
            .get(&page_id)
            .ok_or(BufferPoolError::PageNotFound(page_id))?;

        let frame = &mut state.frames[frame_id as usize];
        if frame.pin_count == 0 {
            return Err(BufferPoolError::PageNotPinned(page_id));
        }
        frame.pin_count -= 1;

        // Sticky: a clean unpin never clears an earlier dirty mark
        if is_dirty {
            frame.is_dirty = true;
        }

        if frame.pin_count == 0 {
            state.replacer.set_evictable(frame_id, true)?;
        }

        Ok(())
    }

    /// Write a page's bytes to disk and clear its dirty flag
    ///
    /// The write is issued whether or not the page is dirty, so flushing
    /// doubles as a sync primitive.
    pub fn flush_page(&self, page_id: PageId) -> Result<(), BufferPoolError> {
        let mut state = self.state.lock();
        let state = &mut *state;

        let frame_id = *state
            .page_table
            .get(&page_id)
            .ok_or(BufferPoolError::PageNotFound(page_id))?;

        let frame = &mut state.frames[frame_id as usize];
        {
            let page = frame.page.read();
            self.disk_manager.write_page(&page)?;
        }
        frame.is_dirty = false;

        Ok(())
    }

    /// Flush every resident page to disk
    pub fn flush_all_pages(&self) -> Result<(), BufferPoolError> {
        let mut state = self.state.lock();
        let state = &mut *state;

        let frame_ids: Vec<FrameId> = state.page_table.values().copied().collect();
        for frame_id in frame_ids {
            let frame = &mut state.frames[frame_id as usize];
            {
                let page = frame.page.read();
                self.disk_manager.write_page(&page)?;
            }
            frame.is_dirty = false;
        }

        Ok(())
    }

    /// Delete a page from the buffer pool, discarding its contents
    ///
    /// Deleting a page that is not resident succeeds vacuously.
    pub fn delete_page(&self, page_id: PageId) -> Result<(), BufferPoolError> {
        let mut state = self.state.lock();
        let state = &mut *state;

        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return Ok(());
        };

        if state.frames[frame_id as usize].pin_count > 0 {
            return Err(BufferPoolError::PagePinned(page_id));
        }

        state.replacer.remove(frame_id)?;
        state.page_table.remove(&page_id);

        let frame = &mut state.frames[frame_id as usize];
        frame.page_id = None;
        frame.is_dirty = false;

        state.free_list.push_back(frame_id);
        self.disk_manager.deallocate_page(page_id);

        Ok(())
    }

    /// Allocate a frame, either from the free list or by page replacement
    ///
    /// An evicted frame's dirty bytes reach disk before the frame is
    /// handed out again.
    fn allocate_frame(&self, state: &mut PoolState) -> Result<FrameId, BufferPoolError> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Ok(frame_id);
        }

        let frame_id = state
            .replacer
            .evict()
            .ok_or(BufferPoolError::BufferPoolFull)?;

        let frame = &state.frames[frame_id as usize];
        if let Some(old_page_id) = frame.page_id {
            if frame.is_dirty {
                log::debug!("writing back dirty page {} from frame {}", old_page_id, frame_id);
                let page = frame.page.read();
                self.disk_manager.write_page(&page)?;
            }
            state.page_table.remove(&old_page_id);
        }

        Ok(frame_id)
    }
}
