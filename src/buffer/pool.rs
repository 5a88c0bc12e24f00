//! Fixed-capacity buffer pool: a flat frame table scanned linearly for hits
//! and victim selection, guarded by a single mutex that also covers the
//! monotonic access counter.

use crate::error::{Result, StorageError};
use crate::page::Page;
use crate::storage::DiskManager;
use crate::types::PageId;
use parking_lot::Mutex;
use std::sync::Arc;

struct Frame {
    page: Option<Page>,
    page_id: PageId,
    last_access: u64,
    valid: bool,
    dirty: bool,
    pin_count: u16,
}

impl Frame {
    fn empty() -> Self {
        Self {
            page: None,
            page_id: PageId::INVALID,
            last_access: 0,
            valid: false,
            dirty: false,
            pin_count: 0,
        }
    }
}

struct PoolState {
    frames: Vec<Frame>,
    access_counter: u64,
}

impl PoolState {
    /// Scan for a valid frame already holding `page_id`.
    fn find_hit(&self, page_id: PageId) -> Option<usize> {
        self.frames
            .iter()
            .position(|f| f.valid && f.page_id == page_id)
    }

    /// First invalid slot if one exists, else the unpinned valid slot with
    /// the smallest `last_access`, ties broken by ascending index. `None`
    /// when every frame is pinned.
    fn find_victim(&self) -> Option<usize> {
        if let Some(idx) = self.frames.iter().position(|f| !f.valid) {
            return Some(idx);
        }
        self.frames
            .iter()
            .enumerate()
            .filter(|(_, f)| f.pin_count == 0)
            .min_by_key(|(idx, f)| (f.last_access, *idx))
            .map(|(idx, _)| idx)
    }
}

/// Handle returned by a successful fetch. Carries no data itself — access
/// goes back through the pool via `with`/`with_mut`, and release is
/// explicit via `unpin`: pinning does not end when the guard is dropped.
#[derive(Debug, Clone, Copy)]
pub struct PageGuard {
    page_id: PageId,
}

impl PageGuard {
    pub fn page_id(&self) -> PageId {
        self.page_id
    }
}

/// Buffer pool: fixed-capacity frame table over a page manager.
pub struct BufferPoolImpl {
    disk_manager: Arc<dyn DiskManager>,
    state: Mutex<PoolState>,
    capacity: usize,
}

impl BufferPoolImpl {
    pub fn new(disk_manager: Arc<dyn DiskManager>, capacity: usize) -> Self {
        let frames = (0..capacity).map(|_| Frame::empty()).collect();
        Self {
            disk_manager,
            state: Mutex::new(PoolState {
                frames,
                access_counter: 0,
            }),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn page_count(&self) -> usize {
        self.disk_manager.num_pages() as usize
    }

    /// Fetch `page_id`, pinning it. `Ok(None)` means the pool is saturated
    /// (every frame pinned); any other failure is a genuine I/O error from
    /// the page manager.
    pub fn get(&self, page_id: PageId) -> Result<Option<PageGuard>> {
        let mut state = self.state.lock();

        if let Some(idx) = state.find_hit(page_id) {
            state.access_counter += 1;
            let counter = state.access_counter;
            let frame = &mut state.frames[idx];
            frame.last_access = counter;
            frame.pin_count += 1;
            log::trace!("buffer pool: hit page {}", page_id);
            return Ok(Some(PageGuard { page_id }));
        }

        let Some(victim_idx) = state.find_victim() else {
            log::debug!("buffer pool: no victim available, all frames pinned");
            return Ok(None);
        };

        if state.frames[victim_idx].valid && state.frames[victim_idx].dirty {
            let victim_page = state.frames[victim_idx].page.as_mut().unwrap();
            self.disk_manager.write(victim_page)?;
            log::trace!(
                "buffer pool: wrote back dirty victim page {}",
                state.frames[victim_idx].page_id
            );
        }

        let page = match self.disk_manager.read(page_id) {
            Ok(page) => page,
            Err(e) => {
                state.frames[victim_idx] = Frame::empty();
                return Err(e);
            }
        };

        state.access_counter += 1;
        let counter = state.access_counter;
        state.frames[victim_idx] = Frame {
            page: Some(page),
            page_id,
            last_access: counter,
            valid: true,
            dirty: false,
            pin_count: 1,
        };
        log::trace!("buffer pool: faulted in page {} at frame {}", page_id, victim_idx);

        Ok(Some(PageGuard { page_id }))
    }

    /// Allocate and install a fresh page, pinned and dirty. `Ok(None)` if
    /// the pool is saturated (every frame pinned), the same sentinel
    /// convention `get` uses for its fault path.
    pub fn new_page(&self) -> Result<Option<(PageId, PageGuard)>> {
        let page = self.disk_manager.alloc()?;
        let page_id = page.page_id();

        let mut state = self.state.lock();
        let Some(idx) = state.find_victim() else {
            log::debug!("buffer pool: no victim available for new page {}", page_id);
            return Ok(None);
        };
        if state.frames[idx].valid && state.frames[idx].dirty {
            let victim_page = state.frames[idx].page.as_mut().unwrap();
            self.disk_manager.write(victim_page)?;
        }

        state.access_counter += 1;
        let counter = state.access_counter;
        state.frames[idx] = Frame {
            page: Some(page),
            page_id,
            last_access: counter,
            valid: true,
            dirty: true,
            pin_count: 1,
        };

        Ok(Some((page_id, PageGuard { page_id })))
    }

    /// Read access to the pinned page behind `guard`.
    pub fn with<R>(&self, guard: &PageGuard, f: impl FnOnce(&Page) -> R) -> Result<R> {
        let state = self.state.lock();
        let idx = state
            .find_hit(guard.page_id)
            .ok_or(StorageError::PageNotFound(guard.page_id))?;
        Ok(f(state.frames[idx].page.as_ref().unwrap()))
    }

    /// Write access to the pinned page behind `guard`; marks it dirty.
    pub fn with_mut<R>(&self, guard: &PageGuard, f: impl FnOnce(&mut Page) -> R) -> Result<R> {
        let mut state = self.state.lock();
        let idx = state
            .find_hit(guard.page_id)
            .ok_or(StorageError::PageNotFound(guard.page_id))?;
        state.frames[idx].dirty = true;
        Ok(f(state.frames[idx].page.as_mut().unwrap()))
    }

    /// Decrement the pin count for `page_id`. No-op if not pinned / not present.
    pub fn unpin(&self, page_id: PageId) {
        let mut state = self.state.lock();
        if let Some(idx) = state.find_hit(page_id) {
            let frame = &mut state.frames[idx];
            frame.pin_count = frame.pin_count.saturating_sub(1);
        }
    }

    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(idx) = state.find_hit(page_id) {
            if state.frames[idx].dirty {
                let page = state.frames[idx].page.as_mut().unwrap();
                self.disk_manager.write(page)?;
                state.frames[idx].dirty = false;
            }
        }
        Ok(())
    }

    pub fn flush_all(&self) -> Result<()> {
        let mut state = self.state.lock();
        for frame in state.frames.iter_mut() {
            if frame.valid && frame.dirty {
                let page = frame.page.as_mut().unwrap();
                self.disk_manager.write(page)?;
                frame.dirty = false;
            }
        }
        Ok(())
    }

    /// Allocate a page on disk without making it resident in the pool.
    #[cfg(test)]
    fn alloc_page_on_disk(&self) -> Result<PageId> {
        Ok(self.disk_manager.alloc()?.page_id())
    }
}
