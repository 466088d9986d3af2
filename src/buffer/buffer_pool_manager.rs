use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, error, warn};
use parking_lot::Mutex;

use crate::buffer::lru_replacer::LruReplacer;
use crate::common::config::{FrameId, PageId};
use crate::storage::disk::disk_manager::DiskIO;
use crate::storage::page::page::Page;
use crate::storage::page::page_guard::PageGuard;

struct BufferPoolInner {
    /// One slot per frame; `None` means the frame is on the free list.
    frames: Vec<Option<Arc<Page>>>,
    page_table: HashMap<PageId, FrameId>,
    free_list: Vec<FrameId>,
}

/// BufferPoolManager caches disk pages in a fixed set of in-memory frames.
///
/// Every successful `new_page`/`fetch_page` pins the page (pin count +1) and
/// must be paired with exactly one `unpin_page`; the guarded variants pair
/// them automatically. A page with a non-zero pin count is never evicted,
/// which is what keeps page latches safe across buffer pool activity.
pub struct BufferPoolManager {
    pool_size: usize,
    next_page_id: AtomicU64,
    disk: Arc<dyn DiskIO>,
    replacer: LruReplacer,
    inner: Mutex<BufferPoolInner>,
}

impl BufferPoolManager {
    /// Creates a new buffer pool with `pool_size` frames over `disk`.
    pub fn new(pool_size: usize, disk: Arc<dyn DiskIO>) -> Self {
        Self {
            pool_size,
            next_page_id: AtomicU64::new(0),
            disk,
            replacer: LruReplacer::new(pool_size),
            inner: Mutex::new(BufferPoolInner {
                frames: (0..pool_size).map(|_| None).collect(),
                page_table: HashMap::new(),
                free_list: (0..pool_size).rev().collect(),
            }),
        }
    }

    pub fn get_pool_size(&self) -> usize {
        self.pool_size
    }

    /// Creates a new page in the buffer pool, pinned once. Returns `None`
    /// when every frame is pinned.
    pub fn new_page(&self) -> Option<Arc<Page>> {
        let mut inner = self.inner.lock();
        let frame_id = self.acquire_frame(&mut inner)?;
        let page_id = self.next_page_id.fetch_add(1, Ordering::SeqCst);
        let page = Arc::new(Page::new(page_id));
        inner.frames[frame_id] = Some(Arc::clone(&page));
        inner.page_table.insert(page_id, frame_id);
        self.replacer.pin(frame_id);
        debug!("created page {} in frame {}", page_id, frame_id);
        Some(page)
    }

    /// Fetches the requested page, pinning it. Reads from disk when the
    /// page is not resident. Returns `None` when every frame is pinned.
    pub fn fetch_page(&self, page_id: PageId) -> Option<Arc<Page>> {
        let mut inner = self.inner.lock();
        if let Some(&frame_id) = inner.page_table.get(&page_id) {
            let page = inner.frames[frame_id]
                .as_ref()
                .expect("page table points at an occupied frame")
                .clone();
            page.incr_pin_count();
            self.replacer.pin(frame_id);
            return Some(page);
        }

        let frame_id = self.acquire_frame(&mut inner)?;
        let page = Arc::new(Page::new(page_id));
        {
            let mut data = page.write();
            if let Err(e) = self.disk.read_page(page_id, &mut data) {
                warn!("read of page {} failed, serving zeroed page: {}", page_id, e);
            }
        }
        inner.frames[frame_id] = Some(Arc::clone(&page));
        inner.page_table.insert(page_id, frame_id);
        self.replacer.pin(frame_id);
        Some(page)
    }

    /// Drops one pin on `page_id`, marking it dirty if `is_dirty`.
    /// Returns false if the page is not resident or not pinned.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let inner = self.inner.lock();
        let frame_id = match inner.page_table.get(&page_id) {
            Some(&frame_id) => frame_id,
            None => return false,
        };
        let page = match inner.frames[frame_id].as_ref() {
            Some(page) => page,
            None => return false,
        };
        if page.get_pin_count() == 0 {
            error!("unpin of page {} with zero pin count", page_id);
            return false;
        }
        if is_dirty {
            page.set_dirty(true);
        }
        if page.decr_pin_count() == 0 {
            self.replacer.unpin(frame_id);
        }
        true
    }

    /// Writes `page_id` back to disk (regardless of its dirty flag) and
    /// clears the dirty flag. Returns false if the page is not resident.
    pub fn flush_page(&self, page_id: PageId) -> bool {
        let inner = self.inner.lock();
        let frame_id = match inner.page_table.get(&page_id) {
            Some(&frame_id) => frame_id,
            None => return false,
        };
        let page = match inner.frames[frame_id].as_ref() {
            Some(page) => page,
            None => return false,
        };
        let data = page.read();
        if let Err(e) = self.disk.write_page(page_id, &data) {
            error!("flush of page {} failed: {}", page_id, e);
            return false;
        }
        page.set_dirty(false);
        true
    }

    /// Flushes every resident page.
    pub fn flush_all_pages(&self) {
        let page_ids: Vec<PageId> = {
            let inner = self.inner.lock();
            inner.page_table.keys().copied().collect()
        };
        for page_id in page_ids {
            self.flush_page(page_id);
        }
    }

    /// Removes `page_id` from the buffer pool and frees its frame.
    /// Returns true if the page was absent or removed, false if pinned.
    pub fn delete_page(&self, page_id: PageId) -> bool {
        let mut inner = self.inner.lock();
        let frame_id = match inner.page_table.get(&page_id) {
            Some(&frame_id) => frame_id,
            None => return true,
        };
        let pinned = match inner.frames[frame_id].as_ref() {
            Some(page) => page.get_pin_count() > 0,
            None => false,
        };
        if pinned {
            return false;
        }
        inner.page_table.remove(&page_id);
        inner.frames[frame_id] = None;
        self.replacer.pin(frame_id);
        inner.free_list.push(frame_id);
        debug!("deleted page {} from frame {}", page_id, frame_id);
        true
    }

    /// `fetch_page` wrapped in a guard that unpins on every exit path.
    pub fn fetch_page_guarded(&self, page_id: PageId) -> Option<PageGuard<'_>> {
        let page = self.fetch_page(page_id)?;
        Some(PageGuard::new(self, page))
    }

    /// `new_page` wrapped in a guard that unpins on every exit path.
    pub fn new_page_guarded(&self) -> Option<PageGuard<'_>> {
        let page = self.new_page()?;
        Some(PageGuard::new(self, page))
    }

    /// Finds a frame for a new resident page: the free list first, then an
    /// eviction victim, writing back the victim's contents if dirty.
    fn acquire_frame(&self, inner: &mut BufferPoolInner) -> Option<FrameId> {
        if let Some(frame_id) = inner.free_list.pop() {
            return Some(frame_id);
        }
        let frame_id = self.replacer.victim()?;
        if let Some(old_page) = inner.frames[frame_id].take() {
            if old_page.is_dirty() {
                let data = old_page.read();
                if let Err(e) = self.disk.write_page(old_page.get_page_id(), &data) {
                    error!(
                        "write-back of evicted page {} failed: {}",
                        old_page.get_page_id(),
                        e
                    );
                }
            }
            inner.page_table.remove(&old_page.get_page_id());
        }
        Some(frame_id)
    }
}
