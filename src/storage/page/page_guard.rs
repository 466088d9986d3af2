use std::cell::Cell;
use std::sync::Arc;

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::buffer::buffer_pool_manager::BufferPoolManager;
use crate::common::config::PageId;
use crate::storage::page::page::{Page, PageData};

/// Scoped wrapper around a pinned page: unpins on drop, on every exit path.
///
/// Latch guards obtained through `read()`/`write()` borrow the `PageGuard`,
/// so the latch is always released before the unpin runs.
pub struct PageGuard<'a> {
    bpm: &'a BufferPoolManager,
    page: Arc<Page>,
    dirty: Cell<bool>,
}

impl<'a> PageGuard<'a> {
    pub fn new(bpm: &'a BufferPoolManager, page: Arc<Page>) -> Self {
        Self {
            bpm,
            page,
            dirty: Cell::new(false),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page.get_page_id()
    }

    /// Takes the page latch in read mode.
    pub fn read(&self) -> RwLockReadGuard<'_, Box<PageData>> {
        self.page.read()
    }

    /// Takes the page latch in write mode.
    pub fn write(&self) -> RwLockWriteGuard<'_, Box<PageData>> {
        self.page.write()
    }

    /// Records that the page was modified; the unpin will carry the dirty
    /// flag to the buffer pool.
    pub fn mark_dirty(&self) {
        self.dirty.set(true);
    }
}

impl Drop for PageGuard<'_> {
    fn drop(&mut self) {
        self.bpm.unpin_page(self.page.get_page_id(), self.dirty.get());
    }
}
