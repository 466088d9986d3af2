use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use log::error;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::config::{PageId, DB_PAGE_SIZE};

pub type PageData = [u8; DB_PAGE_SIZE];

/// Page is the basic unit of storage within the database system. It wraps
/// the actual data page held in main memory together with the book-keeping
/// used by the buffer pool manager: pin count, dirty flag and page id.
///
/// The data buffer sits behind a reader-writer lock which doubles as the
/// page latch: `read()`/`write()` are RLatch/WLatch, and dropping the guard
/// is the unlatch. The pin count keeps the frame from being evicted while
/// any latch can still be taken.
pub struct Page {
    /// The ID of this page.
    page_id: PageId,
    /// The pin count of this page.
    pin_count: AtomicU32,
    /// True if the page differs from its on-disk image.
    is_dirty: AtomicBool,
    /// The actual data stored within the page, guarded by the page latch.
    data: RwLock<Box<PageData>>,
}

impl Page {
    /// Constructor. Zeroes out the page data and pins the page once.
    pub fn new(page_id: PageId) -> Self {
        Self {
            page_id,
            pin_count: AtomicU32::new(1),
            is_dirty: AtomicBool::new(false),
            data: RwLock::new(Box::new([0; DB_PAGE_SIZE])),
        }
    }

    /// Returns the page id of this page.
    pub fn get_page_id(&self) -> PageId {
        self.page_id
    }

    /// Takes the page latch in read mode.
    pub fn read(&self) -> RwLockReadGuard<'_, Box<PageData>> {
        self.data.read()
    }

    /// Takes the page latch in write mode.
    pub fn write(&self) -> RwLockWriteGuard<'_, Box<PageData>> {
        self.data.write()
    }

    /// Returns the pin count of this page.
    pub fn get_pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::SeqCst)
    }

    /// Increments the pin count.
    pub(crate) fn incr_pin_count(&self) {
        self.pin_count.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrements the pin count, returning the new value.
    pub(crate) fn decr_pin_count(&self) -> u32 {
        let previous = self.pin_count.fetch_sub(1, Ordering::SeqCst);
        if previous == 0 {
            error!("pin count of page {} went below zero", self.page_id);
            self.pin_count.store(0, Ordering::SeqCst);
            return 0;
        }
        previous - 1
    }

    /// Returns true if the page is dirty.
    pub fn is_dirty(&self) -> bool {
        self.is_dirty.load(Ordering::SeqCst)
    }

    /// Sets the dirty flag of this page.
    pub fn set_dirty(&self, is_dirty: bool) {
        self.is_dirty.store(is_dirty, Ordering::SeqCst);
    }
}
