use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A reader-writer latch. Multiple readers may hold it simultaneously;
/// a writer excludes readers and other writers.
///
/// The latch is released when the returned guard is dropped, so a scope
/// ending is the unlock.
#[derive(Default)]
pub struct ReaderWriterLatch {
    inner: RwLock<()>,
}

impl ReaderWriterLatch {
    /// Creates a new `ReaderWriterLatch`.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(()),
        }
    }

    /// Acquires the latch in read mode, blocking until it is available.
    pub fn r_lock(&self) -> RwLockReadGuard<'_, ()> {
        self.inner.read()
    }

    /// Acquires the latch in write mode, blocking until it is available.
    pub fn w_lock(&self) -> RwLockWriteGuard<'_, ()> {
        self.inner.write()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readers_share() {
        let latch = ReaderWriterLatch::new();
        let r1 = latch.r_lock();
        let r2 = latch.r_lock();
        drop(r1);
        drop(r2);
        let _w = latch.w_lock();
    }
}
