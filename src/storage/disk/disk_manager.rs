use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;
use parking_lot::Mutex;

use crate::common::config::{PageId, DB_PAGE_SIZE};
use crate::common::exception::DiskError;
use crate::storage::page::page::PageData;

/// The `DiskIO` trait defines the basic operations for interacting with
/// disk storage: page-granular reads and writes.
pub trait DiskIO: Send + Sync {
    fn write_page(&self, page_id: PageId, page_data: &PageData) -> Result<(), DiskError>;
    fn read_page(&self, page_id: PageId, page_data: &mut PageData) -> Result<(), DiskError>;
}

/// File-backed disk manager. Pages live at `page_id * DB_PAGE_SIZE` in a
/// single database file.
pub struct FileDiskManager {
    file_name: String,
    db_io: Mutex<File>,
    num_writes: AtomicU64,
    num_reads: AtomicU64,
}

impl FileDiskManager {
    /// Opens (or creates) the database file at `db_file`.
    pub fn new(db_file: impl AsRef<Path>) -> Result<Self, DiskError> {
        let path = db_file.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)
            .map_err(|source| DiskError::Open {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Self {
            file_name: path.display().to_string(),
            db_io: Mutex::new(file),
            num_writes: AtomicU64::new(0),
            num_reads: AtomicU64::new(0),
        })
    }

    pub fn get_file_name(&self) -> &str {
        &self.file_name
    }

    pub fn get_num_writes(&self) -> u64 {
        self.num_writes.load(Ordering::Relaxed)
    }

    pub fn get_num_reads(&self) -> u64 {
        self.num_reads.load(Ordering::Relaxed)
    }

    /// Flushes buffered writes through to the file.
    pub fn shut_down(&self) -> Result<(), DiskError> {
        let mut db_io = self.db_io.lock();
        db_io.flush().map_err(|source| DiskError::Io {
            page_id: 0,
            source,
        })
    }
}

impl DiskIO for FileDiskManager {
    fn write_page(&self, page_id: PageId, page_data: &PageData) -> Result<(), DiskError> {
        let offset = page_id * DB_PAGE_SIZE as u64;
        let mut db_io = self.db_io.lock();
        db_io
            .seek(SeekFrom::Start(offset))
            .and_then(|_| db_io.write_all(page_data))
            .map_err(|source| DiskError::Io { page_id, source })?;
        self.num_writes.fetch_add(1, Ordering::Relaxed);
        debug!("wrote page {} at offset {}", page_id, offset);
        Ok(())
    }

    fn read_page(&self, page_id: PageId, page_data: &mut PageData) -> Result<(), DiskError> {
        let offset = page_id * DB_PAGE_SIZE as u64;
        let mut db_io = self.db_io.lock();
        db_io
            .seek(SeekFrom::Start(offset))
            .map_err(|source| DiskError::Io { page_id, source })?;
        // A short read means the page was never written; the tail stays zeroed.
        let mut total = 0;
        while total < DB_PAGE_SIZE {
            match db_io.read(&mut page_data[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(source) => return Err(DiskError::Io { page_id, source }),
            }
        }
        page_data[total..].fill(0);
        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
