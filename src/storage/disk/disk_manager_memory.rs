use parking_lot::RwLock;

use crate::common::config::{PageId, DB_PAGE_SIZE};
use crate::common::exception::DiskError;
use crate::storage::disk::disk_manager::DiskIO;
use crate::storage::page::page::PageData;

/// DiskManagerMemory replicates the utility of a disk manager on memory.
/// It is primarily used for data structure and concurrency testing.
pub struct DiskManagerMemory {
    memory: RwLock<Vec<u8>>,
}

impl DiskManagerMemory {
    pub fn new() -> Self {
        Self {
            memory: RwLock::new(Vec::new()),
        }
    }
}

impl Default for DiskManagerMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl DiskIO for DiskManagerMemory {
    fn write_page(&self, page_id: PageId, page_data: &PageData) -> Result<(), DiskError> {
        let offset = page_id as usize * DB_PAGE_SIZE;
        let mut memory = self.memory.write();
        if memory.len() < offset + DB_PAGE_SIZE {
            memory.resize(offset + DB_PAGE_SIZE, 0);
        }
        memory[offset..offset + DB_PAGE_SIZE].copy_from_slice(page_data);
        Ok(())
    }

    fn read_page(&self, page_id: PageId, page_data: &mut PageData) -> Result<(), DiskError> {
        let offset = page_id as usize * DB_PAGE_SIZE;
        let memory = self.memory.read();
        if memory.len() >= offset + DB_PAGE_SIZE {
            page_data.copy_from_slice(&memory[offset..offset + DB_PAGE_SIZE]);
        } else {
            page_data.fill(0);
        }
        Ok(())
    }
}
