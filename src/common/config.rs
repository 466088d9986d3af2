pub const INVALID_PAGE_ID: PageId = u64::MAX; // invalid page id
pub const INVALID_TXN_ID: TxnId = u64::MAX; // invalid transaction id
pub const DB_PAGE_SIZE: usize = 4096; // size of a data page in bytes
pub const BUFFER_POOL_SIZE: usize = 50; // default size of the buffer pool
pub const DIRECTORY_ARRAY_SIZE: usize = 256; // max slots in a hash table directory page
pub const DIRECTORY_MAX_DEPTH: u32 = 8; // 2^8 == DIRECTORY_ARRAY_SIZE

pub type FrameId = usize; // frame index into the buffer pool
pub type PageId = u64; // page id type
pub type TxnId = u64; // transaction id type
pub type Oid = u64; // catalog object id type
