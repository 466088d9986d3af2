use std::marker::PhantomData;
use std::sync::Arc;

use log::debug;

use crate::buffer::buffer_pool_manager::BufferPoolManager;
use crate::common::config::{PageId, DIRECTORY_ARRAY_SIZE};
use crate::common::rwlatch::ReaderWriterLatch;
use crate::concurrency::transaction::Transaction;
use crate::container::hash_function::HashFunction;
use crate::storage::index::codec::Storable;
use crate::storage::index::int_comparator::Comparator;
use crate::storage::page::hash_table_bucket_page::{bucket_array_size, HashTableBucketPage};
use crate::storage::page::hash_table_directory_page::HashTableDirectoryPage;
use crate::storage::page::page_guard::PageGuard;

/// A concurrent extendible hash table backed by the buffer pool. Supports
/// non-unique keys; exact key/value duplicates are rejected. The table
/// grows by splitting buckets (doubling the directory when a full bucket
/// is already at global depth) and shrinks by opportunistically merging
/// empty buckets with their split image.
///
/// Latch discipline: a table-level reader-writer latch arbitrates between
/// plain reads/inserts (read mode) and structural changes (write mode);
/// each page is additionally guarded by its own latch taken after the
/// fetch and released before the unpin. The only write page latch taken
/// under the read-mode table latch is the insert into a non-full bucket.
pub struct ExtendibleHashTable<K, V, C, H> {
    index_name: String,
    bpm: Arc<BufferPoolManager>,
    comparator: C,
    hash_fn: H,
    table_latch: ReaderWriterLatch,
    directory_page_id: PageId,
    bucket_max_size: u16,
    _marker: PhantomData<(K, V)>,
}

impl<K, V, C, H> ExtendibleHashTable<K, V, C, H>
where
    K: Storable,
    V: Storable + PartialEq,
    C: Comparator<K>,
    H: HashFunction<K>,
{
    /// Creates a table whose buckets hold as many pairs as fit a page.
    pub fn new(name: &str, bpm: Arc<BufferPoolManager>, comparator: C, hash_fn: H) -> Option<Self> {
        let bucket_max_size = bucket_array_size::<K, V>() as u16;
        Self::with_bucket_size(name, bpm, comparator, hash_fn, bucket_max_size)
    }

    /// Creates a table with an explicit bucket capacity. The directory
    /// starts at global depth 1 with two empty buckets of local depth 1.
    pub fn with_bucket_size(
        name: &str,
        bpm: Arc<BufferPoolManager>,
        comparator: C,
        hash_fn: H,
        bucket_max_size: u16,
    ) -> Option<Self> {
        let directory_page_id = {
            let directory_guard = bpm.new_page_guarded()?;
            let bucket_0_guard = bpm.new_page_guarded()?;
            let bucket_1_guard = bpm.new_page_guarded()?;

            for bucket_guard in [&bucket_0_guard, &bucket_1_guard] {
                let mut data = bucket_guard.write();
                HashTableBucketPage::<_, K, V>::view(&mut data[..]).init(bucket_max_size);
                drop(data);
                bucket_guard.mark_dirty();
            }

            let mut data = directory_guard.write();
            let mut directory = HashTableDirectoryPage::view(&mut data[..]);
            directory.init();
            directory.set_bucket_page_id(0, bucket_0_guard.page_id());
            directory.set_local_depth(0, 1);
            directory.set_bucket_page_id(1, bucket_1_guard.page_id());
            directory.set_local_depth(1, 1);
            drop(data);
            directory_guard.mark_dirty();
            directory_guard.page_id()
        };
        debug!(
            "created extendible hash table {} with directory page {}",
            name, directory_page_id
        );

        Some(Self {
            index_name: name.to_string(),
            bpm,
            comparator,
            hash_fn,
            table_latch: ReaderWriterLatch::new(),
            directory_page_id,
            bucket_max_size,
            _marker: PhantomData,
        })
    }

    pub fn get_index_name(&self) -> &str {
        &self.index_name
    }

    /// Downcast of the 64-bit key hash used for directory indexing.
    fn hash(&self, key: &K) -> u32 {
        self.hash_fn.get_hash(key) as u32
    }

    fn key_to_directory_index<D: AsRef<[u8]>>(
        &self,
        key: &K,
        directory: &HashTableDirectoryPage<D>,
    ) -> usize {
        (self.hash(key) & directory.global_depth_mask()) as usize
    }

    /// Routes `key` to its bucket page under the current directory,
    /// unpinning the directory before returning.
    fn key_to_bucket_page_id(&self, key: &K) -> Option<(usize, PageId)> {
        let directory_guard = self.bpm.fetch_page_guarded(self.directory_page_id)?;
        let data = directory_guard.read();
        let directory = HashTableDirectoryPage::view(&data[..]);
        let bucket_idx = self.key_to_directory_index(key, &directory);
        Some((bucket_idx, directory.bucket_page_id(bucket_idx)))
    }

    /// Collects every value stored under `key` into `result`.
    /// Returns true if at least one match was found.
    pub fn get_value(
        &self,
        _transaction: Option<&Transaction>,
        key: &K,
        result: &mut Vec<V>,
    ) -> bool {
        let _table_guard = self.table_latch.r_lock();
        let (_, bucket_page_id) = match self.key_to_bucket_page_id(key) {
            Some(route) => route,
            None => return false,
        };
        let bucket_guard = match self.bpm.fetch_page_guarded(bucket_page_id) {
            Some(guard) => guard,
            None => return false,
        };
        let data = bucket_guard.read();
        let bucket = HashTableBucketPage::<_, K, V>::view(&data[..]);
        bucket.get_value(key, &self.comparator, result)
    }

    /// Inserts a key/value pair. Returns false if the exact pair is
    /// already present, or if the directory is saturated and cannot grow
    /// to make room.
    pub fn insert(&self, _transaction: Option<&Transaction>, key: &K, value: &V) -> bool {
        loop {
            // Optimistic fast path: table latch in read mode, write latch
            // only on the target bucket page.
            let fast_path_result = {
                let _table_guard = self.table_latch.r_lock();
                let (_, bucket_page_id) = match self.key_to_bucket_page_id(key) {
                    Some(route) => route,
                    None => return false,
                };
                let bucket_guard = match self.bpm.fetch_page_guarded(bucket_page_id) {
                    Some(guard) => guard,
                    None => return false,
                };
                let mut result = None;
                {
                    let mut data = bucket_guard.write();
                    let mut bucket = HashTableBucketPage::<_, K, V>::view(&mut data[..]);
                    if !bucket.is_full() {
                        result = Some(bucket.insert(key, value, &self.comparator));
                    }
                }
                if result == Some(true) {
                    bucket_guard.mark_dirty();
                }
                result
            };
            if let Some(inserted) = fast_path_result {
                return inserted;
            }

            // The bucket was full: retry under the table write latch and
            // split if it is still full.
            let saturated = {
                let _table_guard = self.table_latch.w_lock();
                let directory_guard = match self.bpm.fetch_page_guarded(self.directory_page_id) {
                    Some(guard) => guard,
                    None => return false,
                };
                let (bucket_idx, bucket_page_id) = {
                    let data = directory_guard.read();
                    let directory = HashTableDirectoryPage::view(&data[..]);
                    let bucket_idx = self.key_to_directory_index(key, &directory);
                    (bucket_idx, directory.bucket_page_id(bucket_idx))
                };
                let bucket_guard = match self.bpm.fetch_page_guarded(bucket_page_id) {
                    Some(guard) => guard,
                    None => return false,
                };
                let still_full = {
                    let data = bucket_guard.read();
                    HashTableBucketPage::<_, K, V>::view(&data[..]).is_full()
                };
                // Another thread may have drained the bucket between the
                // two latch acquisitions; in that case just retry.
                still_full && !self.split(&directory_guard, &bucket_guard, bucket_idx)
            };
            if saturated {
                debug!(
                    "{}: directory saturated at {} slots, insert rejected",
                    self.index_name, DIRECTORY_ARRAY_SIZE
                );
                return false;
            }
        }
    }

    /// Splits the full bucket at directory slot `bucket_idx`, doubling the
    /// directory first when the bucket is already at global depth. Must be
    /// called with the table latch held in write mode. Returns false when
    /// the directory cannot grow any further.
    fn split(
        &self,
        directory_guard: &PageGuard<'_>,
        bucket_guard: &PageGuard<'_>,
        bucket_idx: usize,
    ) -> bool {
        let bucket_page_id = bucket_guard.page_id();
        let mut dir_data = directory_guard.write();
        let mut directory = HashTableDirectoryPage::view(&mut dir_data[..]);

        if directory.local_depth(bucket_idx) as u32 == directory.global_depth() {
            let old_size = directory.size();
            let new_size = old_size * 2;
            if new_size > DIRECTORY_ARRAY_SIZE {
                return false;
            }
            directory.incr_global_depth();
            for new_idx in old_size..new_size {
                directory.set_bucket_page_id(new_idx, directory.bucket_page_id(new_idx - old_size));
                directory.set_local_depth(new_idx, directory.local_depth(new_idx - old_size));
            }
            debug!(
                "{}: directory doubled to global depth {}",
                self.index_name,
                directory.global_depth()
            );
        }

        let new_bucket_guard = match self.bpm.new_page_guarded() {
            Some(guard) => guard,
            None => return false,
        };
        {
            let mut data = new_bucket_guard.write();
            HashTableBucketPage::<_, K, V>::view(&mut data[..]).init(self.bucket_max_size);
        }

        directory.incr_local_depth(bucket_idx);
        let local_depth = directory.local_depth(bucket_idx);
        let local_depth_mask = directory.local_depth_mask(bucket_idx);
        for idx in 0..directory.size() {
            if directory.bucket_page_id(idx) == bucket_page_id {
                if (idx as u32 & local_depth_mask) != (bucket_idx as u32 & local_depth_mask) {
                    directory.set_bucket_page_id(idx, new_bucket_guard.page_id());
                }
                directory.set_local_depth(idx, local_depth);
            }
        }
        debug!(
            "{}: split bucket page {} into {} at local depth {}",
            self.index_name,
            bucket_page_id,
            new_bucket_guard.page_id(),
            local_depth
        );

        // Rehash every live pair under the new directory and move the ones
        // that no longer route to the old bucket. A split may legally leave
        // one of the two buckets empty.
        {
            let mut old_data = bucket_guard.write();
            let mut new_data = new_bucket_guard.write();
            let mut old_bucket = HashTableBucketPage::<_, K, V>::view(&mut old_data[..]);
            let mut new_bucket = HashTableBucketPage::<_, K, V>::view(&mut new_data[..]);
            for slot in 0..old_bucket.max_size() {
                if !old_bucket.is_readable(slot) {
                    continue;
                }
                let slot_key = old_bucket.key_at(slot);
                let target_idx = self.key_to_directory_index(&slot_key, &directory);
                if directory.bucket_page_id(target_idx) != bucket_page_id {
                    let slot_value = old_bucket.value_at(slot);
                    new_bucket.insert(&slot_key, &slot_value, &self.comparator);
                    old_bucket.remove_at(slot);
                }
            }
        }
        bucket_guard.mark_dirty();
        new_bucket_guard.mark_dirty();
        directory_guard.mark_dirty();
        true
    }

    /// Removes a key/value pair. Returns true if the pair was present.
    /// When the removal empties the bucket, attempts an opportunistic
    /// merge with the bucket's split image.
    pub fn remove(&self, _transaction: Option<&Transaction>, key: &K, value: &V) -> bool {
        let removed;
        let emptied;
        {
            let _table_guard = self.table_latch.r_lock();
            let (_, bucket_page_id) = match self.key_to_bucket_page_id(key) {
                Some(route) => route,
                None => return false,
            };
            let bucket_guard = match self.bpm.fetch_page_guarded(bucket_page_id) {
                Some(guard) => guard,
                None => return false,
            };
            {
                let mut data = bucket_guard.write();
                let mut bucket = HashTableBucketPage::<_, K, V>::view(&mut data[..]);
                removed = bucket.remove(key, value, &self.comparator);
                emptied = bucket.is_empty();
            }
            if removed {
                bucket_guard.mark_dirty();
            }
        }
        if emptied {
            self.merge(key);
        }
        removed
    }

    /// Merges the (empty) bucket for `key` into its split image and shrinks
    /// the directory while possible. The directory is re-read under the
    /// table write latch: the world may have changed since the removal that
    /// triggered the merge, so every precondition is re-validated and the
    /// merge silently aborts when one fails.
    fn merge(&self, key: &K) {
        let _table_guard = self.table_latch.w_lock();
        let directory_guard = match self.bpm.fetch_page_guarded(self.directory_page_id) {
            Some(guard) => guard,
            None => return,
        };
        let mut dir_data = directory_guard.write();
        let mut directory = HashTableDirectoryPage::view(&mut dir_data[..]);

        let bucket_idx = self.key_to_directory_index(key, &directory);
        let local_depth = directory.local_depth(bucket_idx);
        if local_depth <= 1 {
            return;
        }
        let image_idx = directory.split_image_index(bucket_idx);
        if directory.local_depth(image_idx) != local_depth {
            return;
        }
        let bucket_page_id = directory.bucket_page_id(bucket_idx);
        let image_page_id = directory.bucket_page_id(image_idx);
        if bucket_page_id == image_page_id {
            // A concurrent merge already collapsed this pair.
            return;
        }

        let still_empty = {
            let bucket_guard = match self.bpm.fetch_page_guarded(bucket_page_id) {
                Some(guard) => guard,
                None => return,
            };
            let data = bucket_guard.read();
            HashTableBucketPage::<_, K, V>::view(&data[..]).is_empty()
        };
        if !still_empty {
            return;
        }

        directory.decr_local_depth(bucket_idx);
        directory.decr_local_depth(image_idx);
        let merged_depth = directory.local_depth(bucket_idx);
        for idx in 0..directory.size() {
            let page_id = directory.bucket_page_id(idx);
            if page_id == bucket_page_id || page_id == image_page_id {
                directory.set_bucket_page_id(idx, image_page_id);
                directory.set_local_depth(idx, merged_depth);
            }
        }
        self.bpm.delete_page(bucket_page_id);
        debug!(
            "{}: merged bucket page {} into {} at local depth {}",
            self.index_name, bucket_page_id, image_page_id, merged_depth
        );

        while directory.can_shrink() {
            directory.decr_global_depth();
        }
        drop(dir_data);
        directory_guard.mark_dirty();
    }

    /// Returns the directory's current global depth.
    pub fn get_global_depth(&self) -> u32 {
        let _table_guard = self.table_latch.r_lock();
        let directory_guard = self
            .bpm
            .fetch_page_guarded(self.directory_page_id)
            .expect("directory page must be fetchable");
        let data = directory_guard.read();
        HashTableDirectoryPage::view(&data[..]).global_depth()
    }

    /// Re-checks the directory invariants, panicking on violation.
    pub fn verify_integrity(&self) {
        let _table_guard = self.table_latch.r_lock();
        let directory_guard = self
            .bpm
            .fetch_page_guarded(self.directory_page_id)
            .expect("directory page must be fetchable");
        let data = directory_guard.read();
        HashTableDirectoryPage::view(&data[..]).verify_integrity();
    }
}
