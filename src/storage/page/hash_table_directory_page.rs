use std::collections::HashMap;

use crate::common::config::{PageId, DIRECTORY_ARRAY_SIZE};

const GLOBAL_DEPTH_OFFSET: usize = 0;
const LOCAL_DEPTHS_OFFSET: usize = 4;
const BUCKET_PAGE_IDS_OFFSET: usize = LOCAL_DEPTHS_OFFSET + DIRECTORY_ARRAY_SIZE;

/**
 * Directory page for the extendible hash table.
 *
 * Directory format (sizes in bytes):
 *  --------------------------------------------------------------------
 * | GlobalDepth (4) | LocalDepths (256) | BucketPageIds (256 * 8) | Free
 *  --------------------------------------------------------------------
 *
 * Slot `i` routes hashes whose low `global_depth` bits equal `i`. The view
 * carries no synchronization; the index guards the directory through the
 * table latch.
 */
pub struct HashTableDirectoryPage<D> {
    data: D,
}

impl<D: AsRef<[u8]>> HashTableDirectoryPage<D> {
    pub fn view(data: D) -> Self {
        Self { data }
    }

    /// Returns the global depth of the hash table directory.
    pub fn global_depth(&self) -> u32 {
        let data = self.data.as_ref();
        u32::from_le_bytes(data[GLOBAL_DEPTH_OFFSET..GLOBAL_DEPTH_OFFSET + 4].try_into().unwrap())
    }

    /// Returns a mask of global depth 1's and the rest 0's.
    pub fn global_depth_mask(&self) -> u32 {
        (1 << self.global_depth()) - 1
    }

    /// Returns the current directory size.
    pub fn size(&self) -> usize {
        1 << self.global_depth()
    }

    /// Gets the local depth of the bucket at `bucket_idx`.
    pub fn local_depth(&self, bucket_idx: usize) -> u8 {
        self.data.as_ref()[LOCAL_DEPTHS_OFFSET + bucket_idx]
    }

    /// Returns a mask of local depth 1's and the rest 0's for the bucket
    /// at `bucket_idx`.
    pub fn local_depth_mask(&self, bucket_idx: usize) -> u32 {
        (1 << self.local_depth(bucket_idx)) - 1
    }

    /// Looks up the bucket page pointed at by directory slot `bucket_idx`.
    pub fn bucket_page_id(&self, bucket_idx: usize) -> PageId {
        let offset = BUCKET_PAGE_IDS_OFFSET + bucket_idx * 8;
        PageId::from_le_bytes(self.data.as_ref()[offset..offset + 8].try_into().unwrap())
    }

    /// Gets the split image of `bucket_idx`: the sibling slot produced by
    /// the most recent split of this bucket.
    pub fn split_image_index(&self, bucket_idx: usize) -> usize {
        bucket_idx ^ (1 << (self.local_depth(bucket_idx) - 1))
    }

    /// Returns true if the directory can be halved: every local depth is
    /// strictly less than the global depth.
    pub fn can_shrink(&self) -> bool {
        let global_depth = self.global_depth();
        if global_depth <= 1 {
            return false;
        }
        (0..self.size()).all(|i| (self.local_depth(i) as u32) < global_depth)
    }

    /// Verifies the directory invariants:
    /// - every local depth is at most the global depth;
    /// - slots sharing a bucket page id share a local depth;
    /// - a bucket with local depth `d` is referenced by exactly
    ///   `2^(global_depth - d)` slots.
    ///
    /// # Panics
    ///
    /// Panics if any invariant is violated; a broken directory is not
    /// recoverable.
    pub fn verify_integrity(&self) {
        let global_depth = self.global_depth();
        let mut pointer_counts: HashMap<PageId, usize> = HashMap::new();
        let mut depths: HashMap<PageId, u8> = HashMap::new();

        for bucket_idx in 0..self.size() {
            let local_depth = self.local_depth(bucket_idx);
            assert!(
                (local_depth as u32) <= global_depth,
                "local depth {} at slot {} exceeds global depth {}",
                local_depth,
                bucket_idx,
                global_depth
            );
            let page_id = self.bucket_page_id(bucket_idx);
            *pointer_counts.entry(page_id).or_insert(0) += 1;
            if let Some(previous) = depths.insert(page_id, local_depth) {
                assert_eq!(
                    previous, local_depth,
                    "bucket page {} has conflicting local depths {} and {}",
                    page_id, previous, local_depth
                );
            }
        }

        for (page_id, count) in pointer_counts {
            let local_depth = depths[&page_id] as u32;
            assert_eq!(
                count,
                1 << (global_depth - local_depth),
                "bucket page {} with local depth {} has {} pointers",
                page_id,
                local_depth,
                count
            );
        }
    }
}

impl<D: AsRef<[u8]> + AsMut<[u8]>> HashTableDirectoryPage<D> {
    /// Formats the page as an empty directory with global depth 1.
    /// The caller wires up the two initial bucket slots.
    pub fn init(&mut self) {
        let data = self.data.as_mut();
        data[..BUCKET_PAGE_IDS_OFFSET + DIRECTORY_ARRAY_SIZE * 8].fill(0);
        self.set_global_depth(1);
    }

    fn set_global_depth(&mut self, global_depth: u32) {
        self.data.as_mut()[GLOBAL_DEPTH_OFFSET..GLOBAL_DEPTH_OFFSET + 4]
            .copy_from_slice(&global_depth.to_le_bytes());
    }

    /// Increments the global depth of the directory.
    pub fn incr_global_depth(&mut self) {
        let depth = self.global_depth();
        assert!(
            (1usize << (depth + 1)) <= DIRECTORY_ARRAY_SIZE,
            "directory cannot grow past {} slots",
            DIRECTORY_ARRAY_SIZE
        );
        self.set_global_depth(depth + 1);
    }

    /// Decrements the global depth of the directory, halving it in place.
    pub fn decr_global_depth(&mut self) {
        let depth = self.global_depth();
        assert!(depth > 0, "directory global depth underflow");
        self.set_global_depth(depth - 1);
    }

    /// Points directory slot `bucket_idx` at `bucket_page_id`.
    pub fn set_bucket_page_id(&mut self, bucket_idx: usize, bucket_page_id: PageId) {
        let offset = BUCKET_PAGE_IDS_OFFSET + bucket_idx * 8;
        self.data.as_mut()[offset..offset + 8].copy_from_slice(&bucket_page_id.to_le_bytes());
    }

    /// Sets the local depth of the bucket at `bucket_idx`.
    pub fn set_local_depth(&mut self, bucket_idx: usize, local_depth: u8) {
        self.data.as_mut()[LOCAL_DEPTHS_OFFSET + bucket_idx] = local_depth;
    }

    /// Increments the local depth of the bucket at `bucket_idx`.
    pub fn incr_local_depth(&mut self, bucket_idx: usize) {
        self.data.as_mut()[LOCAL_DEPTHS_OFFSET + bucket_idx] += 1;
    }

    /// Decrements the local depth of the bucket at `bucket_idx`.
    pub fn decr_local_depth(&mut self, bucket_idx: usize) {
        self.data.as_mut()[LOCAL_DEPTHS_OFFSET + bucket_idx] -= 1;
    }
}
