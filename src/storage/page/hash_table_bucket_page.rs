use std::marker::PhantomData;

use crate::common::config::DB_PAGE_SIZE;
use crate::storage::index::codec::Storable;
use crate::storage::index::int_comparator::Comparator;

const BUCKET_PAGE_HEADER_SIZE: usize = 4;

/// Returns the largest bucket capacity whose header, bitmaps and entry
/// array fit in one page for the given key/value encoding.
pub fn bucket_array_size<K: Storable, V: Storable>() -> usize {
    let entry_size = K::ENCODED_LEN + V::ENCODED_LEN;
    let mut size = (DB_PAGE_SIZE - BUCKET_PAGE_HEADER_SIZE) * 8 / (8 * entry_size + 2);
    while BUCKET_PAGE_HEADER_SIZE + 2 * size.div_ceil(8) + size * entry_size > DB_PAGE_SIZE {
        size -= 1;
    }
    size
}

/**
 * Store indexed key and value together within a bucket page. Supports
 * non-unique keys.
 *
 * Bucket page format (sizes in bytes):
 *  ---------------------------------------------------------------------
 * | MaxSize (2) | Reserved (2) | Occupied ((B+7)/8) | Readable ((B+7)/8) |
 * | KEY(1)+VALUE(1) | KEY(2)+VALUE(2) | ... | KEY(B)+VALUE(B) | Free     |
 *  ---------------------------------------------------------------------
 *
 * A slot with the occupied bit set but the readable bit clear is a deleted
 * tombstone; a slot with both bits clear was never used. Keys and values
 * are fixed-width little-endian per `Storable`.
 *
 * The accessor is a view over the raw page bytes; the caller supplies
 * external synchronization through the page latch.
 */
pub struct HashTableBucketPage<D, K, V> {
    data: D,
    _marker: PhantomData<(K, V)>,
}

impl<D, K, V> HashTableBucketPage<D, K, V>
where
    D: AsRef<[u8]>,
    K: Storable,
    V: Storable + PartialEq,
{
    /// Wraps page bytes in a bucket view. The page must have been
    /// initialized with `init` at some point in its life.
    pub fn view(data: D) -> Self {
        Self {
            data,
            _marker: PhantomData,
        }
    }

    /// Returns the bucket capacity recorded in the page header.
    pub fn max_size(&self) -> usize {
        let data = self.data.as_ref();
        u16::from_le_bytes([data[0], data[1]]) as usize
    }

    fn entry_size() -> usize {
        K::ENCODED_LEN + V::ENCODED_LEN
    }

    fn bitmap_len(&self) -> usize {
        self.max_size().div_ceil(8)
    }

    fn occupied_offset(&self) -> usize {
        BUCKET_PAGE_HEADER_SIZE
    }

    fn readable_offset(&self) -> usize {
        BUCKET_PAGE_HEADER_SIZE + self.bitmap_len()
    }

    fn entry_offset(&self, bucket_idx: usize) -> usize {
        BUCKET_PAGE_HEADER_SIZE + 2 * self.bitmap_len() + bucket_idx * Self::entry_size()
    }

    /// Scans the bucket and collects values stored under `key`.
    /// Returns true if at least one key matched.
    pub fn get_value<C: Comparator<K>>(&self, key: &K, cmp: &C, result: &mut Vec<V>) -> bool {
        let mut key_matched = false;
        for bucket_idx in 0..self.max_size() {
            if self.is_readable(bucket_idx) && cmp.compare(&self.key_at(bucket_idx), key).is_eq() {
                result.push(self.value_at(bucket_idx));
                key_matched = true;
            }
        }
        key_matched
    }

    /// Gets the key at an index in the bucket.
    pub fn key_at(&self, bucket_idx: usize) -> K {
        let offset = self.entry_offset(bucket_idx);
        K::decode(&self.data.as_ref()[offset..offset + K::ENCODED_LEN])
    }

    /// Gets the value at an index in the bucket.
    pub fn value_at(&self, bucket_idx: usize) -> V {
        let offset = self.entry_offset(bucket_idx) + K::ENCODED_LEN;
        V::decode(&self.data.as_ref()[offset..offset + V::ENCODED_LEN])
    }

    /// Returns whether the slot holds a key/value pair or a tombstone.
    pub fn is_occupied(&self, bucket_idx: usize) -> bool {
        let byte = self.data.as_ref()[self.occupied_offset() + bucket_idx / 8];
        (byte >> (bucket_idx % 8)) & 1 != 0
    }

    /// Returns whether the slot holds a live key/value pair.
    pub fn is_readable(&self, bucket_idx: usize) -> bool {
        let byte = self.data.as_ref()[self.readable_offset() + bucket_idx / 8];
        (byte >> (bucket_idx % 8)) & 1 != 0
    }

    /// Returns the number of live pairs, i.e. the current size.
    pub fn num_readable(&self) -> usize {
        let data = self.data.as_ref();
        let mut count = 0;
        for bucket_idx in 0..self.max_size() {
            let byte = data[self.readable_offset() + bucket_idx / 8];
            if (byte >> (bucket_idx % 8)) & 1 != 0 {
                count += 1;
            }
        }
        count
    }

    /// Returns whether the bucket is full.
    pub fn is_full(&self) -> bool {
        self.num_readable() == self.max_size()
    }

    /// Returns whether the bucket is empty.
    pub fn is_empty(&self) -> bool {
        self.num_readable() == 0
    }
}

impl<D, K, V> HashTableBucketPage<D, K, V>
where
    D: AsRef<[u8]> + AsMut<[u8]>,
    K: Storable,
    V: Storable + PartialEq,
{
    /// Formats the page as an empty bucket of `max_size` slots.
    pub fn init(&mut self, max_size: u16) {
        assert!(
            BUCKET_PAGE_HEADER_SIZE
                + 2 * (max_size as usize).div_ceil(8)
                + max_size as usize * Self::entry_size()
                <= DB_PAGE_SIZE,
            "bucket of {} entries does not fit a page",
            max_size
        );
        let data = self.data.as_mut();
        let len = DB_PAGE_SIZE.min(data.len());
        data[..len].fill(0);
        data[0..2].copy_from_slice(&max_size.to_le_bytes());
    }

    /// Attempts to insert a key/value pair into the bucket.
    ///
    /// Returns false if the exact pair is already present or no free slot
    /// remains. Callers are expected to pre-check `is_full` under the page
    /// latch before relying on insertion.
    pub fn insert<C: Comparator<K>>(&mut self, key: &K, value: &V, cmp: &C) -> bool {
        let mut insert_idx = None;
        for bucket_idx in 0..self.max_size() {
            if self.is_readable(bucket_idx) {
                if cmp.compare(&self.key_at(bucket_idx), key).is_eq()
                    && self.value_at(bucket_idx) == *value
                {
                    return false;
                }
            } else if insert_idx.is_none() {
                insert_idx = Some(bucket_idx);
            }
        }
        match insert_idx {
            Some(bucket_idx) => {
                self.put_at(bucket_idx, key, value);
                true
            }
            None => false,
        }
    }

    /// Removes the first slot matching the key/value pair.
    /// Returns true if a match was cleared.
    pub fn remove<C: Comparator<K>>(&mut self, key: &K, value: &V, cmp: &C) -> bool {
        for bucket_idx in 0..self.max_size() {
            if self.is_readable(bucket_idx)
                && cmp.compare(&self.key_at(bucket_idx), key).is_eq()
                && self.value_at(bucket_idx) == *value
            {
                self.remove_at(bucket_idx);
                return true;
            }
        }
        false
    }

    /// Clears the readable bit at `bucket_idx`, leaving a tombstone.
    pub fn remove_at(&mut self, bucket_idx: usize) {
        let offset = self.readable_offset() + bucket_idx / 8;
        self.data.as_mut()[offset] &= !(1 << (bucket_idx % 8));
    }

    fn put_at(&mut self, bucket_idx: usize, key: &K, value: &V) {
        let offset = self.entry_offset(bucket_idx);
        let data = self.data.as_mut();
        key.encode(&mut data[offset..offset + K::ENCODED_LEN]);
        value.encode(
            &mut data[offset + K::ENCODED_LEN..offset + K::ENCODED_LEN + V::ENCODED_LEN],
        );
        self.set_occupied(bucket_idx);
        self.set_readable(bucket_idx);
    }

    fn set_occupied(&mut self, bucket_idx: usize) {
        let offset = self.occupied_offset() + bucket_idx / 8;
        self.data.as_mut()[offset] |= 1 << (bucket_idx % 8);
    }

    fn set_readable(&mut self, bucket_idx: usize) {
        let offset = self.readable_offset() + bucket_idx / 8;
        self.data.as_mut()[offset] |= 1 << (bucket_idx % 8);
    }
}
