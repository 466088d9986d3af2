use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use xxhash_rust::xxh3;

/// Hash function over index keys. The index downcasts the 64-bit result to
/// 32 bits before masking with the directory depth.
pub trait HashFunction<K>: Send + Sync {
    fn get_hash(&self, key: &K) -> u64;
}

/// Default hash function: xxh3 as the 64-bit mixer.
pub struct Xxh3HashFunction<K> {
    _marker: PhantomData<K>,
}

impl<K> Xxh3HashFunction<K> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<K> Default for Xxh3HashFunction<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> HashFunction<K> for Xxh3HashFunction<K>
where
    K: Hash + Send + Sync,
{
    fn get_hash(&self, key: &K) -> u64 {
        let mut hasher = xxh3::Xxh3::new();
        key.hash(&mut hasher);
        hasher.finish()
    }
}
