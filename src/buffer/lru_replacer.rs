use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::common::config::FrameId;

struct LruState {
    /// Eviction order, oldest unpin at the front. Entries whose stamp no
    /// longer matches `stamps` are stale and skipped lazily.
    queue: VecDeque<(u64, FrameId)>,
    /// Live frames and the stamp of their current queue entry.
    stamps: HashMap<FrameId, u64>,
    next_stamp: u64,
}

/// Victim selection for the buffer pool: an ordered set of frames that are
/// candidates for eviction, bounded by the pool size.
///
/// The least recently unpinned frame is evicted first. All operations are
/// serialized by a single mutex and run in amortized O(1): removal from the
/// middle is done lazily by invalidating the frame's stamp.
pub struct LruReplacer {
    inner: Mutex<LruState>,
    max_size: usize,
}

impl LruReplacer {
    /// Creates a replacer that tracks at most `num_frames` frames.
    pub fn new(num_frames: usize) -> Self {
        Self {
            inner: Mutex::new(LruState {
                queue: VecDeque::with_capacity(num_frames),
                stamps: HashMap::with_capacity(num_frames),
                next_stamp: 0,
            }),
            max_size: num_frames,
        }
    }

    /// Removes and returns the least recently unpinned frame, or `None`
    /// if the replacer is empty.
    pub fn victim(&self) -> Option<FrameId> {
        let mut state = self.inner.lock();
        while let Some((stamp, frame_id)) = state.queue.pop_front() {
            if state.stamps.get(&frame_id) == Some(&stamp) {
                state.stamps.remove(&frame_id);
                return Some(frame_id);
            }
            // stale entry for a pinned or re-unpinned frame
        }
        None
    }

    /// Removes `frame_id` from the replacer: the frame is in use and must
    /// not be evicted. No-op if the frame is not tracked.
    pub fn pin(&self, frame_id: FrameId) {
        let mut state = self.inner.lock();
        state.stamps.remove(&frame_id);
    }

    /// Adds `frame_id` as the most recently used eviction candidate.
    /// No-op if the frame is already tracked or the replacer is full.
    pub fn unpin(&self, frame_id: FrameId) {
        let mut state = self.inner.lock();
        if state.stamps.contains_key(&frame_id) {
            return;
        }
        if state.stamps.len() >= self.max_size {
            return;
        }
        let stamp = state.next_stamp;
        state.next_stamp += 1;
        state.stamps.insert(frame_id, stamp);
        state.queue.push_back((stamp, frame_id));
    }

    /// Returns the number of frames currently tracked by the replacer.
    pub fn size(&self) -> usize {
        self.inner.lock().stamps.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpin_is_idempotent() {
        let replacer = LruReplacer::new(4);
        replacer.unpin(1);
        replacer.unpin(1);
        assert_eq!(replacer.size(), 1);
    }

    #[test]
    fn test_capacity_bound() {
        let replacer = LruReplacer::new(2);
        replacer.unpin(1);
        replacer.unpin(2);
        replacer.unpin(3);
        assert_eq!(replacer.size(), 2);
        assert_eq!(replacer.victim(), Some(1));
        assert_eq!(replacer.victim(), Some(2));
        assert_eq!(replacer.victim(), None);
    }

    #[test]
    fn test_pin_removes_candidate() {
        let replacer = LruReplacer::new(4);
        replacer.unpin(1);
        replacer.unpin(2);
        replacer.pin(1);
        assert_eq!(replacer.victim(), Some(2));
        assert_eq!(replacer.victim(), None);
    }
}
