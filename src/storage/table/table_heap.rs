use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::common::rid::RID;
use crate::storage::table::tuple::{Tuple, TupleMeta};

/// Tuples per heap page; only shapes the RIDs the heap hands out.
const TUPLES_PER_PAGE: u64 = 64;

/// In-memory table heap. Rows are addressed by RID exactly like their
/// disk-resident counterparts would be; the executors and the lock
/// manager only ever see RIDs, so the storage format behind them is
/// interchangeable.
pub struct TableHeap {
    tuples: RwLock<BTreeMap<RID, (TupleMeta, Tuple)>>,
    next_slot: AtomicU64,
}

impl TableHeap {
    pub fn new() -> Self {
        Self {
            tuples: RwLock::new(BTreeMap::new()),
            next_slot: AtomicU64::new(0),
        }
    }

    /// Inserts a tuple, assigning it the next free RID.
    pub fn insert_tuple(&self, mut tuple: Tuple) -> RID {
        let slot = self.next_slot.fetch_add(1, Ordering::SeqCst);
        let rid = RID::new(slot / TUPLES_PER_PAGE, (slot % TUPLES_PER_PAGE) as u32);
        tuple.set_rid(rid);
        self.tuples
            .write()
            .insert(rid, (TupleMeta::default(), tuple));
        rid
    }

    /// Returns the live tuple at `rid`, or `None` if absent or deleted.
    pub fn get_tuple(&self, rid: RID) -> Option<Tuple> {
        let tuples = self.tuples.read();
        let (meta, tuple) = tuples.get(&rid)?;
        if meta.is_deleted {
            return None;
        }
        Some(tuple.clone())
    }

    /// Replaces the tuple at `rid` in place. Returns false if the row is
    /// absent or deleted.
    pub fn update_tuple(&self, rid: RID, mut new_tuple: Tuple) -> bool {
        let mut tuples = self.tuples.write();
        match tuples.get_mut(&rid) {
            Some((meta, tuple)) if !meta.is_deleted => {
                new_tuple.set_rid(rid);
                *tuple = new_tuple;
                true
            }
            _ => false,
        }
    }

    /// Marks the tuple at `rid` deleted. Returns false if the row is
    /// absent or already deleted.
    pub fn mark_delete(&self, rid: RID) -> bool {
        let mut tuples = self.tuples.write();
        match tuples.get_mut(&rid) {
            Some((meta, _)) if !meta.is_deleted => {
                meta.is_deleted = true;
                true
            }
            _ => false,
        }
    }

    /// RIDs of every live tuple, in RID order.
    pub fn scan(&self) -> Vec<RID> {
        self.tuples
            .read()
            .iter()
            .filter(|(_, (meta, _))| !meta.is_deleted)
            .map(|(rid, _)| *rid)
            .collect()
    }
}

impl Default for TableHeap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types_db::value::Value;

    #[test]
    fn test_insert_get_delete() {
        let heap = TableHeap::new();
        let rid = heap.insert_tuple(Tuple::new(vec![Value::from(1), Value::from("a")]));
        let tuple = heap.get_tuple(rid).unwrap();
        assert_eq!(tuple.get_value(0), &Value::Integer(1));
        assert!(heap.mark_delete(rid));
        assert!(heap.get_tuple(rid).is_none());
        assert!(!heap.mark_delete(rid));
    }

    #[test]
    fn test_scan_skips_deleted() {
        let heap = TableHeap::new();
        let r1 = heap.insert_tuple(Tuple::new(vec![Value::from(1)]));
        let r2 = heap.insert_tuple(Tuple::new(vec![Value::from(2)]));
        heap.mark_delete(r1);
        assert_eq!(heap.scan(), vec![r2]);
    }
}
