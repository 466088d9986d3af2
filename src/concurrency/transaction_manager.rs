use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use crate::common::config::TxnId;
use crate::concurrency::lock_manager::LockManager;
use crate::concurrency::transaction::{IsolationLevel, Transaction, TransactionState};

/// Process-wide transaction registry. Owns every transaction object and
/// hands out monotonically increasing ids (smaller id = older transaction).
///
/// The lock manager keeps only transaction ids and consults this registry
/// to reach the transaction objects it preempts, which breaks the
/// transaction <-> lock-manager reference cycle.
pub struct TransactionManager {
    next_txn_id: AtomicU64,
    txn_map: RwLock<HashMap<TxnId, Arc<Transaction>>>,
}

impl TransactionManager {
    pub fn new() -> Self {
        Self {
            next_txn_id: AtomicU64::new(0),
            txn_map: RwLock::new(HashMap::new()),
        }
    }

    /// Begins a new transaction at the given isolation level.
    pub fn begin(&self, isolation_level: IsolationLevel) -> Arc<Transaction> {
        let txn_id = self.next_txn_id.fetch_add(1, Ordering::SeqCst);
        let txn = Arc::new(Transaction::new(txn_id, isolation_level));
        self.txn_map.write().insert(txn_id, Arc::clone(&txn));
        debug!("began txn {} at {:?}", txn_id, isolation_level);
        txn
    }

    /// Looks up a live transaction by id.
    pub fn get_transaction(&self, txn_id: TxnId) -> Option<Arc<Transaction>> {
        self.txn_map.read().get(&txn_id).cloned()
    }

    /// Commits the transaction and releases every lock it still holds.
    /// Returns false if the transaction was already aborted (e.g. wounded
    /// by an older transaction).
    pub fn commit(&self, txn: &Transaction, lock_manager: &LockManager) -> bool {
        if txn.get_state() == TransactionState::Aborted {
            lock_manager.release_all(txn);
            return false;
        }
        txn.set_state(TransactionState::Committed);
        lock_manager.release_all(txn);
        debug!("committed txn {}", txn.get_transaction_id());
        true
    }

    /// Aborts the transaction and releases every lock it still holds.
    pub fn abort(&self, txn: &Transaction, lock_manager: &LockManager) {
        txn.set_state(TransactionState::Aborted);
        lock_manager.release_all(txn);
        debug!("aborted txn {}", txn.get_transaction_id());
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}
