use std::collections::HashSet;
use std::thread;

use parking_lot::{Mutex, MutexGuard, RwLock};
use serde::{Deserialize, Serialize};

use crate::common::config::TxnId;
use crate::common::rid::RID;

/// Transaction state. The regular lifecycle is
/// `Growing -> Shrinking -> Committed`; any state may transition to
/// `Aborted` (own violation, or preemption by an older transaction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionState {
    Growing,
    Shrinking,
    Committed,
    Aborted,
}

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
}

/// Represents a transaction. Smaller transaction ids are older; the lock
/// manager's wound-wait policy leans on that order.
///
/// State and lock sets sit behind interior mutability: the lock manager
/// aborts transactions it does not own when an older transaction wounds
/// them.
#[derive(Debug)]
pub struct Transaction {
    txn_id: TxnId,
    isolation_level: IsolationLevel,
    thread_id: thread::ThreadId,
    state: RwLock<TransactionState>,
    /// RIDs this transaction holds shared locks on.
    shared_lock_set: Mutex<HashSet<RID>>,
    /// RIDs this transaction holds exclusive locks on.
    exclusive_lock_set: Mutex<HashSet<RID>>,
}

impl Transaction {
    pub fn new(txn_id: TxnId, isolation_level: IsolationLevel) -> Self {
        Self {
            txn_id,
            isolation_level,
            thread_id: thread::current().id(),
            state: RwLock::new(TransactionState::Growing),
            shared_lock_set: Mutex::new(HashSet::new()),
            exclusive_lock_set: Mutex::new(HashSet::new()),
        }
    }

    /// Returns the ID of the thread that started the transaction.
    pub fn thread_id(&self) -> thread::ThreadId {
        self.thread_id
    }

    /// Returns the ID of this transaction.
    pub fn get_transaction_id(&self) -> TxnId {
        self.txn_id
    }

    /// Returns the isolation level of this transaction.
    pub fn get_isolation_level(&self) -> IsolationLevel {
        self.isolation_level
    }

    /// Returns the transaction state.
    pub fn get_state(&self) -> TransactionState {
        *self.state.read()
    }

    pub fn set_state(&self, state: TransactionState) {
        *self.state.write() = state;
    }

    /// Returns true if this transaction holds a shared lock on `rid`.
    pub fn is_shared_locked(&self, rid: &RID) -> bool {
        self.shared_lock_set.lock().contains(rid)
    }

    /// Returns true if this transaction holds an exclusive lock on `rid`.
    pub fn is_exclusive_locked(&self, rid: &RID) -> bool {
        self.exclusive_lock_set.lock().contains(rid)
    }

    /// Returns the set of RIDs this transaction holds shared locks on.
    pub fn shared_lock_set(&self) -> MutexGuard<'_, HashSet<RID>> {
        self.shared_lock_set.lock()
    }

    /// Returns the set of RIDs this transaction holds exclusive locks on.
    pub fn exclusive_lock_set(&self) -> MutexGuard<'_, HashSet<RID>> {
        self.exclusive_lock_set.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let txn = Transaction::new(1, IsolationLevel::RepeatableRead);
        assert_eq!(txn.get_state(), TransactionState::Growing);
        assert_eq!(txn.get_isolation_level(), IsolationLevel::RepeatableRead);
        assert_eq!(txn.get_transaction_id(), 1);
    }

    #[test]
    fn test_lock_set_bookkeeping() {
        let txn = Transaction::new(1, IsolationLevel::ReadCommitted);
        let rid = RID::new(3, 7);
        txn.shared_lock_set().insert(rid);
        assert!(txn.is_shared_locked(&rid));
        assert!(!txn.is_exclusive_locked(&rid));
        txn.shared_lock_set().remove(&rid);
        assert!(!txn.is_shared_locked(&rid));
    }
}
