//! Record-level lock manager implementing strict two-phase locking with
//! wound-wait deadlock prevention.
//!
//! # General behavior
//! - Lock calls block until granted and then return true; if the
//!   transaction is aborted in the meantime (wounded, or cancelled from
//!   outside) they return false without granting.
//! - Any lock call by an already-aborted transaction returns false
//!   without mutating state.
//!
//! # Wound-wait
//! An older transaction (smaller id) never waits behind a younger one: it
//! aborts younger waiters and younger holders that stand in its way and
//! proceeds. A younger transaction that would block on an older one waits
//! on the queue's condition variable. The resulting wait-for graph only
//! ever points from younger to older, so it cannot form a cycle.
//!
//! # Isolation levels
//! - REPEATABLE_READ takes shared and exclusive locks, allows none once
//!   the transaction enters the shrinking phase, and transitions to
//!   shrinking on its first unlock.
//! - READ_COMMITTED takes both lock kinds; shared locks may be released
//!   while still growing without entering the shrinking phase.
//! - READ_UNCOMMITTED never takes shared locks; attempting one aborts the
//!   transaction.
//!
//! # Upgrades
//! A shared holder may upgrade to exclusive. Only one upgrade may be in
//! flight per record; a second concurrent upgrader is aborted
//! (upgrade-upgrade conflict).

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use log::debug;
use parking_lot::{Condvar, Mutex};

use crate::common::config::{TxnId, INVALID_TXN_ID};
use crate::common::rid::RID;
use crate::concurrency::transaction::{IsolationLevel, Transaction, TransactionState};
use crate::concurrency::transaction_manager::TransactionManager;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// A lock request not yet granted, parked in a queue.
struct LockRequest {
    txn_id: TxnId,
    lock_mode: LockMode,
}

/// Per-record lock state: current holders plus the ordered queue of
/// waiting requests. Created on first touch of a RID and kept for the
/// process lifetime.
struct LockRequestQueue {
    /// Requests waiting to be granted, in arrival order.
    request_queue: VecDeque<LockRequest>,
    /// Transactions currently holding the lock in shared mode.
    shared_lock_holders: HashSet<TxnId>,
    /// Transaction holding the lock in exclusive mode, or INVALID_TXN_ID.
    exclusive_lock_holder: TxnId,
    /// Transaction currently upgrading shared -> exclusive, if any.
    upgrading: TxnId,
    /// Wakes blocked transactions on this record. Shares the lock
    /// manager's single mutex.
    cv: Arc<Condvar>,
}

impl LockRequestQueue {
    fn new() -> Self {
        Self {
            request_queue: VecDeque::new(),
            shared_lock_holders: HashSet::new(),
            exclusive_lock_holder: INVALID_TXN_ID,
            upgrading: INVALID_TXN_ID,
            cv: Arc::new(Condvar::new()),
        }
    }

    fn is_lock_granted(&self, txn_id: TxnId) -> bool {
        self.shared_lock_holders.contains(&txn_id) || self.exclusive_lock_holder == txn_id
    }
}

/// LockManager handles transactions asking for locks on records.
pub struct LockManager {
    txn_manager: Arc<TransactionManager>,
    /// The single latch protecting the shared lock table. No other lock is
    /// acquired while it is held; condition variable waits release it.
    latch: Mutex<HashMap<RID, LockRequestQueue>>,
}

impl LockManager {
    /// Creates a new lock manager configured for the wound-wait deadlock
    /// prevention policy. Transactions are resolved for preemption through
    /// the given registry.
    pub fn new(txn_manager: Arc<TransactionManager>) -> Self {
        Self {
            txn_manager,
            latch: Mutex::new(HashMap::new()),
        }
    }

    /// Acquires a lock on `rid` in shared mode.
    ///
    /// Returns true if the lock is granted. Aborts the transaction (and
    /// returns false) on an isolation violation: a shared request under
    /// READ_UNCOMMITTED, or during the shrinking phase of REPEATABLE_READ.
    pub fn lock_shared(&self, txn: &Transaction, rid: RID) -> bool {
        let state = txn.get_state();
        let isolation_level = txn.get_isolation_level();

        if state == TransactionState::Aborted {
            return false;
        }
        if isolation_level == IsolationLevel::RepeatableRead
            && state == TransactionState::Shrinking
        {
            txn.set_state(TransactionState::Aborted);
            return false;
        }
        // READ_UNCOMMITTED reads without shared locks.
        if isolation_level == IsolationLevel::ReadUncommitted {
            txn.set_state(TransactionState::Aborted);
            return false;
        }
        if txn.is_shared_locked(&rid) || txn.is_exclusive_locked(&rid) {
            return true;
        }

        let txn_id = txn.get_transaction_id();
        let mut lock_table = self.latch.lock();
        let queue = lock_table.entry(rid).or_insert_with(LockRequestQueue::new);

        // Wound-wait: younger exclusive waiters and a younger exclusive
        // holder give way to this reader.
        let mut preempted = self.preempt_younger_requests(queue, txn_id, LockMode::Shared);
        preempted |= self.preempt_younger_exclusive_holder(queue, txn_id);
        if preempted {
            // A preemption may have unblocked surviving older waiters.
            Self::grant_waiters(queue);
            queue.cv.notify_all();
        }

        // Any exclusive waiter still queued survived preemption and is
        // therefore older; cutting ahead of it would let an older
        // transaction wait on a younger one, which wound-wait forbids.
        let must_wait = queue.exclusive_lock_holder != INVALID_TXN_ID
            || queue
                .request_queue
                .iter()
                .any(|request| request.lock_mode == LockMode::Exclusive);
        if !must_wait {
            queue.shared_lock_holders.insert(txn_id);
            txn.shared_lock_set().insert(rid);
            return true;
        }

        // An older exclusive holder or waiter remains; wait behind it.
        queue.request_queue.push_back(LockRequest {
            txn_id,
            lock_mode: LockMode::Shared,
        });
        let cv = Arc::clone(&queue.cv);
        loop {
            let queue = lock_table
                .get(&rid)
                .expect("lock request queues are never destroyed");
            if queue.is_lock_granted(txn_id) || txn.get_state() == TransactionState::Aborted {
                break;
            }
            cv.wait(&mut lock_table);
        }

        if txn.get_state() == TransactionState::Aborted {
            if let Some(queue) = lock_table.get_mut(&rid) {
                Self::abandon(queue, txn_id);
            }
            return false;
        }
        txn.shared_lock_set().insert(rid);
        true
    }

    /// Acquires a lock on `rid` in exclusive mode.
    ///
    /// Returns true if the lock is granted. A request from a shared holder
    /// is delegated to `lock_upgrade`. Any exclusive request during the
    /// shrinking phase aborts the transaction.
    pub fn lock_exclusive(&self, txn: &Transaction, rid: RID) -> bool {
        let state = txn.get_state();
        if state == TransactionState::Aborted {
            return false;
        }
        // No exclusive locks while shrinking, under any isolation level.
        if state == TransactionState::Shrinking {
            txn.set_state(TransactionState::Aborted);
            return false;
        }
        if txn.is_exclusive_locked(&rid) {
            return true;
        }
        if txn.is_shared_locked(&rid) {
            return self.lock_upgrade(txn, rid);
        }

        let txn_id = txn.get_transaction_id();
        let mut lock_table = self.latch.lock();
        let queue = lock_table.entry(rid).or_insert_with(LockRequestQueue::new);

        // Wound-wait: every younger party gives way.
        let mut preempted = self.preempt_younger_requests(queue, txn_id, LockMode::Exclusive);
        preempted |= self.preempt_younger_shared_holders(queue, txn_id);
        preempted |= self.preempt_younger_exclusive_holder(queue, txn_id);
        if preempted {
            Self::grant_waiters(queue);
            queue.cv.notify_all();
        }

        if queue.request_queue.is_empty()
            && queue.shared_lock_holders.is_empty()
            && queue.exclusive_lock_holder == INVALID_TXN_ID
        {
            queue.exclusive_lock_holder = txn_id;
        } else {
            queue.request_queue.push_back(LockRequest {
                txn_id,
                lock_mode: LockMode::Exclusive,
            });
            let cv = Arc::clone(&queue.cv);
            loop {
                let queue = lock_table
                    .get(&rid)
                    .expect("lock request queues are never destroyed");
                if queue.is_lock_granted(txn_id) || txn.get_state() == TransactionState::Aborted {
                    break;
                }
                cv.wait(&mut lock_table);
            }
        }

        // Wounded by another transaction while waiting.
        if txn.get_state() == TransactionState::Aborted {
            if let Some(queue) = lock_table.get_mut(&rid) {
                Self::abandon(queue, txn_id);
            }
            return false;
        }
        txn.exclusive_lock_set().insert(rid);
        true
    }

    /// Upgrades a held shared lock on `rid` to exclusive.
    ///
    /// Returns false without upgrading if the transaction holds no shared
    /// lock. A second concurrent upgrade on the same record aborts the
    /// transaction (upgrade conflict).
    pub fn lock_upgrade(&self, txn: &Transaction, rid: RID) -> bool {
        let state = txn.get_state();
        if state == TransactionState::Aborted {
            return false;
        }
        if state == TransactionState::Shrinking {
            txn.set_state(TransactionState::Aborted);
            return false;
        }
        if !txn.is_shared_locked(&rid) {
            return false;
        }

        let txn_id = txn.get_transaction_id();
        let mut lock_table = self.latch.lock();
        let queue = lock_table.entry(rid).or_insert_with(LockRequestQueue::new);
        if queue.upgrading != INVALID_TXN_ID {
            debug!(
                "txn {} aborted: txn {} is already upgrading this record",
                txn_id, queue.upgrading
            );
            txn.set_state(TransactionState::Aborted);
            return false;
        }

        // Leave the shared holder set before competing for exclusive.
        queue.shared_lock_holders.remove(&txn_id);

        let mut preempted = self.preempt_younger_requests(queue, txn_id, LockMode::Exclusive);
        preempted |= self.preempt_younger_shared_holders(queue, txn_id);
        preempted |= self.preempt_younger_exclusive_holder(queue, txn_id);
        if preempted {
            Self::grant_waiters(queue);
            queue.cv.notify_all();
        }

        if queue.exclusive_lock_holder == INVALID_TXN_ID && queue.shared_lock_holders.is_empty() {
            queue.exclusive_lock_holder = txn_id;
        } else {
            queue.request_queue.push_back(LockRequest {
                txn_id,
                lock_mode: LockMode::Exclusive,
            });
            queue.upgrading = txn_id;
            let cv = Arc::clone(&queue.cv);
            loop {
                let queue = lock_table
                    .get(&rid)
                    .expect("lock request queues are never destroyed");
                if queue.is_lock_granted(txn_id) || txn.get_state() == TransactionState::Aborted {
                    break;
                }
                cv.wait(&mut lock_table);
            }
        }

        if txn.get_state() == TransactionState::Aborted {
            if let Some(queue) = lock_table.get_mut(&rid) {
                Self::abandon(queue, txn_id);
            }
            return false;
        }
        txn.shared_lock_set().remove(&rid);
        txn.exclusive_lock_set().insert(rid);
        true
    }

    /// Releases the lock held by the transaction on `rid` and grants the
    /// lock to eligible waiters.
    ///
    /// Under REPEATABLE_READ the first unlock moves the transaction from
    /// the growing to the shrinking phase; READ_COMMITTED may release
    /// shared locks while still growing.
    pub fn unlock(&self, txn: &Transaction, rid: RID) -> bool {
        let mut lock_table = self.latch.lock();
        if txn.get_isolation_level() == IsolationLevel::RepeatableRead
            && txn.get_state() == TransactionState::Growing
        {
            txn.set_state(TransactionState::Shrinking);
        }
        let txn_id = txn.get_transaction_id();
        let queue = lock_table.entry(rid).or_insert_with(LockRequestQueue::new);
        if queue.exclusive_lock_holder == txn_id {
            queue.exclusive_lock_holder = INVALID_TXN_ID;
        }
        queue.shared_lock_holders.remove(&txn_id);

        txn.shared_lock_set().remove(&rid);
        txn.exclusive_lock_set().remove(&rid);

        Self::grant_waiters(queue);
        queue.cv.notify_all();
        true
    }

    /// Drops every lock a finished transaction still holds and wakes the
    /// waiters this unblocks. Used by commit and abort; performs no phase
    /// transition.
    pub fn release_all(&self, txn: &Transaction) {
        let txn_id = txn.get_transaction_id();
        let mut rids: Vec<RID> = Vec::new();
        rids.extend(txn.shared_lock_set().drain());
        rids.extend(txn.exclusive_lock_set().drain());

        let mut lock_table = self.latch.lock();
        for rid in rids {
            if let Some(queue) = lock_table.get_mut(&rid) {
                Self::abandon(queue, txn_id);
            }
        }
    }

    /// Aborts and removes queued requests younger than `txn_id` that are
    /// incompatible with a request of `lock_mode`. Returns true if any
    /// waiter was wounded.
    fn preempt_younger_requests(
        &self,
        queue: &mut LockRequestQueue,
        txn_id: TxnId,
        lock_mode: LockMode,
    ) -> bool {
        let mut preempted = false;
        let mut idx = 0;
        while idx < queue.request_queue.len() {
            let request = &queue.request_queue[idx];
            let incompatible = lock_mode == LockMode::Exclusive
                || (lock_mode == LockMode::Shared && request.lock_mode == LockMode::Exclusive);
            if incompatible && request.txn_id > txn_id {
                let victim_id = request.txn_id;
                if let Some(victim) = self.txn_manager.get_transaction(victim_id) {
                    victim.set_state(TransactionState::Aborted);
                }
                debug!("txn {} wounded waiting txn {}", txn_id, victim_id);
                if queue.upgrading == victim_id {
                    queue.upgrading = INVALID_TXN_ID;
                }
                queue.request_queue.remove(idx);
                preempted = true;
            } else {
                idx += 1;
            }
        }
        preempted
    }

    /// Aborts and removes shared holders younger than `txn_id`.
    fn preempt_younger_shared_holders(&self, queue: &mut LockRequestQueue, txn_id: TxnId) -> bool {
        let victims: Vec<TxnId> = queue
            .shared_lock_holders
            .iter()
            .copied()
            .filter(|&holder| holder > txn_id)
            .collect();
        for victim_id in &victims {
            if let Some(victim) = self.txn_manager.get_transaction(*victim_id) {
                victim.set_state(TransactionState::Aborted);
            }
            debug!("txn {} wounded shared holder txn {}", txn_id, victim_id);
            queue.shared_lock_holders.remove(victim_id);
        }
        !victims.is_empty()
    }

    /// Aborts and clears an exclusive holder younger than `txn_id`.
    fn preempt_younger_exclusive_holder(
        &self,
        queue: &mut LockRequestQueue,
        txn_id: TxnId,
    ) -> bool {
        let holder_id = queue.exclusive_lock_holder;
        if holder_id != INVALID_TXN_ID && holder_id > txn_id {
            if let Some(victim) = self.txn_manager.get_transaction(holder_id) {
                victim.set_state(TransactionState::Aborted);
            }
            debug!("txn {} wounded exclusive holder txn {}", txn_id, holder_id);
            queue.exclusive_lock_holder = INVALID_TXN_ID;
            return true;
        }
        false
    }

    /// Grants the queue front while it is eligible: a run of shared
    /// waiters is admitted while no exclusive holder exists; an exclusive
    /// waiter additionally requires the shared holder set to be empty.
    fn grant_waiters(queue: &mut LockRequestQueue) {
        while let Some(front) = queue.request_queue.front() {
            match front.lock_mode {
                LockMode::Exclusive => {
                    if queue.exclusive_lock_holder == INVALID_TXN_ID
                        && queue.shared_lock_holders.is_empty()
                    {
                        let request = queue.request_queue.pop_front().unwrap();
                        queue.exclusive_lock_holder = request.txn_id;
                        if queue.upgrading == request.txn_id {
                            queue.upgrading = INVALID_TXN_ID;
                        }
                    }
                    break;
                }
                LockMode::Shared => {
                    if queue.exclusive_lock_holder != INVALID_TXN_ID {
                        break;
                    }
                    let request = queue.request_queue.pop_front().unwrap();
                    queue.shared_lock_holders.insert(request.txn_id);
                }
            }
        }
    }

    /// Scrubs every trace of `txn_id` from a queue (waiting entry, upgrade
    /// reservation, held lock), then re-grants and wakes waiters.
    fn abandon(queue: &mut LockRequestQueue, txn_id: TxnId) {
        queue.request_queue.retain(|request| request.txn_id != txn_id);
        if queue.upgrading == txn_id {
            queue.upgrading = INVALID_TXN_ID;
        }
        if queue.exclusive_lock_holder == txn_id {
            queue.exclusive_lock_holder = INVALID_TXN_ID;
        }
        queue.shared_lock_holders.remove(&txn_id);
        Self::grant_waiters(queue);
        queue.cv.notify_all();
    }
}
