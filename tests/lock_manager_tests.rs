use std::sync::Arc;
use std::thread;
use std::time::Duration;

use granite::common::logger::initialize_logger;
use granite::common::rid::RID;
use granite::concurrency::lock_manager::LockManager;
use granite::concurrency::transaction::{IsolationLevel, Transaction, TransactionState};
use granite::concurrency::transaction_manager::TransactionManager;

struct TestContext {
    txn_manager: Arc<TransactionManager>,
    lock_manager: Arc<LockManager>,
}

impl TestContext {
    fn new() -> Self {
        initialize_logger();
        let txn_manager = Arc::new(TransactionManager::new());
        let lock_manager = Arc::new(LockManager::new(Arc::clone(&txn_manager)));
        Self {
            txn_manager,
            lock_manager,
        }
    }

    fn begin(&self, isolation_level: IsolationLevel) -> Arc<Transaction> {
        self.txn_manager.begin(isolation_level)
    }
}

fn settle() {
    thread::sleep(Duration::from_millis(200));
}

#[test]
fn shared_locks_are_compatible() {
    let ctx = TestContext::new();
    let older = ctx.begin(IsolationLevel::RepeatableRead);
    let younger = ctx.begin(IsolationLevel::RepeatableRead);
    let rid = RID::new(0, 0);

    assert!(ctx.lock_manager.lock_shared(&older, rid));
    assert!(ctx.lock_manager.lock_shared(&younger, rid));
    assert!(older.is_shared_locked(&rid));
    assert!(younger.is_shared_locked(&rid));
    assert_eq!(older.get_state(), TransactionState::Growing);
    assert_eq!(younger.get_state(), TransactionState::Growing);

    assert!(ctx.lock_manager.unlock(&older, rid));
    assert!(ctx.lock_manager.unlock(&younger, rid));
    assert!(!older.is_shared_locked(&rid));
}

#[test]
fn repeat_lock_requests_are_idempotent() {
    let ctx = TestContext::new();
    let txn = ctx.begin(IsolationLevel::RepeatableRead);
    let rid = RID::new(0, 0);

    assert!(ctx.lock_manager.lock_shared(&txn, rid));
    assert!(ctx.lock_manager.lock_shared(&txn, rid));
    assert!(ctx.lock_manager.lock_exclusive(&txn, rid));
    assert!(ctx.lock_manager.lock_exclusive(&txn, rid));
    assert!(txn.is_exclusive_locked(&rid));
    assert!(!txn.is_shared_locked(&rid));
}

#[test]
fn wound_exclusive_holder() {
    let ctx = TestContext::new();
    let older = ctx.begin(IsolationLevel::RepeatableRead);
    let younger = ctx.begin(IsolationLevel::RepeatableRead);
    let rid = RID::new(0, 0);

    // The younger transaction grabs the lock first.
    assert!(ctx.lock_manager.lock_exclusive(&younger, rid));

    // The older transaction wounds it and takes the lock immediately.
    assert!(ctx.lock_manager.lock_exclusive(&older, rid));
    assert_eq!(younger.get_state(), TransactionState::Aborted);
    assert!(older.is_exclusive_locked(&rid));

    // Any further lock request from the wounded transaction fails fast.
    assert!(!ctx.lock_manager.lock_shared(&younger, RID::new(0, 1)));
}

#[test]
fn younger_waits_for_older() {
    let ctx = TestContext::new();
    let older = ctx.begin(IsolationLevel::RepeatableRead);
    let younger = ctx.begin(IsolationLevel::RepeatableRead);
    let rid = RID::new(0, 0);

    assert!(ctx.lock_manager.lock_exclusive(&older, rid));

    let lock_manager = Arc::clone(&ctx.lock_manager);
    let waiter_txn = Arc::clone(&younger);
    let waiter = thread::spawn(move || lock_manager.lock_exclusive(&waiter_txn, rid));

    settle();
    // Still parked: the older holder has not released.
    assert!(!younger.is_exclusive_locked(&rid));

    assert!(ctx.lock_manager.unlock(&older, rid));
    assert!(waiter.join().unwrap());
    assert!(younger.is_exclusive_locked(&rid));
}

#[test]
fn wound_waiting_transaction() {
    let ctx = TestContext::new();
    let oldest = ctx.begin(IsolationLevel::RepeatableRead);
    let middle = ctx.begin(IsolationLevel::RepeatableRead);
    let youngest = ctx.begin(IsolationLevel::RepeatableRead);
    let rid = RID::new(0, 0);

    assert!(ctx.lock_manager.lock_exclusive(&middle, rid));

    let lock_manager = Arc::clone(&ctx.lock_manager);
    let waiter_txn = Arc::clone(&youngest);
    let waiter = thread::spawn(move || lock_manager.lock_exclusive(&waiter_txn, rid));
    settle();

    // The oldest transaction wounds both the holder and the queued waiter.
    assert!(ctx.lock_manager.lock_exclusive(&oldest, rid));
    assert!(!waiter.join().unwrap());
    assert_eq!(middle.get_state(), TransactionState::Aborted);
    assert_eq!(youngest.get_state(), TransactionState::Aborted);
    assert!(oldest.is_exclusive_locked(&rid));
}

#[test]
fn shared_request_waits_for_older_exclusive_holder() {
    let ctx = TestContext::new();
    let older = ctx.begin(IsolationLevel::RepeatableRead);
    let younger = ctx.begin(IsolationLevel::RepeatableRead);
    let rid = RID::new(0, 0);

    assert!(ctx.lock_manager.lock_exclusive(&older, rid));

    let lock_manager = Arc::clone(&ctx.lock_manager);
    let reader_txn = Arc::clone(&younger);
    let reader = thread::spawn(move || lock_manager.lock_shared(&reader_txn, rid));
    settle();
    // The younger reader must not slip into the shared holder set while
    // the older writer still holds the record.
    assert!(!younger.is_shared_locked(&rid));

    assert!(ctx.lock_manager.unlock(&older, rid));
    assert!(reader.join().unwrap());
    assert!(younger.is_shared_locked(&rid));
}

#[test]
fn shared_request_wounds_younger_exclusive_holder() {
    let ctx = TestContext::new();
    let older = ctx.begin(IsolationLevel::RepeatableRead);
    let younger = ctx.begin(IsolationLevel::RepeatableRead);
    let rid = RID::new(0, 0);

    assert!(ctx.lock_manager.lock_exclusive(&younger, rid));
    assert!(ctx.lock_manager.lock_shared(&older, rid));
    assert_eq!(younger.get_state(), TransactionState::Aborted);
    assert!(older.is_shared_locked(&rid));
}

#[test]
fn upgrade_without_contention() {
    let ctx = TestContext::new();
    let txn = ctx.begin(IsolationLevel::RepeatableRead);
    let rid = RID::new(0, 0);

    assert!(ctx.lock_manager.lock_shared(&txn, rid));
    // lock_exclusive on a shared-held record routes through the upgrade.
    assert!(ctx.lock_manager.lock_exclusive(&txn, rid));
    assert!(txn.is_exclusive_locked(&rid));
    assert!(!txn.is_shared_locked(&rid));
}

#[test]
fn upgrade_conflict_aborts_second_upgrader() {
    let ctx = TestContext::new();
    let first = ctx.begin(IsolationLevel::RepeatableRead);
    let second = ctx.begin(IsolationLevel::RepeatableRead);
    let rid = RID::new(0, 0);

    assert!(ctx.lock_manager.lock_shared(&first, rid));
    assert!(ctx.lock_manager.lock_shared(&second, rid));

    // The younger holder starts an upgrade; it waits because the older
    // transaction still holds the record shared.
    let lock_manager = Arc::clone(&ctx.lock_manager);
    let upgrader_txn = Arc::clone(&second);
    let upgrader = thread::spawn(move || lock_manager.lock_upgrade(&upgrader_txn, rid));
    settle();

    // A second concurrent upgrade on the same record is an upgrade
    // conflict: the requester aborts itself.
    assert!(!ctx.lock_manager.lock_upgrade(&first, rid));
    assert_eq!(first.get_state(), TransactionState::Aborted);

    // Releasing the aborted transaction's locks lets the first upgrader
    // through.
    ctx.txn_manager.abort(&first, &ctx.lock_manager);
    assert!(upgrader.join().unwrap());
    assert!(second.is_exclusive_locked(&rid));
    assert!(!second.is_shared_locked(&rid));
}

#[test]
fn two_phase_locking_violation_aborts() {
    let ctx = TestContext::new();
    let txn = ctx.begin(IsolationLevel::RepeatableRead);
    let r1 = RID::new(0, 0);
    let r2 = RID::new(0, 1);

    assert!(ctx.lock_manager.lock_shared(&txn, r1));
    assert!(ctx.lock_manager.unlock(&txn, r1));
    assert_eq!(txn.get_state(), TransactionState::Shrinking);

    // A REPEATABLE_READ transaction in the shrinking phase acquires
    // nothing further.
    assert!(!ctx.lock_manager.lock_shared(&txn, r2));
    assert_eq!(txn.get_state(), TransactionState::Aborted);
}

#[test]
fn read_uncommitted_rejects_shared_locks() {
    let ctx = TestContext::new();
    let txn = ctx.begin(IsolationLevel::ReadUncommitted);
    let rid = RID::new(0, 0);

    assert!(!ctx.lock_manager.lock_shared(&txn, rid));
    assert_eq!(txn.get_state(), TransactionState::Aborted);
}

#[test]
fn read_committed_releases_shared_while_growing() {
    let ctx = TestContext::new();
    let txn = ctx.begin(IsolationLevel::ReadCommitted);
    let r1 = RID::new(0, 0);
    let r2 = RID::new(0, 1);

    assert!(ctx.lock_manager.lock_shared(&txn, r1));
    assert!(ctx.lock_manager.unlock(&txn, r1));
    // Unlike REPEATABLE_READ, the transaction keeps growing.
    assert_eq!(txn.get_state(), TransactionState::Growing);
    assert!(ctx.lock_manager.lock_shared(&txn, r2));
    assert!(ctx.lock_manager.lock_exclusive(&txn, RID::new(0, 2)));
}

#[test]
fn exclusive_lock_in_shrinking_phase_aborts() {
    let ctx = TestContext::new();
    let txn = ctx.begin(IsolationLevel::RepeatableRead);
    let r1 = RID::new(0, 0);

    assert!(ctx.lock_manager.lock_shared(&txn, r1));
    assert!(ctx.lock_manager.unlock(&txn, r1));
    assert!(!ctx.lock_manager.lock_exclusive(&txn, RID::new(0, 1)));
    assert_eq!(txn.get_state(), TransactionState::Aborted);
}

#[test]
fn commit_releases_locks_and_wakes_waiters() {
    let ctx = TestContext::new();
    let older = ctx.begin(IsolationLevel::RepeatableRead);
    let younger = ctx.begin(IsolationLevel::RepeatableRead);
    let rid = RID::new(0, 0);

    assert!(ctx.lock_manager.lock_exclusive(&older, rid));

    let lock_manager = Arc::clone(&ctx.lock_manager);
    let waiter_txn = Arc::clone(&younger);
    let waiter = thread::spawn(move || lock_manager.lock_exclusive(&waiter_txn, rid));
    settle();

    assert!(ctx.txn_manager.commit(&older, &ctx.lock_manager));
    assert!(waiter.join().unwrap());
    assert!(younger.is_exclusive_locked(&rid));
    assert!(older.exclusive_lock_set().is_empty());
}

#[test]
fn wound_wait_stress_makes_progress() {
    let ctx = TestContext::new();
    const THREADS: usize = 8;
    const ROUNDS: usize = 40;

    let mut handles = Vec::new();
    for seed in 0..THREADS {
        let txn_manager = Arc::clone(&ctx.txn_manager);
        let lock_manager = Arc::clone(&ctx.lock_manager);
        handles.push(thread::spawn(move || {
            let mut committed = 0usize;
            let mut txn = txn_manager.begin(IsolationLevel::RepeatableRead);
            for round in 0..ROUNDS {
                // Walk the rid space in a thread-specific order so lock
                // conflicts (and wounds) actually happen.
                let rid_a = RID::new(((seed + round) % 4) as u64, 0);
                let rid_b = RID::new(((seed * 3 + round) % 4) as u64, 1);

                let ok = lock_manager.lock_shared(&txn, rid_a)
                    && lock_manager.lock_exclusive(&txn, rid_b);
                if ok {
                    if txn_manager.commit(&txn, &lock_manager) {
                        committed += 1;
                    }
                } else {
                    txn_manager.abort(&txn, &lock_manager);
                }
                txn = txn_manager.begin(IsolationLevel::RepeatableRead);
            }
            txn_manager.abort(&txn, &lock_manager);
            committed
        }));
    }

    let mut total_committed = 0;
    for handle in handles {
        // The join itself is the deadlock-freedom check: every thread must
        // come back.
        total_committed += handle.join().unwrap();
    }
    assert!(total_committed > 0);
}
