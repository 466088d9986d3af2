use std::sync::Arc;

use crate::buffer::buffer_pool_manager::BufferPoolManager;
use crate::catalog::catalog::Catalog;
use crate::concurrency::lock_manager::LockManager;
use crate::concurrency::transaction::Transaction;
use crate::concurrency::transaction_manager::TransactionManager;

/// Everything an executor needs to run: the transaction it runs inside and
/// handles to the shared engine components.
pub struct ExecutorContext {
    transaction: Arc<Transaction>,
    catalog: Arc<Catalog>,
    bpm: Arc<BufferPoolManager>,
    lock_manager: Arc<LockManager>,
    transaction_manager: Arc<TransactionManager>,
}

impl ExecutorContext {
    pub fn new(
        transaction: Arc<Transaction>,
        catalog: Arc<Catalog>,
        bpm: Arc<BufferPoolManager>,
        lock_manager: Arc<LockManager>,
        transaction_manager: Arc<TransactionManager>,
    ) -> Self {
        Self {
            transaction,
            catalog,
            bpm,
            lock_manager,
            transaction_manager,
        }
    }

    pub fn get_transaction(&self) -> &Arc<Transaction> {
        &self.transaction
    }

    pub fn get_catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn get_buffer_pool_manager(&self) -> &Arc<BufferPoolManager> {
        &self.bpm
    }

    pub fn get_lock_manager(&self) -> &Arc<LockManager> {
        &self.lock_manager
    }

    pub fn get_transaction_manager(&self) -> &Arc<TransactionManager> {
        &self.transaction_manager
    }
}
