use std::sync::Arc;

use crate::catalog::catalog::TableInfo;
use crate::catalog::schema::Schema;
use crate::common::rid::RID;
use crate::concurrency::transaction::IsolationLevel;
use crate::execution::executor_context::ExecutorContext;
use crate::execution::executors::abstract_executor::AbstractExecutor;
use crate::execution::plans::SeqScanPlanNode;
use crate::storage::table::tuple::Tuple;

/// Executes a sequential table scan with an optional filter predicate.
///
/// Rows are read under a shared record lock unless the transaction runs at
/// READ_UNCOMMITTED; under READ_COMMITTED the lock is released as soon as
/// the row has been produced.
pub struct SeqScanExecutor {
    exec_ctx: Arc<ExecutorContext>,
    plan: SeqScanPlanNode,
    table_info: Arc<TableInfo>,
    output_schema: Schema,
    rids: Vec<RID>,
    cursor: usize,
}

impl SeqScanExecutor {
    pub fn new(exec_ctx: Arc<ExecutorContext>, plan: SeqScanPlanNode) -> Self {
        let table_info = exec_ctx
            .get_catalog()
            .get_table(plan.table_oid)
            .expect("seq scan over unknown table");
        let output_schema = table_info.get_schema().clone();
        Self {
            exec_ctx,
            plan,
            table_info,
            output_schema,
            rids: Vec::new(),
            cursor: 0,
        }
    }
}

impl AbstractExecutor for SeqScanExecutor {
    fn init(&mut self) {
        self.rids = self.table_info.get_table().scan();
        self.cursor = 0;
    }

    fn next(&mut self) -> Option<(Tuple, RID)> {
        let txn = self.exec_ctx.get_transaction();
        let lock_manager = self.exec_ctx.get_lock_manager();
        let isolation_level = txn.get_isolation_level();

        while self.cursor < self.rids.len() {
            let rid = self.rids[self.cursor];
            self.cursor += 1;

            let candidate = match self.table_info.get_table().get_tuple(rid) {
                Some(tuple) => tuple,
                None => continue,
            };
            if let Some(predicate) = &self.plan.predicate {
                if !predicate.evaluate(&candidate, &self.output_schema).as_bool() {
                    continue;
                }
            }

            if isolation_level != IsolationLevel::ReadUncommitted
                && !lock_manager.lock_shared(txn, rid)
            {
                return None;
            }
            // Re-read under the lock; the pre-lock value only drove the filter.
            let tuple = match self.table_info.get_table().get_tuple(rid) {
                Some(tuple) => tuple,
                None => continue,
            };
            if isolation_level == IsolationLevel::ReadCommitted
                && !lock_manager.unlock(txn, rid)
            {
                return None;
            }
            return Some((tuple, rid));
        }
        None
    }

    fn get_output_schema(&self) -> &Schema {
        &self.output_schema
    }
}
