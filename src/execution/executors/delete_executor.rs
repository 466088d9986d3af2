use std::sync::Arc;

use crate::catalog::catalog::TableInfo;
use crate::catalog::schema::Schema;
use crate::common::rid::RID;
use crate::execution::executor_context::ExecutorContext;
use crate::execution::executors::abstract_executor::AbstractExecutor;
use crate::execution::plans::DeletePlanNode;
use crate::storage::table::tuple::Tuple;

/// Deletes every row the child produces, under an exclusive record lock,
/// and removes the rows' index entries.
pub struct DeleteExecutor {
    exec_ctx: Arc<ExecutorContext>,
    child_executor: Box<dyn AbstractExecutor>,
    table_info: Arc<TableInfo>,
    output_schema: Schema,
}

impl DeleteExecutor {
    pub fn new(
        exec_ctx: Arc<ExecutorContext>,
        plan: DeletePlanNode,
        child_executor: Box<dyn AbstractExecutor>,
    ) -> Self {
        let table_info = exec_ctx
            .get_catalog()
            .get_table(plan.table_oid)
            .expect("delete from unknown table");
        let output_schema = table_info.get_schema().clone();
        Self {
            exec_ctx,
            child_executor,
            table_info,
            output_schema,
        }
    }
}

impl AbstractExecutor for DeleteExecutor {
    fn init(&mut self) {
        self.child_executor.init();
    }

    fn next(&mut self) -> Option<(Tuple, RID)> {
        let (tuple, rid) = self.child_executor.next()?;

        let txn = self.exec_ctx.get_transaction();
        if !self.exec_ctx.get_lock_manager().lock_exclusive(txn, rid) {
            return None;
        }
        if !self.table_info.get_table().mark_delete(rid) {
            return None;
        }

        let catalog = self.exec_ctx.get_catalog();
        for index_info in catalog.get_table_indexes(self.table_info.get_name()) {
            if let Some(key) = tuple.get_value(index_info.get_key_attr()).as_i64() {
                index_info
                    .get_index()
                    .remove(Some(txn.as_ref()), &key, &rid);
            }
        }
        Some((tuple, rid))
    }

    fn get_output_schema(&self) -> &Schema {
        &self.output_schema
    }
}
