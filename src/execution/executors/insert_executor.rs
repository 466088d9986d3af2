use std::sync::Arc;

use crate::catalog::catalog::TableInfo;
use crate::catalog::schema::Schema;
use crate::common::rid::RID;
use crate::execution::executor_context::ExecutorContext;
use crate::execution::executors::abstract_executor::AbstractExecutor;
use crate::execution::plans::InsertPlanNode;
use crate::storage::table::tuple::Tuple;

/// Inserts rows into a table, either from the plan's raw values or from a
/// child executor, and keeps the table's indexes in step.
pub struct InsertExecutor {
    exec_ctx: Arc<ExecutorContext>,
    plan: InsertPlanNode,
    child_executor: Option<Box<dyn AbstractExecutor>>,
    table_info: Arc<TableInfo>,
    output_schema: Schema,
    raw_idx: usize,
}

impl InsertExecutor {
    pub fn new(
        exec_ctx: Arc<ExecutorContext>,
        plan: InsertPlanNode,
        child_executor: Option<Box<dyn AbstractExecutor>>,
    ) -> Self {
        let table_info = exec_ctx
            .get_catalog()
            .get_table(plan.table_oid)
            .expect("insert into unknown table");
        let output_schema = table_info.get_schema().clone();
        Self {
            exec_ctx,
            plan,
            child_executor,
            table_info,
            output_schema,
            raw_idx: 0,
        }
    }

    fn next_input(&mut self) -> Option<Tuple> {
        match &self.plan.raw_values {
            Some(raw_values) => {
                let values = raw_values.get(self.raw_idx)?.clone();
                self.raw_idx += 1;
                Some(Tuple::new(values))
            }
            None => {
                let child = self
                    .child_executor
                    .as_mut()
                    .expect("insert plan needs raw values or a child");
                child.next().map(|(tuple, _)| tuple)
            }
        }
    }
}

impl AbstractExecutor for InsertExecutor {
    fn init(&mut self) {
        self.raw_idx = 0;
        if let Some(child) = self.child_executor.as_mut() {
            child.init();
        }
    }

    fn next(&mut self) -> Option<(Tuple, RID)> {
        let tuple = self.next_input()?;
        let rid = self.table_info.get_table().insert_tuple(tuple.clone());

        let catalog = self.exec_ctx.get_catalog();
        for index_info in catalog.get_table_indexes(self.table_info.get_name()) {
            if let Some(key) = tuple.get_value(index_info.get_key_attr()).as_i64() {
                index_info
                    .get_index()
                    .insert(Some(self.exec_ctx.get_transaction().as_ref()), &key, &rid);
            }
        }
        let mut tuple = tuple;
        tuple.set_rid(rid);
        Some((tuple, rid))
    }

    fn get_output_schema(&self) -> &Schema {
        &self.output_schema
    }
}
