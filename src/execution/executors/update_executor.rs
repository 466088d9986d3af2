use std::sync::Arc;

use crate::catalog::catalog::TableInfo;
use crate::catalog::schema::Schema;
use crate::common::rid::RID;
use crate::execution::executor_context::ExecutorContext;
use crate::execution::executors::abstract_executor::AbstractExecutor;
use crate::execution::plans::{UpdatePlanNode, UpdateType};
use crate::storage::table::tuple::Tuple;
use crate::types_db::value::Value;

/// Applies column updates to every row the child produces, under an
/// exclusive record lock (upgrading a shared lock where one is held).
pub struct UpdateExecutor {
    exec_ctx: Arc<ExecutorContext>,
    plan: UpdatePlanNode,
    child_executor: Box<dyn AbstractExecutor>,
    table_info: Arc<TableInfo>,
    output_schema: Schema,
}

impl UpdateExecutor {
    pub fn new(
        exec_ctx: Arc<ExecutorContext>,
        plan: UpdatePlanNode,
        child_executor: Box<dyn AbstractExecutor>,
    ) -> Self {
        let table_info = exec_ctx
            .get_catalog()
            .get_table(plan.table_oid)
            .expect("update of unknown table");
        let output_schema = table_info.get_schema().clone();
        Self {
            exec_ctx,
            plan,
            child_executor,
            table_info,
            output_schema,
        }
    }

    fn generate_updated_tuple(&self, src_tuple: &Tuple) -> Tuple {
        let col_count = self.output_schema.get_column_count();
        let mut values = Vec::with_capacity(col_count);
        for idx in 0..col_count {
            let old_value = src_tuple.get_value(idx);
            match self.plan.update_attrs.get(&idx) {
                None => values.push(old_value.clone()),
                Some(info) => match info.update_type {
                    UpdateType::Set => values.push(Value::Integer(info.update_val)),
                    UpdateType::Add => {
                        values.push(old_value.add(&Value::Integer(info.update_val)))
                    }
                },
            }
        }
        Tuple::new(values)
    }
}

impl AbstractExecutor for UpdateExecutor {
    fn init(&mut self) {
        self.child_executor.init();
    }

    fn next(&mut self) -> Option<(Tuple, RID)> {
        let (old_tuple, rid) = self.child_executor.next()?;
        let new_tuple = self.generate_updated_tuple(&old_tuple);

        let txn = self.exec_ctx.get_transaction();
        if !self.exec_ctx.get_lock_manager().lock_exclusive(txn, rid) {
            return None;
        }
        if !self.table_info.get_table().update_tuple(rid, new_tuple.clone()) {
            return None;
        }

        let catalog = self.exec_ctx.get_catalog();
        for index_info in catalog.get_table_indexes(self.table_info.get_name()) {
            let key_attr = index_info.get_key_attr();
            let index = index_info.get_index();
            if let Some(old_key) = old_tuple.get_value(key_attr).as_i64() {
                index.remove(Some(txn.as_ref()), &old_key, &rid);
            }
            if let Some(new_key) = new_tuple.get_value(key_attr).as_i64() {
                index.insert(Some(txn.as_ref()), &new_key, &rid);
            }
        }
        let mut new_tuple = new_tuple;
        new_tuple.set_rid(rid);
        Some((new_tuple, rid))
    }

    fn get_output_schema(&self) -> &Schema {
        &self.output_schema
    }
}
