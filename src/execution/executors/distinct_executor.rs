use std::collections::HashSet;

use crate::catalog::schema::Schema;
use crate::common::rid::RID;
use crate::execution::executors::abstract_executor::AbstractExecutor;
use crate::execution::plans::DistinctPlanNode;
use crate::storage::table::tuple::Tuple;
use crate::types_db::value::Value;

/// Hash-based duplicate elimination over the child's full output tuples,
/// preserving first-seen order.
pub struct DistinctExecutor {
    _plan: DistinctPlanNode,
    child_executor: Box<dyn AbstractExecutor>,
    output_schema: Schema,
    results: Vec<Tuple>,
    cursor: usize,
}

impl DistinctExecutor {
    pub fn new(plan: DistinctPlanNode, child_executor: Box<dyn AbstractExecutor>) -> Self {
        let output_schema = child_executor.get_output_schema().clone();
        Self {
            _plan: plan,
            child_executor,
            output_schema,
            results: Vec::new(),
            cursor: 0,
        }
    }
}

impl AbstractExecutor for DistinctExecutor {
    fn init(&mut self) {
        self.child_executor.init();
        self.results.clear();
        self.cursor = 0;

        let mut seen: HashSet<Vec<Value>> = HashSet::new();
        while let Some((tuple, _)) = self.child_executor.next() {
            if seen.insert(tuple.get_values().to_vec()) {
                self.results.push(tuple);
            }
        }
    }

    fn next(&mut self) -> Option<(Tuple, RID)> {
        if self.cursor == self.results.len() {
            return None;
        }
        let tuple = self.results[self.cursor].clone();
        self.cursor += 1;
        let rid = tuple.get_rid();
        Some((tuple, rid))
    }

    fn get_output_schema(&self) -> &Schema {
        &self.output_schema
    }
}
