use std::collections::HashMap;

use crate::catalog::schema::Schema;
use crate::common::rid::RID;
use crate::execution::executors::abstract_executor::AbstractExecutor;
use crate::execution::plans::HashJoinPlanNode;
use crate::storage::table::tuple::Tuple;
use crate::types_db::value::Value;

/// Equi-join: builds a hash table over the left child keyed by the join
/// attribute, then probes it with the right child. Matches for a probe
/// tuple are buffered so duplicate join keys on the left are all emitted.
pub struct HashJoinExecutor {
    plan: HashJoinPlanNode,
    left_executor: Box<dyn AbstractExecutor>,
    right_executor: Box<dyn AbstractExecutor>,
    output_schema: Schema,
    hash_table: HashMap<Value, Vec<Tuple>>,
    output_buffer: Vec<Tuple>,
    buffer_idx: usize,
}

impl HashJoinExecutor {
    pub fn new(
        plan: HashJoinPlanNode,
        left_executor: Box<dyn AbstractExecutor>,
        right_executor: Box<dyn AbstractExecutor>,
    ) -> Self {
        let output_schema = Schema::join(
            left_executor.get_output_schema(),
            right_executor.get_output_schema(),
        );
        Self {
            plan,
            left_executor,
            right_executor,
            output_schema,
            hash_table: HashMap::new(),
            output_buffer: Vec::new(),
            buffer_idx: 0,
        }
    }

    fn joined_tuple(left: &Tuple, right: &Tuple) -> Tuple {
        let mut values = left.get_values().to_vec();
        values.extend(right.get_values().iter().cloned());
        Tuple::new(values)
    }
}

impl AbstractExecutor for HashJoinExecutor {
    fn init(&mut self) {
        self.left_executor.init();
        self.right_executor.init();
        self.hash_table.clear();
        self.output_buffer.clear();
        self.buffer_idx = 0;

        let left_schema = self.left_executor.get_output_schema().clone();
        while let Some((tuple, _)) = self.left_executor.next() {
            let key = self.plan.left_key.evaluate(&tuple, &left_schema);
            self.hash_table.entry(key).or_default().push(tuple);
        }
    }

    fn next(&mut self) -> Option<(Tuple, RID)> {
        if self.hash_table.is_empty() {
            return None;
        }
        loop {
            if self.buffer_idx < self.output_buffer.len() {
                let tuple = self.output_buffer[self.buffer_idx].clone();
                self.buffer_idx += 1;
                let rid = tuple.get_rid();
                return Some((tuple, rid));
            }

            let right_schema = self.right_executor.get_output_schema().clone();
            let (right_tuple, _) = self.right_executor.next()?;
            let key = self.plan.right_key.evaluate(&right_tuple, &right_schema);
            if let Some(matches) = self.hash_table.get(&key) {
                self.output_buffer.clear();
                self.buffer_idx = 0;
                for left_tuple in matches {
                    self.output_buffer
                        .push(Self::joined_tuple(left_tuple, &right_tuple));
                }
            }
        }
    }

    fn get_output_schema(&self) -> &Schema {
        &self.output_schema
    }
}
