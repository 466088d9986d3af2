use crate::catalog::schema::Schema;
use crate::common::rid::RID;
use crate::execution::executors::abstract_executor::AbstractExecutor;
use crate::execution::plans::NestedLoopJoinPlanNode;
use crate::storage::table::tuple::Tuple;

/// Joins two children with a nested loop, emitting the concatenation of
/// every left/right pair that satisfies the join predicate. The right
/// child is re-initialized for each left tuple.
pub struct NestedLoopJoinExecutor {
    plan: NestedLoopJoinPlanNode,
    left_executor: Box<dyn AbstractExecutor>,
    right_executor: Box<dyn AbstractExecutor>,
    output_schema: Schema,
    left_tuple: Option<Tuple>,
}

impl NestedLoopJoinExecutor {
    pub fn new(
        plan: NestedLoopJoinPlanNode,
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
            left_tuple: None,
        }
    }

    fn joined_tuple(left: &Tuple, right: &Tuple) -> Tuple {
        let mut values = left.get_values().to_vec();
        values.extend(right.get_values().iter().cloned());
        Tuple::new(values)
    }
}

impl AbstractExecutor for NestedLoopJoinExecutor {
    fn init(&mut self) {
        self.left_executor.init();
        self.right_executor.init();
        self.left_tuple = self.left_executor.next().map(|(tuple, _)| tuple);
    }

    fn next(&mut self) -> Option<(Tuple, RID)> {
        let left_schema = self.left_executor.get_output_schema().clone();
        let right_schema = self.right_executor.get_output_schema().clone();
        while let Some(left_tuple) = self.left_tuple.clone() {
            while let Some((right_tuple, _)) = self.right_executor.next() {
                let satisfied = self
                    .plan
                    .predicate
                    .evaluate_join(&left_tuple, &left_schema, &right_tuple, &right_schema)
                    .as_bool();
                if satisfied {
                    let joined = Self::joined_tuple(&left_tuple, &right_tuple);
                    let rid = joined.get_rid();
                    return Some((joined, rid));
                }
            }
            self.right_executor.init();
            self.left_tuple = self.left_executor.next().map(|(tuple, _)| tuple);
        }
        None
    }

    fn get_output_schema(&self) -> &Schema {
        &self.output_schema
    }
}
