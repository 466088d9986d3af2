use std::collections::HashMap;

use crate::catalog::schema::Schema;
use crate::common::rid::RID;
use crate::execution::executors::abstract_executor::AbstractExecutor;
use crate::execution::expressions::ComparisonOp;
use crate::execution::plans::{AggregationPlanNode, AggregationType};
use crate::storage::table::tuple::Tuple;
use crate::types_db::value::Value;

/// Hash table mapping group-by keys to running aggregate values.
struct SimpleAggregationHashTable {
    agg_types: Vec<AggregationType>,
    table: HashMap<Vec<Value>, Vec<Value>>,
}

impl SimpleAggregationHashTable {
    fn new(agg_types: Vec<AggregationType>) -> Self {
        Self {
            agg_types,
            table: HashMap::new(),
        }
    }

    fn generate_initial_aggregate_value(&self) -> Vec<Value> {
        self.agg_types
            .iter()
            .map(|agg_type| match agg_type {
                AggregationType::CountStar => Value::Integer(0),
                _ => Value::Null,
            })
            .collect()
    }

    /// Folds one input row into the group's running aggregates.
    fn insert_combine(&mut self, key: Vec<Value>, inputs: &[Value]) {
        let initial = self.generate_initial_aggregate_value();
        let aggregates = self.table.entry(key).or_insert(initial);
        for (idx, agg_type) in self.agg_types.iter().enumerate() {
            let input = &inputs[idx];
            let current = &aggregates[idx];
            aggregates[idx] = match agg_type {
                AggregationType::CountStar => current.add(&Value::Integer(1)),
                AggregationType::Count => {
                    if input.is_null() {
                        current.clone()
                    } else if current.is_null() {
                        Value::Integer(1)
                    } else {
                        current.add(&Value::Integer(1))
                    }
                }
                AggregationType::Sum => {
                    if input.is_null() {
                        current.clone()
                    } else if current.is_null() {
                        input.clone()
                    } else {
                        current.add(input)
                    }
                }
                AggregationType::Min => {
                    if input.is_null() {
                        current.clone()
                    } else if current.is_null() || input < current {
                        input.clone()
                    } else {
                        current.clone()
                    }
                }
                AggregationType::Max => {
                    if input.is_null() {
                        current.clone()
                    } else if current.is_null() || input > current {
                        input.clone()
                    } else {
                        current.clone()
                    }
                }
            };
        }
    }
}

/// Hash aggregation: consumes the whole child on `init`, then iterates the
/// groups, applying the optional HAVING filter.
pub struct AggregationExecutor {
    plan: AggregationPlanNode,
    child_executor: Box<dyn AbstractExecutor>,
    output_schema: Schema,
    results: Vec<(Vec<Value>, Vec<Value>)>,
    cursor: usize,
}

impl AggregationExecutor {
    pub fn new(
        plan: AggregationPlanNode,
        child_executor: Box<dyn AbstractExecutor>,
        output_schema: Schema,
    ) -> Self {
        Self {
            plan,
            child_executor,
            output_schema,
            results: Vec::new(),
            cursor: 0,
        }
    }

    fn having_satisfied(&self, aggregates: &[Value]) -> bool {
        match &self.plan.having {
            None => true,
            Some(having) => {
                let lhs = &aggregates[having.agg_idx];
                if lhs.is_null() {
                    return false;
                }
                match having.op {
                    ComparisonOp::Equal => *lhs == having.value,
                    ComparisonOp::NotEqual => *lhs != having.value,
                    ComparisonOp::LessThan => *lhs < having.value,
                    ComparisonOp::GreaterThan => *lhs > having.value,
                }
            }
        }
    }
}

impl AbstractExecutor for AggregationExecutor {
    fn init(&mut self) {
        self.child_executor.init();
        let child_schema = self.child_executor.get_output_schema().clone();
        let mut aht = SimpleAggregationHashTable::new(self.plan.agg_types.clone());

        while let Some((tuple, _)) = self.child_executor.next() {
            let key: Vec<Value> = self
                .plan
                .group_bys
                .iter()
                .map(|expr| expr.evaluate(&tuple, &child_schema))
                .collect();
            let inputs: Vec<Value> = self
                .plan
                .aggregates
                .iter()
                .map(|expr| expr.evaluate(&tuple, &child_schema))
                .collect();
            aht.insert_combine(key, &inputs);
        }

        let mut results: Vec<(Vec<Value>, Vec<Value>)> = aht.table.into_iter().collect();
        // Group order is irrelevant to correctness; sort for stable output.
        results.sort();
        self.results = results;
        self.cursor = 0;
    }

    fn next(&mut self) -> Option<(Tuple, RID)> {
        while self.cursor < self.results.len() {
            let (group_bys, aggregates) = &self.results[self.cursor];
            self.cursor += 1;
            if !self.having_satisfied(aggregates) {
                continue;
            }
            let mut values = group_bys.clone();
            values.extend(aggregates.iter().cloned());
            let tuple = Tuple::new(values);
            let rid = tuple.get_rid();
            return Some((tuple, rid));
        }
        None
    }

    fn get_output_schema(&self) -> &Schema {
        &self.output_schema
    }
}
