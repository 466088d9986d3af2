use std::collections::HashMap;

use crate::common::config::Oid;
use crate::execution::expressions::{ComparisonOp, Expression};
use crate::types_db::value::Value;

/// Sequential scan over a table, with an optional filter predicate.
pub struct SeqScanPlanNode {
    pub table_oid: Oid,
    pub predicate: Option<Expression>,
}

/// Insert of raw value rows; when `raw_values` is `None` the executor
/// pulls rows from its child instead.
pub struct InsertPlanNode {
    pub table_oid: Oid,
    pub raw_values: Option<Vec<Vec<Value>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateType {
    Set,
    Add,
}

#[derive(Debug, Clone, Copy)]
pub struct UpdateInfo {
    pub update_type: UpdateType,
    pub update_val: i64,
}

/// Column-wise update applied to every row the child produces.
pub struct UpdatePlanNode {
    pub table_oid: Oid,
    pub update_attrs: HashMap<usize, UpdateInfo>,
}

/// Delete of every row the child produces.
pub struct DeletePlanNode {
    pub table_oid: Oid,
}

/// Nested-loop join on an arbitrary join predicate.
pub struct NestedLoopJoinPlanNode {
    pub predicate: Expression,
}

/// Hash join on a single equi-join attribute per side.
pub struct HashJoinPlanNode {
    pub left_key: Expression,
    pub right_key: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationType {
    CountStar,
    Count,
    Sum,
    Min,
    Max,
}

/// Hash aggregation with group-by columns and an optional HAVING filter on
/// one of the aggregates.
pub struct AggregationPlanNode {
    pub group_bys: Vec<Expression>,
    pub aggregates: Vec<Expression>,
    pub agg_types: Vec<AggregationType>,
    pub having: Option<HavingClause>,
}

#[derive(Debug, Clone)]
pub struct HavingClause {
    /// Index into `aggregates` of the value being filtered on.
    pub agg_idx: usize,
    pub op: ComparisonOp,
    pub value: Value,
}

/// Duplicate elimination over the child's full output tuples.
pub struct DistinctPlanNode;
