use crate::catalog::schema::Schema;
use crate::storage::table::tuple::Tuple;
use crate::types_db::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
}

/// Expression tree evaluated over tuples. `tuple_idx` selects the side in
/// a join evaluation (0 = left/outer, 1 = right/inner) and is ignored for
/// single-tuple evaluation.
#[derive(Debug, Clone)]
pub enum Expression {
    ColumnValue {
        tuple_idx: usize,
        col_idx: usize,
    },
    Constant(Value),
    Comparison {
        op: ComparisonOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
}

impl Expression {
    /// Column of the (single) input tuple.
    pub fn column(col_idx: usize) -> Self {
        Expression::ColumnValue {
            tuple_idx: 0,
            col_idx,
        }
    }

    pub fn constant(value: Value) -> Self {
        Expression::Constant(value)
    }

    pub fn comparison(op: ComparisonOp, left: Expression, right: Expression) -> Self {
        Expression::Comparison {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Evaluates against a single tuple.
    pub fn evaluate(&self, tuple: &Tuple, schema: &Schema) -> Value {
        match self {
            Expression::ColumnValue { col_idx, .. } => {
                debug_assert!(*col_idx < schema.get_column_count());
                tuple.get_value(*col_idx).clone()
            }
            Expression::Constant(value) => value.clone(),
            Expression::Comparison { op, left, right } => Self::compare(
                *op,
                &left.evaluate(tuple, schema),
                &right.evaluate(tuple, schema),
            ),
        }
    }

    /// Evaluates against a pair of join inputs.
    pub fn evaluate_join(
        &self,
        left_tuple: &Tuple,
        left_schema: &Schema,
        right_tuple: &Tuple,
        right_schema: &Schema,
    ) -> Value {
        match self {
            Expression::ColumnValue { tuple_idx, col_idx } => {
                if *tuple_idx == 0 {
                    debug_assert!(*col_idx < left_schema.get_column_count());
                    left_tuple.get_value(*col_idx).clone()
                } else {
                    debug_assert!(*col_idx < right_schema.get_column_count());
                    right_tuple.get_value(*col_idx).clone()
                }
            }
            Expression::Constant(value) => value.clone(),
            Expression::Comparison { op, left, right } => Self::compare(
                *op,
                &left.evaluate_join(left_tuple, left_schema, right_tuple, right_schema),
                &right.evaluate_join(left_tuple, left_schema, right_tuple, right_schema),
            ),
        }
    }

    fn compare(op: ComparisonOp, lhs: &Value, rhs: &Value) -> Value {
        if lhs.is_null() || rhs.is_null() {
            return Value::Null;
        }
        let result = match op {
            ComparisonOp::Equal => lhs == rhs,
            ComparisonOp::NotEqual => lhs != rhs,
            ComparisonOp::LessThan => lhs < rhs,
            ComparisonOp::GreaterThan => lhs > rhs,
        };
        Value::Boolean(result)
    }
}
