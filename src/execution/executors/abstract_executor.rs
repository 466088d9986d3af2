use crate::catalog::schema::Schema;
use crate::common::rid::RID;
use crate::storage::table::tuple::Tuple;

/// The Volcano tuple-at-a-time iterator model: the minimal interface every
/// executor supports.
pub trait AbstractExecutor {
    /// Initialize the executor. Must be called before `next()`.
    fn init(&mut self);

    /// Yield the next tuple, or `None` when the executor is exhausted.
    fn next(&mut self) -> Option<(Tuple, RID)>;

    /// The schema of the tuples this executor produces.
    fn get_output_schema(&self) -> &Schema;
}
