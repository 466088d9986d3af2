/// The column types the executors evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeId {
    Boolean,
    Integer,
    Varchar,
}
