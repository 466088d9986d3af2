pub mod table_heap;
pub mod tuple;
