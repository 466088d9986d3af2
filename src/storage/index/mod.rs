pub mod codec;
pub mod int_comparator;
