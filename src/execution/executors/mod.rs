pub mod abstract_executor;
pub mod aggregation_executor;
pub mod delete_executor;
pub mod distinct_executor;
pub mod hash_join_executor;
pub mod insert_executor;
pub mod nested_loop_join_executor;
pub mod seq_scan_executor;
pub mod update_executor;
