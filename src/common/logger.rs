use env_logger::Builder;
use log::LevelFilter;
use std::sync::Once;

static INIT: Once = Once::new();

pub fn initialize_logger() {
    INIT.call_once(|| {
        let mut builder = Builder::new();

        builder
            .filter_level(LevelFilter::Info)
            .filter_module("granite", LevelFilter::Debug)
            .filter_module("granite::buffer", LevelFilter::Debug)
            .filter_module("granite::container", LevelFilter::Debug)
            .filter_module("granite::concurrency", LevelFilter::Debug)
            .format_timestamp_millis()
            .parse_default_env()
            .is_test(true)
            .init();
    });
}
