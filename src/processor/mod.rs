pub mod payload_builder;
pub mod run_driver;
