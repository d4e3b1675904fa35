// Test modules

pub mod common;
mod engine_test;
mod scenario_test;
