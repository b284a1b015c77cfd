mod common;
mod aggregate_tests;
mod pipeline_tests;
mod scheduler_tests;
mod seen_tests;
