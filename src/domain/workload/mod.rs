pub mod job;
pub mod job_generator;
pub mod user;
pub mod workload;

mod workload_tests;
