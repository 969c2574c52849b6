pub mod scenario;
pub mod topology;
pub mod utils;
pub mod workload;
