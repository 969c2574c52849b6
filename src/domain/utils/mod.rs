pub mod id;
pub mod random;
pub mod statistics;
