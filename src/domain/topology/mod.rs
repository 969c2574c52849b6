pub mod feature;
pub mod node;
pub mod node_config;
pub mod node_generator;
pub mod switch_tree;
pub mod topology;
pub mod topology_generator;
