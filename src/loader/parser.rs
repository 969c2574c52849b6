use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::domain::topology::node::Node;
use crate::domain::topology::node_config::parse_node_config;
use crate::domain::topology::switch_tree::parse_topology;
use crate::domain::topology::topology::Topology;
use crate::domain::utils::id::{AccountName, UserName};
use crate::domain::workload::user::{User, parse_users};
use crate::error::Result;

/// Parses a JSON file into a given type `T`.
///
/// Errors are automatically converted into `crate::error::Error` variants:
/// - `Error::IoError` if the file cannot be read.
/// - `Error::DeserializationError` if the JSON is malformed.
pub fn parse_json_file<T: DeserializeOwned>(file_path: impl AsRef<Path>) -> Result<T> {
    let data = fs::read_to_string(file_path)?;
    let parsed_data: T = serde_json::from_str(&data)?;

    Ok(parsed_data)
}

/// Reads the `NodeName=` lines of a `slurm.conf`. Every other line is ignored.
pub fn read_node_config(file_path: impl AsRef<Path>) -> Result<Vec<Node>> {
    let text = fs::read_to_string(file_path)?;
    Ok(parse_node_config(&text)?)
}

/// Reads a `topology.conf` whose node ranges are resolved against `nodes`.
pub fn read_topology(nodes: &[Node], file_path: impl AsRef<Path>) -> Result<Topology> {
    let text = fs::read_to_string(file_path)?;
    Ok(parse_topology(nodes, &text)?)
}

/// Reads a `users.sim` file.
pub fn read_users(file_path: impl AsRef<Path>) -> Result<Vec<User>> {
    let text = fs::read_to_string(file_path)?;
    Ok(parse_users(&text)?)
}

/// Reads a JSON object mapping user names to account names.
pub fn read_accounts(file_path: impl AsRef<Path>) -> Result<HashMap<UserName, AccountName>> {
    let raw: HashMap<String, String> = parse_json_file(file_path)?;
    Ok(raw.into_iter().map(|(user, account)| (UserName::new(user), AccountName::new(account))).collect())
}
