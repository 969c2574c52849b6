use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use crate::domain::topology::node::Node;
use crate::domain::topology::node_config::{format_gres_config, format_node_config};
use crate::domain::topology::switch_tree::print_topology;
use crate::domain::topology::topology::Topology;
use crate::domain::utils::id::{AccountName, UserName};
use crate::domain::utils::statistics::{StatisticEvent, write_statistics};
use crate::domain::workload::user::{User, print_users};
use crate::domain::workload::workload::{WorkloadEntry, format_events};
use crate::error::Result;

fn ensure_parent(file_path: &Path) -> Result<()> {
    if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn write_text(file_path: &Path, contents: &str) -> Result<()> {
    ensure_parent(file_path)?;
    fs::write(file_path, contents)?;
    log::debug!("Wrote {} bytes to '{}'", contents.len(), file_path.display());
    Ok(())
}

/// Writes the node lines of `slurm.conf`, optionally preceded by a `NodeName=DEFAULT` line.
pub fn write_node_config(file_path: impl AsRef<Path>, default: Option<&Node>, nodes: &[Node]) -> Result<()> {
    write_text(file_path.as_ref(), &format_node_config(default, nodes))
}

/// Writes `gres.conf`. Node groups without GPUs are left out, so the file may be empty.
pub fn write_gres_config(file_path: impl AsRef<Path>, nodes: &[Node]) -> Result<()> {
    write_text(file_path.as_ref(), &format_gres_config(nodes))
}

pub fn write_topology(file_path: impl AsRef<Path>, topology: &Topology) -> Result<()> {
    write_text(file_path.as_ref(), &print_topology(topology))
}

pub fn write_users(file_path: impl AsRef<Path>, users: &[User]) -> Result<()> {
    write_text(file_path.as_ref(), &print_users(users))
}

/// Writes the account mapping as a JSON object with sorted keys.
pub fn write_accounts(file_path: impl AsRef<Path>, accounts: &HashMap<UserName, AccountName>) -> Result<()> {
    let sorted: BTreeMap<&str, &str> = accounts.iter().map(|(user, account)| (user.as_str(), account.as_str())).collect();
    write_text(file_path.as_ref(), &serde_json::to_string_pretty(&sorted)?)
}

pub fn write_events(file_path: impl AsRef<Path>, entries: &[WorkloadEntry]) -> Result<()> {
    write_text(file_path.as_ref(), &format_events(entries))
}

/// Writes one statistics row per submission.
pub fn write_workload_statistics(file_path: impl AsRef<Path>, entries: &[WorkloadEntry]) -> Result<()> {
    let file_path = file_path.as_ref();
    ensure_parent(file_path)?;

    let events: Vec<StatisticEvent> = entries.iter().map(StatisticEvent::from).collect();
    write_statistics(BufWriter::new(File::create(file_path)?), &events)
}
