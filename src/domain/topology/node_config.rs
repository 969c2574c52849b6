//! `NodeName=` lines of `slurm.conf`.

use std::collections::HashMap;

use crate::domain::topology::node::{NameRange, Node, NodeCount};
use crate::error::ParseError;

pub const DEFAULT_NODE_NAME: &str = "DEFAULT";

/// Renders one node group in the fixed field order
/// `RealMemory Procs Sockets CoresPerSocket ThreadsPerCore Gres Feature`.
pub fn format_node(node: &Node) -> String {
    let mut fields = vec![format!("NodeName={}", node.name_range())];

    if node.memory_mb != 0 {
        fields.push(format!("RealMemory={}", node.memory_mb));
    }
    fields.push(format!("Procs={}", node.cores_per_machine));
    fields.push(format!("Sockets={}", node.sockets));
    fields.push(format!("CoresPerSocket={}", node.cores_per_socket()));
    fields.push(format!("ThreadsPerCore={}", node.threads_per_core));
    if node.gpus > 0 {
        fields.push(format!("Gres=gpu:{}", node.gpus));
    }
    if !node.features.is_empty() {
        fields.push(format!("Feature={}", node.features.join(",")));
    }
    fields.join(" ")
}

/// Renders all node groups, preceded by the `DEFAULT` pseudo-node when one is given.
pub fn format_node_config(default: Option<&Node>, nodes: &[Node]) -> String {
    let mut out = String::new();
    if let Some(default) = default {
        let mut default = default.clone();
        default.name = DEFAULT_NODE_NAME.to_string();
        default.count = NodeCount::Implicit;
        out.push_str(&format_node(&default));
        out.push('\n');
    }
    for node in nodes {
        out.push_str(&format_node(node));
        out.push('\n');
    }
    out
}

/// `gres.conf` lines for every node group that carries GPUs.
pub fn format_gres_config(nodes: &[Node]) -> String {
    nodes
        .iter()
        .filter(|node| node.gpus > 0)
        .map(|node| format!("NodeName={} Name=gpu Count={}\n", node.name_range(), node.gpus))
        .collect()
}

fn parse_fields(line: &str) -> HashMap<&str, &str> {
    line.split_whitespace().filter_map(|token| token.split_once('=')).collect()
}

fn number<T: std::str::FromStr>(fields: &HashMap<&str, &str>, field: &'static str) -> Result<Option<T>, ParseError> {
    match fields.get(field) {
        None => Ok(None),
        Some(value) => value.parse().map(Some).map_err(|_| ParseError::InvalidNumber { field: field.to_string(), value: value.to_string() }),
    }
}

fn build_node(name_range: &str, fields: &HashMap<&str, &str>) -> Result<Node, ParseError> {
    let range: NameRange = name_range.parse()?;

    let procs: u32 = number(fields, "Procs")?.ok_or_else(|| ParseError::MissingField { node: name_range.to_string(), field: "Procs" })?;
    let sockets: u32 = number(fields, "Sockets")?.unwrap_or(1);
    let memory_mb: u64 = number(fields, "RealMemory")?.unwrap_or(0);
    let threads_per_core: u32 = number(fields, "ThreadsPerCore")?.unwrap_or(1);

    let gpus = match fields.get("Gres") {
        None => 0,
        Some(gres) => {
            let count = gres.rsplit(':').next().unwrap_or_default();
            count.parse().map_err(|_| ParseError::InvalidNumber { field: "Gres".to_string(), value: gres.to_string() })?
        }
    };

    let features: Vec<String> = fields
        .get("Feature")
        .map(|list| list.split(',').filter(|f| !f.is_empty()).map(str::to_string).collect())
        .unwrap_or_default();

    Ok(Node::new(range.name, range.count, procs, sockets, memory_mb)
        .with_threads_per_core(threads_per_core)
        .with_gpus(gpus)
        .with_features(features))
}

/// Parses every `NodeName=` line, merging each group's explicit fields over the `DEFAULT` line.
/// Other `slurm.conf` lines are skipped. The `DEFAULT` pseudo-node itself is not returned.
pub fn parse_node_config(text: &str) -> Result<Vec<Node>, ParseError> {
    let mut defaults: HashMap<&str, &str> = HashMap::new();
    let mut nodes = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if !line.starts_with("NodeName=") {
            continue;
        }

        let mut fields = parse_fields(line);
        let name_range = match fields.remove("NodeName") {
            Some(name) if !name.is_empty() => name,
            _ => return Err(ParseError::BadFormatting { line: index + 1, reason: "empty NodeName".to_string() }),
        };

        if name_range == DEFAULT_NODE_NAME {
            defaults.extend(fields);
            continue;
        }

        let mut merged = defaults.clone();
        merged.extend(fields);
        nodes.push(build_node(name_range, &merged)?);
    }

    Ok(nodes)
}
