//! `topology.conf` rendering and parsing.
//!
//! One line per switch: `SwitchName=<id> Nodes=<ranges> Switches=<ids>`. Children are written before
//! their parents, the root switch is `TOP`.

use std::collections::HashMap;

use crate::domain::topology::node::Node;
use crate::domain::topology::topology::{Topology, TreeNode};
use crate::domain::utils::id::SwitchName;
use crate::error::ParseError;

pub const ROOT_SWITCH: &str = "TOP";
const SWITCH_PREFIX: &str = "IB";

/// Renders a switch tree. Internal switches are named `IBA`, `IBB`, ..., `IBZ`, `IBAA`, ...
#[derive(Debug, Default)]
pub struct TopologyPrinter {
    next_switch: usize,
    lines: Vec<String>,
}

impl TopologyPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn print(mut self, topology: &Topology) -> String {
        self.print_switch(SwitchName::new(ROOT_SWITCH), topology.tree());
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }

    fn allocate_switch_name(&mut self) -> SwitchName {
        let name = SwitchName::new(format!("{}{}", SWITCH_PREFIX, switch_suffix(self.next_switch)));
        self.next_switch += 1;
        name
    }

    fn print_switch(&mut self, name: SwitchName, children: &[TreeNode]) -> SwitchName {
        let mut node_list = Vec::new();
        let mut switch_list = Vec::new();

        for child in children {
            match child {
                TreeNode::Leaf(node) => node_list.push(node.name_range()),
                TreeNode::Group(grandchildren) => {
                    let child_name = self.allocate_switch_name();
                    switch_list.push(self.print_switch(child_name, grandchildren).to_string());
                }
            }
        }

        let mut line = format!("SwitchName={}", name);
        if !node_list.is_empty() {
            line.push_str(&format!(" Nodes={}", node_list.join(",")));
        }
        if !switch_list.is_empty() {
            line.push_str(&format!(" Switches={}", switch_list.join(",")));
        }
        self.lines.push(line);
        name
    }
}

/// Spreadsheet-style suffix: 0 -> A, 25 -> Z, 26 -> AA.
fn switch_suffix(mut index: usize) -> String {
    let mut suffix = Vec::new();
    loop {
        suffix.push((b'A' + (index % 26) as u8) as char);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    suffix.iter().rev().collect()
}

pub fn print_topology(topology: &Topology) -> String {
    TopologyPrinter::new().print(topology)
}

/// Rebuilds a [`Topology`] from `topology.conf` text. `nodes` resolves the `Nodes=` name ranges.
pub fn parse_topology(nodes: &[Node], text: &str) -> Result<Topology, ParseError> {
    let known_nodes: HashMap<String, &Node> = nodes.iter().map(|node| (node.name_range(), node)).collect();
    let mut switches: HashMap<SwitchName, Vec<TreeNode>> = HashMap::new();

    for (index, line) in text.lines().enumerate() {
        let line_number = index + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let switch_name = match tokens.next().and_then(|t| t.split_once('=')) {
            Some(("SwitchName", value)) if !value.is_empty() => SwitchName::new(value),
            _ => return Err(ParseError::BadFormatting { line: line_number, reason: "line must start with 'SwitchName=<id>'".to_string() }),
        };

        let mut children = Vec::new();
        for token in tokens {
            let (key, value) = token
                .split_once('=')
                .ok_or_else(|| ParseError::BadFormatting { line: line_number, reason: format!("expected key=value, got '{}'", token) })?;

            match key {
                "Nodes" => {
                    for node_name in value.split(',').filter(|n| !n.is_empty()) {
                        let node = known_nodes.get(node_name).ok_or_else(|| ParseError::UnknownNode(node_name.to_string()))?;
                        children.push(TreeNode::Leaf((*node).clone()));
                    }
                }
                "Switches" => {
                    for child_name in value.split(',').filter(|n| !n.is_empty()) {
                        let child = switches.get(&SwitchName::new(child_name)).ok_or_else(|| ParseError::UnknownSwitch(child_name.to_string()))?;
                        children.push(TreeNode::Group(child.clone()));
                    }
                }
                other => log::warn!("Ignoring unknown topology key '{}' on line {}", other, line_number),
            }
        }

        switches.insert(switch_name, children);
    }

    let root = switches.remove(&SwitchName::new(ROOT_SWITCH)).ok_or(ParseError::MissingRootSwitch)?;
    Ok(Topology::new(root))
}
