use std::collections::HashMap;

use crate::domain::topology::feature::FeatureTag;
use crate::domain::topology::node::Node;

/// One element of the switch tree. Every `Group` models one network switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    Leaf(Node),
    Group(Vec<TreeNode>),
}

/// Capacity statistics over all nodes of one [`FeatureTag`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Aggregate {
    /// Sum of `cores_per_machine * machines`.
    pub total_cores: u64,
    pub max_cores_per_machine: u32,
    pub max_memory_mb: u64,
    pub max_gpus_per_machine: u32,
    pub machines: u64,
}

impl Aggregate {
    fn add(&mut self, node: &Node) {
        self.total_cores += node.cores_per_machine as u64 * node.machine_count();
        self.max_cores_per_machine = self.max_cores_per_machine.max(node.cores_per_machine);
        self.max_memory_mb = self.max_memory_mb.max(node.memory_mb);
        self.max_gpus_per_machine = self.max_gpus_per_machine.max(node.gpus);
        self.machines += node.machine_count();
    }

    pub fn is_empty(&self) -> bool {
        self.machines == 0
    }
}

/// A simulated cluster: the switch tree, its flattened node groups and their aggregate tables.
///
/// Built once from the tree and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Topology {
    tree: Vec<TreeNode>,
    nodes: Vec<Node>,
    aggregates: HashMap<FeatureTag, Aggregate>,
}

impl Topology {
    pub fn new(tree: Vec<TreeNode>) -> Self {
        let nodes = Self::flatten(&tree);

        let mut aggregates: HashMap<FeatureTag, Aggregate> = HashMap::new();
        aggregates.insert(FeatureTag::Default, Aggregate::default());
        aggregates.insert(FeatureTag::All, Aggregate::default());
        for tag in FeatureTag::RESOURCE_CLASSES {
            aggregates.insert(tag, Aggregate::default());
        }

        for node in &nodes {
            aggregates.entry(FeatureTag::All).or_default().add(node);

            let classes = node.resource_classes();
            if classes.is_empty() {
                aggregates.entry(FeatureTag::Default).or_default().add(node);
            }
            for tag in classes {
                aggregates.entry(tag).or_default().add(node);
            }
        }

        log::debug!(
            "Topology built: {} node groups, {} machines, {} cores",
            nodes.len(),
            aggregates[&FeatureTag::All].machines,
            aggregates[&FeatureTag::All].total_cores
        );

        Self { tree, nodes, aggregates }
    }

    /// Depth-first, order-preserving flattening. A leaf equal in every field to an earlier one is the
    /// same node group reached through several switches and is kept once. Leaves that only share a
    /// name range stay distinct.
    fn flatten(tree: &[TreeNode]) -> Vec<Node> {
        let mut nodes: Vec<Node> = Vec::new();
        let mut stack: Vec<&TreeNode> = tree.iter().rev().collect();

        while let Some(element) = stack.pop() {
            match element {
                TreeNode::Leaf(node) => {
                    if !nodes.contains(node) {
                        nodes.push(node.clone());
                    }
                }
                TreeNode::Group(children) => stack.extend(children.iter().rev()),
            }
        }
        nodes
    }

    pub fn tree(&self) -> &[TreeNode] {
        &self.tree
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn aggregate(&self, tag: FeatureTag) -> Aggregate {
        self.aggregates.get(&tag).copied().unwrap_or_default()
    }

    pub fn total_machines(&self) -> u64 {
        self.aggregate(FeatureTag::All).machines
    }

    /// Number of machines providing at least the given per-machine resources and carrying every
    /// required feature.
    pub fn count_matching_nodes(&self, min_cores: u32, min_memory_mb: u64, min_gpus: u32, required_features: &[&str]) -> u64 {
        self.nodes
            .iter()
            .filter(|node| node.cores_per_machine >= min_cores && node.memory_mb >= min_memory_mb && node.gpus >= min_gpus)
            .filter(|node| node.has_all_features(required_features))
            .map(Node::machine_count)
            .sum()
    }
}
