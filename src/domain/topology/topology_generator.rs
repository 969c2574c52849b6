use rand::Rng;

use crate::api::scenario_dto::TopologyGeneratorDto;
use crate::domain::topology::feature::group_feature;
use crate::domain::topology::node::{Node, NodeCount};
use crate::domain::topology::node_generator::{NodeGenerator, NodeTraits, check_range};
use crate::domain::topology::topology::{Topology, TreeNode};
use crate::domain::utils::random::{SimRng, draw, rng_from_seed};
use crate::error::ConfigError;

/// Kind of node group drawn by [`TopologyGenerator::generate_group`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Gpu,
    ManyCores,
    Mixed,
    Cpu,
}

/// Cumulative thresholds `gpu < many_cores < mixed` on one uniform draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupProbabilities {
    pub gpu: f64,
    pub many_cores: f64,
    pub mixed: f64,
}

impl Default for GroupProbabilities {
    fn default() -> Self {
        Self { gpu: 0.3, many_cores: 0.5, mixed: 0.6 }
    }
}

impl GroupProbabilities {
    fn validate(&self) -> Result<(), ConfigError> {
        let thresholds = [self.gpu, self.many_cores, self.mixed];
        let in_bounds = thresholds.iter().all(|p| (0.0..=1.0).contains(p));
        let cumulative = thresholds.windows(2).all(|w| w[0] <= w[1]);
        if in_bounds && cumulative { Ok(()) } else { Err(ConfigError::InvalidProbabilities(thresholds.to_vec())) }
    }

    pub fn kind_for(&self, p: f64) -> GroupKind {
        if p < self.gpu {
            GroupKind::Gpu
        } else if p < self.many_cores {
            GroupKind::ManyCores
        } else if p < self.mixed {
            GroupKind::Mixed
        } else {
            GroupKind::Cpu
        }
    }
}

/// Builds a forest of node groups, one group per switch.
#[derive(Debug)]
pub struct TopologyGenerator {
    node_generator: NodeGenerator,
    min_group_size: u32,
    max_group_size: u32,
    probabilities: GroupProbabilities,
    group_letter: char,
    rng: SimRng,
}

impl TopologyGenerator {
    pub fn new(
        node_generator: NodeGenerator,
        min_group_size: u32,
        max_group_size: u32,
        probabilities: GroupProbabilities,
        rng: SimRng,
    ) -> Result<Self, ConfigError> {
        check_range("group_size", min_group_size as i64, max_group_size as i64)?;
        if min_group_size == 0 {
            return Err(ConfigError::InvalidValue { parameter: "min_group_size", reason: "groups need at least one machine".to_string() });
        }
        probabilities.validate()?;

        Ok(Self { node_generator, min_group_size, max_group_size, probabilities, group_letter: 'a', rng })
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = rng_from_seed(Some(seed));
    }

    pub fn node_generator_mut(&mut self) -> &mut NodeGenerator {
        &mut self.node_generator
    }

    pub fn current_group_letter(&self) -> char {
        self.group_letter
    }

    fn advance_group_letter(&mut self) {
        self.group_letter = next_letter(self.group_letter);
    }

    /// Draws one group named after the current group letter. Homogeneous groups yield one node,
    /// mixed groups yield one single-machine node per member.
    pub fn generate_group(&mut self) -> Vec<Node> {
        let size = draw(&mut self.rng, self.min_group_size, self.max_group_size);
        let kind = self.probabilities.kind_for(self.rng.random::<f64>());
        let letter = self.group_letter;
        let name = letter.to_string();
        let features = vec![group_feature(letter)];

        log::debug!("Generating {:?} group '{}' with {} machines", kind, name, size);

        match kind {
            GroupKind::Gpu => vec![self.node_generator.generate(&name, NodeCount::from_scalar(size), features, NodeTraits::gpu())],
            GroupKind::ManyCores => {
                vec![self.node_generator.generate(&name, NodeCount::from_scalar(size), features, NodeTraits::many_cores())]
            }
            GroupKind::Mixed => {
                let mut sub_letter = 'a';
                let mut nodes = Vec::with_capacity(size as usize);
                for _ in 0..size {
                    let traits = NodeTraits {
                        big_mem: self.rng.random_bool(0.5),
                        gpu: self.rng.random_bool(0.5),
                        many_cores: self.rng.random_bool(0.5),
                    };
                    let sub_name = format!("{}{}", letter, sub_letter);
                    nodes.push(self.node_generator.generate(&sub_name, NodeCount::from_scalar(1), features.clone(), traits));
                    sub_letter = next_letter(sub_letter);
                }
                nodes
            }
            GroupKind::Cpu => vec![self.node_generator.generate(&name, NodeCount::from_scalar(size), features, NodeTraits::default())],
        }
    }

    pub fn generate_topology(&mut self, group_count: usize) -> Topology {
        let mut tree = Vec::with_capacity(group_count);
        for _ in 0..group_count {
            let group = self.generate_group();
            tree.push(TreeNode::Group(group.into_iter().map(TreeNode::Leaf).collect()));
            self.advance_group_letter();
        }

        let topology = Topology::new(tree);
        log::info!("Generated topology with {} groups and {} machines", group_count, topology.total_machines());
        topology
    }
}

impl TryFrom<(&TopologyGeneratorDto, NodeGenerator, SimRng)> for TopologyGenerator {
    type Error = ConfigError;

    fn try_from(args: (&TopologyGeneratorDto, NodeGenerator, SimRng)) -> Result<Self, Self::Error> {
        let (dto, node_generator, rng) = args;
        let probabilities = GroupProbabilities { gpu: dto.gpu_probability, many_cores: dto.many_cores_probability, mixed: dto.mixed_probability };
        TopologyGenerator::new(node_generator, dto.min_group_size, dto.max_group_size, probabilities, rng)
    }
}

/// `a..z`, wrapping back to `a`.
pub fn next_letter(c: char) -> char {
    if c == 'z' { 'a' } else { ((c as u8) + 1) as char }
}
