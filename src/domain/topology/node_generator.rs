use crate::api::scenario_dto::NodeGeneratorDto;
use crate::domain::topology::feature::{BIG_MEM_FEATURE, MANY_CORES_FEATURE};
use crate::domain::topology::node::{Node, NodeCount};
use crate::domain::utils::random::{SimRng, draw, rng_from_seed};
use crate::error::ConfigError;

/// Megabytes per drawn memory unit.
pub const MEMORY_UNIT_MB: u64 = 4000;

/// Cores per drawn core unit.
pub const CORE_UNIT: u32 = 4;

/// Resource-class switches for a single [`NodeGenerator::generate`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeTraits {
    pub big_mem: bool,
    pub gpu: bool,
    pub many_cores: bool,
}

impl NodeTraits {
    pub fn gpu() -> Self {
        Self { gpu: true, ..Default::default() }
    }

    pub fn many_cores() -> Self {
        Self { many_cores: true, ..Default::default() }
    }
}

/// Bounds of all ranges a [`NodeGenerator`] draws from. Every range is half-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRanges {
    pub min_cores: u32,
    pub max_cores: u32,
    pub min_memory_units: u64,
    pub max_memory_units: u64,
    pub min_sockets: u32,
    pub max_sockets: u32,
    pub min_gpus: u32,
    pub max_gpus: u32,
}

impl NodeRanges {
    fn validate(&self) -> Result<(), ConfigError> {
        check_range("cores", self.min_cores as i64, self.max_cores as i64)?;
        check_range("memory_units", self.min_memory_units as i64, self.max_memory_units as i64)?;
        check_range("sockets", self.min_sockets as i64, self.max_sockets as i64)?;
        check_range("gpus", self.min_gpus as i64, self.max_gpus as i64)?;

        if self.min_sockets == 0 {
            return Err(ConfigError::InvalidValue { parameter: "min_sockets", reason: "a machine needs at least one socket".to_string() });
        }
        if self.max_memory_units == 0 {
            return Err(ConfigError::InvalidValue { parameter: "max_memory_units", reason: "machines need memory".to_string() });
        }

        // ManyCores and BigMem draw from scaled copies of the upper bounds.
        if self.max_cores.checked_mul(8 * CORE_UNIT).is_none() {
            return Err(ConfigError::InvalidValue { parameter: "max_cores", reason: "scaled core count overflows".to_string() });
        }
        if self.max_memory_units.checked_mul(16 * MEMORY_UNIT_MB).is_none() {
            return Err(ConfigError::InvalidValue { parameter: "max_memory_units", reason: "scaled memory overflows".to_string() });
        }
        Ok(())
    }
}

pub(crate) fn check_range(parameter: &'static str, min: i64, max: i64) -> Result<(), ConfigError> {
    if min > max { Err(ConfigError::InvalidRange { parameter, min, max }) } else { Ok(()) }
}

/// Produces [`Node`]s from independent bounded draws.
#[derive(Debug)]
pub struct NodeGenerator {
    ranges: NodeRanges,
    many_cores_range: (u32, u32),
    big_mem_range: (u64, u64),
    rng: SimRng,
}

impl NodeGenerator {
    pub fn new(ranges: NodeRanges, rng: SimRng) -> Result<Self, ConfigError> {
        ranges.validate()?;

        Ok(Self {
            many_cores_range: (ranges.max_cores * 2, ranges.max_cores * 8),
            big_mem_range: (ranges.max_memory_units * 4, ranges.max_memory_units * 16),
            ranges,
            rng,
        })
    }

    pub fn ranges(&self) -> &NodeRanges {
        &self.ranges
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = rng_from_seed(Some(seed));
    }

    pub fn generate(&mut self, name: &str, count: NodeCount, mut features: Vec<String>, traits: NodeTraits) -> Node {
        let cores_raw = if traits.many_cores {
            features.push(MANY_CORES_FEATURE.to_string());
            draw(&mut self.rng, self.many_cores_range.0, self.many_cores_range.1)
        } else {
            draw(&mut self.rng, self.ranges.min_cores, self.ranges.max_cores)
        };
        let cores_per_machine = cores_from_raw(cores_raw);

        let drawn_sockets = draw(&mut self.rng, self.ranges.min_sockets, self.ranges.max_sockets);
        let sockets = fit_sockets(cores_per_machine, drawn_sockets);

        let memory_units = if traits.big_mem {
            features.push(BIG_MEM_FEATURE.to_string());
            draw(&mut self.rng, self.big_mem_range.0, self.big_mem_range.1)
        } else {
            draw(&mut self.rng, self.ranges.min_memory_units, self.ranges.max_memory_units)
        };
        let memory_mb = memory_units.max(1) * MEMORY_UNIT_MB;

        let node = Node::new(name, count, cores_per_machine, sockets, memory_mb).with_features(features);
        if !traits.gpu {
            return node;
        }

        let gpus = draw(&mut self.rng, self.ranges.min_gpus, self.ranges.max_gpus);
        node.with_gpus(gpus)
    }
}

impl TryFrom<(&NodeGeneratorDto, SimRng)> for NodeGenerator {
    type Error = ConfigError;

    fn try_from(args: (&NodeGeneratorDto, SimRng)) -> Result<Self, Self::Error> {
        let (dto, rng) = args;
        let ranges = NodeRanges {
            min_cores: dto.min_cores,
            max_cores: dto.max_cores,
            min_memory_units: dto.min_memory_units,
            max_memory_units: dto.max_memory_units,
            min_sockets: dto.min_sockets,
            max_sockets: dto.max_sockets,
            min_gpus: dto.min_gpus,
            max_gpus: dto.max_gpus,
        };
        NodeGenerator::new(ranges, rng)
    }
}

/// A raw draw of zero still yields one core unit.
pub fn cores_from_raw(cores_raw: u32) -> u32 {
    cores_raw.max(1) * CORE_UNIT
}

/// Lowers `sockets` until it divides `cores`. Never drops below one socket.
pub fn fit_sockets(cores: u32, sockets: u32) -> u32 {
    let mut sockets = sockets.max(1);
    while cores % sockets != 0 {
        sockets -= cores % sockets;
    }
    sockets
}
