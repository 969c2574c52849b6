use std::collections::HashMap;
use std::sync::Arc;

use crate::api::scenario_dto::ScenarioDto;
use crate::domain::topology::node_generator::NodeGenerator;
use crate::domain::topology::topology::Topology;
use crate::domain::topology::topology_generator::TopologyGenerator;
use crate::domain::utils::id::{AccountName, UserName};
use crate::domain::utils::random::{SimRng, derive_rng, rng_from_seed};
use crate::domain::workload::job_generator::JobGenerator;
use crate::domain::workload::user::User;
use crate::domain::workload::workload::{WorkLoad, WorkloadEntry};
use crate::error::ConfigError;

/// A topology together with a workload generated for it.
#[derive(Debug)]
pub struct GeneratedScenario {
    pub topology: Arc<Topology>,
    pub entries: Vec<WorkloadEntry>,
}

/// Wires all generators together from one [`ScenarioDto`].
///
/// Every generator receives its own random source derived from the master seed, so a seeded scenario
/// is reproducible as a whole.
#[derive(Debug)]
pub struct Scenario {
    dto: ScenarioDto,
    topology_generator: TopologyGenerator,
    rng: SimRng,
}

impl Scenario {
    pub fn new(dto: ScenarioDto) -> Result<Self, ConfigError> {
        if dto.cluster_size == 0 {
            return Err(ConfigError::InvalidValue { parameter: "cluster_size", reason: "a cluster needs at least one node group".to_string() });
        }

        let mut rng = rng_from_seed(dto.seed);
        let node_generator = NodeGenerator::try_from((&dto.node_generator, derive_rng(&mut rng)))?;
        let topology_generator = TopologyGenerator::try_from((&dto.topology_generator, node_generator, derive_rng(&mut rng)))?;

        match dto.seed {
            Some(seed) => log::info!("Scenario configured with seed {}", seed),
            None => log::info!("Scenario configured without seed, output is not reproducible"),
        }

        Ok(Self { dto, topology_generator, rng })
    }

    pub fn dto(&self) -> &ScenarioDto {
        &self.dto
    }

    /// Draws a fresh topology of `cluster_size` node groups.
    pub fn generate_topology(&mut self) -> Arc<Topology> {
        Arc::new(self.topology_generator.generate_topology(self.dto.cluster_size))
    }

    /// Builds the job generator and workload for `topology`.
    pub fn workload_for(
        &mut self,
        topology: Arc<Topology>,
        users: Vec<User>,
        accounts: HashMap<UserName, AccountName>,
    ) -> Result<WorkLoad, ConfigError> {
        let job_generator = JobGenerator::try_from((&self.dto.job_generator, topology, derive_rng(&mut self.rng)))?;
        WorkLoad::try_from((&self.dto.workload, users, accounts, job_generator, derive_rng(&mut self.rng)))
    }

    /// Generates a topology and `job_count` submissions on it.
    pub fn generate(&mut self, users: Vec<User>, accounts: HashMap<UserName, AccountName>) -> Result<GeneratedScenario, ConfigError> {
        let topology = self.generate_topology();
        let mut workload = self.workload_for(topology.clone(), users, accounts)?;
        let entries = workload.generate_workload(self.dto.workload.job_count, true);

        Ok(GeneratedScenario { topology, entries })
    }
}
