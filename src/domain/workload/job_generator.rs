use std::sync::Arc;

use rand::Rng;
use rand::seq::IndexedRandom;

use crate::api::scenario_dto::JobGeneratorDto;
use crate::domain::topology::feature::FeatureTag;
use crate::domain::topology::topology::Topology;
use crate::domain::utils::id::{AccountName, JobId, UserName};
use crate::domain::utils::random::{SimRng, draw, draw_inclusive, rng_from_seed};
use crate::domain::workload::job::{Job, JobKind, JobRequest, RequestedTime, TaskShape, WALLTIME_FROM_LIMIT};
use crate::error::ConfigError;

/// Upper bound, in seconds, of how much earlier than its limit a job may complete.
pub const MAX_WALLTIME_SHRINK: i64 = 3600;

#[derive(Debug, Clone, PartialEq)]
pub struct JobGeneratorSettings {
    pub max_long_job_hours: u32,
    pub max_short_job_minutes: u32,
    pub min_memory_mb: u64,
    pub long_job_probability: f64,
    pub gpu_constraint_probability: f64,
    pub memory_constraint_probability: f64,
}

impl Default for JobGeneratorSettings {
    fn default() -> Self {
        Self::from(&JobGeneratorDto::default())
    }
}

impl From<&JobGeneratorDto> for JobGeneratorSettings {
    fn from(dto: &JobGeneratorDto) -> Self {
        Self {
            max_long_job_hours: dto.max_long_job_hours,
            max_short_job_minutes: dto.max_short_job_minutes,
            min_memory_mb: dto.min_memory_mb,
            long_job_probability: dto.long_job_probability,
            gpu_constraint_probability: dto.gpu_constraint_probability,
            memory_constraint_probability: dto.memory_constraint_probability,
        }
    }
}

impl JobGeneratorSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        let probabilities = [self.long_job_probability, self.gpu_constraint_probability, self.memory_constraint_probability];
        if probabilities.iter().all(|p| (0.0..=1.0).contains(p)) { Ok(()) } else { Err(ConfigError::InvalidProbabilities(probabilities.to_vec())) }
    }
}

/// Per-node requirements a task shape has to satisfy on top of its task count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShapeConstraint {
    pub class: Option<FeatureTag>,
    pub memory_mb: Option<u64>,
    pub gpus: Option<u32>,
}

impl ShapeConstraint {
    fn required_features(&self) -> Vec<&'static str> {
        self.class.and_then(|tag| tag.constraint()).into_iter().collect()
    }
}

/// Draws jobs that the given topology can always host on more than one machine.
///
/// Every `generate_*_job` returns `None` when a draw turns out infeasible; callers retry.
#[derive(Debug)]
pub struct JobGenerator {
    topology: Arc<Topology>,
    settings: JobGeneratorSettings,

    /// Classes with any machine at all.
    job_classes: Vec<FeatureTag>,

    /// Classes offering at least two machines for a one-task-per-node job.
    classic_classes: Vec<FeatureTag>,
    rng: SimRng,
}

impl JobGenerator {
    /// Fails if no resource class offers two machines, since then not even a classic job can be placed.
    pub fn new(topology: Arc<Topology>, settings: JobGeneratorSettings, rng: SimRng) -> Result<Self, ConfigError> {
        settings.validate()?;

        let job_classes: Vec<FeatureTag> = FeatureTag::JOB_CLASSES.into_iter().filter(|tag| !topology.aggregate(*tag).is_empty()).collect();
        let classic_classes: Vec<FeatureTag> = job_classes
            .iter()
            .copied()
            .filter(|tag| {
                let constraint = ShapeConstraint { class: Some(*tag), ..Default::default() };
                topology.count_matching_nodes(1, 0, 0, &constraint.required_features()) >= 2
            })
            .collect();

        if classic_classes.is_empty() {
            return Err(ConfigError::InfeasibleTopology(format!(
                "{} machines in {} node groups, no resource class has two machines",
                topology.total_machines(),
                topology.nodes().len()
            )));
        }

        log::debug!("JobGenerator ready: job classes {:?}, classic classes {:?}", job_classes, classic_classes);
        Ok(Self { topology, settings, job_classes, classic_classes, rng })
    }

    pub fn topology(&self) -> &Arc<Topology> {
        &self.topology
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = rng_from_seed(Some(seed));
    }

    pub fn generate_requested_time(&mut self, is_long: bool) -> RequestedTime {
        if !is_long {
            return RequestedTime { hours: 0, minutes: draw(&mut self.rng, 1, self.settings.max_short_job_minutes) };
        }

        let hours = if self.settings.max_long_job_hours <= 1 { 0 } else { draw(&mut self.rng, 0, self.settings.max_long_job_hours) };
        let minutes = if hours > 0 {
            if self.rng.random_bool(0.5) { 0 } else { 30 }
        } else {
            draw(&mut self.rng, 1, 60)
        };
        RequestedTime { hours, minutes }
    }

    pub fn generate_simulated_walltime(&mut self, time: &RequestedTime) -> i64 {
        let limit = time.as_seconds();
        let shrink = draw_inclusive(&mut self.rng, -1, limit.min(MAX_WALLTIME_SHRINK));
        if shrink <= 0 { WALLTIME_FROM_LIMIT } else { limit - shrink }
    }

    /// Draws tasks per node in `[1, max_tasks_per_node]` and a node count strictly below the number of
    /// matching machines. `None` if at most one machine matches.
    pub fn generate_task_shape(&mut self, max_tasks_per_node: u32, constraint: &ShapeConstraint) -> Option<TaskShape> {
        if max_tasks_per_node == 0 {
            return None;
        }

        let tasks_per_node = draw_inclusive(&mut self.rng, 1, max_tasks_per_node);
        let matching_nodes = self.topology.count_matching_nodes(
            tasks_per_node,
            constraint.memory_mb.unwrap_or(0),
            constraint.gpus.unwrap_or(0),
            &constraint.required_features(),
        );

        if matching_nodes <= 1 {
            log::trace!("Infeasible task shape: {} tasks per node, {:?}, {} matching machines", tasks_per_node, constraint, matching_nodes);
            return None;
        }

        let nodes = draw(&mut self.rng, 1, matching_nodes);
        Some(TaskShape { tasks_per_node, nodes, matching_nodes })
    }

    /// GPUs per node for a job of `class`. Borrows the cluster-wide maximum when the class has no GPUs.
    pub fn generate_gres(&mut self, class: FeatureTag) -> u32 {
        let mut max_gpus = self.topology.aggregate(class).max_gpus_per_machine;
        if max_gpus == 0 {
            max_gpus = self.topology.aggregate(FeatureTag::All).max_gpus_per_machine;
        }
        if max_gpus == 0 { 0 } else { draw_inclusive(&mut self.rng, 1, max_gpus) }
    }

    /// Memory per node in `[min_memory_mb, 4/5 of the class maximum)`, rounded down to 1000 MB.
    pub fn generate_mem(&mut self, class: FeatureTag) -> Option<u64> {
        let ceiling = self.topology.aggregate(class).max_memory_mb * 4 / 5;
        if ceiling <= self.settings.min_memory_mb {
            return None;
        }

        let memory_mb = draw(&mut self.rng, self.settings.min_memory_mb, ceiling) / 1000 * 1000;
        (memory_mb > 0).then_some(memory_mb)
    }

    fn pick_class(&mut self, kind: JobKind) -> FeatureTag {
        let classes = if kind == JobKind::Classic { &self.classic_classes } else { &self.job_classes };
        classes.choose(&mut self.rng).copied().unwrap_or(FeatureTag::Default)
    }

    fn finish_job(&mut self, id: JobId, kind: JobKind, user: UserName, account: Option<AccountName>, constraint: ShapeConstraint, shape: TaskShape) -> Job {
        let is_long = self.rng.random_bool(self.settings.long_job_probability);
        let time = self.generate_requested_time(is_long);
        let simulated_walltime = self.generate_simulated_walltime(&time);

        let request = JobRequest { time, shape, account, constraint: constraint.class, memory_mb: constraint.memory_mb, gpus: constraint.gpus };
        Job::new(id, kind, simulated_walltime, user, request)
    }

    pub fn generate_classic_job(&mut self, id: JobId, user: UserName, account: Option<AccountName>) -> Option<Job> {
        let class = self.pick_class(JobKind::Classic);
        let constraint = ShapeConstraint { class: Some(class), ..Default::default() };

        let shape = self.generate_task_shape(self.topology.aggregate(class).max_cores_per_machine, &constraint)?;
        Some(self.finish_job(id, JobKind::Classic, user, account, constraint, shape))
    }

    pub fn generate_gpu_job(&mut self, id: JobId, user: UserName, account: Option<AccountName>) -> Option<Job> {
        let class = self.pick_class(JobKind::Gpu);
        let gpus = self.generate_gres(class);
        let constraint = ShapeConstraint { class: Some(class), memory_mb: None, gpus: (gpus > 0).then_some(gpus) };

        // The GPU count is part of the shape constraint, so only GPU machines are counted as matching.
        let shape = self.generate_task_shape(self.topology.aggregate(class).max_cores_per_machine, &constraint)?;
        Some(self.finish_job(id, JobKind::Gpu, user, account, constraint, shape))
    }

    pub fn generate_generic_job(&mut self, id: JobId, user: UserName, account: Option<AccountName>) -> Option<Job> {
        let class = self.pick_class(JobKind::Generic);

        let gpus = if self.rng.random_bool(self.settings.gpu_constraint_probability) {
            Some(self.generate_gres(class)).filter(|g| *g > 0)
        } else {
            None
        };
        let memory_mb = if self.rng.random_bool(self.settings.memory_constraint_probability) { self.generate_mem(class) } else { None };
        let constraint = ShapeConstraint { class: Some(class), memory_mb, gpus };

        let shape = self.generate_task_shape(self.topology.aggregate(class).max_cores_per_machine, &constraint)?;
        Some(self.finish_job(id, JobKind::Generic, user, account, constraint, shape))
    }

    pub fn generate(&mut self, kind: JobKind, id: JobId, user: UserName, account: Option<AccountName>) -> Option<Job> {
        match kind {
            JobKind::Classic => self.generate_classic_job(id, user, account),
            JobKind::Gpu => self.generate_gpu_job(id, user, account),
            JobKind::Generic => self.generate_generic_job(id, user, account),
        }
    }
}

impl TryFrom<(&JobGeneratorDto, Arc<Topology>, SimRng)> for JobGenerator {
    type Error = ConfigError;

    fn try_from(args: (&JobGeneratorDto, Arc<Topology>, SimRng)) -> Result<Self, Self::Error> {
        let (dto, topology, rng) = args;
        JobGenerator::new(topology, JobGeneratorSettings::from(dto), rng)
    }
}
