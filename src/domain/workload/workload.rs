use std::collections::HashMap;
use std::fmt;

use rand::Rng;

use crate::api::scenario_dto::WorkLoadDto;
use crate::domain::topology::node_generator::check_range;
use crate::domain::utils::id::{AccountName, JobId, UserName};
use crate::domain::utils::random::{SimRng, draw, rng_from_seed};
use crate::domain::utils::statistics::{ANALYTICS_TARGET, StatParameter, StatisticEvent};
use crate::domain::workload::job::{Job, JobKind};
use crate::domain::workload::job_generator::JobGenerator;
use crate::domain::workload::user::User;
use crate::error::ConfigError;

pub const JOB_ID_OFFSET: u64 = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct WorkLoadSettings {
    pub min_inter_arrival: u64,
    pub max_inter_arrival: u64,

    /// Cumulative thresholds: below `classic_probability` a classic job, below `gpu_probability` a
    /// GPU job, otherwise a generic one.
    pub classic_probability: f64,
    pub gpu_probability: f64,
    pub retry: u32,
}

impl Default for WorkLoadSettings {
    fn default() -> Self {
        Self::from(&WorkLoadDto::default())
    }
}

impl From<&WorkLoadDto> for WorkLoadSettings {
    fn from(dto: &WorkLoadDto) -> Self {
        Self {
            min_inter_arrival: dto.min_inter_arrival,
            max_inter_arrival: dto.max_inter_arrival,
            classic_probability: dto.classic_probability,
            gpu_probability: dto.gpu_probability,
            retry: dto.retry,
        }
    }
}

impl WorkLoadSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        check_range("inter_arrival", self.min_inter_arrival as i64, self.max_inter_arrival as i64)?;

        let thresholds = [self.classic_probability, self.gpu_probability];
        let valid = thresholds.iter().all(|p| (0.0..=1.0).contains(p)) && self.classic_probability <= self.gpu_probability;
        if valid { Ok(()) } else { Err(ConfigError::InvalidProbabilities(thresholds.to_vec())) }
    }

    pub fn kind_for(&self, p: f64) -> JobKind {
        if p < self.classic_probability {
            JobKind::Classic
        } else if p < self.gpu_probability {
            JobKind::Gpu
        } else {
            JobKind::Generic
        }
    }
}

/// One submission of the synthetic stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadEntry {
    /// Seconds since the start of the stream.
    pub arrival: u64,
    pub job: Job,

    /// Generator calls it took to obtain the job.
    pub attempts: u32,

    /// True if the requested flavor kept failing and a classic job was substituted.
    pub fallback: bool,
}

impl fmt::Display for WorkloadEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-dt {} -e submit_batch_job | {}", self.arrival, self.job)
    }
}

impl From<&WorkloadEntry> for StatisticEvent {
    fn from(entry: &WorkloadEntry) -> Self {
        let request = &entry.job.request;
        let mut event = StatisticEvent::new();
        event
            .set(StatParameter::Time, entry.arrival)
            .set(StatParameter::JobId, entry.job.id.as_str())
            .set(StatParameter::JobKind, entry.job.kind.to_string())
            .set(StatParameter::User, entry.job.user.as_str())
            .set_opt(StatParameter::Account, request.account.as_ref().map(|account| account.as_str()))
            .set(StatParameter::RequestedTime, request.time.as_seconds())
            .set(StatParameter::SimulatedWalltime, entry.job.simulated_walltime)
            .set(StatParameter::Nodes, request.shape.nodes)
            .set(StatParameter::TasksPerNode, request.shape.tasks_per_node)
            .set(StatParameter::NumberOfTasks, request.shape.total_tasks())
            .set(StatParameter::MatchingNodes, request.shape.matching_nodes)
            .set_opt(StatParameter::Constraint, request.constraint.and_then(|tag| tag.constraint()))
            .set_opt(StatParameter::MemoryPerNode, request.memory_mb)
            .set_opt(StatParameter::GpusPerNode, request.gpus)
            .set(StatParameter::Attempts, entry.attempts)
            .set(StatParameter::Fallback, entry.fallback);
        event
    }
}

/// Renders the event file, one submission per line.
pub fn format_events(entries: &[WorkloadEntry]) -> String {
    entries.iter().map(|entry| format!("{}\n", entry)).collect()
}

/// Timestamped job submission stream.
#[derive(Debug)]
pub struct WorkLoad {
    users: Vec<User>,
    accounts: HashMap<UserName, AccountName>,
    job_generator: JobGenerator,
    settings: WorkLoadSettings,
    timestamp: u64,
    job_counter: u64,
    rng: SimRng,
}

impl WorkLoad {
    /// Admin users never submit jobs and are dropped from `users`.
    pub fn new(
        users: Vec<User>,
        accounts: HashMap<UserName, AccountName>,
        job_generator: JobGenerator,
        settings: WorkLoadSettings,
        rng: SimRng,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;

        let users: Vec<User> = users.into_iter().filter(|user| !user.is_admin()).collect();
        if users.is_empty() {
            return Err(ConfigError::EmptyUserList);
        }

        for user in users.iter().filter(|user| !accounts.contains_key(&user.name)) {
            log::warn!("User '{}' has no account, its jobs are submitted without '-A'", user.name);
        }

        Ok(Self { users, accounts, job_generator, settings, timestamp: 0, job_counter: 1, rng })
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn job_counter(&self) -> u64 {
        self.job_counter
    }

    pub fn job_generator_mut(&mut self) -> &mut JobGenerator {
        &mut self.job_generator
    }

    pub fn reset(&mut self) {
        self.timestamp = 0;
        self.job_counter = 1;
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = rng_from_seed(Some(seed));
    }

    /// Generates the next submission and advances the clock and the job id counter.
    ///
    /// The drawn flavor is attempted `retry` times. After that classic jobs are drawn until one
    /// fits, which terminates because the job generator only accepts topologies where classic jobs
    /// are feasible.
    pub fn generate_one(&mut self) -> WorkloadEntry {
        let arrival = self.timestamp;
        let user = self.users[draw(&mut self.rng, 0, self.users.len())].clone();
        let account = self.accounts.get(&user.name).cloned();
        let job_id = JobId::new(format!("jobid_{}", self.job_counter + JOB_ID_OFFSET));
        let kind = self.settings.kind_for(self.rng.random::<f64>());

        let mut attempts = 0;
        let mut job = None;
        while job.is_none() && attempts < self.settings.retry {
            attempts += 1;
            job = self.job_generator.generate(kind, job_id.clone(), user.name.clone(), account.clone());
        }

        let fallback = job.is_none();
        let job = match job {
            Some(job) => job,
            None => {
                log::debug!("No feasible {} job after {} attempts for {}, falling back to classic", kind, attempts, job_id);
                loop {
                    attempts += 1;
                    if let Some(job) = self.job_generator.generate_classic_job(job_id.clone(), user.name.clone(), account.clone()) {
                        break job;
                    }
                }
            }
        };

        tracing::info!(
            target: ANALYTICS_TARGET,
            Time = arrival,
            JobId = %job.id,
            JobKind = %job.kind,
            User = %job.user,
            Tasks = job.request.shape.total_tasks(),
            Nodes = job.request.shape.nodes,
            Attempts = attempts,
            Fallback = fallback,
        );

        self.timestamp += draw(&mut self.rng, self.settings.min_inter_arrival, self.settings.max_inter_arrival);
        self.job_counter += 1;

        WorkloadEntry { arrival, job, attempts, fallback }
    }

    pub fn generate_workload(&mut self, count: usize, reset: bool) -> Vec<WorkloadEntry> {
        if reset {
            self.reset();
        }

        let entries: Vec<WorkloadEntry> = (0..count).map(|_| self.generate_one()).collect();
        log::info!("Generated workload of {} jobs spanning {} s", entries.len(), self.timestamp);
        entries
    }
}

impl TryFrom<(&WorkLoadDto, Vec<User>, HashMap<UserName, AccountName>, JobGenerator, SimRng)> for WorkLoad {
    type Error = ConfigError;

    fn try_from(args: (&WorkLoadDto, Vec<User>, HashMap<UserName, AccountName>, JobGenerator, SimRng)) -> Result<Self, Self::Error> {
        let (dto, users, accounts, job_generator, rng) = args;
        WorkLoad::new(users, accounts, job_generator, WorkLoadSettings::from(dto), rng)
    }
}
