use std::fmt;

use crate::domain::topology::feature::FeatureTag;
use crate::domain::utils::id::{AccountName, JobId, UserName};

/// Trailing job-name token of every submission line.
pub const JOB_SCRIPT_NAME: &str = "pseudo.job";

pub const PARTITION: &str = "normal";
pub const QOS: &str = "normal";

/// Simulated walltime meaning "the requested time limit governs".
pub const WALLTIME_FROM_LIMIT: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Classic,
    Gpu,
    Generic,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobKind::Classic => "classic",
            JobKind::Gpu => "gpu",
            JobKind::Generic => "generic",
        };
        write!(f, "{}", name)
    }
}

/// Requested time limit. Seconds are always zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestedTime {
    pub hours: u32,
    pub minutes: u32,
}

impl RequestedTime {
    pub fn as_seconds(&self) -> i64 {
        self.hours as i64 * 3600 + self.minutes as i64 * 60
    }
}

impl fmt::Display for RequestedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:00", self.hours, self.minutes)
    }
}

/// How many nodes a job spans and how many tasks run on each of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskShape {
    pub tasks_per_node: u32,
    pub nodes: u64,

    /// Machines matching the per-node request when the shape was drawn. Always greater than `nodes`.
    pub matching_nodes: u64,
}

impl TaskShape {
    pub fn total_tasks(&self) -> u64 {
        self.nodes * self.tasks_per_node as u64
    }
}

/// Structured form of a job's scheduler directives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub time: RequestedTime,
    pub shape: TaskShape,
    pub account: Option<AccountName>,
    pub constraint: Option<FeatureTag>,
    pub memory_mb: Option<u64>,
    pub gpus: Option<u32>,
}

impl JobRequest {
    /// Renders the directives in their fixed order.
    pub fn to_flags(&self) -> Vec<String> {
        let mut flags = vec![
            format!("-t {}", self.time),
            format!("-n {}", self.shape.total_tasks()),
            format!("--ntasks-per-node={}", self.shape.tasks_per_node),
        ];
        if let Some(account) = &self.account {
            flags.push(format!("-A {}", account));
        }
        flags.push(format!("-p {}", PARTITION));
        flags.push(format!("-q {}", QOS));
        if let Some(constraint) = self.constraint.and_then(|tag| tag.constraint()) {
            flags.push(format!("--constraint={}", constraint));
        }
        if let Some(memory_mb) = self.memory_mb {
            flags.push(format!("--mem={}", memory_mb));
        }
        if let Some(gpus) = self.gpus {
            flags.push(format!("--gres=gpu:{}", gpus));
        }
        flags
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub kind: JobKind,

    /// [`WALLTIME_FROM_LIMIT`] or an induced early completion in seconds.
    pub simulated_walltime: i64,
    pub user: UserName,
    pub flags: Vec<String>,
    pub request: JobRequest,
}

impl Job {
    pub fn new(id: JobId, kind: JobKind, simulated_walltime: i64, user: UserName, request: JobRequest) -> Self {
        let flags = request.to_flags();
        Self { id, kind, simulated_walltime, user, flags, request }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-J {} -sim-walltime {} --uid={} ", self.id, self.simulated_walltime, self.user)?;
        for flag in &self.flags {
            write!(f, "{} ", flag)?;
        }
        write!(f, "{}", JOB_SCRIPT_NAME)
    }
}
