use serde::{Deserialize, Serialize};

/// Root of a scenario configuration file. Every field may be omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScenarioDto {
    /// Master seed. Without one every run draws fresh entropy.
    pub seed: Option<u64>,

    /// Number of node groups (switches below `TOP`).
    pub cluster_size: usize,

    pub node_generator: NodeGeneratorDto,
    pub topology_generator: TopologyGeneratorDto,
    pub job_generator: JobGeneratorDto,
    pub workload: WorkLoadDto,
}

impl Default for ScenarioDto {
    fn default() -> Self {
        Self {
            seed: None,
            cluster_size: 6,
            node_generator: NodeGeneratorDto::default(),
            topology_generator: TopologyGeneratorDto::default(),
            job_generator: JobGeneratorDto::default(),
            workload: WorkLoadDto::default(),
        }
    }
}

/// Core counts are in units of 4 cores, memory in units of 4000 MB.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeGeneratorDto {
    pub min_cores: u32,
    pub max_cores: u32,
    pub min_memory_units: u64,
    pub max_memory_units: u64,
    pub min_sockets: u32,
    pub max_sockets: u32,
    pub min_gpus: u32,
    pub max_gpus: u32,
}

impl Default for NodeGeneratorDto {
    fn default() -> Self {
        Self { min_cores: 0, max_cores: 7, min_memory_units: 6, max_memory_units: 33, min_sockets: 1, max_sockets: 3, min_gpus: 1, max_gpus: 9 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TopologyGeneratorDto {
    pub min_group_size: u32,
    pub max_group_size: u32,
    pub gpu_probability: f64,
    pub many_cores_probability: f64,
    pub mixed_probability: f64,
}

impl Default for TopologyGeneratorDto {
    fn default() -> Self {
        Self { min_group_size: 4, max_group_size: 8, gpu_probability: 0.3, many_cores_probability: 0.5, mixed_probability: 0.6 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobGeneratorDto {
    pub max_long_job_hours: u32,
    pub max_short_job_minutes: u32,
    pub min_memory_mb: u64,
    pub long_job_probability: f64,
    pub gpu_constraint_probability: f64,
    pub memory_constraint_probability: f64,
}

impl Default for JobGeneratorDto {
    fn default() -> Self {
        Self {
            max_long_job_hours: 24,
            max_short_job_minutes: 60,
            min_memory_mb: 1000,
            long_job_probability: 0.5,
            gpu_constraint_probability: 0.5,
            memory_constraint_probability: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkLoadDto {
    pub job_count: usize,
    pub min_inter_arrival: u64,
    pub max_inter_arrival: u64,
    pub classic_probability: f64,
    pub gpu_probability: f64,
    pub retry: u32,
}

impl Default for WorkLoadDto {
    fn default() -> Self {
        Self { job_count: 50, min_inter_arrival: 1800, max_inter_arrival: 6000, classic_probability: 0.7, gpu_probability: 0.9, retry: 5 }
    }
}
