use std::fmt;
use std::str::FromStr;

use crate::domain::topology::feature::FeatureTag;
use crate::error::ParseError;

/// Number of machines a [`Node`] stands for, as it appears in a Slurm name range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeCount {
    /// Bare name without index, one machine.
    Implicit,

    /// Indexed machines `start..=end`.
    Range { start: u32, end: u32 },
}

impl NodeCount {
    /// Scalar count. `0` keeps the bare name, every other value becomes `[1-n]`.
    pub fn from_scalar(count: u32) -> Self {
        match count {
            0 => NodeCount::Implicit,
            n => NodeCount::Range { start: 1, end: n },
        }
    }

    pub fn machines(&self) -> u32 {
        match *self {
            NodeCount::Implicit => 1,
            NodeCount::Range { start, end } => end.saturating_sub(start) + 1,
        }
    }
}

/// A homogeneous group of identical machines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub count: NodeCount,
    pub cores_per_machine: u32,
    pub sockets: u32,
    pub memory_mb: u64,
    pub threads_per_core: u32,
    pub gpus: u32,

    /// Ordered feature tags. Empty means a plain CPU node.
    pub features: Vec<String>,
}

impl Node {
    pub fn new(name: impl Into<String>, count: NodeCount, cores_per_machine: u32, sockets: u32, memory_mb: u64) -> Self {
        Self {
            name: name.into(),
            count,
            cores_per_machine,
            sockets,
            memory_mb,
            threads_per_core: 1,
            gpus: 0,
            features: Vec::new(),
        }
    }

    pub fn with_gpus(mut self, gpus: u32) -> Self {
        self.gpus = gpus;
        self
    }

    pub fn with_features<S: Into<String>>(mut self, features: impl IntoIterator<Item = S>) -> Self {
        self.features = features.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_threads_per_core(mut self, threads_per_core: u32) -> Self {
        self.threads_per_core = threads_per_core;
        self
    }

    pub fn machine_count(&self) -> u64 {
        self.count.machines() as u64
    }

    pub fn cores_per_socket(&self) -> u32 {
        if self.sockets == 0 { self.cores_per_machine } else { self.cores_per_machine / self.sockets }
    }

    /// Canonical Slurm name range: `name`, `name<k>` or `name[a-b]`.
    pub fn name_range(&self) -> String {
        match self.count {
            NodeCount::Implicit => self.name.clone(),
            NodeCount::Range { start, end } if start == end => format!("{}{}", self.name, start),
            NodeCount::Range { start, end } => format!("{}[{}-{}]", self.name, start, end),
        }
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }

    /// True if every required feature is carried by this node. An empty requirement always matches.
    pub fn has_all_features(&self, required: &[&str]) -> bool {
        required.iter().all(|feature| self.has_feature(feature))
    }

    /// Resource classes this node belongs to, derived from its features.
    pub fn resource_classes(&self) -> Vec<FeatureTag> {
        let mut classes: Vec<FeatureTag> = self.features.iter().filter_map(|f| FeatureTag::from_feature(f)).collect();
        classes.sort();
        classes.dedup();
        classes
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} machines, {} cores, {} sockets, {} MB, {} GPUs, features [{}])",
            self.name_range(),
            self.machine_count(),
            self.cores_per_machine,
            self.sockets,
            self.memory_mb,
            self.gpus,
            self.features.join(",")
        )
    }
}

/// A parsed Slurm name range: base name plus machine count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRange {
    pub name: String,
    pub count: NodeCount,
}

impl FromStr for NameRange {
    type Err = ParseError;

    /// Trailing digits are read as a single machine index, so base names must not end in a digit.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidNodeRange(s.to_string());

        if s.is_empty() {
            return Err(invalid());
        }

        if let Some(open) = s.find('[') {
            let inner = s[open + 1..].strip_suffix(']').ok_or_else(invalid)?;
            let (start, end) = inner.split_once('-').ok_or_else(invalid)?;
            let start: u32 = start.parse().map_err(|_| invalid())?;
            let end: u32 = end.parse().map_err(|_| invalid())?;
            if open == 0 || start > end {
                return Err(invalid());
            }
            return Ok(NameRange { name: s[..open].to_string(), count: NodeCount::Range { start, end } });
        }

        let base = s.trim_end_matches(|c: char| c.is_ascii_digit());
        if base.len() == s.len() {
            return Ok(NameRange { name: s.to_string(), count: NodeCount::Implicit });
        }
        if base.is_empty() {
            return Err(invalid());
        }

        let index: u32 = s[base.len()..].parse().map_err(|_| invalid())?;
        Ok(NameRange { name: base.to_string(), count: NodeCount::Range { start: index, end: index } })
    }
}
