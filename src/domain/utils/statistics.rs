use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;

use crate::error::Result;

/// Target of the structured `tracing` events emitted per generated job.
pub const ANALYTICS_TARGET: &str = "analytics";

/// Placeholder written for columns an event did not set.
pub const MISSING_VALUE: &str = "NA";

/// Each event is a set of key-value pairs. This enum lists all allowed keys and thus the columns of
/// the statistics file, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StatParameter {
    /// Submission time in seconds since the start of the workload.
    Time,

    JobId,

    /// "classic", "gpu" or "generic"
    JobKind,

    User,
    Account,

    /// Requested time limit in seconds.
    RequestedTime,

    /// `-1` when the time limit governs.
    SimulatedWalltime,

    Nodes,
    TasksPerNode,
    NumberOfTasks,

    /// Machines able to host one node of the job when it was drawn.
    MatchingNodes,

    Constraint,
    MemoryPerNode,
    GpusPerNode,

    /// Generator calls spent on this job.
    Attempts,

    /// Whether a classic job replaced the drawn flavor.
    Fallback,
}

impl StatParameter {
    pub const ALL: [StatParameter; 16] = [
        StatParameter::Time,
        StatParameter::JobId,
        StatParameter::JobKind,
        StatParameter::User,
        StatParameter::Account,
        StatParameter::RequestedTime,
        StatParameter::SimulatedWalltime,
        StatParameter::Nodes,
        StatParameter::TasksPerNode,
        StatParameter::NumberOfTasks,
        StatParameter::MatchingNodes,
        StatParameter::Constraint,
        StatParameter::MemoryPerNode,
        StatParameter::GpusPerNode,
        StatParameter::Attempts,
        StatParameter::Fallback,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatParameter::Time => "Time",
            StatParameter::JobId => "JobId",
            StatParameter::JobKind => "JobKind",
            StatParameter::User => "User",
            StatParameter::Account => "Account",
            StatParameter::RequestedTime => "RequestedTime",
            StatParameter::SimulatedWalltime => "SimulatedWalltime",
            StatParameter::Nodes => "Nodes",
            StatParameter::TasksPerNode => "TasksPerNode",
            StatParameter::NumberOfTasks => "NumberOfTasks",
            StatParameter::MatchingNodes => "MatchingNodes",
            StatParameter::Constraint => "Constraint",
            StatParameter::MemoryPerNode => "MemoryPerNode",
            StatParameter::GpusPerNode => "GpusPerNode",
            StatParameter::Attempts => "Attempts",
            StatParameter::Fallback => "Fallback",
        }
    }

    /// Returns the defined order of columns for the CSV header
    pub fn headers() -> Vec<&'static str> {
        Self::ALL.iter().map(|param| param.as_str()).collect()
    }
}

/// Values are stored in their native format and only formatted when written.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl StatValue {
    pub fn to_field(&self) -> String {
        match self {
            StatValue::Integer(i) => i.to_string(),
            StatValue::Float(f) => f.to_string(),
            StatValue::Text(t) => t.clone(),
            StatValue::Bool(b) => b.to_string(),
        }
    }
}

impl From<i64> for StatValue {
    fn from(v: i64) -> Self {
        StatValue::Integer(v)
    }
}

impl From<u32> for StatValue {
    fn from(v: u32) -> Self {
        StatValue::Integer(v as i64)
    }
}

impl From<u64> for StatValue {
    fn from(v: u64) -> Self {
        StatValue::Integer(v as i64)
    }
}

impl From<f64> for StatValue {
    fn from(v: f64) -> Self {
        StatValue::Float(v)
    }
}

impl From<String> for StatValue {
    fn from(v: String) -> Self {
        StatValue::Text(v)
    }
}

impl From<&str> for StatValue {
    fn from(v: &str) -> Self {
        StatValue::Text(v.to_string())
    }
}

impl From<bool> for StatValue {
    fn from(v: bool) -> Self {
        StatValue::Bool(v)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatisticEvent {
    data: HashMap<StatParameter, StatValue>,
}

impl StatisticEvent {
    pub fn new() -> Self {
        Self { data: HashMap::new() }
    }

    pub fn set<V: Into<StatValue>>(&mut self, param: StatParameter, value: V) -> &mut Self {
        self.data.insert(param, value.into());
        self
    }

    /// Sets `param` only if `value` is present, leaving the column `NA` otherwise.
    pub fn set_opt<V: Into<StatValue>>(&mut self, param: StatParameter, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.set(param, value);
        }
        self
    }

    pub fn get(&self, param: StatParameter) -> Option<&StatValue> {
        self.data.get(&param)
    }

    /// The event as one CSV row in header order.
    pub fn to_row(&self) -> Vec<String> {
        StatParameter::ALL
            .iter()
            .map(|param| self.data.get(param).map(StatValue::to_field).unwrap_or_else(|| MISSING_VALUE.to_string()))
            .collect()
    }
}

/// Writes the header and one `;`-separated row per event.
pub fn write_statistics<W: Write>(writer: W, events: &[StatisticEvent]) -> Result<()> {
    let mut csv_wtr = csv::WriterBuilder::new().delimiter(b';').from_writer(writer);

    csv_wtr.write_record(StatParameter::headers())?;
    for event in events {
        csv_wtr.write_record(event.to_row())?;
    }
    csv_wtr.flush()?;

    Ok(())
}
