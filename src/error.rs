use thiserror::Error;

/// Raised when a generator is constructed from parameters it can never satisfy.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid range for '{parameter}': min ({min}) must not exceed max ({max})")]
    InvalidRange { parameter: &'static str, min: i64, max: i64 },

    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue { parameter: &'static str, reason: String },

    #[error("Probability thresholds must be cumulative and within [0, 1], got {0:?}")]
    InvalidProbabilities(Vec<f64>),

    #[error("The workload needs at least one non-admin user")]
    EmptyUserList,

    #[error("Topology cannot host any multi-node job: {0}")]
    InfeasibleTopology(String),
}

/// Raised when persisted cluster, topology or user data cannot be read back.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("Bad formatting on line {line}: {reason}")]
    BadFormatting { line: usize, reason: String },

    #[error("Topology references unknown node '{0}'")]
    UnknownNode(String),

    #[error("Topology references unknown switch '{0}'")]
    UnknownSwitch(String),

    #[error("Topology has no 'SwitchName=TOP' root switch")]
    MissingRootSwitch,

    #[error("Node '{node}' is missing required field '{field}'")]
    MissingField { node: String, field: &'static str },

    #[error("Field '{field}' has a non-numeric value '{value}'")]
    InvalidNumber { field: String, value: String },

    #[error("Invalid node name range '{0}'")]
    InvalidNodeRange(String),

    #[error("Invalid user record on line {line}: '{content}'")]
    InvalidUserRecord { line: usize, content: String },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found or could not be read: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse scenario JSON: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Failed to write workload statistics: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Invalid generator configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Malformed persisted data: {0}")]
    Parse(#[from] ParseError),
}

pub type Result<T> = std::result::Result<T, Error>;
