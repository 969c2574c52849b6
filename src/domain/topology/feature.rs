use std::fmt;

pub const BIG_MEM_FEATURE: &str = "BigMem";
pub const MANY_CORES_FEATURE: &str = "ManyCores";

/// Key of an aggregate table in a [`Topology`](super::topology::Topology).
///
/// `Default` covers nodes without any resource-class tag, `All` covers every node, the remaining
/// variants cover nodes tagged with the matching resource class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureTag {
    /// Nodes carrying neither `BigMem` nor `ManyCores`, whatever other tags (`CPU-A`, `IB`, ...) they have.
    Default,
    All,
    BigMem,
    ManyCores,
}

impl FeatureTag {
    /// Resource-class tags which are attached to nodes as features.
    pub const RESOURCE_CLASSES: [FeatureTag; 2] = [FeatureTag::BigMem, FeatureTag::ManyCores];

    /// Classes a job can be generated for.
    pub const JOB_CLASSES: [FeatureTag; 3] = [FeatureTag::Default, FeatureTag::BigMem, FeatureTag::ManyCores];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureTag::Default => "DEFAULT",
            FeatureTag::All => "ALL",
            FeatureTag::BigMem => BIG_MEM_FEATURE,
            FeatureTag::ManyCores => MANY_CORES_FEATURE,
        }
    }

    /// Maps a node feature string onto its resource class, if it is one.
    pub fn from_feature(feature: &str) -> Option<FeatureTag> {
        match feature {
            BIG_MEM_FEATURE => Some(FeatureTag::BigMem),
            MANY_CORES_FEATURE => Some(FeatureTag::ManyCores),
            _ => None,
        }
    }

    /// The `--constraint` a job targeting this class has to carry.
    pub fn constraint(&self) -> Option<&'static str> {
        match self {
            FeatureTag::BigMem | FeatureTag::ManyCores => Some(self.as_str()),
            FeatureTag::Default | FeatureTag::All => None,
        }
    }
}

impl fmt::Display for FeatureTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Group-identity feature, e.g. `CPU-A` for group letter `a`.
pub fn group_feature(group_letter: char) -> String {
    format!("CPU-{}", group_letter.to_ascii_uppercase())
}
