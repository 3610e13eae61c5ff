use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Qualitative complexity level derived from the numeric score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityLevel {
    Simple,
    Moderate,
    Complex,
    Enterprise,
}

impl fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple => write!(f, "simple"),
            Self::Moderate => write!(f, "moderate"),
            Self::Complex => write!(f, "complex"),
            Self::Enterprise => write!(f, "enterprise"),
        }
    }
}

/// How many agents handle a request and how their outputs are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegationStrategy {
    SingleAgent,
    MultiAgent,
    OrchestratorLed,
}

impl fmt::Display for DelegationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SingleAgent => write!(f, "single_agent"),
            Self::MultiAgent => write!(f, "multi_agent"),
            Self::OrchestratorLed => write!(f, "orchestrator_led"),
        }
    }
}

impl FromStr for DelegationStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single_agent" | "single-agent" => Ok(Self::SingleAgent),
            "multi_agent" | "multi-agent" => Ok(Self::MultiAgent),
            "orchestrator_led" | "orchestrator-led" => Ok(Self::OrchestratorLed),
            _ => Err(anyhow::anyhow!("Invalid delegation strategy: {s}")),
        }
    }
}

/// Structured sub-scores produced by complexity analysis.
///
/// Recomputed per request; never persisted as authoritative state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ComplexityMetrics {
    /// Contribution from the operation tag itself
    pub operation_factor: f64,
    /// Contribution from the number of files touched
    pub file_factor: f64,
    /// Contribution from change volume
    pub volume_factor: f64,
    /// Contribution from dependency count
    pub dependency_factor: f64,
    /// Contribution from the caller-assessed risk level
    pub risk_factor: f64,
    /// Estimated duration in minutes (advisory)
    pub estimated_duration_mins: u64,
}

impl ComplexityMetrics {
    /// Sum of all factors
    pub fn total(&self) -> f64 {
        self.operation_factor
            + self.file_factor
            + self.volume_factor
            + self.dependency_factor
            + self.risk_factor
    }
}

/// Final complexity verdict for a request. Derived, immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ComplexityScore {
    /// Numeric score; unbounded above, effectively 0-150
    pub score: f64,
    /// Qualitative level
    pub level: ComplexityLevel,
    /// Strategy recommendation, a pure function of the score
    pub recommended_strategy: DelegationStrategy,
    /// Recommended number of agents (>= 1)
    pub estimated_agents: usize,
}
