use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::complexity::{ComplexityMetrics, ComplexityScore, DelegationStrategy};

/// How disagreeing agent outputs are collapsed into one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    Consensus,
    MajorityVote,
    ExpertPriority,
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Consensus => write!(f, "consensus"),
            Self::MajorityVote => write!(f, "majority_vote"),
            Self::ExpertPriority => write!(f, "expert_priority"),
        }
    }
}

impl FromStr for ConflictPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "consensus" => Ok(Self::Consensus),
            "majority_vote" => Ok(Self::MajorityVote),
            "expert_priority" => Ok(Self::ExpertPriority),
            _ => Err(anyhow::anyhow!("Invalid conflict policy: {s}")),
        }
    }
}

/// Whether a result came from the real runtime or the simulated fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationPath {
    Runtime,
    Simulated,
}

/// A single agent's result from one invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WorkerResult {
    /// Agent that produced this result
    pub agent: String,

    /// Result payload
    pub payload: Value,

    /// Result-embedded expertise/confidence score used by expert-priority
    /// resolution
    pub expertise_score: f64,

    /// Real runtime result or simulated fallback
    pub invoked_through: InvocationPath,

    /// Wall-clock duration of the invocation
    pub duration_ms: u64,
}

impl WorkerResult {
    /// Canonical serialized form used for vote counting and consensus checks
    pub fn canonical(&self) -> String {
        self.payload.to_string()
    }
}

/// Outcome of applying a conflict policy to multiple results
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConflictOutcome {
    /// The winning value
    pub value: Value,

    /// Policy that produced it
    pub policy: ConflictPolicy,

    /// Whether every participant agreed. Consensus still returns the first
    /// result when false; this flag is the disagreement signal.
    pub unanimous: bool,

    /// Agents whose results participated
    pub participants: Vec<String>,
}

/// Per-agent outcome recorded during orchestrator-led execution (and carried
/// on multi-agent batch failures)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WorkerOutcome {
    pub agent: String,
    pub success: bool,
    pub result: Option<WorkerResult>,
    pub error: Option<String>,
}

/// Consolidated summary returned by orchestrator-led execution.
///
/// Deliberately not arbitrated: each agent's success or failure is preserved
/// with attribution instead of being collapsed into one value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OrchestrationSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub outcomes: Vec<WorkerOutcome>,
}

/// Final outcome of executing a delegation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// Single-agent execution: the one result, passed through
    Single(WorkerResult),
    /// Multi-agent execution: arbitrated value plus every raw result
    Resolved {
        outcome: ConflictOutcome,
        results: Vec<WorkerResult>,
    },
    /// Orchestrator-led execution: consolidated per-agent summary
    Orchestrated(OrchestrationSummary),
}

/// Plan produced by delegation analysis.
///
/// Created once per analyzed request; mutated only by the execution-time
/// configuration clamps on strategy and agent list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DelegationResult {
    /// Unique delegation id, the key into session bookkeeping
    pub id: Uuid,

    /// Execution strategy
    pub strategy: DelegationStrategy,

    /// Selected agents, in selection order
    pub agents: Vec<String>,

    /// The complexity verdict that drove the plan
    pub score: ComplexityScore,

    /// The sub-scores behind the verdict
    pub metrics: ComplexityMetrics,

    /// Advisory duration estimate in minutes
    pub estimated_duration_mins: u64,

    /// Policy applied if multiple agents disagree
    pub conflict_resolution: ConflictPolicy,
}
