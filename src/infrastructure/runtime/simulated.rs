use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::domain::error::WorkerRuntimeError;
use crate::domain::models::config::SimulationConfig;
use crate::domain::models::delegation::{InvocationPath, WorkerResult};
use crate::domain::ports::WorkerRuntime;

/// Relative latency multipliers per agent archetype. Agents outside this
/// table get the neutral multiplier.
const LATENCY_PROFILES: &[(&str, f64)] = &[
    ("architect", 1.5),
    ("security-auditor", 1.3),
    ("refactorer", 1.2),
    ("test-architect", 1.1),
    ("bug-triage-specialist", 1.0),
    ("code-reviewer", 0.8),
    ("enforcer", 0.6),
];

const NEUTRAL_MULTIPLIER: f64 = 1.0;
/// Baseline simulated expertise reported on every result
const SIMULATED_EXPERTISE: f64 = 60.0;

/// Worker runtime that fabricates plausible results instead of invoking
/// anything.
///
/// Serves two roles: a standalone runtime for local development, and the
/// fallback target when the real runtime's transport fails. Latency is
/// deterministic per agent so repeated runs behave identically.
pub struct SimulatedWorkerRuntime {
    config: SimulationConfig,
    /// Allowed agent ids; `None` accepts everything
    allow_list: Option<HashSet<String>>,
}

impl SimulatedWorkerRuntime {
    /// Runtime restricted to the given agent allow-list
    pub fn new(config: SimulationConfig, allow_list: impl IntoIterator<Item = String>) -> Self {
        Self {
            config,
            allow_list: Some(allow_list.into_iter().collect()),
        }
    }

    /// Runtime that accepts any agent id. Used as the transport-failure
    /// fallback, where the agent has already passed allow-list checks.
    pub fn permissive(config: SimulationConfig) -> Self {
        Self {
            config,
            allow_list: None,
        }
    }

    fn latency_for(&self, agent: &str) -> u64 {
        let multiplier = LATENCY_PROFILES
            .iter()
            .find(|(name, _)| *name == agent)
            .map_or(NEUTRAL_MULTIPLIER, |(_, m)| *m);
        let latency = (self.config.base_latency_ms as f64 * multiplier).round() as u64;
        latency.min(self.config.max_latency_ms)
    }
}

#[async_trait]
impl WorkerRuntime for SimulatedWorkerRuntime {
    async fn invoke(&self, agent: &str, task: &str) -> Result<WorkerResult, WorkerRuntimeError> {
        if let Some(allowed) = &self.allow_list {
            if !allowed.contains(agent) {
                return Err(WorkerRuntimeError::UnknownWorker(agent.to_string()));
            }
        }

        let latency_ms = self.latency_for(agent);
        debug!(agent, latency_ms, "simulating invocation");
        tokio::time::sleep(Duration::from_millis(latency_ms)).await;

        Ok(WorkerResult {
            agent: agent.to_string(),
            payload: json!({
                "agent": agent,
                "task": task,
                "status": "completed",
                "simulated": true,
            }),
            expertise_score: SIMULATED_EXPERTISE,
            invoked_through: InvocationPath::Simulated,
            duration_ms: latency_ms,
        })
    }
}
