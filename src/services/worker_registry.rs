use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::domain::models::capability::AgentCapability;

/// Exponential smoothing weight for performance feedback
const FEEDBACK_WEIGHT: f64 = 0.1;

#[derive(Debug, Default)]
struct RegistryState {
    capabilities: HashMap<String, AgentCapability>,
    active_tasks: HashMap<String, usize>,
}

/// Catalog of agent capability profiles plus live load tracking.
///
/// Owns every `AgentCapability` in the process. An agent is eligible for
/// selection only while its active task count is below its capacity.
#[derive(Debug, Clone, Default)]
pub struct WorkerRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl WorkerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with the default agent catalog
    pub async fn with_default_catalog() -> Self {
        let registry = Self::new();
        for capability in default_catalog() {
            registry.register(capability).await;
        }
        registry
    }

    /// Register or replace an agent's capability profile
    pub async fn register(&self, capability: AgentCapability) {
        let mut state = self.state.write().await;
        debug!(agent = %capability.name, capacity = capability.capacity, "registering agent");
        state.active_tasks.entry(capability.name.clone()).or_insert(0);
        state.capabilities.insert(capability.name.clone(), capability);
    }

    /// Remove an agent from the catalog
    pub async fn deregister(&self, name: &str) -> Option<AgentCapability> {
        let mut state = self.state.write().await;
        state.active_tasks.remove(name);
        state.capabilities.remove(name)
    }

    /// Look up one agent's profile
    pub async fn capability(&self, name: &str) -> Option<AgentCapability> {
        self.state.read().await.capabilities.get(name).cloned()
    }

    /// All registered agent names
    pub async fn agent_names(&self) -> Vec<String> {
        self.state.read().await.capabilities.keys().cloned().collect()
    }

    /// Current active task count for an agent
    pub async fn active_tasks(&self, name: &str) -> usize {
        self.state
            .read()
            .await
            .active_tasks
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    /// Agents with spare capacity, sorted by performance descending.
    ///
    /// This is the candidate pool for all selection strategies.
    pub async fn available_agents(&self) -> Vec<AgentCapability> {
        let state = self.state.read().await;
        let mut available: Vec<AgentCapability> = state
            .capabilities
            .values()
            .filter(|cap| {
                let active = state.active_tasks.get(&cap.name).copied().unwrap_or(0);
                active < cap.capacity
            })
            .cloned()
            .collect();

        available.sort_by(|a, b| {
            b.performance
                .partial_cmp(&a.performance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        available
    }

    /// Mark an agent as having picked up one task
    pub async fn begin_task(&self, name: &str) {
        let mut state = self.state.write().await;
        *state.active_tasks.entry(name.to_string()).or_insert(0) += 1;
    }

    /// Mark an agent as having released one task
    pub async fn end_task(&self, name: &str) {
        let mut state = self.state.write().await;
        match state.active_tasks.get_mut(name) {
            Some(count) if *count > 0 => *count -= 1,
            _ => warn!(agent = name, "end_task without matching begin_task"),
        }
    }

    /// Fold one execution outcome into the agent's performance score.
    ///
    /// Exponentially smoothed toward 100 on success and 0 on failure, so a
    /// single outcome nudges rather than rewrites the score.
    pub async fn record_performance(&self, name: &str, success: bool) {
        let mut state = self.state.write().await;
        if let Some(cap) = state.capabilities.get_mut(name) {
            let target = if success { 100.0 } else { 0.0 };
            cap.performance =
                (cap.performance * (1.0 - FEEDBACK_WEIGHT) + target * FEEDBACK_WEIGHT)
                    .clamp(0.0, 100.0);
        }
    }
}

/// The default agent catalog shipped with the delegation core
pub fn default_catalog() -> Vec<AgentCapability> {
    fn tags(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    vec![
        AgentCapability::new(
            "architect",
            tags(&["architecture", "design", "planning"]),
            tags(&["system-design", "api-design"]),
            3,
            92.0,
        ),
        AgentCapability::new(
            "code-reviewer",
            tags(&["review", "quality", "readability"]),
            tags(&["static-analysis", "style"]),
            4,
            88.0,
        ),
        AgentCapability::new(
            "security-auditor",
            tags(&["security", "audit", "vulnerability"]),
            tags(&["threat-modeling", "secrets"]),
            2,
            90.0,
        ),
        AgentCapability::new(
            "refactorer",
            tags(&["refactor", "cleanup", "migration"]),
            tags(&["dead-code", "api-migration"]),
            3,
            85.0,
        ),
        AgentCapability::new(
            "test-architect",
            tags(&["test", "coverage", "quality"]),
            tags(&["property-testing", "fixtures"]),
            3,
            84.0,
        ),
        AgentCapability::new(
            "bug-triage-specialist",
            tags(&["debug", "fix", "triage"]),
            tags(&["bisection", "crash-analysis"]),
            3,
            86.0,
        ),
        AgentCapability::new(
            "enforcer",
            tags(&["policy", "compliance", "standards"]),
            tags(&["lint-rules", "conventions"]),
            5,
            80.0,
        ),
    ]
}
