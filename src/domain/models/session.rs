use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::delegation::{ConflictPolicy, DelegationResult, ExecutionOutcome};
use super::request::RequestPriority;

/// A message queued between agents within a session.
///
/// Created on send, removed from the pending queue on receive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Communication {
    pub id: Uuid,
    pub from_agent: String,
    pub to_agent: String,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
    pub priority: RequestPriority,
}

impl Communication {
    pub fn new(
        from_agent: impl Into<String>,
        to_agent: impl Into<String>,
        payload: Value,
        priority: RequestPriority,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            from_agent: from_agent.into(),
            to_agent: to_agent.into(),
            payload,
            timestamp: Utc::now(),
            priority,
        }
    }
}

/// One contribution to the shared context history for a key
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SharedContextEntry {
    pub value: Value,
    pub from_agent: String,
    pub timestamp: DateTime<Utc>,
}

/// The latest shared-context value for a key, annotated with its contributor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SharedContextView {
    pub key: String,
    pub value: Value,
    pub contributed_by: String,
    pub updated_at: DateTime<Utc>,
    /// Number of entries in the full history for this key
    pub revisions: usize,
}

/// Record of a resolved conflict. Append-only, never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConflictRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub participants: Vec<String>,
    pub strategy: ConflictPolicy,
    pub outcome: Value,
}

/// One entry in a worker's per-session interaction log
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct InteractionRecord {
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub success: bool,
    pub response_time_ms: u64,
}

/// Running per-session coordination metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SessionMetrics {
    pub total_interactions: u64,
    pub successful_interactions: u64,
    pub failed_interactions: u64,
    pub total_conflicts: u64,
    pub avg_response_time_ms: f64,
    /// success_rate * (1 - conflict_rate)
    pub coordination_efficiency: f64,
}

impl SessionMetrics {
    /// Fold one interaction into the running aggregates
    pub fn record_interaction(&mut self, success: bool, response_time_ms: u64) {
        self.total_interactions += 1;
        if success {
            self.successful_interactions += 1;
        } else {
            self.failed_interactions += 1;
        }

        let n = self.total_interactions as f64;
        self.avg_response_time_ms =
            self.avg_response_time_ms + (response_time_ms as f64 - self.avg_response_time_ms) / n;

        self.recompute_efficiency();
    }

    /// Fold one conflict into the running aggregates
    pub fn record_conflict(&mut self) {
        self.total_conflicts += 1;
        self.recompute_efficiency();
    }

    fn recompute_efficiency(&mut self) {
        if self.total_interactions == 0 {
            self.coordination_efficiency = 0.0;
            return;
        }
        let success_rate =
            self.successful_interactions as f64 / self.total_interactions as f64;
        let conflict_rate =
            (self.total_conflicts as f64 / self.total_interactions as f64).min(1.0);
        self.coordination_efficiency = success_rate * (1.0 - conflict_rate);
    }
}

/// Coordination sub-state: live agents, messaging, shared context, metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CoordinationState {
    pub active_agents: HashSet<String>,
    pub pending_messages: Vec<Communication>,
    /// Append-only per-key value history
    pub shared_context: HashMap<String, Vec<SharedContextEntry>>,
    pub metrics: SessionMetrics,
}

/// Snapshot of a delegation plus its outcome, kept after completion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CompletedDelegation {
    pub delegation_id: Uuid,
    pub delegation: DelegationResult,
    pub outcome: ExecutionOutcome,
    pub completed_at: DateTime<Utc>,
}

/// All coordination state for one logical session.
///
/// Created on first use of a session id; torn down only by explicit cleanup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SessionContext {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub active_delegations: HashMap<Uuid, DelegationResult>,
    pub completed_delegations: Vec<CompletedDelegation>,
    /// Per-agent interaction log, append-only
    pub interactions: HashMap<String, Vec<InteractionRecord>>,
    pub conflict_history: Vec<ConflictRecord>,
    pub coordination: CoordinationState,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            started_at: Utc::now(),
            active_delegations: HashMap::new(),
            completed_delegations: Vec::new(),
            interactions: HashMap::new(),
            conflict_history: Vec::new(),
            coordination: CoordinationState::default(),
        }
    }
}

/// Read-only summary of a session's current state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SessionStatus {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub active_delegations: usize,
    pub completed_delegations: usize,
    pub active_agents: Vec<String>,
    pub pending_messages: usize,
    pub shared_context_keys: usize,
    pub conflicts_recorded: usize,
    pub metrics: SessionMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_running_average() {
        let mut metrics = SessionMetrics::default();
        metrics.record_interaction(true, 100);
        metrics.record_interaction(true, 300);

        assert_eq!(metrics.total_interactions, 2);
        assert!((metrics.avg_response_time_ms - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_coordination_efficiency() {
        let mut metrics = SessionMetrics::default();
        for _ in 0..3 {
            metrics.record_interaction(true, 50);
        }
        metrics.record_interaction(false, 50);
        metrics.record_conflict();

        // success_rate = 3/4, conflict_rate = 1/4
        let expected = 0.75 * (1.0 - 0.25);
        assert!((metrics.coordination_efficiency - expected).abs() < 1e-9);
    }

    #[test]
    fn test_efficiency_zero_without_interactions() {
        let mut metrics = SessionMetrics::default();
        metrics.record_conflict();
        assert!((metrics.coordination_efficiency - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_session_context_starts_empty() {
        let ctx = SessionContext::new("s1");
        assert!(ctx.active_delegations.is_empty());
        assert!(ctx.coordination.pending_messages.is_empty());
        assert!(ctx.conflict_history.is_empty());
    }
}
