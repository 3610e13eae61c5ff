use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::models::complexity::DelegationStrategy;

/// Point-in-time snapshot of the process-wide delegation metrics
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct MetricsSnapshot {
    pub total_delegations: u64,
    pub successful_executions: u64,
    pub failed_executions: u64,
    pub avg_complexity: f64,
    pub avg_duration_ms: f64,
    pub strategy_usage: HashMap<String, u64>,
}

#[derive(Debug, Default)]
struct MetricsState {
    total_delegations: u64,
    successful_executions: u64,
    failed_executions: u64,
    avg_complexity: f64,
    avg_duration_ms: f64,
    strategy_usage: HashMap<DelegationStrategy, u64>,
}

/// Process-wide delegation counters, accumulated across all requests and
/// reset only at process restart.
///
/// Every analyzed request increments the total exactly once at analysis
/// time, regardless of later execution outcome. Updates are serialized
/// through a single writer lock so concurrent delegations never lose counts.
#[derive(Debug, Clone, Default)]
pub struct DelegationMetrics {
    state: Arc<RwLock<MetricsState>>,
}

impl DelegationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one analyzed delegation: total, running average complexity,
    /// and the strategy histogram.
    pub async fn record_analysis(&self, strategy: DelegationStrategy, complexity: f64) {
        let mut state = self.state.write().await;
        state.total_delegations += 1;
        let n = state.total_delegations as f64;
        state.avg_complexity += (complexity - state.avg_complexity) / n;
        *state.strategy_usage.entry(strategy).or_insert(0) += 1;
    }

    /// Record a successful execution and fold its duration into the running
    /// average.
    pub async fn record_success(&self, duration_ms: u64) {
        let mut state = self.state.write().await;
        state.successful_executions += 1;
        let n = state.successful_executions as f64;
        state.avg_duration_ms += (duration_ms as f64 - state.avg_duration_ms) / n;
    }

    /// Record a failed execution
    pub async fn record_failure(&self) {
        let mut state = self.state.write().await;
        state.failed_executions += 1;
    }

    /// Snapshot the current counters
    pub async fn snapshot(&self) -> MetricsSnapshot {
        let state = self.state.read().await;
        MetricsSnapshot {
            total_delegations: state.total_delegations,
            successful_executions: state.successful_executions,
            failed_executions: state.failed_executions,
            avg_complexity: state.avg_complexity,
            avg_duration_ms: state.avg_duration_ms,
            strategy_usage: state
                .strategy_usage
                .iter()
                .map(|(strategy, count)| (strategy.to_string(), *count))
                .collect(),
        }
    }
}
