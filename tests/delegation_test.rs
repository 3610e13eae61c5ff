//! End-to-end delegation flow tests against the public API.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use strray::{
    AuditLogService, ConflictPolicy, DelegationError, DelegationRequest, DelegationStrategy,
    Delegator, ExecutionOutcome, InvocationPath, OrchestrationConfig, RequestContext,
    SimulatedWorkerRuntime, SimulationConfig, WorkerRegistry, WorkerResult, WorkerRuntime,
    WorkerRuntimeError,
};

fn fast_simulation() -> SimulationConfig {
    SimulationConfig {
        base_latency_ms: 1,
        max_latency_ms: 5,
    }
}

/// Runtime whose payload verdict depends on the agent, for conflict tests
struct VerdictRuntime {
    rejecting: Vec<String>,
}

#[async_trait]
impl WorkerRuntime for VerdictRuntime {
    async fn invoke(&self, agent: &str, _task: &str) -> Result<WorkerResult, WorkerRuntimeError> {
        let verdict = if self.rejecting.iter().any(|a| a == agent) {
            "reject"
        } else {
            "approve"
        };
        Ok(WorkerResult {
            agent: agent.to_string(),
            payload: json!({ "verdict": verdict }),
            expertise_score: if agent == "security-auditor" { 95.0 } else { 70.0 },
            invoked_through: InvocationPath::Runtime,
            duration_ms: 3,
        })
    }
}

/// Runtime that always fails at the transport level
struct DownRuntime;

#[async_trait]
impl WorkerRuntime for DownRuntime {
    async fn invoke(&self, agent: &str, _task: &str) -> Result<WorkerResult, WorkerRuntimeError> {
        Err(WorkerRuntimeError::Transport {
            agent: agent.to_string(),
            message: "socket closed".to_string(),
        })
    }
}

async fn simulated_delegator(orchestration: OrchestrationConfig) -> Delegator {
    let registry = WorkerRegistry::with_default_catalog().await;
    let runtime = Arc::new(SimulatedWorkerRuntime::new(
        fast_simulation(),
        registry.agent_names().await,
    ));
    let fallback = Arc::new(SimulatedWorkerRuntime::permissive(fast_simulation()));
    Delegator::new(
        registry,
        runtime,
        fallback,
        Arc::new(AuditLogService::default()),
        orchestration,
    )
}

async fn delegator_with_runtime(runtime: Arc<dyn WorkerRuntime>) -> Delegator {
    Delegator::new(
        WorkerRegistry::with_default_catalog().await,
        runtime,
        Arc::new(SimulatedWorkerRuntime::permissive(fast_simulation())),
        Arc::new(AuditLogService::default()),
        OrchestrationConfig::default(),
    )
}

fn heavy_context() -> RequestContext {
    RequestContext {
        file_count: Some(20),
        change_volume: Some(2000),
        dependencies: Some(6),
        ..RequestContext::default()
    }
}

#[tokio::test]
async fn empty_context_goes_to_a_single_agent() {
    let delegator = simulated_delegator(OrchestrationConfig::default()).await;
    let request = DelegationRequest::new("format", "tidy imports");

    let result = delegator.analyze_delegation(&request).await;
    assert_eq!(result.strategy, DelegationStrategy::SingleAgent);
    assert_eq!(result.agents.len(), 1);
}

#[tokio::test]
async fn heavy_request_gets_a_team() {
    let delegator = simulated_delegator(OrchestrationConfig::default()).await;
    let mut request = DelegationRequest::new("architecture", "redesign the storage layer");
    request.context = heavy_context();

    let result = delegator.analyze_delegation(&request).await;
    assert_eq!(result.strategy, DelegationStrategy::MultiAgent);
    assert!(result.agents.len() >= 2);
    assert!(result.score.score > 25.0);
}

#[tokio::test]
async fn mention_agent_overrides_scoring() {
    let delegator = simulated_delegator(OrchestrationConfig::default()).await;
    let mut request = DelegationRequest::new("architecture", "redesign the storage layer");
    request.context = heavy_context();
    request.mention_agent = Some("security-auditor".to_string());

    let result = delegator.analyze_delegation(&request).await;
    assert_eq!(result.strategy, DelegationStrategy::SingleAgent);
    assert_eq!(result.agents, vec!["security-auditor".to_string()]);
}

#[tokio::test]
async fn force_multi_applies_to_trivial_requests() {
    let delegator = simulated_delegator(OrchestrationConfig::default()).await;
    let mut request = DelegationRequest::new("docs", "update the changelog");
    request.force_multi_agent = true;

    let result = delegator.analyze_delegation(&request).await;
    assert_eq!(result.strategy, DelegationStrategy::MultiAgent);
    assert!(result.agents.len() >= 2);
}

#[tokio::test]
async fn forced_refactor_uses_the_refactor_team() {
    let delegator = simulated_delegator(OrchestrationConfig::default()).await;
    let mut request = DelegationRequest::new("refactor", "split the god module");
    request.force_multi_agent = true;

    let result = delegator.analyze_delegation(&request).await;
    assert_eq!(
        result.agents,
        vec!["architect", "refactorer", "code-reviewer"]
    );
}

#[tokio::test]
async fn execute_single_agent_simulated() {
    let delegator = simulated_delegator(OrchestrationConfig::default()).await;
    let request = DelegationRequest::new("format", "tidy imports");
    let mut result = delegator.analyze_delegation(&request).await;

    let outcome = delegator
        .execute_delegation(&mut result, &request)
        .await
        .unwrap();
    match outcome {
        ExecutionOutcome::Single(worker) => {
            assert_eq!(worker.invoked_through, InvocationPath::Simulated);
            assert_eq!(worker.payload["status"], json!("completed"));
        }
        other => panic!("expected single outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn majority_vote_picks_the_most_common_payload() {
    let delegator = delegator_with_runtime(Arc::new(VerdictRuntime {
        rejecting: vec!["code-reviewer".to_string()],
    }))
    .await;

    // Heavy context lands in the complex band, which maps to majority vote
    let mut request = DelegationRequest::new("architecture", "redesign the storage layer");
    request.context = heavy_context();
    request.force_multi_agent = true;
    request.required_agents = Some(vec![
        "architect".to_string(),
        "code-reviewer".to_string(),
        "security-auditor".to_string(),
    ]);

    let mut result = delegator.analyze_delegation(&request).await;
    assert_eq!(result.conflict_resolution, ConflictPolicy::MajorityVote);

    let outcome = delegator
        .execute_delegation(&mut result, &request)
        .await
        .unwrap();
    match outcome {
        ExecutionOutcome::Resolved { outcome, results } => {
            assert_eq!(results.len(), 3);
            assert_eq!(outcome.value, json!({ "verdict": "approve" }));
            assert!(!outcome.unanimous);
        }
        other => panic!("expected resolved outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn consensus_flags_disagreement_and_keeps_first_result() {
    let delegator = delegator_with_runtime(Arc::new(VerdictRuntime {
        rejecting: vec!["code-reviewer".to_string()],
    }))
    .await;

    // No context keeps the score in the simple band, which maps to consensus
    let mut request = DelegationRequest::new("docs", "update the changelog");
    request.force_multi_agent = true;
    request.required_agents = Some(vec![
        "architect".to_string(),
        "code-reviewer".to_string(),
    ]);

    let mut result = delegator.analyze_delegation(&request).await;
    assert_eq!(result.conflict_resolution, ConflictPolicy::Consensus);

    let outcome = delegator
        .execute_delegation(&mut result, &request)
        .await
        .unwrap();
    match outcome {
        ExecutionOutcome::Resolved { outcome, .. } => {
            assert!(!outcome.unanimous);
            // First result in team order wins when consensus fails
            assert_eq!(outcome.value, json!({ "verdict": "approve" }));
        }
        other => panic!("expected resolved outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn transport_failure_downgrades_to_simulation() {
    let delegator = delegator_with_runtime(Arc::new(DownRuntime)).await;
    let request = DelegationRequest::new("format", "tidy imports");
    let mut result = delegator.analyze_delegation(&request).await;

    let outcome = delegator
        .execute_delegation(&mut result, &request)
        .await
        .unwrap();
    match outcome {
        ExecutionOutcome::Single(worker) => {
            assert_eq!(worker.invoked_through, InvocationPath::Simulated);
        }
        other => panic!("expected single outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_agent_is_a_hard_error() {
    let registry = WorkerRegistry::with_default_catalog().await;
    // Allow-list without the mentioned agent
    let runtime = Arc::new(SimulatedWorkerRuntime::new(
        fast_simulation(),
        vec!["architect".to_string()],
    ));
    let delegator = Delegator::new(
        registry,
        runtime,
        Arc::new(SimulatedWorkerRuntime::permissive(fast_simulation())),
        Arc::new(AuditLogService::default()),
        OrchestrationConfig::default(),
    );

    let mut request = DelegationRequest::new("format", "tidy imports");
    request.mention_agent = Some("intruder".to_string());
    let mut result = delegator.analyze_delegation(&request).await;

    let err = delegator
        .execute_delegation(&mut result, &request)
        .await
        .unwrap_err();
    assert!(matches!(err, DelegationError::Execution { .. }));
}

#[tokio::test]
async fn disabled_multi_agent_forces_single() {
    let delegator = simulated_delegator(OrchestrationConfig {
        multi_agent_enabled: false,
        max_concurrent_agents: 5,
    })
    .await;
    let mut request = DelegationRequest::new("architecture", "redesign the storage layer");
    request.context = heavy_context();
    let mut result = delegator.analyze_delegation(&request).await;

    let outcome = delegator
        .execute_delegation(&mut result, &request)
        .await
        .unwrap();
    assert_eq!(result.strategy, DelegationStrategy::SingleAgent);
    assert!(matches!(outcome, ExecutionOutcome::Single(_)));
}

#[tokio::test]
async fn concurrency_cap_truncates_the_team() {
    let delegator = simulated_delegator(OrchestrationConfig {
        multi_agent_enabled: true,
        max_concurrent_agents: 2,
    })
    .await;
    let mut request = DelegationRequest::new("security", "audit the payment flow");
    request.force_multi_agent = true;
    let mut result = delegator.analyze_delegation(&request).await;
    assert_eq!(result.agents.len(), 3);

    delegator
        .execute_delegation(&mut result, &request)
        .await
        .unwrap();
    assert_eq!(result.agents.len(), 2);
}

#[tokio::test]
async fn delegation_flow_is_fully_audited() {
    use strray::services::{AuditAction, AuditLevel};
    use strray::{AuditFilter, SessionCoordinator};

    let audit = Arc::new(AuditLogService::default());
    let coordinator = SessionCoordinator::new().with_audit(audit.clone());
    let registry = WorkerRegistry::with_default_catalog().await;
    let runtime = Arc::new(SimulatedWorkerRuntime::new(
        fast_simulation(),
        registry.agent_names().await,
    ));
    let delegator = Delegator::new(
        registry,
        runtime,
        Arc::new(SimulatedWorkerRuntime::permissive(fast_simulation())),
        audit.clone(),
        OrchestrationConfig::default(),
    )
    .with_coordinator(coordinator);

    let mut request = DelegationRequest::new("format", "tidy imports");
    request.session_id = Some("sess-1".to_string());
    let mut plan = delegator.analyze_delegation(&request).await;
    delegator
        .execute_delegation(&mut plan, &request)
        .await
        .unwrap();

    // The analysis decision is queryable on its own
    let decisions = audit
        .query(
            AuditFilter::new()
                .with_min_level(AuditLevel::Decision)
                .with_action(AuditAction::DelegationAnalyzed),
        )
        .await;
    assert_eq!(decisions.len(), 1);

    // Execution and session lifecycle entries are all present
    let actions: Vec<_> = audit
        .query(AuditFilter::new())
        .await
        .iter()
        .map(|e| e.action)
        .collect();
    for expected in [
        AuditAction::ExecutionStarted,
        AuditAction::ExecutionCompleted,
        AuditAction::SessionInitialized,
        AuditAction::DelegationRegistered,
        AuditAction::DelegationCompleted,
    ] {
        assert!(actions.contains(&expected), "missing {expected:?}");
    }

    let session_entries = audit.session_history("sess-1").await;
    assert!(!session_entries.is_empty());
}

#[tokio::test]
async fn metrics_count_analyses_and_outcomes() {
    let delegator = simulated_delegator(OrchestrationConfig::default()).await;

    let simple = DelegationRequest::new("format", "tidy imports");
    let mut heavy = DelegationRequest::new("architecture", "redesign the storage layer");
    heavy.context = heavy_context();

    let mut plan = delegator.analyze_delegation(&simple).await;
    delegator.analyze_delegation(&heavy).await;
    delegator
        .execute_delegation(&mut plan, &simple)
        .await
        .unwrap();

    let snapshot = delegator.metrics_snapshot().await;
    assert_eq!(snapshot.total_delegations, 2);
    assert_eq!(snapshot.successful_executions, 1);
    assert_eq!(snapshot.failed_executions, 0);
    assert_eq!(
        snapshot.strategy_usage.get("single_agent").copied(),
        Some(1)
    );
    assert_eq!(snapshot.strategy_usage.get("multi_agent").copied(), Some(1));
}
