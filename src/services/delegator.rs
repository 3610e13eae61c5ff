//! Delegation analysis and execution.
//!
//! Turns an incoming request into a strategy and agent team via complexity
//! scoring, then runs the team single, fanned-out concurrent, or sequential
//! with per-agent oversight, arbitrating disagreements with the configured
//! conflict policy.

use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::error::{DelegationError, WorkerRuntimeError};
use crate::domain::models::complexity::{ComplexityLevel, DelegationStrategy};
use crate::domain::models::config::OrchestrationConfig;
use crate::domain::models::delegation::{
    ConflictPolicy, DelegationResult, ExecutionOutcome, InvocationPath, OrchestrationSummary,
    WorkerOutcome, WorkerResult,
};
use crate::domain::models::request::DelegationRequest;
use crate::domain::ports::WorkerRuntime;
use crate::services::audit_log::{AuditAction, AuditCategory, AuditEntry, AuditLevel, AuditLogService};
use crate::services::complexity_scorer::ComplexityScorer;
use crate::services::conflict;
use crate::services::metrics::{DelegationMetrics, MetricsSnapshot};
use crate::services::session_coordinator::SessionCoordinator;
use crate::services::worker_registry::WorkerRegistry;

/// Safe default when the registry has no available agent at all
const FALLBACK_SINGLE: &str = "code-reviewer";
/// Fixed two-agent default for team strategies with an empty registry
const FALLBACK_PAIR: [&str; 2] = ["architect", "code-reviewer"];

/// Keyword-based default teams for forced multi-agent delegation, checked in
/// order; the first group whose keyword matches wins.
const DEFAULT_TEAMS: &[(&[&str], [&str; 3])] = &[
    (
        &["security", "vulnerability", "auth"],
        ["security-auditor", "code-reviewer", "enforcer"],
    ),
    (
        &["refactor", "architecture", "redesign"],
        ["architect", "refactorer", "code-reviewer"],
    ),
    (
        &["test", "quality", "coverage"],
        ["test-architect", "code-reviewer", "enforcer"],
    ),
    (
        &["debug", "fix", "bug"],
        ["bug-triage-specialist", "code-reviewer", "enforcer"],
    ),
];

const GENERIC_TEAM: [&str; 3] = ["architect", "code-reviewer", "security-auditor"];

/// Pick the default team for forced multi-agent delegation from operation
/// and description keywords
pub fn default_team(match_text: &str) -> Vec<String> {
    for (keywords, team) in DEFAULT_TEAMS {
        if keywords.iter().any(|kw| match_text.contains(kw)) {
            return team.iter().map(|s| (*s).to_string()).collect();
        }
    }
    GENERIC_TEAM.iter().map(|s| (*s).to_string()).collect()
}

/// Routes requests to agent teams and runs them.
///
/// Analysis never fails: degenerate inputs fall back to a safe single agent.
/// Execution failures propagate with the original cause preserved, after
/// being logged with duration and operation context.
#[derive(Clone)]
pub struct Delegator {
    scorer: ComplexityScorer,
    registry: WorkerRegistry,
    runtime: Arc<dyn WorkerRuntime>,
    /// Invoked when the primary runtime reports a transport failure
    fallback: Arc<dyn WorkerRuntime>,
    metrics: DelegationMetrics,
    audit: Arc<AuditLogService>,
    coordinator: Option<SessionCoordinator>,
    orchestration: OrchestrationConfig,
}

impl Delegator {
    pub fn new(
        registry: WorkerRegistry,
        runtime: Arc<dyn WorkerRuntime>,
        fallback: Arc<dyn WorkerRuntime>,
        audit: Arc<AuditLogService>,
        orchestration: OrchestrationConfig,
    ) -> Self {
        Self {
            scorer: ComplexityScorer::new(),
            registry,
            runtime,
            fallback,
            metrics: DelegationMetrics::new(),
            audit,
            coordinator: None,
            orchestration,
        }
    }

    /// Attach a session coordinator; delegations carrying a session id will
    /// be registered and completed there.
    pub fn with_coordinator(mut self, coordinator: SessionCoordinator) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    /// Snapshot of the process-wide delegation metrics
    pub async fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot().await
    }

    /// Analyze a request into a strategy, agent team, and conflict policy.
    ///
    /// Override precedence: an explicit agent mention forces single-agent
    /// delegation to exactly that agent; otherwise a force-multi flag forces
    /// multi-agent delegation with the caller's team or a keyword default.
    #[instrument(skip(self, request), fields(operation = %request.operation))]
    pub async fn analyze_delegation(&self, request: &DelegationRequest) -> DelegationResult {
        let metrics = self.scorer.analyze(&request.operation, &request.context);
        let score = self
            .scorer
            .score_with_hint(&metrics, request.context.agent_count_hint());

        let (strategy, agents) = if let Some(mention) = &request.mention_agent {
            (DelegationStrategy::SingleAgent, vec![mention.clone()])
        } else if request.force_multi_agent {
            let team = request
                .required_agents
                .clone()
                .filter(|team| !team.is_empty())
                .unwrap_or_else(|| default_team(&request.match_text()));
            (DelegationStrategy::MultiAgent, team)
        } else {
            let strategy = score.recommended_strategy;
            let agents = self
                .select_agents(strategy, score.estimated_agents, request)
                .await;
            (strategy, agents)
        };

        let conflict_resolution = match score.level {
            ComplexityLevel::Simple | ComplexityLevel::Moderate => ConflictPolicy::Consensus,
            ComplexityLevel::Complex => ConflictPolicy::MajorityVote,
            ComplexityLevel::Enterprise => ConflictPolicy::ExpertPriority,
        };

        let result = DelegationResult {
            id: Uuid::new_v4(),
            strategy,
            agents,
            estimated_duration_mins: metrics.estimated_duration_mins,
            score,
            metrics,
            conflict_resolution,
        };

        // Counted exactly once per analyzed request, regardless of whether
        // execution ever happens
        self.metrics
            .record_analysis(result.strategy, result.score.score)
            .await;

        self.audit
            .log(
                AuditEntry::new(
                    AuditLevel::Decision,
                    AuditCategory::Delegation,
                    AuditAction::DelegationAnalyzed,
                    format!(
                        "{} -> {} with {} agent(s)",
                        request.operation,
                        result.strategy,
                        result.agents.len()
                    ),
                )
                .with_metadata("score", json!(result.score.score))
                .with_metadata("level", json!(result.score.level.to_string()))
                .with_metadata("agents", json!(result.agents))
                .with_metadata("conflict_policy", json!(result.conflict_resolution.to_string())),
            )
            .await;

        info!(
            strategy = %result.strategy,
            score = result.score.score,
            agents = ?result.agents,
            "delegation analyzed"
        );

        self.register_in_session(request, &result).await;
        result
    }

    /// Execute an analyzed delegation.
    ///
    /// Applies the configuration clamps first: with multi-agent orchestration
    /// disabled the strategy is forced to single-agent, and the team is
    /// truncated to the configured concurrency cap.
    #[instrument(skip(self, result, request), fields(delegation_id = %result.id, strategy = %result.strategy))]
    pub async fn execute_delegation(
        &self,
        result: &mut DelegationResult,
        request: &DelegationRequest,
    ) -> Result<ExecutionOutcome, DelegationError> {
        self.apply_clamps(result);

        let task = if request.description.is_empty() {
            request.operation.clone()
        } else {
            format!("{}: {}", request.operation, request.description)
        };

        self.audit
            .log(
                AuditEntry::new(
                    AuditLevel::Info,
                    AuditCategory::Execution,
                    AuditAction::ExecutionStarted,
                    format!("executing {} via {}", request.operation, result.strategy),
                )
                .with_metadata("agents", json!(result.agents)),
            )
            .await;

        let started = Instant::now();
        let outcome = match result.strategy {
            DelegationStrategy::SingleAgent => {
                let agent = result.agents[0].clone();
                self.invoke_agent(&agent, &task).await.map(ExecutionOutcome::Single)
            }
            DelegationStrategy::MultiAgent => self.execute_concurrent(result, &task).await,
            DelegationStrategy::OrchestratorLed => {
                Ok(ExecutionOutcome::Orchestrated(
                    self.execute_sequential(result, &task).await,
                ))
            }
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(outcome) => {
                self.metrics.record_success(duration_ms).await;
                self.record_feedback(&outcome).await;
                self.audit
                    .log(
                        AuditEntry::new(
                            AuditLevel::Info,
                            AuditCategory::Execution,
                            AuditAction::ExecutionCompleted,
                            format!("{} completed in {duration_ms}ms", request.operation),
                        )
                        .with_metadata("duration_ms", json!(duration_ms)),
                    )
                    .await;
                self.complete_in_session(request, result, &outcome).await;
                Ok(outcome)
            }
            Err(err) => {
                self.metrics.record_failure().await;
                error!(
                    operation = %request.operation,
                    duration_ms,
                    error = %err,
                    "delegation execution failed"
                );
                self.audit
                    .error(
                        AuditCategory::Execution,
                        AuditAction::ExecutionFailed,
                        format!("{} failed after {duration_ms}ms: {err}", request.operation),
                    )
                    .await;
                if let DelegationError::BatchFailed { outcomes } = &err {
                    for outcome in outcomes {
                        if !outcome.success {
                            self.registry.record_performance(&outcome.agent, false).await;
                        }
                    }
                }
                self.record_session_failure(request, &err).await;
                Err(err)
            }
        }
    }

    /// Select agents for a strategy from the registry's candidate pool
    /// (agents with spare capacity, best performance first).
    async fn select_agents(
        &self,
        strategy: DelegationStrategy,
        estimated_agents: usize,
        request: &DelegationRequest,
    ) -> Vec<String> {
        let pool = self.registry.available_agents().await;
        let text = request.match_text();

        match strategy {
            DelegationStrategy::SingleAgent => pool
                .iter()
                .find(|cap| cap.matches(&text))
                .or_else(|| pool.first())
                .map_or_else(
                    || vec![FALLBACK_SINGLE.to_string()],
                    |cap| vec![cap.name.clone()],
                ),
            DelegationStrategy::MultiAgent => {
                let target = estimated_agents.max(2);
                let mut selected: Vec<String> = Vec::new();

                // Expertise matches first, then fill by performance
                for cap in &pool {
                    if selected.len() >= target {
                        break;
                    }
                    if cap.matches(&text) {
                        selected.push(cap.name.clone());
                    }
                }
                for cap in &pool {
                    if selected.len() >= target {
                        break;
                    }
                    if !selected.contains(&cap.name) {
                        selected.push(cap.name.clone());
                    }
                }

                if selected.len() < 2 {
                    for cap in pool.iter().take(2) {
                        if !selected.contains(&cap.name) {
                            selected.push(cap.name.clone());
                        }
                    }
                }
                if selected.is_empty() {
                    return FALLBACK_PAIR.iter().map(|s| (*s).to_string()).collect();
                }
                selected
            }
            DelegationStrategy::OrchestratorLed => {
                let n = estimated_agents.max(3);
                let selected: Vec<String> =
                    pool.iter().take(n).map(|cap| cap.name.clone()).collect();
                if selected.is_empty() {
                    return FALLBACK_PAIR.iter().map(|s| (*s).to_string()).collect();
                }
                selected
            }
        }
    }

    fn apply_clamps(&self, result: &mut DelegationResult) {
        if !self.orchestration.multi_agent_enabled
            && result.strategy != DelegationStrategy::SingleAgent
        {
            warn!(
                delegation_id = %result.id,
                "multi-agent orchestration disabled, forcing single-agent"
            );
            result.strategy = DelegationStrategy::SingleAgent;
            result.agents.truncate(1);
        }

        let cap = self.orchestration.max_concurrent_agents.max(1);
        if result.agents.len() > cap {
            warn!(
                delegation_id = %result.id,
                cap,
                "agent team exceeds max_concurrent_agents, truncating"
            );
            result.agents.truncate(cap);
        }

        if result.agents.is_empty() {
            result.agents.push(FALLBACK_SINGLE.to_string());
        }
    }

    /// Invoke one agent, holding a registry load slot for the duration.
    ///
    /// Unknown-agent errors surface as configuration errors; transport
    /// failures are downgraded to the simulated fallback.
    async fn invoke_agent(&self, agent: &str, task: &str) -> Result<WorkerResult, DelegationError> {
        self.registry.begin_task(agent).await;
        let invoked = self.runtime.invoke(agent, task).await;
        let outcome = match invoked {
            Ok(result) => Ok(result),
            Err(err @ WorkerRuntimeError::UnknownWorker(_)) => Err(DelegationError::Execution {
                agent: agent.to_string(),
                source: err,
            }),
            Err(WorkerRuntimeError::Transport { message, .. }) => {
                warn!(agent, message, "transport failure, falling back to simulated execution");
                self.audit
                    .log(
                        AuditEntry::new(
                            AuditLevel::Warning,
                            AuditCategory::Execution,
                            AuditAction::FallbackSimulated,
                            format!("agent {agent} invoked through simulation: {message}"),
                        )
                        .with_metadata("agent", json!(agent)),
                    )
                    .await;
                self.fallback
                    .invoke(agent, task)
                    .await
                    .map_err(|err| DelegationError::Execution {
                        agent: agent.to_string(),
                        source: err,
                    })
            }
        };
        self.registry.end_task(agent).await;
        outcome
    }

    /// Concurrent fan-out with an all-or-nothing join: one agent failing
    /// fails the batch, with every per-agent outcome carried on the error.
    async fn execute_concurrent(
        &self,
        result: &DelegationResult,
        task: &str,
    ) -> Result<ExecutionOutcome, DelegationError> {
        let mut handles = Vec::with_capacity(result.agents.len());
        for agent in &result.agents {
            let this = self.clone();
            let agent = agent.clone();
            let task = task.to_string();
            handles.push(tokio::spawn(async move {
                this.invoke_agent(&agent, &task).await
            }));
        }

        let joined = futures::future::join_all(handles).await;

        let mut results: Vec<WorkerResult> = Vec::new();
        let mut outcomes: Vec<WorkerOutcome> = Vec::new();
        let mut any_failed = false;

        for (agent, handle) in result.agents.iter().zip(joined) {
            let invoked = match handle {
                Ok(invoked) => invoked,
                Err(join_err) => Err(DelegationError::Execution {
                    agent: agent.clone(),
                    source: WorkerRuntimeError::Transport {
                        agent: agent.clone(),
                        message: format!("task join failed: {join_err}"),
                    },
                }),
            };
            match invoked {
                Ok(worker_result) => {
                    outcomes.push(WorkerOutcome {
                        agent: agent.clone(),
                        success: true,
                        result: Some(worker_result.clone()),
                        error: None,
                    });
                    results.push(worker_result);
                }
                Err(err) => {
                    any_failed = true;
                    outcomes.push(WorkerOutcome {
                        agent: agent.clone(),
                        success: false,
                        result: None,
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        if any_failed {
            return Err(DelegationError::BatchFailed { outcomes });
        }

        let resolved = conflict::resolve(result.conflict_resolution, &results);
        if results.len() > 1 {
            self.audit
                .log(
                    AuditEntry::new(
                        AuditLevel::Info,
                        AuditCategory::Conflict,
                        AuditAction::ConflictResolved,
                        format!(
                            "{} result(s) resolved via {} (unanimous: {})",
                            results.len(),
                            resolved.policy,
                            resolved.unanimous
                        ),
                    )
                    .with_metadata("participants", json!(resolved.participants)),
                )
                .await;
        }

        Ok(ExecutionOutcome::Resolved {
            outcome: resolved,
            results,
        })
    }

    /// Sequential execution with per-agent attribution: a failing agent is
    /// recorded and does not abort its successors, and no arbitration is
    /// applied to the results.
    async fn execute_sequential(
        &self,
        result: &DelegationResult,
        task: &str,
    ) -> OrchestrationSummary {
        let mut outcomes: Vec<WorkerOutcome> = Vec::new();
        let mut succeeded = 0;
        let mut failed = 0;

        for agent in &result.agents {
            match self.invoke_agent(agent, task).await {
                Ok(worker_result) => {
                    succeeded += 1;
                    outcomes.push(WorkerOutcome {
                        agent: agent.clone(),
                        success: true,
                        result: Some(worker_result),
                        error: None,
                    });
                }
                Err(err) => {
                    failed += 1;
                    warn!(agent, error = %err, "orchestrated agent failed, continuing");
                    outcomes.push(WorkerOutcome {
                        agent: agent.clone(),
                        success: false,
                        result: None,
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        OrchestrationSummary {
            succeeded,
            failed,
            outcomes,
        }
    }

    /// Feed execution results back into agent performance scores. Simulated
    /// results are excluded so scores reflect only real runtime outcomes.
    async fn record_feedback(&self, outcome: &ExecutionOutcome) {
        match outcome {
            ExecutionOutcome::Single(result) => {
                if result.invoked_through == InvocationPath::Runtime {
                    self.registry.record_performance(&result.agent, true).await;
                }
            }
            ExecutionOutcome::Resolved { results, .. } => {
                for result in results {
                    if result.invoked_through == InvocationPath::Runtime {
                        self.registry.record_performance(&result.agent, true).await;
                    }
                }
            }
            ExecutionOutcome::Orchestrated(summary) => {
                for worker in &summary.outcomes {
                    let simulated = worker
                        .result
                        .as_ref()
                        .is_some_and(|r| r.invoked_through == InvocationPath::Simulated);
                    if !simulated {
                        self.registry
                            .record_performance(&worker.agent, worker.success)
                            .await;
                    }
                }
            }
        }
    }

    /// Register a freshly analyzed delegation in its session, creating the
    /// session on first use. Coordination failures are logged, never raised:
    /// analysis must not fail.
    async fn register_in_session(&self, request: &DelegationRequest, result: &DelegationResult) {
        let (Some(coordinator), Some(session_id)) = (&self.coordinator, &request.session_id)
        else {
            return;
        };

        // Atomic get-or-create: concurrent first delegations for one id all
        // fall through to registration
        if let Err(err) = coordinator.ensure_session(session_id).await {
            warn!(session_id, error = %err, "failed to initialize session");
            return;
        }

        if let Err(err) = coordinator
            .register_delegation(session_id, result.clone())
            .await
        {
            warn!(session_id, error = %err, "failed to register delegation");
        }
    }

    /// Snapshot a completed delegation into its session and record per-agent
    /// interactions.
    async fn complete_in_session(
        &self,
        request: &DelegationRequest,
        result: &DelegationResult,
        outcome: &ExecutionOutcome,
    ) {
        let (Some(coordinator), Some(session_id)) = (&self.coordinator, &request.session_id)
        else {
            return;
        };

        let interactions: Vec<(String, bool, u64)> = match outcome {
            ExecutionOutcome::Single(r) => vec![(r.agent.clone(), true, r.duration_ms)],
            ExecutionOutcome::Resolved { results, .. } => results
                .iter()
                .map(|r| (r.agent.clone(), true, r.duration_ms))
                .collect(),
            ExecutionOutcome::Orchestrated(summary) => summary
                .outcomes
                .iter()
                .map(|w| {
                    let duration = w.result.as_ref().map_or(0, |r| r.duration_ms);
                    (w.agent.clone(), w.success, duration)
                })
                .collect(),
        };

        for (agent, success, duration_ms) in interactions {
            if let Err(err) = coordinator
                .record_interaction(session_id, &agent, &request.operation, success, duration_ms)
                .await
            {
                warn!(session_id, agent, error = %err, "failed to record interaction");
            }
        }

        if let Err(err) = coordinator
            .complete_delegation(session_id, result.id, outcome.clone())
            .await
        {
            warn!(session_id, error = %err, "failed to complete delegation");
        }
    }

    /// Record failed interactions for a batch failure in the session
    async fn record_session_failure(&self, request: &DelegationRequest, err: &DelegationError) {
        let (Some(coordinator), Some(session_id)) = (&self.coordinator, &request.session_id)
        else {
            return;
        };

        if let DelegationError::BatchFailed { outcomes } = err {
            for outcome in outcomes {
                if let Err(record_err) = coordinator
                    .record_interaction(
                        session_id,
                        &outcome.agent,
                        &request.operation,
                        outcome.success,
                        0,
                    )
                    .await
                {
                    warn!(session_id, error = %record_err, "failed to record failed interaction");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::request::RequestContext;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Test runtime with scriptable per-agent failures
    struct MockRuntime {
        transport_failures: HashSet<String>,
        unknown_agents: HashSet<String>,
        invocations: AtomicUsize,
    }

    impl MockRuntime {
        fn healthy() -> Self {
            Self {
                transport_failures: HashSet::new(),
                unknown_agents: HashSet::new(),
                invocations: AtomicUsize::new(0),
            }
        }

        fn failing_transport(agents: &[&str]) -> Self {
            Self {
                transport_failures: agents.iter().map(|s| (*s).to_string()).collect(),
                unknown_agents: HashSet::new(),
                invocations: AtomicUsize::new(0),
            }
        }

        fn rejecting(agents: &[&str]) -> Self {
            Self {
                transport_failures: HashSet::new(),
                unknown_agents: agents.iter().map(|s| (*s).to_string()).collect(),
                invocations: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl WorkerRuntime for MockRuntime {
        async fn invoke(&self, agent: &str, _task: &str) -> Result<WorkerResult, WorkerRuntimeError> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            if self.unknown_agents.contains(agent) {
                return Err(WorkerRuntimeError::UnknownWorker(agent.to_string()));
            }
            if self.transport_failures.contains(agent) {
                return Err(WorkerRuntimeError::Transport {
                    agent: agent.to_string(),
                    message: "connection refused".to_string(),
                });
            }
            Ok(WorkerResult {
                agent: agent.to_string(),
                payload: json!({"agent": agent, "verdict": "ok"}),
                expertise_score: 80.0,
                invoked_through: InvocationPath::Runtime,
                duration_ms: 5,
            })
        }
    }

    /// Fallback runtime that always succeeds with a simulated result
    struct MockFallback;

    #[async_trait]
    impl WorkerRuntime for MockFallback {
        async fn invoke(&self, agent: &str, _task: &str) -> Result<WorkerResult, WorkerRuntimeError> {
            Ok(WorkerResult {
                agent: agent.to_string(),
                payload: json!({"agent": agent, "simulated": true}),
                expertise_score: 50.0,
                invoked_through: InvocationPath::Simulated,
                duration_ms: 1,
            })
        }
    }

    async fn delegator_with(runtime: MockRuntime, orchestration: OrchestrationConfig) -> Delegator {
        Delegator::new(
            WorkerRegistry::with_default_catalog().await,
            Arc::new(runtime),
            Arc::new(MockFallback),
            Arc::new(AuditLogService::default()),
            orchestration,
        )
    }

    fn multi_request() -> DelegationRequest {
        let mut request = DelegationRequest::new("architecture", "redesign the storage layer");
        request.context = RequestContext {
            file_count: Some(20),
            change_volume: Some(2000),
            dependencies: Some(6),
            ..RequestContext::default()
        };
        request
    }

    #[tokio::test]
    async fn test_mention_agent_forces_single() {
        let delegator = delegator_with(MockRuntime::healthy(), OrchestrationConfig::default()).await;
        let mut request = multi_request();
        request.mention_agent = Some("security-auditor".to_string());

        let result = delegator.analyze_delegation(&request).await;
        assert_eq!(result.strategy, DelegationStrategy::SingleAgent);
        assert_eq!(result.agents, vec!["security-auditor".to_string()]);
    }

    #[tokio::test]
    async fn test_force_multi_uses_keyword_team() {
        let delegator = delegator_with(MockRuntime::healthy(), OrchestrationConfig::default()).await;
        let mut request = DelegationRequest::new("docs", "refactor the handbook layout");
        request.force_multi_agent = true;

        let result = delegator.analyze_delegation(&request).await;
        assert_eq!(result.strategy, DelegationStrategy::MultiAgent);
        assert_eq!(
            result.agents,
            vec!["architect", "refactorer", "code-reviewer"]
        );
    }

    #[tokio::test]
    async fn test_mention_wins_over_force_multi() {
        let delegator = delegator_with(MockRuntime::healthy(), OrchestrationConfig::default()).await;
        let mut request = multi_request();
        request.mention_agent = Some("refactorer".to_string());
        request.force_multi_agent = true;

        let result = delegator.analyze_delegation(&request).await;
        assert_eq!(result.strategy, DelegationStrategy::SingleAgent);
        assert_eq!(result.agents, vec!["refactorer".to_string()]);
    }

    #[tokio::test]
    async fn test_trivial_request_goes_single() {
        let delegator = delegator_with(MockRuntime::healthy(), OrchestrationConfig::default()).await;
        let request = DelegationRequest::new("typo", "fix readme");

        let result = delegator.analyze_delegation(&request).await;
        assert_eq!(result.strategy, DelegationStrategy::SingleAgent);
        assert_eq!(result.agents.len(), 1);
    }

    #[tokio::test]
    async fn test_complex_request_gets_team_of_at_least_two() {
        let delegator = delegator_with(MockRuntime::healthy(), OrchestrationConfig::default()).await;
        let result = delegator.analyze_delegation(&multi_request()).await;
        assert_eq!(result.strategy, DelegationStrategy::MultiAgent);
        assert!(result.agents.len() >= 2);
    }

    #[tokio::test]
    async fn test_execute_single_returns_result() {
        let delegator = delegator_with(MockRuntime::healthy(), OrchestrationConfig::default()).await;
        let request = DelegationRequest::new("typo", "fix readme");
        let mut result = delegator.analyze_delegation(&request).await;

        let outcome = delegator
            .execute_delegation(&mut result, &request)
            .await
            .unwrap();
        match outcome {
            ExecutionOutcome::Single(worker) => {
                assert_eq!(worker.invoked_through, InvocationPath::Runtime);
            }
            other => panic!("expected single outcome, got {other:?}"),
        }

        let snapshot = delegator.metrics_snapshot().await;
        assert_eq!(snapshot.total_delegations, 1);
        assert_eq!(snapshot.successful_executions, 1);
    }

    #[tokio::test]
    async fn test_execute_multi_resolves_conflicts() {
        let delegator = delegator_with(MockRuntime::healthy(), OrchestrationConfig::default()).await;
        let request = multi_request();
        let mut result = delegator.analyze_delegation(&request).await;

        let outcome = delegator
            .execute_delegation(&mut result, &request)
            .await
            .unwrap();
        match outcome {
            ExecutionOutcome::Resolved { outcome, results } => {
                assert_eq!(results.len(), result.agents.len());
                assert_eq!(outcome.participants.len(), results.len());
            }
            other => panic!("expected resolved outcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_batch_failure_carries_every_outcome() {
        let mut request = multi_request();
        request.force_multi_agent = true;
        request.required_agents = Some(vec![
            "architect".to_string(),
            "code-reviewer".to_string(),
        ]);

        let delegator = delegator_with(
            MockRuntime::rejecting(&["code-reviewer"]),
            OrchestrationConfig::default(),
        )
        .await;
        let mut result = delegator.analyze_delegation(&request).await;

        let err = delegator
            .execute_delegation(&mut result, &request)
            .await
            .unwrap_err();
        match err {
            DelegationError::BatchFailed { outcomes } => {
                assert_eq!(outcomes.len(), 2);
                assert!(outcomes.iter().any(|o| o.success));
                assert!(outcomes.iter().any(|o| !o.success));
            }
            other => panic!("expected batch failure, got {other}"),
        }

        let snapshot = delegator.metrics_snapshot().await;
        assert_eq!(snapshot.failed_executions, 1);
    }

    #[tokio::test]
    async fn test_transport_failure_falls_back_to_simulation() {
        let delegator = delegator_with(
            MockRuntime::failing_transport(&["architect"]),
            OrchestrationConfig::default(),
        )
        .await;
        let mut request = DelegationRequest::new("typo", "fix readme");
        request.mention_agent = Some("architect".to_string());
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
    async fn test_unknown_agent_surfaces() {
        let delegator = delegator_with(
            MockRuntime::rejecting(&["ghost"]),
            OrchestrationConfig::default(),
        )
        .await;
        let mut request = DelegationRequest::new("typo", "fix readme");
        request.mention_agent = Some("ghost".to_string());
        let mut result = delegator.analyze_delegation(&request).await;

        let err = delegator
            .execute_delegation(&mut result, &request)
            .await
            .unwrap_err();
        assert!(matches!(err, DelegationError::Execution { .. }));
    }

    #[tokio::test]
    async fn test_multi_disabled_clamps_to_single() {
        let delegator = delegator_with(
            MockRuntime::healthy(),
            OrchestrationConfig {
                multi_agent_enabled: false,
                max_concurrent_agents: 5,
            },
        )
        .await;
        let request = multi_request();
        let mut result = delegator.analyze_delegation(&request).await;
        assert_eq!(result.strategy, DelegationStrategy::MultiAgent);

        let outcome = delegator
            .execute_delegation(&mut result, &request)
            .await
            .unwrap();
        assert_eq!(result.strategy, DelegationStrategy::SingleAgent);
        assert_eq!(result.agents.len(), 1);
        assert!(matches!(outcome, ExecutionOutcome::Single(_)));
    }

    #[tokio::test]
    async fn test_concurrency_cap_truncates_team() {
        let delegator = delegator_with(
            MockRuntime::healthy(),
            OrchestrationConfig {
                multi_agent_enabled: true,
                max_concurrent_agents: 2,
            },
        )
        .await;
        let mut request = multi_request();
        request.force_multi_agent = true;
        request.required_agents = Some(vec![
            "architect".to_string(),
            "code-reviewer".to_string(),
            "security-auditor".to_string(),
        ]);
        let mut result = delegator.analyze_delegation(&request).await;

        delegator
            .execute_delegation(&mut result, &request)
            .await
            .unwrap();
        assert_eq!(result.agents.len(), 2);
    }

    #[tokio::test]
    async fn test_session_tracks_delegation_lifecycle() {
        let coordinator = SessionCoordinator::new();
        let delegator = delegator_with(MockRuntime::healthy(), OrchestrationConfig::default())
            .await
            .with_coordinator(coordinator.clone());

        let mut request = DelegationRequest::new("typo", "fix readme");
        request.session_id = Some("s1".to_string());

        let mut result = delegator.analyze_delegation(&request).await;
        let status = coordinator.session_status("s1").await.unwrap();
        assert_eq!(status.active_delegations, 1);

        delegator
            .execute_delegation(&mut result, &request)
            .await
            .unwrap();
        let status = coordinator.session_status("s1").await.unwrap();
        assert_eq!(status.active_delegations, 0);
        assert_eq!(status.completed_delegations, 1);
        assert_eq!(status.metrics.total_interactions, 1);
    }

    #[tokio::test]
    async fn test_concurrent_analyses_all_register_in_one_session() {
        let coordinator = SessionCoordinator::new();
        let delegator = delegator_with(MockRuntime::healthy(), OrchestrationConfig::default())
            .await
            .with_coordinator(coordinator.clone());

        let mut request = DelegationRequest::new("typo", "fix readme");
        request.session_id = Some("s1".to_string());

        let mut handles = Vec::new();
        for _ in 0..4 {
            let d = delegator.clone();
            let r = request.clone();
            handles.push(tokio::spawn(async move { d.analyze_delegation(&r).await }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Racing first delegations must not drop any registration
        let status = coordinator.session_status("s1").await.unwrap();
        assert_eq!(status.active_delegations, 4);
    }

    #[test]
    fn test_default_team_security_keywords() {
        assert_eq!(
            default_team("run a security sweep"),
            vec!["security-auditor", "code-reviewer", "enforcer"]
        );
    }

    #[test]
    fn test_default_team_refactor_keywords() {
        assert_eq!(
            default_team("refactor the session module"),
            vec!["architect", "refactorer", "code-reviewer"]
        );
    }

    #[test]
    fn test_default_team_test_keywords() {
        assert_eq!(
            default_team("improve test coverage"),
            vec!["test-architect", "code-reviewer", "enforcer"]
        );
    }

    #[test]
    fn test_default_team_debug_keywords() {
        assert_eq!(
            default_team("fix the crash in the parser"),
            vec!["bug-triage-specialist", "code-reviewer", "enforcer"]
        );
    }

    #[test]
    fn test_default_team_generic() {
        assert_eq!(
            default_team("document the api"),
            vec!["architect", "code-reviewer", "security-auditor"]
        );
    }

    #[test]
    fn test_keyword_precedence_first_group_wins() {
        // "security" appears before "refactor" in the group order
        assert_eq!(
            default_team("refactor the security layer"),
            vec!["security-auditor", "code-reviewer", "enforcer"]
        );
    }
}
