//! Strray - Delegation and Session Coordination Core
//!
//! Strray scores incoming work requests for complexity, picks a delegation
//! strategy and agent team, executes the team against a pluggable worker
//! runtime, arbitrates disagreeing results, and tracks multi-agent state in
//! session-scoped shared context.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Pure models, ports, and error types
//! - **Service Layer** (`services`): Scoring, delegation, conflict
//!   resolution, session coordination
//! - **Infrastructure Layer** (`infrastructure`): Runtime adapters,
//!   configuration loading, logging setup
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use strray::{
//!     AuditLogService, Config, DelegationRequest, Delegator,
//!     SessionCoordinator, SimulatedWorkerRuntime, WorkerRegistry,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let registry = WorkerRegistry::with_default_catalog().await;
//!     let runtime = Arc::new(SimulatedWorkerRuntime::new(
//!         config.simulation.clone(),
//!         registry.agent_names().await,
//!     ));
//!     let fallback = Arc::new(SimulatedWorkerRuntime::permissive(config.simulation.clone()));
//!     let audit = Arc::new(AuditLogService::default());
//!
//!     let delegator = Delegator::new(
//!         registry,
//!         runtime,
//!         fallback,
//!         audit.clone(),
//!         config.orchestration,
//!     )
//!     .with_coordinator(SessionCoordinator::new().with_audit(audit));
//!
//!     let request = DelegationRequest::new("refactor", "split the session module");
//!     let mut plan = delegator.analyze_delegation(&request).await;
//!     let outcome = delegator.execute_delegation(&mut plan, &request).await?;
//!     println!("{outcome:?}");
//!     Ok(())
//! }
//! ```

pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::error::{CoordinationError, DelegationError, WorkerRuntimeError};
pub use domain::models::{
    AgentCapability, ComplexityLevel, ComplexityMetrics, ComplexityScore, Config,
    ConflictOutcome, ConflictPolicy, DelegationRequest, DelegationResult, DelegationStrategy,
    ExecutionOutcome, InvocationPath, LoggingConfig, OrchestrationConfig, RequestContext,
    RequestPriority, SessionContext, SessionStatus, SimulationConfig, WorkerOutcome, WorkerResult,
};
pub use domain::ports::WorkerRuntime;
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::logging::LoggerImpl;
pub use infrastructure::runtime::SimulatedWorkerRuntime;
pub use services::{
    AuditFilter, AuditLogService, ComplexityScorer, DelegationMetrics, Delegator,
    MetricsSnapshot, SessionCoordinator, WorkerRegistry,
};
