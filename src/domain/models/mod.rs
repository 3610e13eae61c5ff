pub mod capability;
pub mod complexity;
pub mod config;
pub mod delegation;
pub mod request;
pub mod session;

pub use capability::AgentCapability;
pub use complexity::{ComplexityLevel, ComplexityMetrics, ComplexityScore, DelegationStrategy};
pub use config::{Config, LoggingConfig, OrchestrationConfig, SimulationConfig};
pub use delegation::{
    ConflictOutcome, ConflictPolicy, DelegationResult, ExecutionOutcome, InvocationPath,
    OrchestrationSummary, WorkerOutcome, WorkerResult,
};
pub use request::{DelegationRequest, RequestContext, RequestPriority, RiskLevel};
pub use session::{
    Communication, CompletedDelegation, ConflictRecord, CoordinationState, InteractionRecord,
    SessionContext, SessionMetrics, SessionStatus, SharedContextEntry, SharedContextView,
};
