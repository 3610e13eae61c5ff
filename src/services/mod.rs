pub mod audit_log;
pub mod complexity_scorer;
pub mod conflict;
pub mod delegator;
pub mod metrics;
pub mod session_coordinator;
pub mod worker_registry;

pub use audit_log::{AuditAction, AuditCategory, AuditEntry, AuditFilter, AuditLevel, AuditLogService};
pub use complexity_scorer::ComplexityScorer;
pub use delegator::Delegator;
pub use metrics::{DelegationMetrics, MetricsSnapshot};
pub use session_coordinator::{SessionCoordinator, SessionCreated};
pub use worker_registry::{default_catalog, WorkerRegistry};
