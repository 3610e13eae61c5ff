use thiserror::Error;

use super::models::delegation::WorkerOutcome;

/// Errors raised by the worker runtime collaborator
#[derive(Error, Debug)]
pub enum WorkerRuntimeError {
    /// The agent id is not in the configured allow-list. A configuration
    /// error: always surfaced, never retried or simulated away.
    #[error("Unknown agent: {0} (not in the configured allow-list)")]
    UnknownWorker(String),

    /// The invocation transport failed. Intercepted by the delegator and
    /// downgraded to a simulated execution.
    #[error("Transport failure invoking agent {agent}: {message}")]
    Transport { agent: String, message: String },
}

/// Errors raised on the delegation path
#[derive(Error, Debug)]
pub enum DelegationError {
    /// A single agent invocation failed during single-agent or
    /// orchestrator-led execution
    #[error("Agent {agent} failed: {source}")]
    Execution {
        agent: String,
        #[source]
        source: WorkerRuntimeError,
    },

    /// The multi-agent all-or-nothing join failed. Carries every per-agent
    /// outcome so callers can adopt a partial-success policy.
    #[error("Multi-agent batch failed: {} of {} agents errored", failed_count(outcomes), outcomes.len())]
    BatchFailed { outcomes: Vec<WorkerOutcome> },
}

fn failed_count(outcomes: &[WorkerOutcome]) -> usize {
    outcomes.iter().filter(|o| !o.success).count()
}

/// Errors raised by session coordination operations
#[derive(Error, Debug)]
pub enum CoordinationError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Invalid session id: {0:?}")]
    InvalidSessionId(String),

    #[error("Session already exists: {0}")]
    SessionExists(String),

    #[error("Delegation not found in session {session_id}: {delegation_id}")]
    DelegationNotFound {
        session_id: String,
        delegation_id: String,
    },

    #[error("No shared context entries for key: {0}")]
    EmptyContextKey(String),
}
