use async_trait::async_trait;

use crate::domain::error::WorkerRuntimeError;
use crate::domain::models::delegation::WorkerResult;

/// Port to the external collaborator that actually runs agent work.
///
/// Implementations must fail with `WorkerRuntimeError::UnknownWorker` when
/// the agent id is not in the configured allow-list, and with
/// `WorkerRuntimeError::Transport` for delivery failures. The delegator
/// treats the former as a configuration error and downgrades the latter to
/// a simulated execution.
#[async_trait]
pub trait WorkerRuntime: Send + Sync {
    /// Invoke the named agent with a task description
    async fn invoke(&self, agent: &str, task: &str) -> Result<WorkerResult, WorkerRuntimeError>;
}
