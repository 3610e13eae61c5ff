use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::error::CoordinationError;
use crate::domain::models::delegation::{
    ConflictOutcome, ConflictPolicy, DelegationResult, ExecutionOutcome,
};
use crate::domain::models::request::RequestPriority;
use crate::domain::models::session::{
    Communication, CompletedDelegation, ConflictRecord, InteractionRecord, SessionContext,
    SessionStatus, SharedContextEntry, SharedContextView,
};
use crate::services::audit_log::{
    AuditAction, AuditCategory, AuditEntry, AuditLevel, AuditLogService,
};
use crate::services::conflict;

/// Agents seeded as active when a session is created
const DEFAULT_ACTIVE_AGENTS: &[&str] = &["architect", "code-reviewer", "security-auditor"];

/// Summary returned by session initialization
#[derive(Debug, Clone)]
pub struct SessionCreated {
    pub session_id: String,
    pub active_agents: Vec<String>,
}

/// Per-session coordination state: active delegations, inter-agent messages,
/// append-only shared context, and conflict history.
///
/// All operations are scoped by session id and fail with
/// [`CoordinationError::SessionNotFound`] for unknown ids, except
/// `initialize_session` which creates the session. Mutations are serialized
/// through the coordinator's write lock, so concurrent requests within one
/// session cannot race. Sessions accumulate until `cleanup_session`; there is
/// no automatic expiry.
#[derive(Debug, Clone, Default)]
pub struct SessionCoordinator {
    sessions: Arc<RwLock<HashMap<String, SessionContext>>>,
    /// Optional audit sink; session lifecycle and coordination events land
    /// here when attached
    audit: Option<Arc<AuditLogService>>,
}

impl SessionCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an audit sink that receives session lifecycle and
    /// coordination events
    pub fn with_audit(mut self, audit: Arc<AuditLogService>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Create a session, seeding the default active agent set.
    ///
    /// # Errors
    /// Returns `InvalidSessionId` for blank ids and `SessionExists` when the
    /// id is already live.
    #[instrument(skip(self))]
    pub async fn initialize_session(
        &self,
        session_id: &str,
    ) -> Result<SessionCreated, CoordinationError> {
        if session_id.trim().is_empty() {
            return Err(CoordinationError::InvalidSessionId(session_id.to_string()));
        }

        let created = {
            let mut sessions = self.sessions.write().await;
            if sessions.contains_key(session_id) {
                return Err(CoordinationError::SessionExists(session_id.to_string()));
            }
            Self::create_session(&mut sessions, session_id)
        };

        self.audit_event(
            session_id,
            AuditCategory::Session,
            AuditAction::SessionInitialized,
            "session initialized",
        )
        .await;
        info!(session_id, "session initialized");
        Ok(created)
    }

    /// Create the session if it does not exist yet; returns whether this
    /// call created it.
    ///
    /// The existence check and the insert happen under one write lock, so
    /// concurrent first uses of the same id never fail: exactly one caller
    /// creates, the rest see the session already live.
    #[instrument(skip(self))]
    pub async fn ensure_session(&self, session_id: &str) -> Result<bool, CoordinationError> {
        if session_id.trim().is_empty() {
            return Err(CoordinationError::InvalidSessionId(session_id.to_string()));
        }

        let created = {
            let mut sessions = self.sessions.write().await;
            if sessions.contains_key(session_id) {
                false
            } else {
                Self::create_session(&mut sessions, session_id);
                true
            }
        };

        if created {
            self.audit_event(
                session_id,
                AuditCategory::Session,
                AuditAction::SessionInitialized,
                "session created on first use",
            )
            .await;
            info!(session_id, "session initialized");
        }
        Ok(created)
    }

    /// Whether a session currently exists
    pub async fn has_session(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    /// Ids of every live session
    pub async fn active_sessions(&self) -> Vec<String> {
        self.sessions.read().await.keys().cloned().collect()
    }

    /// Move a delegation into the session's active map
    #[instrument(skip(self, delegation), fields(delegation_id = %delegation.id))]
    pub async fn register_delegation(
        &self,
        session_id: &str,
        delegation: DelegationResult,
    ) -> Result<(), CoordinationError> {
        let delegation_id = delegation.id;
        {
            let mut sessions = self.sessions.write().await;
            let session = Self::session_mut(&mut sessions, session_id)?;
            session.active_delegations.insert(delegation.id, delegation);
        }
        self.audit_event(
            session_id,
            AuditCategory::Session,
            AuditAction::DelegationRegistered,
            format!("delegation {delegation_id} registered"),
        )
        .await;
        Ok(())
    }

    /// Move a delegation out of the active map, snapshotting it with its
    /// outcome into the completed store
    #[instrument(skip(self, outcome))]
    pub async fn complete_delegation(
        &self,
        session_id: &str,
        delegation_id: Uuid,
        outcome: ExecutionOutcome,
    ) -> Result<(), CoordinationError> {
        {
            let mut sessions = self.sessions.write().await;
            let session = Self::session_mut(&mut sessions, session_id)?;

            let delegation = session.active_delegations.remove(&delegation_id).ok_or(
                CoordinationError::DelegationNotFound {
                    session_id: session_id.to_string(),
                    delegation_id: delegation_id.to_string(),
                },
            )?;

            session.completed_delegations.push(CompletedDelegation {
                delegation_id,
                delegation,
                outcome,
                completed_at: Utc::now(),
            });
        }
        self.audit_event(
            session_id,
            AuditCategory::Session,
            AuditAction::DelegationCompleted,
            format!("delegation {delegation_id} completed"),
        )
        .await;
        Ok(())
    }

    /// Append an interaction to an agent's log and fold it into the session
    /// metrics
    #[instrument(skip(self, description))]
    pub async fn record_interaction(
        &self,
        session_id: &str,
        agent: &str,
        description: impl Into<String> + std::fmt::Debug,
        success: bool,
        response_time_ms: u64,
    ) -> Result<(), CoordinationError> {
        let mut sessions = self.sessions.write().await;
        let session = Self::session_mut(&mut sessions, session_id)?;

        session
            .interactions
            .entry(agent.to_string())
            .or_default()
            .push(InteractionRecord {
                timestamp: Utc::now(),
                description: description.into(),
                success,
                response_time_ms,
            });
        session.coordination.active_agents.insert(agent.to_string());
        session
            .coordination
            .metrics
            .record_interaction(success, response_time_ms);
        Ok(())
    }

    /// Queue a message for another agent
    #[instrument(skip(self, payload))]
    pub async fn send_message(
        &self,
        session_id: &str,
        from_agent: &str,
        to_agent: &str,
        payload: Value,
        priority: RequestPriority,
    ) -> Result<Uuid, CoordinationError> {
        let id = {
            let mut sessions = self.sessions.write().await;
            let session = Self::session_mut(&mut sessions, session_id)?;

            let message = Communication::new(from_agent, to_agent, payload, priority);
            let id = message.id;
            session.coordination.pending_messages.push(message);
            id
        };
        self.audit_event(
            session_id,
            AuditCategory::Session,
            AuditAction::MessageSent,
            format!("{from_agent} -> {to_agent}"),
        )
        .await;
        debug!(session_id, from_agent, to_agent, %id, "message queued");
        Ok(id)
    }

    /// Atomically remove and return every pending message addressed to the
    /// agent, in insertion order. No acknowledgment, no redelivery.
    #[instrument(skip(self))]
    pub async fn receive_messages(
        &self,
        session_id: &str,
        agent: &str,
    ) -> Result<Vec<Communication>, CoordinationError> {
        let delivered = {
            let mut sessions = self.sessions.write().await;
            let session = Self::session_mut(&mut sessions, session_id)?;

            let pending = std::mem::take(&mut session.coordination.pending_messages);
            let (delivered, remaining): (Vec<_>, Vec<_>) =
                pending.into_iter().partition(|m| m.to_agent == agent);
            session.coordination.pending_messages = remaining;
            delivered
        };
        if !delivered.is_empty() {
            self.audit_event(
                session_id,
                AuditCategory::Session,
                AuditAction::MessagesReceived,
                format!("{agent} drained {} message(s)", delivered.len()),
            )
            .await;
        }
        Ok(delivered)
    }

    /// Append a value to the shared context history for a key.
    ///
    /// Writes never overwrite: each contribution becomes a new entry.
    #[instrument(skip(self, value))]
    pub async fn share_context(
        &self,
        session_id: &str,
        key: &str,
        value: Value,
        from_agent: &str,
    ) -> Result<(), CoordinationError> {
        {
            let mut sessions = self.sessions.write().await;
            let session = Self::session_mut(&mut sessions, session_id)?;

            session
                .coordination
                .shared_context
                .entry(key.to_string())
                .or_default()
                .push(SharedContextEntry {
                    value,
                    from_agent: from_agent.to_string(),
                    timestamp: Utc::now(),
                });
        }
        self.audit_event(
            session_id,
            AuditCategory::Session,
            AuditAction::ContextShared,
            format!("{from_agent} appended to {key}"),
        )
        .await;
        Ok(())
    }

    /// Read the most recent shared-context entry for a key, annotated with
    /// its contributor. `None` if the key has never been written.
    pub async fn get_shared_context(
        &self,
        session_id: &str,
        key: &str,
    ) -> Result<Option<SharedContextView>, CoordinationError> {
        let sessions = self.sessions.read().await;
        let session = Self::session_ref(&sessions, session_id)?;

        Ok(session.coordination.shared_context.get(key).and_then(|entries| {
            entries.last().map(|latest| SharedContextView {
                key: key.to_string(),
                value: latest.value.clone(),
                contributed_by: latest.from_agent.clone(),
                updated_at: latest.timestamp,
                revisions: entries.len(),
            })
        }))
    }

    /// Full history for a shared-context key, oldest first
    pub async fn context_history(
        &self,
        session_id: &str,
        key: &str,
    ) -> Result<Vec<SharedContextEntry>, CoordinationError> {
        let sessions = self.sessions.read().await;
        let session = Self::session_ref(&sessions, session_id)?;
        Ok(session
            .coordination
            .shared_context
            .get(key)
            .cloned()
            .unwrap_or_default())
    }

    /// Resolve the shared-context history for a key with the given policy,
    /// appending a conflict record with every contributing agent.
    #[instrument(skip(self))]
    pub async fn resolve_conflict(
        &self,
        session_id: &str,
        key: &str,
        strategy: ConflictPolicy,
    ) -> Result<ConflictOutcome, CoordinationError> {
        let outcome = {
            let mut sessions = self.sessions.write().await;
            let session = Self::session_mut(&mut sessions, session_id)?;

            let entries = session
                .coordination
                .shared_context
                .get(key)
                .filter(|entries| !entries.is_empty())
                .ok_or_else(|| CoordinationError::EmptyContextKey(key.to_string()))?;

            let outcome = conflict::resolve_entries(strategy, entries);

            session.conflict_history.push(ConflictRecord {
                id: Uuid::new_v4(),
                timestamp: Utc::now(),
                participants: outcome.participants.clone(),
                strategy,
                outcome: outcome.value.clone(),
            });
            session.coordination.metrics.record_conflict();
            outcome
        };

        self.audit_event(
            session_id,
            AuditCategory::Conflict,
            AuditAction::ConflictResolved,
            format!("{key} resolved via {strategy} (unanimous: {})", outcome.unanimous),
        )
        .await;
        if !outcome.unanimous {
            warn!(session_id, key, %strategy, "shared context resolved without unanimity");
        }
        Ok(outcome)
    }

    /// Read-only summary of a session's current state
    pub async fn session_status(
        &self,
        session_id: &str,
    ) -> Result<SessionStatus, CoordinationError> {
        let sessions = self.sessions.read().await;
        let session = Self::session_ref(&sessions, session_id)?;

        let mut active_agents: Vec<String> =
            session.coordination.active_agents.iter().cloned().collect();
        active_agents.sort();

        Ok(SessionStatus {
            session_id: session.session_id.clone(),
            started_at: session.started_at,
            active_delegations: session.active_delegations.len(),
            completed_delegations: session.completed_delegations.len(),
            active_agents,
            pending_messages: session.coordination.pending_messages.len(),
            shared_context_keys: session.coordination.shared_context.len(),
            conflicts_recorded: session.conflict_history.len(),
            metrics: session.coordination.metrics.clone(),
        })
    }

    /// Clear every collection for the session and remove it.
    ///
    /// This is the only teardown path.
    #[instrument(skip(self))]
    pub async fn cleanup_session(&self, session_id: &str) -> Result<(), CoordinationError> {
        {
            let mut sessions = self.sessions.write().await;
            sessions
                .remove(session_id)
                .ok_or_else(|| CoordinationError::SessionNotFound(session_id.to_string()))?;
        }
        self.audit_event(
            session_id,
            AuditCategory::Session,
            AuditAction::SessionCleaned,
            "session cleaned up",
        )
        .await;
        info!(session_id, "session cleaned up");
        Ok(())
    }

    fn create_session(
        sessions: &mut HashMap<String, SessionContext>,
        session_id: &str,
    ) -> SessionCreated {
        let mut context = SessionContext::new(session_id);
        for agent in DEFAULT_ACTIVE_AGENTS {
            context
                .coordination
                .active_agents
                .insert((*agent).to_string());
        }

        let created = SessionCreated {
            session_id: session_id.to_string(),
            active_agents: context.coordination.active_agents.iter().cloned().collect(),
        };
        sessions.insert(session_id.to_string(), context);
        created
    }

    async fn audit_event(
        &self,
        session_id: &str,
        category: AuditCategory,
        action: AuditAction,
        message: impl Into<String>,
    ) {
        if let Some(audit) = &self.audit {
            audit
                .log(
                    AuditEntry::new(AuditLevel::Info, category, action, message)
                        .with_session(session_id),
                )
                .await;
        }
    }

    fn session_mut<'a>(
        sessions: &'a mut HashMap<String, SessionContext>,
        session_id: &str,
    ) -> Result<&'a mut SessionContext, CoordinationError> {
        sessions
            .get_mut(session_id)
            .ok_or_else(|| CoordinationError::SessionNotFound(session_id.to_string()))
    }

    fn session_ref<'a>(
        sessions: &'a HashMap<String, SessionContext>,
        session_id: &str,
    ) -> Result<&'a SessionContext, CoordinationError> {
        sessions
            .get(session_id)
            .ok_or_else(|| CoordinationError::SessionNotFound(session_id.to_string()))
    }
}
