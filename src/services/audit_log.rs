//! Audit logging for the delegation path.
//!
//! Every analysis decision, execution start/success/failure, conflict
//! resolution, fallback simulation, and session lifecycle event lands here as
//! a structured entry. Fire-and-forget: logging never fails and never blocks
//! the delegation path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Audit log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditLevel {
    Debug,
    Info,
    Decision,
    Warning,
    Error,
}

/// Category of audit event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCategory {
    /// Analysis and strategy selection
    Delegation,
    /// Worker invocation and fan-out
    Execution,
    /// Conflict resolution outcomes
    Conflict,
    /// Session coordination lifecycle
    Session,
}

/// Action recorded by an audit entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    DelegationAnalyzed,
    ExecutionStarted,
    ExecutionCompleted,
    ExecutionFailed,
    FallbackSimulated,
    ConflictResolved,
    SessionInitialized,
    SessionCleaned,
    DelegationRegistered,
    DelegationCompleted,
    MessageSent,
    MessagesReceived,
    ContextShared,
}

/// A single audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub level: AuditLevel,
    pub category: AuditCategory,
    pub action: AuditAction,
    /// Session the event belongs to, when scoped
    pub session_id: Option<String>,
    /// Human-readable message
    pub message: String,
    /// Additional structured metadata
    pub metadata: std::collections::HashMap<String, serde_json::Value>,
}

impl AuditEntry {
    pub fn new(
        level: AuditLevel,
        category: AuditCategory,
        action: AuditAction,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            level,
            category,
            action,
            session_id: None,
            message: message.into(),
            metadata: std::collections::HashMap::new(),
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Filter for querying audit entries
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub min_level: Option<AuditLevel>,
    pub category: Option<AuditCategory>,
    pub action: Option<AuditAction>,
    pub session_id: Option<String>,
    pub limit: Option<usize>,
}

impl AuditFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_level(mut self, level: AuditLevel) -> Self {
        self.min_level = Some(level);
        self
    }

    pub fn with_category(mut self, category: AuditCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_action(mut self, action: AuditAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(min_level) = self.min_level {
            if entry.level < min_level {
                return false;
            }
        }
        if let Some(category) = self.category {
            if entry.category != category {
                return false;
            }
        }
        if let Some(action) = self.action {
            if entry.action != action {
                return false;
            }
        }
        if let Some(ref session_id) = self.session_id {
            if entry.session_id.as_ref() != Some(session_id) {
                return false;
            }
        }
        true
    }
}

/// In-memory bounded audit log.
///
/// Oldest entries are dropped once `max_entries` is reached.
#[derive(Debug)]
pub struct AuditLogService {
    max_entries: usize,
    entries: Arc<RwLock<VecDeque<AuditEntry>>>,
}

impl Default for AuditLogService {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl AuditLogService {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            entries: Arc::new(RwLock::new(VecDeque::new())),
        }
    }

    /// Append an entry, evicting the oldest past the bound
    pub async fn log(&self, entry: AuditEntry) {
        let mut entries = self.entries.write().await;
        while entries.len() >= self.max_entries {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Log a simple info event
    pub async fn info(
        &self,
        category: AuditCategory,
        action: AuditAction,
        message: impl Into<String>,
    ) {
        self.log(AuditEntry::new(AuditLevel::Info, category, action, message))
            .await;
    }

    /// Log a decision event
    pub async fn decision(
        &self,
        category: AuditCategory,
        action: AuditAction,
        message: impl Into<String>,
    ) {
        self.log(AuditEntry::new(AuditLevel::Decision, category, action, message))
            .await;
    }

    /// Log an error event
    pub async fn error(
        &self,
        category: AuditCategory,
        action: AuditAction,
        message: impl Into<String>,
    ) {
        self.log(AuditEntry::new(AuditLevel::Error, category, action, message))
            .await;
    }

    /// Query entries, newest first
    pub async fn query(&self, filter: AuditFilter) -> Vec<AuditEntry> {
        let entries = self.entries.read().await;
        let mut results: Vec<AuditEntry> =
            entries.iter().filter(|e| filter.matches(e)).cloned().collect();
        results.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = filter.limit {
            results.truncate(limit);
        }
        results
    }

    /// All entries for one session, newest first
    pub async fn session_history(&self, session_id: &str) -> Vec<AuditEntry> {
        self.query(AuditFilter::new().with_session(session_id)).await
    }

    /// Number of entries currently retained
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
