//! Transaction log store
//!
//! One entry is recorded per processed request, successful or not.
//! Persistence beyond the process lifetime belongs to external stores
//! implementing `TransactionLogStore`.

use crate::error::EngineResult;
use crate::intent::ProcessedTransaction;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub user_id: String,
    pub action: String,
    pub status: LogStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<ProcessedTransaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LogEntry {
    pub fn success(user_id: impl Into<String>, transaction: ProcessedTransaction) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            action: transaction.action.clone(),
            status: LogStatus::Success,
            transaction: Some(transaction),
            error: None,
            created_at: Utc::now(),
        }
    }

    pub fn failure(
        user_id: impl Into<String>,
        action: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            action: action.into(),
            status: LogStatus::Failed,
            transaction: None,
            error: Some(error.into()),
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait TransactionLogStore: Send + Sync {
    async fn record(&self, entry: LogEntry) -> EngineResult<()>;

    /// Entries for one user, oldest first
    async fn list_for_user(&self, user_id: &str) -> EngineResult<Vec<LogEntry>>;
}

/// Process-local store keyed by user id
#[derive(Debug, Default)]
pub struct InMemoryLogStore {
    entries: DashMap<String, Vec<LogEntry>>,
}

impl InMemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionLogStore for InMemoryLogStore {
    async fn record(&self, entry: LogEntry) -> EngineResult<()> {
        debug!(
            "Recording {} {} entry {} for {}",
            entry.action,
            if entry.status == LogStatus::Success { "success" } else { "failure" },
            entry.id,
            entry.user_id
        );
        self.entries
            .entry(entry.user_id.clone())
            .or_default()
            .push(entry);
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> EngineResult<Vec<LogEntry>> {
        Ok(self
            .entries
            .get(user_id)
            .map(|entries| entries.value().clone())
            .unwrap_or_default())
    }
}
