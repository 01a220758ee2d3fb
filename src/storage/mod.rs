//! Persistence ports and the SQLite adapter.
//!
//! The repository itself never touches storage. The assistant calls
//! [`DocumentStore::save`] after every mutation and treats failures as
//! warnings, so a broken database never blocks or corrupts in-memory state.

mod sqlite;

pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StorageResult;
use crate::repository::Document;

/// Durable copy of the document set.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Replace the stored set with `documents`, keeping their order.
    async fn save(&self, documents: &[Document]) -> StorageResult<()>;

    /// Stored documents in the order they were saved.
    async fn load(&self) -> StorageResult<Vec<Document>>;
}

/// Audit trail of model calls.
#[async_trait]
pub trait InvocationLog: Send + Sync {
    /// Append one record.
    async fn log_invocation(&self, invocation: &Invocation) -> StorageResult<()>;

    /// Most recent invocations first.
    async fn recent_invocations(&self, limit: u32) -> StorageResult<Vec<Invocation>>;
}

/// Record of one model call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    /// Unique invocation identifier.
    pub id: String,
    /// Conversation the question belonged to.
    pub session_id: Option<String>,
    /// Langbase pipe that answered.
    pub pipe_name: String,
    /// The question as typed.
    pub question: String,
    /// Number of grounding documents in the prompt.
    pub document_count: i64,
    /// Wall-clock latency of the call.
    pub latency_ms: Option<i64>,
    /// Whether the model answered.
    pub success: bool,
    /// Error text when it did not.
    pub error: Option<String>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl Invocation {
    /// Create a new invocation log entry
    pub fn new(
        pipe_name: impl Into<String>,
        question: impl Into<String>,
        document_count: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: None,
            pipe_name: pipe_name.into(),
            question: question.into(),
            document_count: i64::try_from(document_count).unwrap_or(i64::MAX),
            latency_ms: None,
            success: true,
            error: None,
            created_at: Utc::now(),
        }
    }

    /// Set the session ID
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Mark as successful
    pub fn success(mut self, latency_ms: i64) -> Self {
        self.success = true;
        self.latency_ms = Some(latency_ms);
        self
    }

    /// Mark as failed
    pub fn failure(mut self, error: impl Into<String>, latency_ms: i64) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self.latency_ms = Some(latency_ms);
        self
    }
}
