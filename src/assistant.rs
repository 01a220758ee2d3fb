//! The legal assistant: documents, conversation and model wired together.
//!
//! [`Assistant`] owns the in-memory [`DocumentRepository`] and the single
//! [`ConversationSession`]. Every document mutation is written through to the
//! [`DocumentStore`]; storage failures are logged and otherwise ignored so the
//! working set stays usable when the database is not.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::context::{build_system_prompt, order_for_display, RankedDocument};
use crate::error::{ExtractError, StorageResult, SubmitRejection};
use crate::extract::{extract_file, extract_text};
use crate::model::CompletionModel;
use crate::repository::{Document, DocumentRepository, UpsertOutcome};
use crate::session::{ConversationSession, Message};
use crate::storage::{DocumentStore, Invocation, InvocationLog};

/// Result of adding one file in a batch.
#[derive(Debug)]
pub struct FileOutcome {
    /// The file as given.
    pub path: PathBuf,
    /// What the upsert did, or why the file was skipped.
    pub result: Result<UpsertOutcome, ExtractError>,
}

/// Question answering over a set of uploaded legal documents.
pub struct Assistant {
    repository: DocumentRepository,
    session: ConversationSession,
    model: Arc<dyn CompletionModel>,
    store: Arc<dyn DocumentStore>,
    invocations: Option<Arc<dyn InvocationLog>>,
    pipe_name: String,
}

impl Assistant {
    /// Create an assistant with no documents.
    pub fn new(
        model: Arc<dyn CompletionModel>,
        store: Arc<dyn DocumentStore>,
        pipe_name: impl Into<String>,
    ) -> Self {
        Self {
            repository: DocumentRepository::new(),
            session: ConversationSession::new(),
            model,
            store,
            invocations: None,
            pipe_name: pipe_name.into(),
        }
    }

    /// Record every model call in `log`.
    pub fn with_invocation_log(mut self, log: Arc<dyn InvocationLog>) -> Self {
        self.invocations = Some(log);
        self
    }

    /// Replace the working set with whatever the store holds.
    pub async fn load(&mut self) -> StorageResult<usize> {
        let documents = self.store.load().await?;
        self.repository = DocumentRepository::from_documents(documents);
        info!(documents = self.repository.len(), "Documents restored");
        Ok(self.repository.len())
    }

    /// Current documents, raw order.
    pub fn repository(&self) -> &DocumentRepository {
        &self.repository
    }

    /// The conversation so far.
    pub fn session(&self) -> &ConversationSession {
        &self.session
    }

    /// Documents in prompt order: by rank, then newest effective date.
    pub fn documents_for_display(&self) -> Vec<RankedDocument<'_>> {
        order_for_display(self.repository.list())
    }

    /// The system prompt the next question would be sent with.
    pub fn system_prompt(&self) -> String {
        build_system_prompt(self.repository.list())
    }

    /// Add already-extracted text under `name`.
    pub async fn add_document(
        &mut self,
        name: impl Into<String>,
        content: impl Into<String>,
        effective_date: NaiveDate,
    ) -> UpsertOutcome {
        let outcome = self
            .repository
            .upsert(Document::new(name, content, effective_date));
        self.persist().await;
        outcome
    }

    /// Extract the bytes of a file called `name` and add the text.
    pub async fn add_file(
        &mut self,
        name: &str,
        bytes: &[u8],
        effective_date: NaiveDate,
    ) -> Result<UpsertOutcome, ExtractError> {
        let content = extract_text(name, bytes)?;
        Ok(self.add_document(name, content, effective_date).await)
    }

    /// Add several files from disk sharing one effective date.
    ///
    /// A file that fails to extract is reported in its [`FileOutcome`] and the
    /// rest are still added. The store is written once at the end.
    pub async fn add_paths(
        &mut self,
        paths: &[PathBuf],
        effective_date: NaiveDate,
    ) -> Vec<FileOutcome> {
        let mut outcomes = Vec::with_capacity(paths.len());
        let mut changed = false;

        for path in paths {
            let result = self.upsert_path(path, effective_date);
            match &result {
                Ok(_) => changed = true,
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping file"),
            }
            outcomes.push(FileOutcome {
                path: path.clone(),
                result,
            });
        }

        if changed {
            self.persist().await;
        }
        outcomes
    }

    fn upsert_path(
        &mut self,
        path: &Path,
        effective_date: NaiveDate,
    ) -> Result<UpsertOutcome, ExtractError> {
        let (name, content) = extract_file(path)?;
        Ok(self
            .repository
            .upsert(Document::new(name, content, effective_date)))
    }

    /// Remove a document by id. Unknown ids change nothing.
    pub async fn remove(&mut self, id: &str) -> Option<Document> {
        let removed = self.repository.remove(id)?;
        self.persist().await;
        Some(removed)
    }

    /// Ask a question about the current documents.
    ///
    /// Input problems are returned as a [`SubmitRejection`] and leave the
    /// conversation untouched. A model failure is not an error here: it comes
    /// back as an assistant message with `failed` set.
    pub async fn ask(&mut self, question: &str) -> Result<Message, SubmitRejection> {
        let start = Instant::now();
        let message = self
            .session
            .submit(question, &self.repository, self.model.as_ref())
            .await?
            .clone();
        let latency_ms = i64::try_from(start.elapsed().as_millis()).unwrap_or(i64::MAX);

        if let Some(log) = &self.invocations {
            let invocation = Invocation::new(&self.pipe_name, question, self.repository.len())
                .with_session(self.session.id());
            let invocation = if message.failed {
                invocation.failure(message.text.clone(), latency_ms)
            } else {
                invocation.success(latency_ms)
            };
            if let Err(e) = log.log_invocation(&invocation).await {
                warn!(error = %e, "Failed to log invocation");
            }
        }

        Ok(message)
    }

    async fn persist(&self) {
        if let Err(e) = self.store.save(self.repository.list()).await {
            warn!(error = %e, "Failed to persist documents");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, AppResult, LangbaseError};
    use crate::model::ChatTurn;
    use crate::storage::SqliteStorage;
    use async_trait::async_trait;

    /// Answers with the given text, or times out when there is none.
    struct FixedModel(Option<&'static str>);

    #[async_trait]
    impl CompletionModel for FixedModel {
        async fn complete(&self, _: &str, _: &[ChatTurn], _: &str) -> AppResult<String> {
            match self.0 {
                Some(text) => Ok(text.to_string()),
                None => Err(AppError::Langbase(LangbaseError::Timeout { timeout_ms: 5 })),
            }
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn assistant(model: FixedModel) -> (Assistant, Arc<SqliteStorage>) {
        let storage = Arc::new(SqliteStorage::new_in_memory().await.unwrap());
        let assistant = Assistant::new(Arc::new(model), storage.clone(), "legal-qa")
            .with_invocation_log(storage.clone());
        (assistant, storage)
    }

    #[tokio::test]
    async fn test_mutations_are_persisted() {
        let (mut assistant, storage) = assistant(FixedModel(Some("ok"))).await;

        let outcome = assistant
            .add_document("Luật Giáo dục.pdf", "Điều 1", date(2019, 6, 14))
            .await;
        assert_eq!(storage.load().await.unwrap().len(), 1);

        assistant.remove(outcome.id()).await.unwrap();
        assert!(storage.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_restores_documents() {
        let (mut first, storage) = assistant(FixedModel(Some("ok"))).await;
        first
            .add_document("Thông tư 13.pdf", "Điều 9", date(2023, 5, 1))
            .await;

        let mut second = Assistant::new(
            Arc::new(FixedModel(Some("ok"))),
            storage.clone(),
            "legal-qa",
        );
        assert_eq!(second.load().await.unwrap(), 1);
        assert!(second.repository().find_by_name("Thông tư 13.pdf").is_some());
    }

    #[tokio::test]
    async fn test_add_file_rejects_unsupported_format() {
        let (mut assistant, _) = assistant(FixedModel(Some("ok"))).await;

        let result = assistant.add_file("scan.png", b"\x89PNG", date(2024, 1, 1)).await;

        assert!(matches!(result, Err(ExtractError::UnsupportedFormat { .. })));
        assert!(assistant.repository().is_empty());
    }

    #[tokio::test]
    async fn test_ask_logs_invocation() {
        let (mut assistant, storage) = assistant(FixedModel(Some("Theo Điều 1"))).await;
        assistant
            .add_document("Luật Giáo dục.pdf", "Điều 1", date(2019, 6, 14))
            .await;

        let answer = assistant.ask("Học phí?").await.unwrap();

        assert_eq!(answer.text, "Theo Điều 1");
        let logged = storage.recent_invocations(10).await.unwrap();
        assert_eq!(logged.len(), 1);
        assert!(logged[0].success);
        assert_eq!(logged[0].document_count, 1);
        assert_eq!(logged[0].session_id.as_deref(), Some(assistant.session().id()));
    }

    #[tokio::test]
    async fn test_failed_ask_is_logged_and_recorded() {
        let (mut assistant, storage) = assistant(FixedModel(None)).await;
        assistant
            .add_document("Luật Giáo dục.pdf", "Điều 1", date(2019, 6, 14))
            .await;

        let answer = assistant.ask("Học phí?").await.unwrap();

        assert!(answer.failed);
        assert!(!assistant.session().is_processing());
        let logged = storage.recent_invocations(10).await.unwrap();
        assert!(!logged[0].success);
        assert_eq!(logged[0].error.as_deref(), Some(answer.text.as_str()));
    }

    #[tokio::test]
    async fn test_rejected_ask_is_not_logged() {
        let (mut assistant, storage) = assistant(FixedModel(Some("ok"))).await;

        let result = assistant.ask("Học phí?").await;

        assert_eq!(result.unwrap_err(), SubmitRejection::NoDocuments);
        assert!(assistant.session().messages().is_empty());
        assert!(storage.recent_invocations(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ask_replays_earlier_turns() {
        let (mut assistant, _) = assistant(FixedModel(Some("ok"))).await;
        assistant
            .add_document("Luật Giáo dục.pdf", "Điều 1", date(2019, 6, 14))
            .await;

        assistant.ask("first").await.unwrap();
        assistant.ask("second").await.unwrap();

        assert_eq!(assistant.session().messages().len(), 4);
        assert!(!assistant.session().is_processing());
    }
}
