//! Conversation history and the idle/processing state machine.
//!
//! ```text
//!            begin(question) ok
//!   Idle ───────────────────────────▶ Processing
//!    ▲                                    │
//!    └──────── finish(ticket, outcome) ◀──┘
//! ```
//!
//! [`ConversationSession::begin`] hands out a [`PendingQuestion`] ticket and is
//! refused while a question is in flight. The ticket is the only way back to
//! `Idle`, so an answer can't be recorded for a question that was never
//! accepted. Model failures become a failed assistant message; they never
//! escape the session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::context::{assemble, AssembledPrompt};
use crate::error::{AppResult, SubmitRejection};
use crate::model::{ChatTurn, CompletionModel};
use crate::repository::DocumentRepository;

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// The person asking.
    User,
    /// The model, or an error shown in its place.
    Assistant,
}

/// One entry of the conversation. Messages are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message id.
    pub id: String,
    /// Who wrote it.
    pub speaker: Speaker,
    /// Message body; for a failed message, the error text.
    pub text: String,
    /// When the message was appended.
    pub sent_at: DateTime<Utc>,
    /// Marks a surfaced error; such messages are never replayed to the model.
    pub failed: bool,
}

impl Message {
    fn new(speaker: Speaker, text: impl Into<String>, failed: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            speaker,
            text: text.into(),
            sent_at: Utc::now(),
            failed,
        }
    }

    /// A question from the user.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Speaker::User, text, false)
    }

    /// An answer from the model.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Speaker::Assistant, text, false)
    }

    /// An error shown in place of an answer.
    pub fn assistant_failure(text: impl Into<String>) -> Self {
        Self::new(Speaker::Assistant, text, true)
    }
}

/// Drop failed messages and map the rest to model turns, keeping order.
pub fn filter_history(messages: &[Message]) -> Vec<ChatTurn> {
    messages
        .iter()
        .filter(|m| !m.failed)
        .map(|m| match m.speaker {
            Speaker::User => ChatTurn::user(m.text.clone()),
            Speaker::Assistant => ChatTurn::assistant(m.text.clone()),
        })
        .collect()
}

/// Session state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Ready to accept a question.
    #[default]
    Idle,
    /// A question is in flight; `question_id` is the id of its user message.
    Processing { question_id: String },
}

/// An accepted question waiting for its answer.
///
/// Returned by [`ConversationSession::begin`] and consumed by
/// [`ConversationSession::finish`].
#[derive(Debug)]
#[must_use = "a pending question keeps the session busy until it is finished"]
pub struct PendingQuestion {
    question_id: String,
    question: String,
    prompt: AssembledPrompt,
}

impl PendingQuestion {
    /// Id of the user message that asked this question.
    pub fn question_id(&self) -> &str {
        &self.question_id
    }

    /// The question as asked.
    pub fn question(&self) -> &str {
        &self.question
    }

    /// System prompt built from the documents at the time of asking.
    pub fn system_prompt(&self) -> &str {
        &self.prompt.system_prompt
    }

    /// Prior turns to replay; excludes the question itself.
    pub fn history(&self) -> &[ChatTurn] {
        &self.prompt.history
    }
}

/// Ordered conversation plus the single-question-in-flight guard.
#[derive(Debug, Clone)]
pub struct ConversationSession {
    id: String,
    messages: Vec<Message>,
    state: SessionState,
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationSession {
    /// Start an empty conversation in `Idle`.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            messages: Vec::new(),
            state: SessionState::Idle,
        }
    }

    /// Session id, recorded with every logged invocation.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// True while a question is in flight.
    pub fn is_processing(&self) -> bool {
        matches!(self.state, SessionState::Processing { .. })
    }

    /// Full history in chronological order, failed messages included.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Accept a question: move to `Processing` and record the user message.
    ///
    /// Refused, with nothing changed, when a question is already in flight,
    /// when the question is blank, or when there are no documents to ground on.
    pub fn begin(
        &mut self,
        question: &str,
        repository: &DocumentRepository,
    ) -> Result<PendingQuestion, SubmitRejection> {
        if self.is_processing() {
            debug!(session_id = %self.id, "Rejected question: already processing");
            return Err(SubmitRejection::AlreadyProcessing);
        }
        if question.trim().is_empty() {
            return Err(SubmitRejection::EmptyQuestion);
        }
        if repository.is_empty() {
            return Err(SubmitRejection::NoDocuments);
        }

        // History is captured before the question is appended
        let prompt = assemble(repository.list(), &self.messages);
        let message = Message::user(question);
        let question_id = message.id.clone();
        self.messages.push(message);
        self.state = SessionState::Processing {
            question_id: question_id.clone(),
        };

        info!(
            session_id = %self.id,
            question_id = %question_id,
            documents = repository.len(),
            history = prompt.history.len(),
            "Question accepted"
        );

        Ok(PendingQuestion {
            question_id,
            question: question.to_string(),
            prompt,
        })
    }

    /// Record the outcome of a pending question and return to `Idle`.
    ///
    /// Returns `None` (and changes nothing) if the ticket does not belong to the
    /// question currently in flight.
    pub fn finish(
        &mut self,
        pending: PendingQuestion,
        outcome: AppResult<String>,
    ) -> Option<&Message> {
        match &self.state {
            SessionState::Processing { question_id } if *question_id == pending.question_id => {}
            _ => {
                warn!(
                    session_id = %self.id,
                    question_id = %pending.question_id,
                    "Ignoring answer for a question that is not in flight"
                );
                return None;
            }
        }
        Some(self.record_outcome(outcome))
    }

    fn record_outcome(&mut self, outcome: AppResult<String>) -> &Message {
        let message = match outcome {
            Ok(answer) => Message::assistant(answer),
            Err(e) => {
                warn!(session_id = %self.id, error = %e, "Question failed");
                Message::assistant_failure(e.to_string())
            }
        };
        self.messages.push(message);
        self.state = SessionState::Idle;
        &self.messages[self.messages.len() - 1]
    }

    /// Ask a question and wait for the answer.
    ///
    /// Returns the assistant message, which is marked `failed` when the model
    /// call errored.
    pub async fn submit(
        &mut self,
        question: &str,
        repository: &DocumentRepository,
        model: &dyn CompletionModel,
    ) -> Result<&Message, SubmitRejection> {
        let pending = self.begin(question, repository)?;
        let start = Instant::now();
        let outcome = model
            .complete(pending.system_prompt(), pending.history(), pending.question())
            .await;
        debug!(
            session_id = %self.id,
            latency_ms = start.elapsed().as_millis(),
            ok = outcome.is_ok(),
            "Model call finished"
        );
        Ok(self.record_outcome(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, LangbaseError};
    use crate::repository::Document;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use mockall::mock;

    mock! {
        pub Model {}

        #[async_trait]
        impl CompletionModel for Model {
            async fn complete(
                &self,
                system_prompt: &str,
                history: &[ChatTurn],
                question: &str,
            ) -> AppResult<String>;
        }
    }

    fn repository_with_one_document() -> DocumentRepository {
        let mut repo = DocumentRepository::new();
        repo.upsert(Document::new(
            "Luật Giáo dục.pdf",
            "Điều 1",
            NaiveDate::from_ymd_opt(2019, 6, 14).unwrap(),
        ));
        repo
    }

    #[test]
    fn test_new_session_is_idle_and_empty() {
        let session = ConversationSession::new();
        assert_eq!(session.state(), &SessionState::Idle);
        assert!(session.messages().is_empty());
    }

    #[test]
    fn test_begin_appends_user_message_and_enters_processing() {
        let repo = repository_with_one_document();
        let mut session = ConversationSession::new();

        let pending = session.begin("Học phí?", &repo).unwrap();

        assert!(session.is_processing());
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].speaker, Speaker::User);
        assert_eq!(session.messages()[0].id, pending.question_id());
        assert!(pending.history().is_empty());
        assert!(pending.system_prompt().contains("Luật Giáo dục.pdf"));
    }

    #[test]
    fn test_second_begin_while_processing_is_rejected() {
        let repo = repository_with_one_document();
        let mut session = ConversationSession::new();
        let _pending = session.begin("first", &repo).unwrap();
        let before = session.messages().to_vec();

        let second = session.begin("second", &repo);

        assert_eq!(second.unwrap_err(), SubmitRejection::AlreadyProcessing);
        assert_eq!(session.messages(), before.as_slice());
    }

    #[test]
    fn test_blank_question_is_rejected_without_change() {
        let repo = repository_with_one_document();
        let mut session = ConversationSession::new();

        for question in ["", "   ", "\n\t"] {
            assert_eq!(
                session.begin(question, &repo).unwrap_err(),
                SubmitRejection::EmptyQuestion
            );
        }
        assert_eq!(session.state(), &SessionState::Idle);
        assert!(session.messages().is_empty());
    }

    #[test]
    fn test_question_without_documents_is_rejected() {
        let repo = DocumentRepository::new();
        let mut session = ConversationSession::new();

        assert_eq!(
            session.begin("Học phí?", &repo).unwrap_err(),
            SubmitRejection::NoDocuments
        );
        assert_eq!(session.state(), &SessionState::Idle);
        assert!(session.messages().is_empty());
    }

    #[test]
    fn test_finish_success_returns_to_idle() {
        let repo = repository_with_one_document();
        let mut session = ConversationSession::new();
        let pending = session.begin("q", &repo).unwrap();

        let answer = session.finish(pending, Ok("answer".to_string())).cloned();

        let answer = answer.expect("ticket belongs to the session");
        assert_eq!(answer.speaker, Speaker::Assistant);
        assert_eq!(answer.text, "answer");
        assert!(!answer.failed);
        assert_eq!(session.state(), &SessionState::Idle);
        assert_eq!(session.messages().len(), 2);
    }

    #[test]
    fn test_finish_failure_records_failed_message() {
        let repo = repository_with_one_document();
        let mut session = ConversationSession::new();
        let pending = session.begin("q", &repo).unwrap();

        let err = AppError::Langbase(LangbaseError::Timeout { timeout_ms: 100 });
        let message = session.finish(pending, Err(err)).cloned().unwrap();

        assert!(message.failed);
        assert!(message.text.contains("timeout"));
        assert_eq!(session.state(), &SessionState::Idle);
    }

    #[test]
    fn test_finish_with_foreign_ticket_is_ignored() {
        let repo = repository_with_one_document();
        let mut ours = ConversationSession::new();
        let mut other = ConversationSession::new();
        let _ours_pending = ours.begin("ours", &repo).unwrap();
        let foreign = other.begin("other", &repo).unwrap();

        assert!(ours.finish(foreign, Ok("x".to_string())).is_none());
        assert!(ours.is_processing());
        assert_eq!(ours.messages().len(), 1);
    }

    #[test]
    fn test_filter_history_drops_failed_and_keeps_order() {
        let history = vec![
            Message::user("a"),
            Message::assistant_failure("b"),
            Message::user("c"),
        ];
        assert_eq!(
            filter_history(&history),
            vec![ChatTurn::user("a"), ChatTurn::user("c")]
        );
    }

    #[test]
    fn test_filter_history_maps_speakers() {
        let history = vec![Message::user("q"), Message::assistant("a")];
        assert_eq!(
            filter_history(&history),
            vec![ChatTurn::user("q"), ChatTurn::assistant("a")]
        );
    }

    #[tokio::test]
    async fn test_submit_success() {
        let repo = repository_with_one_document();
        let mut session = ConversationSession::new();
        let mut model = MockModel::new();
        model
            .expect_complete()
            .times(1)
            .returning(|_, _, _| Ok("Theo Điều 1...".to_string()));

        let answer = session.submit("Học phí?", &repo, &model).await.unwrap().clone();

        assert_eq!(answer.text, "Theo Điều 1...");
        assert!(!answer.failed);
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.state(), &SessionState::Idle);
    }

    #[tokio::test]
    async fn test_submit_model_failure_is_recorded_not_raised() {
        let repo = repository_with_one_document();
        let mut session = ConversationSession::new();
        let mut model = MockModel::new();
        model.expect_complete().times(1).returning(|_, _, _| {
            Err(AppError::Langbase(LangbaseError::Api {
                status: 500,
                message: "boom".to_string(),
            }))
        });

        let answer = session.submit("Học phí?", &repo, &model).await.unwrap().clone();

        assert!(answer.failed);
        assert!(answer.text.contains("boom"));
        assert_eq!(session.state(), &SessionState::Idle);
    }

    #[tokio::test]
    async fn test_rejected_submit_never_calls_model() {
        let repo = DocumentRepository::new();
        let mut session = ConversationSession::new();
        let mut model = MockModel::new();
        model.expect_complete().times(0);

        let result = session.submit("Học phí?", &repo, &model).await;

        assert_eq!(result.unwrap_err(), SubmitRejection::NoDocuments);
        assert!(session.messages().is_empty());
    }

    #[tokio::test]
    async fn test_submit_while_processing_is_rejected() {
        let repo = repository_with_one_document();
        let mut session = ConversationSession::new();
        let _pending = session.begin("first", &repo).unwrap();
        let mut model = MockModel::new();
        model.expect_complete().times(0);

        let result = session.submit("second", &repo, &model).await;

        assert_eq!(result.unwrap_err(), SubmitRejection::AlreadyProcessing);
        assert_eq!(session.messages().len(), 1);
    }
}
