//! The completion capability the session calls to answer a question.
//!
//! The session only needs `complete(system_prompt, history, question)`.
//! [`crate::langbase::LangbaseClient`] implements it over HTTP; tests plug in
//! fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;

/// Who said a replayed turn, in the vocabulary the model expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// A question.
    User,
    /// An earlier answer.
    Assistant,
}

/// One prior exchange replayed to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Who spoke.
    pub role: TurnRole,
    /// What was said.
    pub text: String,
}

impl ChatTurn {
    /// A user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    /// A model turn.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            text: text.into(),
        }
    }
}

/// A model that answers a question given instructions and prior turns.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Produce an answer. Errors are surfaced to the user as a failed message.
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[ChatTurn],
        question: &str,
    ) -> AppResult<String>;
}
