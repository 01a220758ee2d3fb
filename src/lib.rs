//! # Legal QA
//!
//! Grounded question answering over Vietnamese legal documents.
//!
//! Uploaded documents are classified into the legal hierarchy by name,
//! ordered by tier and effective date, and serialized into the system prompt
//! of a Langbase pipe. A single conversation session accepts one question at
//! a time and replays its successful history with every call.
//!
//! ## Architecture
//!
//! ```text
//! files ─▶ extract ─▶ DocumentRepository ─▶ context (rank + order) ─▶ system prompt
//!                            │                                              │
//!                      SQLite (documents)        ConversationSession ─▶ Langbase Pipes (HTTP)
//!                                                         │
//!                                                 SQLite (invocations)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use legal_qa::{Assistant, Config};
//! use legal_qa::langbase::LangbaseClient;
//! use legal_qa::storage::SqliteStorage;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let storage = Arc::new(SqliteStorage::new(&config.database).await?);
//!     let langbase = LangbaseClient::new(&config.langbase, &config.assistant.pipe, config.request.clone())?;
//!     let mut assistant = Assistant::new(Arc::new(langbase), storage, &config.assistant.pipe);
//!     assistant.load().await?;
//!     let answer = assistant.ask("Học phí mầm non năm 2024 là bao nhiêu?").await?;
//!     println!("{}", answer.text);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Orchestration of documents, session, model and storage.
pub mod assistant;
/// Command-line interface definitions and command execution.
pub mod cli;
/// Configuration management from environment variables.
pub mod config;
/// Serialization of documents into the system prompt.
pub mod context;
/// Error types and result aliases for the application.
pub mod error;
/// Text extraction from uploaded files.
pub mod extract;
/// Langbase API client and types for pipe communication.
pub mod langbase;
/// Provider-neutral chat model interface.
pub mod model;
/// System prompt template and fixed texts.
pub mod prompts;
/// Legal tier classification of document names.
pub mod rank;
/// In-memory document working set.
pub mod repository;
/// Conversation history and question lifecycle.
pub mod session;
/// SQLite storage layer for persistence.
pub mod storage;

pub use assistant::Assistant;
pub use config::Config;
pub use error::{AppError, AppResult, SubmitRejection};
pub use rank::{classify, Rank};
pub use repository::{Document, DocumentRepository};
pub use session::ConversationSession;
