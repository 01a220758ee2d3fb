//! Command-line interface for the `legal-qa` binary.
//!
//! Commands render their output into a [`CliResult`]; `main` prints it and
//! exits with its code. `chat` is the exception and talks to the terminal
//! directly through [`run_chat`].

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::assistant::Assistant;
use crate::repository::UpsertOutcome;
use crate::session::Message;

/// Grounded question answering over Vietnamese legal documents.
#[derive(Parser, Debug)]
#[command(name = "legal-qa", version, about)]
pub struct Cli {
    /// Command to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Extract and add documents (same-named documents are replaced)
    Add {
        /// Files to add: PDF, DOCX, DOC, XLSX/XLS, TXT, MD, CSV or JSON
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Effective date shared by all files, YYYY-MM-DD (default: today)
        #[arg(long, value_parser = parse_date)]
        effective_date: Option<NaiveDate>,
    },

    /// Remove a document by id
    Remove {
        /// Document id as shown by `list`
        id: String,
    },

    /// List documents in priority order
    List,

    /// Ask a single question
    Ask {
        /// The question
        question: String,
    },

    /// Interactive conversation on stdin
    Chat,

    /// Print the system prompt built from the current documents
    Prompt,
}

/// Result of CLI command execution.
pub struct CliResult {
    /// Exit code (0 = success)
    pub exit_code: i32,
    /// Output message
    pub message: String,
}

impl CliResult {
    /// Create a success result with the given message.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            message: message.into(),
        }
    }

    /// Create an error result with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            exit_code: 1,
            message: message.into(),
        }
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD, got '{}': {}", raw, e))
}

/// Execute a non-interactive command against `assistant`.
pub async fn execute_command(command: Commands, assistant: &mut Assistant) -> CliResult {
    match command {
        Commands::Add {
            files,
            effective_date,
        } => {
            let date = effective_date.unwrap_or_else(|| chrono::Local::now().date_naive());
            execute_add(assistant, &files, date).await
        }
        Commands::Remove { id } => match assistant.remove(&id).await {
            Some(doc) => CliResult::success(format!("Removed {} ({})", doc.name, doc.id)),
            None => CliResult::error(format!("No document with id {}", id)),
        },
        Commands::List => execute_list(assistant),
        Commands::Ask { question } => match assistant.ask(&question).await {
            Ok(message) => render_answer(&message),
            Err(rejection) => CliResult::error(rejection.to_string()),
        },
        Commands::Chat => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let stdout = tokio::io::stdout();
            match run_chat(assistant, stdin, stdout).await {
                Ok(()) => CliResult::success(""),
                Err(e) => CliResult::error(format!("Chat aborted: {}", e)),
            }
        }
        Commands::Prompt => CliResult::success(assistant.system_prompt()),
    }
}

async fn execute_add(assistant: &mut Assistant, files: &[PathBuf], date: NaiveDate) -> CliResult {
    let outcomes = assistant.add_paths(files, date).await;

    let mut output = String::new();
    let mut failures = 0;
    for outcome in &outcomes {
        let line = match &outcome.result {
            Ok(UpsertOutcome::Inserted { id }) => {
                format!("added     {}  {}", id, outcome.path.display())
            }
            Ok(UpsertOutcome::Replaced { id }) => {
                format!("replaced  {}  {}", id, outcome.path.display())
            }
            Err(e) => {
                failures += 1;
                format!("failed    {}: {}", outcome.path.display(), e)
            }
        };
        output.push_str(&line);
        output.push('\n');
    }
    output.push_str(&format!(
        "{} of {} file(s) added, effective {}",
        outcomes.len() - failures,
        outcomes.len(),
        date.format("%Y-%m-%d")
    ));

    if failures > 0 {
        CliResult::error(output)
    } else {
        CliResult::success(output)
    }
}

fn execute_list(assistant: &Assistant) -> CliResult {
    let documents = assistant.documents_for_display();
    if documents.is_empty() {
        return CliResult::success("No documents.");
    }

    let mut output = String::new();
    for (index, ranked) in documents.iter().enumerate() {
        output.push_str(&format!(
            "{:>3}. [{:>2}] {:<28} {}  {}  {}\n",
            index + 1,
            ranked.rank.tier(),
            ranked.rank.label(),
            ranked.document.effective_date.format("%Y-%m-%d"),
            ranked.document.id,
            ranked.document.name,
        ));
    }
    CliResult::success(output.trim_end().to_string())
}

fn render_answer(message: &Message) -> CliResult {
    if message.failed {
        CliResult::error(format!("Lỗi: {}", message.text))
    } else {
        CliResult::success(message.text.clone())
    }
}

/// Read questions line by line and write each answer back.
///
/// Ends on EOF or on a line reading `/exit`. Rejected questions are reported
/// and the loop continues.
pub async fn run_chat<R, W>(assistant: &mut Assistant, mut input: R, mut output: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();
    loop {
        output.write_all(b"> ").await?;
        output.flush().await?;

        line.clear();
        if input.read_line(&mut line).await? == 0 {
            break;
        }
        let question = line.trim();
        if question == "/exit" {
            break;
        }
        if question.is_empty() {
            continue;
        }

        let reply = match assistant.ask(question).await {
            Ok(message) => render_answer(&message).message,
            Err(rejection) => format!("({})", rejection),
        };
        output.write_all(reply.as_bytes()).await?;
        output.write_all(b"\n\n").await?;
    }
    output.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppResult;
    use crate::model::{ChatTurn, CompletionModel};
    use crate::storage::SqliteStorage;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Echo;

    #[async_trait]
    impl CompletionModel for Echo {
        async fn complete(&self, _: &str, history: &[ChatTurn], question: &str) -> AppResult<String> {
            Ok(format!("{} (history {})", question, history.len()))
        }
    }

    async fn assistant() -> Assistant {
        let storage = Arc::new(SqliteStorage::new_in_memory().await.unwrap());
        Assistant::new(Arc::new(Echo), storage, "legal-qa")
    }

    #[test]
    fn test_parse_add_with_date() {
        let cli = Cli::try_parse_from([
            "legal-qa",
            "add",
            "a.pdf",
            "b.docx",
            "--effective-date",
            "2024-07-01",
        ])
        .unwrap();

        match cli.command {
            Commands::Add {
                files,
                effective_date,
            } => {
                assert_eq!(files.len(), 2);
                assert_eq!(effective_date, NaiveDate::from_ymd_opt(2024, 7, 1));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_bad_date() {
        let result =
            Cli::try_parse_from(["legal-qa", "add", "a.pdf", "--effective-date", "01/07/2024"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_add_requires_files() {
        assert!(Cli::try_parse_from(["legal-qa", "add"]).is_err());
    }

    #[tokio::test]
    async fn test_ask_without_documents_fails() {
        let mut assistant = assistant().await;
        let result = execute_command(
            Commands::Ask {
                question: "Học phí?".into(),
            },
            &mut assistant,
        )
        .await;

        assert_eq!(result.exit_code, 1);
        assert!(result.message.contains("No documents"));
    }

    #[tokio::test]
    async fn test_list_shows_rank_order() {
        let mut assistant = assistant().await;
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assistant.add_document("Thông tư 13.pdf", "x", date).await;
        assistant.add_document("Luật Giáo dục.pdf", "y", date).await;

        let result = execute_command(Commands::List, &mut assistant).await;

        let lines: Vec<&str> = result.message.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Luật Giáo dục.pdf"));
        assert!(lines[1].contains("Thông tư 13.pdf"));
    }

    #[tokio::test]
    async fn test_add_reports_failures_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("Nghị định 81.txt");
        std::fs::write(&good, "Điều 1").unwrap();
        let bad = dir.path().join("scan.png");
        std::fs::write(&bad, "x").unwrap();
        let mut assistant = assistant().await;

        let result = execute_command(
            Commands::Add {
                files: vec![bad, good],
                effective_date: NaiveDate::from_ymd_opt(2021, 8, 27),
            },
            &mut assistant,
        )
        .await;

        assert_eq!(result.exit_code, 1);
        assert!(result.message.contains("1 of 2 file(s) added"));
        assert_eq!(assistant.repository().len(), 1);
    }

    #[tokio::test]
    async fn test_chat_loop_keeps_history() {
        let mut assistant = assistant().await;
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assistant.add_document("Luật Giáo dục.pdf", "y", date).await;

        let input: &[u8] = "first\n\nsecond\n/exit\nnever\n".as_bytes();
        let mut output = Vec::new();
        run_chat(&mut assistant, input, &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("first (history 0)"));
        assert!(text.contains("second (history 2)"));
        assert!(!text.contains("never"));
        assert_eq!(assistant.session().messages().len(), 4);
    }
}
