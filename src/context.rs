//! Ordering and serialization of grounding documents into the system prompt.
//!
//! The same ordering is used for display and for the prompt:
//!
//! 1. legal tier, ascending (see [`crate::rank`])
//! 2. effective date, newest first
//! 3. otherwise input order (the sort is stable)
//!
//! Document content is passed through verbatim: no escaping, no truncation.
//! Any size limit belongs to the model provider.

use std::cmp::Reverse;
use std::fmt::Write as _;

use crate::model::ChatTurn;
use crate::prompts::{CONTEXT_PLACEHOLDER, LEGAL_ASSISTANT_PROMPT, NO_DOCUMENTS_PLACEHOLDER};
use crate::rank::Rank;
use crate::repository::Document;
use crate::session::{filter_history, Message};

/// Everything sent to the model besides the question itself.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledPrompt {
    /// Instruction template with the serialized documents embedded.
    pub system_prompt: String,
    /// Prior turns to replay, failed messages removed.
    pub history: Vec<ChatTurn>,
}

/// A document paired with its computed tier, in display order.
#[derive(Debug, Clone, Copy)]
pub struct RankedDocument<'a> {
    /// Tier derived from the document name.
    pub rank: Rank,
    /// The ranked document.
    pub document: &'a Document,
}

/// Sort documents by tier then newest effective date, keeping input order on ties.
pub fn order_for_display(documents: &[Document]) -> Vec<RankedDocument<'_>> {
    let mut ranked: Vec<RankedDocument<'_>> = documents
        .iter()
        .map(|document| RankedDocument {
            rank: document.rank(),
            document,
        })
        .collect();
    // `sort_by_key` is stable
    ranked.sort_by_key(|r| (r.rank, Reverse(r.document.effective_date)));
    ranked
}

/// Serialize the documents in priority order into one delimited block.
pub fn build_context(documents: &[Document]) -> String {
    if documents.is_empty() {
        return NO_DOCUMENTS_PLACEHOLDER.to_string();
    }

    let blocks: Vec<String> = order_for_display(documents)
        .iter()
        .enumerate()
        .map(|(index, ranked)| render_document(index + 1, ranked))
        .collect();
    blocks.join("\n")
}

fn render_document(index: usize, ranked: &RankedDocument<'_>) -> String {
    let doc = ranked.document;
    let mut block = String::with_capacity(doc.content.len() + doc.name.len() + 160);
    // Writing into a String cannot fail
    let _ = write!(
        block,
        "\n<document index=\"{}\" priority_rank=\"{}\">\n<meta>\n  <title>{}</title>\n  <effective_date>{}</effective_date>\n</meta>\n<content>\n{}\n</content>\n</document>\n",
        index,
        ranked.rank,
        doc.name,
        doc.effective_date.format("%Y-%m-%d"),
        doc.content
    );
    block
}

/// Embed the document block into the instruction template.
pub fn build_system_prompt(documents: &[Document]) -> String {
    LEGAL_ASSISTANT_PROMPT.replacen(CONTEXT_PLACEHOLDER, &build_context(documents), 1)
}

/// Build the system prompt and the history to replay for one question.
pub fn assemble(documents: &[Document], history: &[Message]) -> AssembledPrompt {
    AssembledPrompt {
        system_prompt: build_system_prompt(documents),
        history: filter_history(history),
    }
}
