//! In-memory working set of grounding documents.
//!
//! Document names are unique: [`DocumentRepository::upsert`] is the only way in,
//! and it replaces a same-named entry in place instead of adding a second one.
//! The raw order is newest insert first; display order is decided by
//! [`crate::context::order_for_display`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::rank::{classify, Rank};

/// A legal document extracted from an uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier; survives re-uploads under the same name.
    pub id: String,
    /// Display name, usually the original file name.
    pub name: String,
    /// Extracted text.
    pub content: String,
    /// Date the instrument takes effect.
    pub effective_date: NaiveDate,
    /// When this version was uploaded.
    pub uploaded_at: DateTime<Utc>,
}

impl Document {
    /// Create a new document with a fresh identifier.
    pub fn new(
        name: impl Into<String>,
        content: impl Into<String>,
        effective_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            content: content.into(),
            effective_date,
            uploaded_at: Utc::now(),
        }
    }

    /// Legal tier derived from the name.
    pub fn rank(&self) -> Rank {
        classify(&self.name)
    }
}

/// What an upsert did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new entry was added at the front.
    Inserted { id: String },
    /// An entry with the same name was replaced; its id was kept.
    Replaced { id: String },
}

impl UpsertOutcome {
    /// Identifier of the affected entry.
    pub fn id(&self) -> &str {
        match self {
            UpsertOutcome::Inserted { id } | UpsertOutcome::Replaced { id } => id,
        }
    }
}

/// Document set with upsert-by-name semantics.
#[derive(Debug, Clone, Default)]
pub struct DocumentRepository {
    documents: Vec<Document>,
}

impl DocumentRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a repository from persisted documents given in raw order.
    ///
    /// If the same name appears more than once the first (newest) entry wins.
    pub fn from_documents(documents: Vec<Document>) -> Self {
        let mut repository = Self::new();
        for doc in documents {
            if repository.find_by_name(&doc.name).is_some() {
                warn!(name = %doc.name, doc_id = %doc.id, "Dropping duplicate document name on load");
                continue;
            }
            repository.documents.push(doc);
        }
        repository
    }

    /// Insert a document, or replace the content and date of the same-named one.
    pub fn upsert(&mut self, doc: Document) -> UpsertOutcome {
        match self.documents.iter_mut().find(|d| d.name == doc.name) {
            Some(existing) => {
                existing.content = doc.content;
                existing.effective_date = doc.effective_date;
                existing.uploaded_at = Utc::now();
                debug!(doc_id = %existing.id, name = %existing.name, "Document replaced");
                UpsertOutcome::Replaced {
                    id: existing.id.clone(),
                }
            }
            None => {
                let id = doc.id.clone();
                debug!(doc_id = %id, name = %doc.name, "Document inserted");
                self.documents.insert(0, doc);
                UpsertOutcome::Inserted { id }
            }
        }
    }

    /// Remove a document by id. Unknown ids are ignored.
    pub fn remove(&mut self, id: &str) -> Option<Document> {
        let index = self.documents.iter().position(|d| d.id == id)?;
        let removed = self.documents.remove(index);
        debug!(doc_id = %removed.id, name = %removed.name, "Document removed");
        Some(removed)
    }

    /// All documents, newest insert first.
    pub fn list(&self) -> &[Document] {
        &self.documents
    }

    /// Look up a document by id.
    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    /// Look up a document by exact name.
    pub fn find_by_name(&self, name: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.name == name)
    }

    /// Number of documents held.
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use legal_qa::{Document, DocumentRepository};
    ///
    /// let mut repository = DocumentRepository::new();
    /// assert!(repository.is_empty());
    ///
    /// let date = NaiveDate::from_ymd_opt(2019, 6, 14).unwrap();
    /// repository.upsert(Document::new("Luật Giáo dục.pdf", "Điều 1", date));
    /// repository.upsert(Document::new("Luật Giáo dục.pdf", "Điều 2", date));
    /// assert_eq!(repository.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// True when no document has been added.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
