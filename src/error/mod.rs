use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Langbase error: {0}")]
    Langbase(#[from] LangbaseError),

    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),
}

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("Corrupt row for document {document_id}: {message}")]
    CorruptRow {
        document_id: String,
        message: String,
    },

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Langbase API errors
#[derive(Debug, Error)]
pub enum LangbaseError {
    #[error("Langbase unavailable: {message} (retries: {retries})")]
    Unavailable { message: String, retries: u32 },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("LANGBASE_API_KEY is not set; it is required to ask questions")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors raised while turning an uploaded file into text
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(
        "Unsupported file format: {name}. Use PDF, DOCX, DOC, Excel or plain text files"
    )]
    UnsupportedFormat { name: String },

    #[error("File {name} is empty or has no extractable text")]
    Empty { name: String },

    #[error("PDF extraction failed: {message}")]
    Pdf { message: String },

    #[error("OOXML extraction failed: {message}")]
    Ooxml { message: String },

    #[error("Legacy .doc not supported, convert it to .docx ({message})")]
    LegacyDoc { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons a question is refused before it reaches the model.
///
/// A refused question leaves the session untouched: no state change and no
/// message appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitRejection {
    #[error("Question is empty")]
    EmptyQuestion,

    #[error("No documents loaded; add at least one document before asking")]
    NoDocuments,

    #[error("A question is already being processed")]
    AlreadyProcessing,
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for Langbase operations
pub type LangbaseResult<T> = Result<T, LangbaseError>;

/// Result type alias for extraction
pub type ExtractResult<T> = Result<T, ExtractError>;
