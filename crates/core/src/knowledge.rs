//! Knowledge documents and the store that holds them.
//!
//! A knowledge document is reference text extracted from an upload. The
//! whole corpus is fed to the context assembler for every chat message.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::StoreError;

pub const PDF_MEDIA_TYPE: &str = "application/pdf";
pub const PLAIN_TEXT_MEDIA_TYPE: &str = "text/plain";
pub const WORD_DOCUMENT_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// The media types an upload may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    #[serde(rename = "application/pdf")]
    Pdf,
    #[serde(rename = "text/plain")]
    PlainText,
    #[serde(rename = "application/vnd.openxmlformats-officedocument.wordprocessingml.document")]
    WordDocument,
}

impl FileType {
    /// Parse a declared media type.
    ///
    /// Accepts the canonical MIME strings and a few short aliases. MIME
    /// parameters (`; charset=utf-8`) and case are ignored. Returns `None`
    /// for anything else.
    pub fn from_media_type(declared: &str) -> Option<Self> {
        let essence = declared
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            PDF_MEDIA_TYPE | "pdf" => Some(Self::Pdf),
            PLAIN_TEXT_MEDIA_TYPE | "text" | "txt" | "plain-text" => Some(Self::PlainText),
            WORD_DOCUMENT_MEDIA_TYPE | "docx" | "word-document" => Some(Self::WordDocument),
            _ => None,
        }
    }

    /// The canonical MIME string.
    pub fn media_type(&self) -> &'static str {
        match self {
            Self::Pdf => PDF_MEDIA_TYPE,
            Self::PlainText => PLAIN_TEXT_MEDIA_TYPE,
            Self::WordDocument => WORD_DOCUMENT_MEDIA_TYPE,
        }
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::PlainText => "plain-text",
            Self::WordDocument => "word-document",
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.media_type())
    }
}

/// A stored piece of reference text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeDocument {
    pub id: String,

    /// Original display name. Not unique, not used for lookup.
    pub filename: String,

    /// Extracted plain text. May be empty.
    pub content: String,

    pub file_type: FileType,

    /// Byte length of the original upload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,

    pub uploaded_at: DateTime<Utc>,
}

/// Fields supplied by the caller when inserting; the store assigns the rest.
#[derive(Debug, Clone)]
pub struct NewKnowledgeDocument {
    pub filename: String,
    pub content: String,
    pub file_type: FileType,
    pub file_size: Option<u64>,
}

/// Durable collection of knowledge documents.
///
/// Implementations: SQLite, in-memory (for tests and ephemeral servers).
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Assign an id and upload time, persist, and return the full record.
    async fn insert(&self, document: NewKnowledgeDocument)
    -> Result<KnowledgeDocument, StoreError>;

    /// All documents, most recently uploaded first.
    async fn list_all(&self) -> Result<Vec<KnowledgeDocument>, StoreError>;

    /// Fetch one document, or `NotFound`.
    async fn find_by_id(&self, id: &str) -> Result<KnowledgeDocument, StoreError>;

    /// Remove one document, or `NotFound` if it does not exist.
    async fn delete_by_id(&self, id: &str) -> Result<(), StoreError>;

    /// Number of stored documents.
    async fn count(&self) -> Result<usize, StoreError>;

    /// Reachability check for status reporting.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
