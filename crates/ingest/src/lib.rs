//! Knowledge ingestion: size guard, text extraction, and storage of uploads.

pub mod extract;

use std::sync::Arc;

use deskmate_core::error::{Error, ExtractionError, Result};
use deskmate_core::knowledge::{FileType, KnowledgeDocument, KnowledgeStore, NewKnowledgeDocument};
use tracing::{info, warn};

pub use extract::DocumentExtractor;

/// One uploaded file as received from the client.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    /// Media type or short alias; see [`FileType::from_media_type`].
    pub declared_type: String,
    pub bytes: Vec<u8>,
}

/// Turns uploads into stored knowledge documents.
pub struct KnowledgeIngestor {
    store: Arc<dyn KnowledgeStore>,
    extractor: DocumentExtractor,
    max_upload_bytes: usize,
}

impl KnowledgeIngestor {
    pub fn new(store: Arc<dyn KnowledgeStore>, max_upload_bytes: usize) -> Self {
        Self {
            store,
            extractor: DocumentExtractor::new(),
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Validate, extract, and persist one upload.
    ///
    /// Nothing is stored unless extraction succeeds.
    pub async fn ingest(&self, upload: Upload) -> Result<KnowledgeDocument> {
        let filename = upload.filename.trim();
        if filename.is_empty() {
            return Err(Error::InvalidRequest("filename is required".into()));
        }

        let size = upload.bytes.len();
        if size > self.max_upload_bytes {
            warn!(filename, size, limit = self.max_upload_bytes, "Rejected oversized upload");
            return Err(Error::PayloadTooLarge {
                size,
                limit: self.max_upload_bytes,
            });
        }

        let file_type = FileType::from_media_type(&upload.declared_type)
            .ok_or_else(|| ExtractionError::UnsupportedFormat(upload.declared_type.clone()))?;

        let content = self.extractor.extract(upload.bytes, file_type).await?;

        let stored = self
            .store
            .insert(NewKnowledgeDocument {
                filename: filename.to_string(),
                content,
                file_type,
                file_size: Some(size as u64),
            })
            .await?;

        info!(
            id = %stored.id,
            filename = %stored.filename,
            file_type = file_type.label(),
            chars = stored.content.len(),
            "Ingested knowledge document"
        );
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskmate_store::InMemoryKnowledgeStore;

    fn ingestor(limit: usize) -> (KnowledgeIngestor, Arc<InMemoryKnowledgeStore>) {
        let store = Arc::new(InMemoryKnowledgeStore::new());
        (KnowledgeIngestor::new(store.clone(), limit), store)
    }

    fn upload(filename: &str, declared_type: &str, bytes: &[u8]) -> Upload {
        Upload {
            filename: filename.into(),
            declared_type: declared_type.into(),
            bytes: bytes.to_vec(),
        }
    }

    #[tokio::test]
    async fn plain_text_upload_is_stored() {
        let (ingestor, store) = ingestor(1024);
        let doc = ingestor
            .ingest(upload("faq.txt", "text/plain", b"We ship worldwide."))
            .await
            .unwrap();

        assert_eq!(doc.content, "We ship worldwide.");
        assert_eq!(doc.file_type, FileType::PlainText);
        assert_eq!(doc.file_size, Some(18));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn docx_upload_is_stored() {
        let (ingestor, _) = ingestor(1024 * 1024);
        let bytes = extract::tests::docx_with_body(r#"<w:p><w:r><w:t>Hello docx</w:t></w:r></w:p>"#);
        let doc = ingestor
            .ingest(upload("guide.docx", "docx", &bytes))
            .await
            .unwrap();
        assert_eq!(doc.content, "Hello docx");
        assert_eq!(doc.file_type, FileType::WordDocument);
    }

    #[tokio::test]
    async fn oversized_upload_rejected_before_extraction() {
        let (ingestor, store) = ingestor(4);
        // Not a valid type either; the size check must win.
        let err = ingestor
            .ingest(upload("big.bin", "application/octet-stream", b"12345"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PayloadTooLarge { size: 5, limit: 4 }));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unsupported_type_stores_nothing() {
        let (ingestor, store) = ingestor(1024);
        let err = ingestor
            .ingest(upload("sheet.csv", "text/csv", b"a,b"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Extraction(ExtractionError::UnsupportedFormat(_))
        ));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_extraction_stores_nothing() {
        let (ingestor, store) = ingestor(1024);
        let err = ingestor
            .ingest(upload("broken.pdf", "application/pdf", b"%PDF-garbage"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Extraction(ExtractionError::ExtractionFailed { .. })
        ));
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_filename_is_invalid() {
        let (ingestor, _) = ingestor(1024);
        let err = ingestor
            .ingest(upload("  ", "text/plain", b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }
}
