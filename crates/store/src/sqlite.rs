//! SQLite backend for knowledge documents and sessions.
//!
//! One database file, three tables:
//! - `knowledge_documents`: extracted upload text
//! - `sessions`: one row per conversation
//! - `session_messages`: the exchange log, ordered by `seq` within a session
//!
//! Timestamps are stored as RFC 3339 text with microsecond precision so that
//! lexical order matches chronological order.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use deskmate_core::error::StoreError;
use deskmate_core::knowledge::{FileType, KnowledgeDocument, KnowledgeStore, NewKnowledgeDocument};
use deskmate_core::session::{Exchange, Session, SessionStatus, SessionStore};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

/// A SQLite store implementing both [`KnowledgeStore`] and [`SessionStore`].
pub struct SqliteStore {
    pool: SqlitePool,
}

fn unavailable(context: &str, e: sqlx::Error) -> StoreError {
    StoreError::Unavailable(format!("{context}: {e}"))
}

fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(column: &str, value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Unavailable(format!("corrupt {column} value '{value}': {e}")))
}

impl SqliteStore {
    /// Open (or create) a SQLite database at `path`.
    ///
    /// Pass `":memory:"` for an in-process ephemeral database (useful for tests).
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| unavailable("invalid SQLite path", e))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        // An in-memory database lives only as long as its connection, so keep
        // exactly one open for the life of the pool.
        let pool_options = if path == ":memory:" || path == "sqlite::memory:" {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(4)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| unavailable("failed to open SQLite", e))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS knowledge_documents (
                iid          INTEGER PRIMARY KEY AUTOINCREMENT,
                id           TEXT UNIQUE NOT NULL,
                filename     TEXT NOT NULL,
                content      TEXT NOT NULL,
                file_type    TEXT NOT NULL,
                file_size    INTEGER,
                uploaded_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| unavailable("knowledge_documents table", e))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_knowledge_uploaded_at \
             ON knowledge_documents(uploaded_at DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| unavailable("uploaded_at index", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL,
                started_at  TEXT NOT NULL,
                status      TEXT NOT NULL DEFAULT 'active'
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| unavailable("sessions table", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS session_messages (
                session_id    TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
                seq           INTEGER NOT NULL,
                user_message  TEXT NOT NULL,
                ai_response   TEXT NOT NULL,
                timestamp     TEXT NOT NULL,
                PRIMARY KEY (session_id, seq)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| unavailable("session_messages table", e))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Result<KnowledgeDocument, StoreError> {
        let file_type_str: String = row
            .try_get("file_type")
            .map_err(|e| unavailable("file_type column", e))?;
        let file_type = FileType::from_media_type(&file_type_str).ok_or_else(|| {
            StoreError::Unavailable(format!("corrupt file_type value '{file_type_str}'"))
        })?;
        let file_size: Option<i64> = row
            .try_get("file_size")
            .map_err(|e| unavailable("file_size column", e))?;
        let uploaded_at: String = row
            .try_get("uploaded_at")
            .map_err(|e| unavailable("uploaded_at column", e))?;

        Ok(KnowledgeDocument {
            id: row.try_get("id").map_err(|e| unavailable("id column", e))?,
            filename: row
                .try_get("filename")
                .map_err(|e| unavailable("filename column", e))?,
            content: row
                .try_get("content")
                .map_err(|e| unavailable("content column", e))?,
            file_type,
            file_size: file_size.map(|s| s.max(0) as u64),
            uploaded_at: parse_ts("uploaded_at", &uploaded_at)?,
        })
    }

    fn row_to_exchange(row: &sqlx::sqlite::SqliteRow) -> Result<Exchange, StoreError> {
        let timestamp: String = row
            .try_get("timestamp")
            .map_err(|e| unavailable("timestamp column", e))?;

        Ok(Exchange {
            user_message: row
                .try_get("user_message")
                .map_err(|e| unavailable("user_message column", e))?,
            ai_response: row
                .try_get("ai_response")
                .map_err(|e| unavailable("ai_response column", e))?,
            timestamp: parse_ts("timestamp", &timestamp)?,
        })
    }
}

#[async_trait]
impl KnowledgeStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn insert(&self, document: NewKnowledgeDocument) -> Result<KnowledgeDocument, StoreError> {
        let stored = KnowledgeDocument {
            id: Uuid::new_v4().to_string(),
            filename: document.filename,
            content: document.content,
            file_type: document.file_type,
            file_size: document.file_size,
            uploaded_at: now(),
        };

        sqlx::query(
            "INSERT INTO knowledge_documents (id, filename, content, file_type, file_size, uploaded_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&stored.id)
        .bind(&stored.filename)
        .bind(&stored.content)
        .bind(stored.file_type.media_type())
        .bind(stored.file_size.map(|s| s as i64))
        .bind(format_ts(&stored.uploaded_at))
        .execute(&self.pool)
        .await
        .map_err(|e| unavailable("insert knowledge document", e))?;

        debug!(id = %stored.id, filename = %stored.filename, "Stored knowledge document");
        Ok(stored)
    }

    async fn list_all(&self) -> Result<Vec<KnowledgeDocument>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, filename, content, file_type, file_size, uploaded_at \
             FROM knowledge_documents ORDER BY uploaded_at DESC, iid DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| unavailable("list knowledge documents", e))?;

        rows.iter().map(Self::row_to_document).collect()
    }

    async fn find_by_id(&self, id: &str) -> Result<KnowledgeDocument, StoreError> {
        let row = sqlx::query(
            "SELECT id, filename, content, file_type, file_size, uploaded_at \
             FROM knowledge_documents WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| unavailable("find knowledge document", e))?;

        match row {
            Some(row) => Self::row_to_document(&row),
            None => Err(StoreError::knowledge_not_found(id)),
        }
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM knowledge_documents WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| unavailable("delete knowledge document", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::knowledge_not_found(id));
        }
        Ok(())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM knowledge_documents")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| unavailable("count knowledge documents", e))?;
        let n: i64 = row.try_get("n").map_err(|e| unavailable("count column", e))?;
        Ok(n.max(0) as usize)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| unavailable("ping", e))?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn create(&self, user_id: Option<&str>) -> Result<Session, StoreError> {
        let mut session = Session::new(user_id);
        session.started_at = session.started_at.trunc_subsecs(6);

        sqlx::query("INSERT INTO sessions (id, user_id, started_at, status) VALUES (?1, ?2, ?3, ?4)")
            .bind(&session.id)
            .bind(&session.user_id)
            .bind(format_ts(&session.started_at))
            .bind(session.status.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| unavailable("insert session", e))?;

        debug!(session_id = %session.id, user_id = %session.user_id, "Created session");
        Ok(session)
    }

    async fn find_by_id(&self, id: &str) -> Result<Session, StoreError> {
        let row = sqlx::query("SELECT id, user_id, started_at, status FROM sessions WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| unavailable("find session", e))?
            .ok_or_else(|| StoreError::session_not_found(id))?;

        let started_at: String = row
            .try_get("started_at")
            .map_err(|e| unavailable("started_at column", e))?;
        let status: String = row
            .try_get("status")
            .map_err(|e| unavailable("status column", e))?;

        let messages = sqlx::query(
            "SELECT user_message, ai_response, timestamp FROM session_messages \
             WHERE session_id = ?1 ORDER BY seq ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| unavailable("load session messages", e))?
        .iter()
        .map(Self::row_to_exchange)
        .collect::<Result<Vec<_>, _>>()?;

        Ok(Session {
            id: row.try_get("id").map_err(|e| unavailable("id column", e))?,
            user_id: row
                .try_get("user_id")
                .map_err(|e| unavailable("user_id column", e))?,
            started_at: parse_ts("started_at", &started_at)?,
            messages,
            status: SessionStatus::parse(&status).unwrap_or_default(),
        })
    }

    async fn append_exchange(
        &self,
        session_id: &str,
        user_message: &str,
        ai_response: &str,
    ) -> Result<Exchange, StoreError> {
        let exchange = Exchange {
            user_message: user_message.to_string(),
            ai_response: ai_response.to_string(),
            timestamp: now(),
        };

        // Single statement: the existence check and the next sequence number
        // are computed in the same write as the insert.
        let result = sqlx::query(
            r#"
            INSERT INTO session_messages (session_id, seq, user_message, ai_response, timestamp)
            SELECT id,
                   (SELECT COALESCE(MAX(seq), -1) + 1 FROM session_messages WHERE session_id = ?1),
                   ?2, ?3, ?4
            FROM sessions WHERE id = ?1
            "#,
        )
        .bind(session_id)
        .bind(&exchange.user_message)
        .bind(&exchange.ai_response)
        .bind(format_ts(&exchange.timestamp))
        .execute(&self.pool)
        .await
        .map_err(|e| unavailable("append exchange", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::session_not_found(session_id));
        }
        Ok(exchange)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        KnowledgeStore::ping(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskmate_core::session::ANONYMOUS_USER;
    use std::sync::Arc;

    async fn test_store() -> SqliteStore {
        SqliteStore::new(":memory:").await.unwrap()
    }

    fn doc(filename: &str, content: &str, file_type: FileType) -> NewKnowledgeDocument {
        NewKnowledgeDocument {
            filename: filename.into(),
            content: content.into(),
            file_type,
            file_size: Some(content.len() as u64),
        }
    }

    #[tokio::test]
    async fn insert_and_find_round_trip() {
        let store = test_store().await;
        let stored = store
            .insert(doc("manual.docx", "Press the red button.", FileType::WordDocument))
            .await
            .unwrap();

        let found = KnowledgeStore::find_by_id(&store, &stored.id).await.unwrap();
        assert_eq!(found, stored);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn empty_content_and_missing_size_allowed() {
        let store = test_store().await;
        let stored = store
            .insert(NewKnowledgeDocument {
                filename: "blank.pdf".into(),
                content: String::new(),
                file_type: FileType::Pdf,
                file_size: None,
            })
            .await
            .unwrap();

        let found = KnowledgeStore::find_by_id(&store, &stored.id).await.unwrap();
        assert_eq!(found.content, "");
        assert_eq!(found.file_size, None);
        assert_eq!(found.file_type, FileType::Pdf);
    }

    #[tokio::test]
    async fn list_all_newest_first() {
        let store = test_store().await;
        let a = store.insert(doc("a.txt", "first", FileType::PlainText)).await.unwrap();
        let b = store.insert(doc("b.txt", "second", FileType::PlainText)).await.unwrap();
        let c = store.insert(doc("a.txt", "dup", FileType::PlainText)).await.unwrap();

        let ids: Vec<_> = store.list_all().await.unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![c.id, b.id, a.id]);
    }

    #[tokio::test]
    async fn delete_then_delete_again() {
        let store = test_store().await;
        let stored = store.insert(doc("a.txt", "x", FileType::PlainText)).await.unwrap();

        store.delete_by_id(&stored.id).await.unwrap();
        assert!(store.delete_by_id(&stored.id).await.unwrap_err().is_not_found());
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn session_lifecycle() {
        let store = test_store().await;
        let session = store.create(None).await.unwrap();
        assert_eq!(session.user_id, ANONYMOUS_USER);

        store.append_exchange(&session.id, "q1", "a1").await.unwrap();
        store.append_exchange(&session.id, "q2", "a2").await.unwrap();

        let found = SessionStore::find_by_id(&store, &session.id).await.unwrap();
        assert_eq!(found.started_at, session.started_at);
        assert_eq!(found.status, SessionStatus::Active);
        assert_eq!(found.messages.len(), 2);
        assert_eq!(found.messages[0].user_message, "q1");
        assert_eq!(found.messages[1].ai_response, "a2");
    }

    #[tokio::test]
    async fn append_to_missing_session_is_not_found() {
        let store = test_store().await;
        let err = store.append_exchange("missing", "q", "a").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(
            SessionStore::find_by_id(&store, "missing")
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn concurrent_appends_keep_every_entry() {
        let store = Arc::new(test_store().await);
        let session = store.create(Some("u1")).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..10 {
            let store = store.clone();
            let id = session.id.clone();
            handles.push(tokio::spawn(async move {
                store.append_exchange(&id, &format!("q{i}"), "a").await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let found = SessionStore::find_by_id(store.as_ref(), &session.id).await.unwrap();
        assert_eq!(found.messages.len(), 10);
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deskmate.db");
        let path = path.to_str().unwrap();

        let session_id = {
            let store = SqliteStore::new(path).await.unwrap();
            store.insert(doc("faq.txt", "Hours: 9-5", FileType::PlainText)).await.unwrap();
            let session = store.create(Some("u1")).await.unwrap();
            store.append_exchange(&session.id, "hours?", "9-5").await.unwrap();
            session.id
        };

        let store = SqliteStore::new(path).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        let session = SessionStore::find_by_id(&store, &session_id).await.unwrap();
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.user_id, "u1");
    }

    #[tokio::test]
    async fn ping_succeeds() {
        let store = test_store().await;
        KnowledgeStore::ping(&store).await.unwrap();
        SessionStore::ping(&store).await.unwrap();
    }
}
