//! Storage backends for knowledge documents and chat sessions.
//!
//! Both stores are built once at startup by [`open`] and handed out as
//! `Arc<dyn Trait>` handles.

pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::sync::Arc;

use deskmate_config::StorageConfig;
use deskmate_core::{KnowledgeStore, SessionStore, StoreError};
use tracing::info;

pub use in_memory::{InMemoryKnowledgeStore, InMemorySessionStore};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// The pair of store handles shared by the orchestrator and HTTP handlers.
#[derive(Clone)]
pub struct Stores {
    pub knowledge: Arc<dyn KnowledgeStore>,
    pub sessions: Arc<dyn SessionStore>,
}

impl Stores {
    /// Fresh in-memory stores.
    pub fn in_memory() -> Self {
        Self {
            knowledge: Arc::new(InMemoryKnowledgeStore::new()),
            sessions: Arc::new(InMemorySessionStore::new()),
        }
    }
}

/// Build the stores selected by `[storage] backend`.
pub async fn open(config: &StorageConfig) -> Result<Stores, StoreError> {
    match config.backend.as_str() {
        "memory" => {
            info!("Using in-memory storage; data is lost on exit");
            Ok(Stores::in_memory())
        }
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let path = config.database_path();
            if let Some(parent) = std::path::Path::new(&path).parent() {
                if !parent.as_os_str().is_empty() && path != ":memory:" {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        StoreError::Unavailable(format!(
                            "cannot create {}: {e}",
                            parent.display()
                        ))
                    })?;
                }
            }
            let store = Arc::new(SqliteStore::new(&path).await?);
            Ok(Stores {
                knowledge: store.clone(),
                sessions: store,
            })
        }
        other => Err(StoreError::Unavailable(format!(
            "unknown storage backend \"{other}\""
        ))),
    }
}
