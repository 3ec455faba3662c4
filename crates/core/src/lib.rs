//! # Deskmate Core
//!
//! Domain types, traits, and error definitions for the Deskmate support-chat
//! backend. This crate has **no framework dependencies**: it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (completion provider, knowledge store, session
//! store) is a trait here. Implementations live in their respective crates,
//! are constructed once at process start, and are passed around as
//! `Arc<dyn Trait>` handles. Tests substitute in-memory or scripted versions.

pub mod error;
pub mod knowledge;
pub mod provider;
pub mod session;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ExtractionError, ProviderError, Result, StoreError};
pub use knowledge::{FileType, KnowledgeDocument, KnowledgeStore, NewKnowledgeDocument};
pub use provider::{
    CompletionProvider, CompletionRequest, CompletionResponse, CredentialStatus, Usage,
};
pub use session::{Exchange, Session, SessionStatus, SessionStore};
