//! Chat orchestration for Deskmate.
//!
//! Each incoming message runs one linear pipeline:
//!
//! 1. **Validate** the session id and message
//! 2. **Assemble context** from the stored knowledge corpus
//! 3. **Complete** via the configured provider
//! 4. **Fall back** to a canned answer if the provider fails for any reason
//! 5. **Persist** the exchange on the session
//!
//! Provider failures never reach the caller; they are logged and counted per
//! failure kind instead.

pub mod context;
pub mod metrics;
pub mod orchestrator;
pub mod prompt;
pub mod session_locks;

#[cfg(test)]
mod test_helpers;

pub use context::{
    AssembledContext, CharacterBudget, ContextAssembler, FullCorpus, SelectionStrategy,
};
pub use metrics::{FallbackCounts, OutcomeMetrics, OutcomeSnapshot};
pub use orchestrator::{AnswerSource, ChatOrchestrator, ChatReply};
pub use prompt::{SYSTEM_INSTRUCTION, compose_user_prompt};
pub use session_locks::SessionLocks;
