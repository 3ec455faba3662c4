//! Completion backends for Deskmate.
//!
//! [`ChatCompletionsProvider`] implements `deskmate_core::CompletionProvider`
//! against any OpenAI-compatible `/chat/completions` endpoint (Groq by default).
//! [`FallbackResponder`] produces the canned answer used when that call fails.

pub mod fallback;
pub mod openai_compat;

pub use fallback::FallbackResponder;
pub use openai_compat::ChatCompletionsProvider;
