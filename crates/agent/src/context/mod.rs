//! Knowledge context assembly.
//!
//! Turns the stored knowledge corpus into one prompt-ready text block. Which
//! documents make it in is decided by a [`SelectionStrategy`]; the default
//! includes every document.

pub mod assembler;

pub use assembler::{
    AssembledContext, CharacterBudget, ContextAssembler, FullCorpus, SelectionStrategy,
    DOCUMENT_SEPARATOR,
};
