//! Context assembler and selection strategies.
//!
//! # Determinism
//!
//! Assembly is deterministic: identical inputs always produce identical
//! output. Documents keep the order they are given in (the store's
//! most-recent-first order) and are joined with a blank line.

use deskmate_config::ContextConfig;
use deskmate_core::knowledge::KnowledgeDocument;
use std::sync::Arc;

/// Placed between consecutive documents.
pub const DOCUMENT_SEPARATOR: &str = "\n\n";

/// Picks which documents go into the prompt, preserving input order.
pub trait SelectionStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn select<'a>(&self, documents: &'a [KnowledgeDocument]) -> Vec<&'a KnowledgeDocument>;
}

/// Include every document. Prompt size grows with the corpus.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullCorpus;

impl SelectionStrategy for FullCorpus {
    fn name(&self) -> &str {
        "full_corpus"
    }

    fn select<'a>(&self, documents: &'a [KnowledgeDocument]) -> Vec<&'a KnowledgeDocument> {
        documents.iter().collect()
    }
}

/// Take documents in order until the next one would push the assembled text
/// (separators included) past `max_chars` characters.
#[derive(Debug, Clone, Copy)]
pub struct CharacterBudget {
    pub max_chars: usize,
}

impl CharacterBudget {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }
}

impl SelectionStrategy for CharacterBudget {
    fn name(&self) -> &str {
        "character_budget"
    }

    fn select<'a>(&self, documents: &'a [KnowledgeDocument]) -> Vec<&'a KnowledgeDocument> {
        let separator_chars = DOCUMENT_SEPARATOR.chars().count();
        let mut used = 0usize;
        let mut selected = Vec::new();

        for doc in documents {
            let overhead = if selected.is_empty() { 0 } else { separator_chars };
            let cost = overhead + doc.content.chars().count();
            if used + cost > self.max_chars {
                break;
            }
            used += cost;
            selected.push(doc);
        }

        selected
    }
}

/// The joined context plus bookkeeping for logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledContext {
    pub text: String,
    pub included: usize,
    pub available: usize,
}

impl AssembledContext {
    pub fn dropped(&self) -> usize {
        self.available - self.included
    }
}

/// Joins selected document contents into one block.
#[derive(Clone)]
pub struct ContextAssembler {
    strategy: Arc<dyn SelectionStrategy>,
}

impl ContextAssembler {
    pub fn new(strategy: Arc<dyn SelectionStrategy>) -> Self {
        Self { strategy }
    }

    /// `CharacterBudget` when `[context] max_chars` is set, `FullCorpus` otherwise.
    pub fn from_config(config: &ContextConfig) -> Self {
        match config.max_chars {
            Some(max_chars) => Self::new(Arc::new(CharacterBudget::new(max_chars))),
            None => Self::default(),
        }
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    /// Assemble the context string for `documents`.
    pub fn assemble(&self, documents: &[KnowledgeDocument]) -> AssembledContext {
        let selected = self.strategy.select(documents);
        let text = selected
            .iter()
            .map(|d| d.content.as_str())
            .collect::<Vec<_>>()
            .join(DOCUMENT_SEPARATOR);

        AssembledContext {
            text,
            included: selected.len(),
            available: documents.len(),
        }
    }
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(Arc::new(FullCorpus))
    }
}

impl std::fmt::Debug for ContextAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextAssembler")
            .field("strategy", &self.strategy.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use deskmate_core::knowledge::FileType;

    fn doc(id: &str, content: &str) -> KnowledgeDocument {
        KnowledgeDocument {
            id: id.into(),
            filename: format!("{id}.txt"),
            content: content.into(),
            file_type: FileType::PlainText,
            file_size: None,
            uploaded_at: Utc::now(),
        }
    }

    #[test]
    fn empty_corpus_gives_empty_context() {
        let ctx = ContextAssembler::default().assemble(&[]);
        assert_eq!(ctx.text, "");
        assert_eq!(ctx.included, 0);
    }

    #[test]
    fn documents_joined_with_blank_line_in_order() {
        let docs = vec![doc("b", "Newest."), doc("a", "Oldest.")];
        let ctx = ContextAssembler::default().assemble(&docs);
        assert_eq!(ctx.text, "Newest.\n\nOldest.");
        assert_eq!(ctx.included, 2);
        assert_eq!(ctx.dropped(), 0);
    }

    #[test]
    fn length_is_sum_of_contents_plus_separators() {
        let docs = vec![
            doc("1", "alpha"),
            doc("2", ""),
            doc("3", "gamma ünïcode"),
            doc("4", "delta\n\nwith blank line"),
        ];
        let ctx = ContextAssembler::default().assemble(&docs);
        let content_len: usize = docs.iter().map(|d| d.content.len()).sum();
        let separators = DOCUMENT_SEPARATOR.len() * (docs.len() - 1);
        assert_eq!(ctx.text.len(), content_len + separators);
    }

    #[test]
    fn reordering_changes_order_not_content() {
        let docs = vec![doc("1", "one"), doc("2", "two"), doc("3", "three")];
        let mut reversed = docs.clone();
        reversed.reverse();

        let assembler = ContextAssembler::default();
        let forward = assembler.assemble(&docs).text;
        let backward = assembler.assemble(&reversed).text;

        assert_ne!(forward, backward);
        let mut f: Vec<_> = forward.split(DOCUMENT_SEPARATOR).collect();
        let mut b: Vec<_> = backward.split(DOCUMENT_SEPARATOR).collect();
        f.sort();
        b.sort();
        assert_eq!(f, b);
        assert_eq!(forward.len(), backward.len());
    }

    #[test]
    fn character_budget_stops_at_first_overflow() {
        let docs = vec![doc("1", "12345"), doc("2", "678"), doc("3", "9")];
        // 5 + 2 + 3 = 10 fits; adding "9" would need 13.
        let assembler = ContextAssembler::new(Arc::new(CharacterBudget::new(10)));
        let ctx = assembler.assemble(&docs);
        assert_eq!(ctx.text, "12345\n\n678");
        assert_eq!(ctx.included, 2);
        assert_eq!(ctx.dropped(), 1);
        assert!(ctx.text.chars().count() <= 10);
    }

    #[test]
    fn character_budget_too_small_for_first_document() {
        let docs = vec![doc("1", "too long for the budget")];
        let ctx = ContextAssembler::new(Arc::new(CharacterBudget::new(3))).assemble(&docs);
        assert_eq!(ctx.text, "");
        assert_eq!(ctx.included, 0);
    }

    #[test]
    fn from_config_picks_strategy() {
        assert_eq!(
            ContextAssembler::from_config(&ContextConfig::default()).strategy_name(),
            "full_corpus"
        );
        let bounded = ContextConfig {
            max_chars: Some(100),
        };
        assert_eq!(
            ContextAssembler::from_config(&bounded).strategy_name(),
            "character_budget"
        );
    }
}
