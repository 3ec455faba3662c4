//! Fallback responder: canned answers used when the completion provider fails.
//!
//! Picks one of a fixed set of templates uniformly at random and embeds the
//! customer's message verbatim. Never fails and performs no I/O.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

const TEMPLATES: [(&str, &str); 5] = [
    (
        "I understand you're asking about \"",
        "\". Based on our documentation, I'd be happy to help you with this.",
    ),
    (
        "Thank you for your question about \"",
        "\". Our team is here to assist you with this matter.",
    ),
    (
        "I see you need help with \"",
        "\". Let me provide you with the best information we have available.",
    ),
    (
        "That's a great question about \"",
        "\". Based on our resources, here's what I can tell you...",
    ),
    (
        "I appreciate you reaching out about \"",
        "\". Let me guide you through the solution.",
    ),
];

/// Substitute answer generator with an injectable random source.
pub struct FallbackResponder {
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl FallbackResponder {
    /// Responder seeded from the operating system.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Deterministic responder; the same seed yields the same template sequence.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(rng: impl RngCore + Send + 'static) -> Self {
        Self {
            rng: Mutex::new(Box::new(rng)),
        }
    }

    /// Seeded when `seed` is set, OS-random otherwise.
    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::new, Self::seeded)
    }

    /// Number of distinct templates.
    pub fn template_count() -> usize {
        TEMPLATES.len()
    }

    /// Produce a substitute answer quoting `user_message`.
    pub fn respond(&self, user_message: &str) -> String {
        let index = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            rng.random_range(0..TEMPLATES.len())
        };
        render(index, user_message)
    }
}

impl Default for FallbackResponder {
    fn default() -> Self {
        Self::new()
    }
}

fn render(index: usize, user_message: &str) -> String {
    let (prefix, suffix) = TEMPLATES[index];
    format!("{prefix}{user_message}{suffix}")
}
