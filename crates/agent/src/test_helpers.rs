//! Shared test helpers for orchestrator tests.

use deskmate_core::error::ProviderError;
use deskmate_core::provider::{CompletionProvider, CompletionRequest, CompletionResponse};
use std::sync::Mutex;
use std::time::Duration;

/// What the scripted provider does on every call.
#[derive(Clone)]
pub enum Script {
    /// Answer with this text.
    Answer(String),
    /// Answer with the user prompt it received.
    Echo,
    /// Fail with this error.
    Fail(ProviderError),
}

/// A provider that follows a fixed script and records every request.
pub struct ScriptedProvider {
    script: Script,
    /// Calls whose prompt contains "slow" sleep this long first.
    slow_delay: Duration,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            slow_delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn answering(text: &str) -> Self {
        Self::new(Script::Answer(text.into()))
    }

    pub fn echo() -> Self {
        Self::new(Script::Echo)
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::new(Script::Fail(error))
    }

    pub fn with_slow_delay(mut self, delay: Duration) -> Self {
        self.slow_delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());

        if request.user_prompt.contains("slow") {
            tokio::time::sleep(self.slow_delay).await;
        }

        let content = match &self.script {
            Script::Answer(text) => text.clone(),
            Script::Echo => request.user_prompt,
            Script::Fail(error) => return Err(error.clone()),
        };

        Ok(CompletionResponse {
            content,
            model: "scripted-model".into(),
            usage: None,
        })
    }
}
