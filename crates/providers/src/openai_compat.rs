//! OpenAI-compatible chat completions provider.
//!
//! Works with Groq (the default), OpenAI, OpenRouter and any endpoint exposing
//! `POST {base_url}/chat/completions`. One request per call, no retries and
//! no streaming.

use std::time::Duration;

use async_trait::async_trait;
use deskmate_config::{PLACEHOLDER_API_KEY, ProviderConfig};
use deskmate_core::error::ProviderError;
use deskmate_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A provider speaking the OpenAI chat completions protocol.
pub struct ChatCompletionsProvider {
    name: String,
    base_url: String,
    api_key: Option<String>,
    credential_prefix: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
    client: reqwest::Client,
}

impl ChatCompletionsProvider {
    /// Create a provider with Groq's model defaults.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            credential_prefix: "gsk_".into(),
            model: "llama-3.3-70b-versatile".into(),
            temperature: 0.7,
            max_tokens: 1024,
            timeout: DEFAULT_TIMEOUT,
            client: reqwest::Client::new(),
        }
    }

    /// Create a Groq provider (convenience constructor).
    pub fn groq(api_key: Option<String>) -> Self {
        Self::new("groq", "https://api.groq.com/openai/v1", api_key)
    }

    /// Build from the `[provider]` config section.
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self::new(&config.name, &config.base_url, config.api_key.clone())
            .with_credential_prefix(&config.credential_prefix)
            .with_model(&config.model)
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens)
            .with_timeout(Duration::from_secs(config.timeout_secs))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Required key prefix. An empty prefix accepts any non-blank key.
    pub fn with_credential_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.credential_prefix = prefix.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Return the usable key, or the error explaining why there is none.
    fn credential(&self) -> std::result::Result<&str, ProviderError> {
        let key = match self.api_key.as_deref().map(str::trim) {
            Some(k) if !k.is_empty() && k != PLACEHOLDER_API_KEY => k,
            _ => {
                return Err(ProviderError::NotConfigured(format!(
                    "no API key set for provider '{}'",
                    self.name
                )));
            }
        };

        if !key.starts_with(&self.credential_prefix) {
            return Err(ProviderError::InvalidCredentialFormat(format!(
                "API key for '{}' must start with '{}'",
                self.name, self.credential_prefix
            )));
        }

        Ok(key)
    }

    fn request_body<'a>(&'a self, request: &'a CompletionRequest) -> ApiRequest<'a> {
        ApiRequest {
            model: &self.model,
            messages: vec![
                ApiMessage {
                    role: "system",
                    content: &request.system_instruction,
                },
                ApiMessage {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: 1.0,
            stream: false,
        }
    }

    async fn send(
        &self,
        api_key: &str,
        body: &ApiRequest<'_>,
    ) -> std::result::Result<CompletionResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 401 {
            return Err(ProviderError::Unauthorized(
                "provider rejected the API key".into(),
            ));
        }

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            return Err(ProviderError::RateLimited { retry_after_secs });
        }

        if !response.status().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::Api {
                status_code: status,
                body: error_body,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        parse_response(&text, &self.model)
    }
}

/// Pull the first choice's content out of a raw response body.
fn parse_response(
    text: &str,
    requested_model: &str,
) -> std::result::Result<CompletionResponse, ProviderError> {
    let api_response: ApiResponse = serde_json::from_str(text)
        .map_err(|e| ProviderError::MalformedResponse(format!("invalid JSON: {e}")))?;

    let content = api_response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| {
            ProviderError::MalformedResponse("no choices[0].message.content in response".into())
        })?;

    let usage = api_response.usage.map(|u| Usage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    Ok(CompletionResponse {
        content,
        model: api_response
            .model
            .unwrap_or_else(|| requested_model.to_string()),
        usage,
    })
}

#[async_trait]
impl CompletionProvider for ChatCompletionsProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, ProviderError> {
        let api_key = self.credential()?;
        let body = self.request_body(&request);

        debug!(provider = %self.name, model = %self.model, "Sending completion request");

        match tokio::time::timeout(self.timeout, self.send(api_key, &body)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.timeout.as_secs())),
        }
    }

    fn credential_status(&self) -> CredentialStatus {
        match self.credential() {
            Ok(_) => CredentialStatus::Configured,
            Err(ProviderError::InvalidCredentialFormat(_)) => CredentialStatus::InvalidFormat,
            Err(_) => CredentialStatus::NotConfigured,
        }
    }
}

// --- OpenAI wire types ---

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
    model: Option<String>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> CompletionRequest {
        CompletionRequest::new("You are helpful", "What are your hours?")
    }

    fn provider_for(server: &MockServer) -> ChatCompletionsProvider {
        ChatCompletionsProvider::new("groq", server.uri(), Some("gsk_test".into()))
    }

    fn ok_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "model": "llama-3.3-70b-versatile",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 5, "total_tokens": 17}
        })
    }

    #[test]
    fn groq_constructor() {
        let provider = ChatCompletionsProvider::groq(None);
        assert_eq!(provider.name(), "groq");
        assert!(provider.base_url.contains("api.groq.com"));
        assert_eq!(provider.model(), "llama-3.3-70b-versatile");
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let provider = ChatCompletionsProvider::new("x", "http://localhost:1/v1/", None);
        assert_eq!(provider.base_url, "http://localhost:1/v1");
    }

    #[test]
    fn credential_status_reflects_key() {
        let missing = ChatCompletionsProvider::groq(None);
        assert_eq!(missing.credential_status(), CredentialStatus::NotConfigured);

        let placeholder = ChatCompletionsProvider::groq(Some(PLACEHOLDER_API_KEY.into()));
        assert_eq!(placeholder.credential_status(), CredentialStatus::NotConfigured);

        let blank = ChatCompletionsProvider::groq(Some("   ".into()));
        assert_eq!(blank.credential_status(), CredentialStatus::NotConfigured);

        let wrong = ChatCompletionsProvider::groq(Some("sk-openai".into()));
        assert_eq!(wrong.credential_status(), CredentialStatus::InvalidFormat);

        let good = ChatCompletionsProvider::groq(Some("gsk_abc".into()));
        assert_eq!(good.credential_status(), CredentialStatus::Configured);

        let any = ChatCompletionsProvider::groq(Some("sk-openai".into())).with_credential_prefix("");
        assert_eq!(any.credential_status(), CredentialStatus::Configured);
    }

    #[test]
    fn parse_response_requires_content() {
        let err = parse_response(r#"{"choices":[]}"#, "m").unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));

        let err = parse_response(r#"{"choices":[{"message":{"role":"assistant"}}]}"#, "m")
            .unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));

        let err = parse_response("<html>bad gateway</html>", "m").unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[test]
    fn parse_response_falls_back_to_requested_model() {
        let resp = parse_response(r#"{"choices":[{"message":{"content":"hi"}}]}"#, "m1").unwrap();
        assert_eq!(resp.content, "hi");
        assert_eq!(resp.model, "m1");
        assert!(resp.usage.is_none());
    }

    #[tokio::test]
    async fn complete_sends_expected_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer gsk_test"))
            .and(body_partial_json(serde_json::json!({
                "model": "llama-3.3-70b-versatile",
                "max_tokens": 1024,
                "stream": false,
                "messages": [
                    {"role": "system", "content": "You are helpful"},
                    {"role": "user", "content": "What are your hours?"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("9 to 5.")))
            .expect(1)
            .mount(&server)
            .await;

        let resp = provider_for(&server).complete(request()).await.unwrap();
        assert_eq!(resp.content, "9 to 5.");
        assert_eq!(resp.model, "llama-3.3-70b-versatile");
        assert_eq!(resp.usage.unwrap().total_tokens, 17);
    }

    #[tokio::test]
    async fn missing_key_fails_without_network_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("x")))
            .expect(0)
            .mount(&server)
            .await;

        let provider = ChatCompletionsProvider::new("groq", server.uri(), None);
        let err = provider.complete(request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));

        let provider = ChatCompletionsProvider::new("groq", server.uri(), Some("sk-bad".into()));
        let err = provider.complete(request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidCredentialFormat(_)));
    }

    #[tokio::test]
    async fn unauthorized_maps_to_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let err = provider_for(&server).complete(request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn rate_limit_honours_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let err = provider_for(&server).complete(request()).await.unwrap_err();
        match err {
            ProviderError::RateLimited { retry_after_secs } => {
                assert_eq!(retry_after_secs, Some(7))
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_keeps_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = provider_for(&server).complete(request()).await.unwrap_err();
        match err {
            ProviderError::Api { status_code, body } => {
                assert_eq!(status_code, 503);
                assert_eq!(body, "overloaded");
            }
            other => panic!("expected Api, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_choices_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let err = provider_for(&server).complete(request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(ok_body("late"))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let provider = provider_for(&server).with_timeout(Duration::from_millis(200));
        let err = provider.complete(request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        // Port 9 (discard) on localhost is not expected to accept HTTP.
        let provider =
            ChatCompletionsProvider::new("groq", "http://127.0.0.1:9", Some("gsk_x".into()))
                .with_timeout(Duration::from_secs(5));
        let err = provider.complete(request()).await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Network(_) | ProviderError::Timeout(_)
        ));
    }

    #[test]
    fn from_config_applies_settings() {
        let config = ProviderConfig {
            model: "mixtral".into(),
            timeout_secs: 3,
            api_key: Some("gsk_cfg".into()),
            ..ProviderConfig::default()
        };
        let provider = ChatCompletionsProvider::from_config(&config);
        assert_eq!(provider.model(), "mixtral");
        assert_eq!(provider.timeout, Duration::from_secs(3));
        assert_eq!(provider.credential_status(), CredentialStatus::Configured);
    }
}
