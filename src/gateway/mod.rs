//! Uniform gateway over the model backends.
//!
//! Every backend is reduced to a single `complete(prompt) -> text` call (plus
//! a vision variant for the one backend that accepts images). The gateway
//! never panics and never retries: transport problems, non-2xx statuses, and
//! bodies missing the expected fields all come back as a typed
//! [`GatewayError`], and retry policy stays with the caller.

use std::error::Error as StdError;
use std::fmt;

use async_trait::async_trait;
use base64::Engine;

use crate::api::{
    ChatMessage, ChatRequest, ChatResponse, GenerateContent, GeneratePart, GenerateRequest,
    GenerateResponse, GenerationConfig,
};
use crate::config::{Config, GOOGLE_API_KEY_VAR, OPENROUTER_API_KEY_VAR};

const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// One interchangeable language-model provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    Gemini,
    OpenRouter,
    DeepSeek,
}

impl Backend {
    pub fn label(&self) -> &'static str {
        match self {
            Backend::Gemini => "Gemini",
            Backend::OpenRouter => "OpenRouter",
            Backend::DeepSeek => "DeepSeek",
        }
    }

    pub fn model_id(&self) -> &'static str {
        match self {
            Backend::Gemini => "gemini-2.0-flash",
            Backend::OpenRouter => "deepseek/deepseek-chat-v3-0324:free",
            Backend::DeepSeek => "deepseek/deepseek-r1:free",
        }
    }

    /// Only Gemini accepts image input.
    pub fn supports_vision(&self) -> bool {
        matches!(self, Backend::Gemini)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug)]
pub enum GatewayError {
    /// Network or HTTP-level failure talking to the provider.
    Transport(String),
    /// The provider answered, but the body lacked the expected fields.
    Malformed(String),
    /// The API key for this backend was never configured.
    MissingCredential(&'static str),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Transport(reason) => write!(f, "transport failure: {reason}"),
            GatewayError::Malformed(reason) => write!(f, "malformed response: {reason}"),
            GatewayError::MissingCredential(var) => {
                write!(f, "missing credential: {var} is not set")
            }
        }
    }
}

impl StdError for GatewayError {}

/// The single seam the pipeline sees. One outbound call per invocation.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn complete(&self, backend: Backend, prompt: &str) -> Result<String, GatewayError>;

    async fn complete_vision(
        &self,
        backend: Backend,
        image: &[u8],
        mime_type: &str,
        prompt: &str,
    ) -> Result<String, GatewayError>;
}

/// reqwest-backed gateway over the real providers.
pub struct HttpGateway {
    client: reqwest::Client,
    openrouter_base: String,
    gemini_base: String,
    google_api_key: Option<String>,
    openrouter_api_key: Option<String>,
}

impl HttpGateway {
    pub fn new(config: &Config) -> Self {
        // No request deadline: a hung backend holds its request open rather
        // than being silently abandoned. See DESIGN.md.
        Self {
            client: reqwest::Client::new(),
            openrouter_base: OPENROUTER_BASE_URL.to_string(),
            gemini_base: GEMINI_BASE_URL.to_string(),
            google_api_key: config.google_api_key.clone(),
            openrouter_api_key: config.openrouter_api_key.clone(),
        }
    }

    async fn openrouter_complete(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<String, GatewayError> {
        let api_key = self
            .openrouter_api_key
            .as_deref()
            .ok_or(GatewayError::MissingCredential(OPENROUTER_API_KEY_VAR))?;

        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![ChatMessage::user(prompt)],
        };

        let response = self
            .client
            .post(join_url(&self.openrouter_base, "chat/completions"))
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Transport(summarize_error_body(
                status.as_u16(),
                &body,
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;

        body.text()
            .map(|text| text.trim().to_string())
            .ok_or_else(|| GatewayError::Malformed("response carried no choices".to_string()))
    }

    async fn gemini_generate(&self, parts: Vec<GeneratePart>) -> Result<String, GatewayError> {
        let api_key = self
            .google_api_key
            .as_deref()
            .ok_or(GatewayError::MissingCredential(GOOGLE_API_KEY_VAR))?;

        let request = GenerateRequest {
            contents: vec![GenerateContent { parts }],
            generation_config: Some(GenerationConfig::default()),
        };

        let endpoint = format!("models/{}:generateContent", Backend::Gemini.model_id());
        let response = self
            .client
            .post(join_url(&self.gemini_base, &endpoint))
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Transport(summarize_error_body(
                status.as_u16(),
                &body,
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;

        body.text()
            .map(|text| text.trim().to_string())
            .ok_or_else(|| GatewayError::Malformed("response carried no candidates".to_string()))
    }
}

#[async_trait]
impl ModelGateway for HttpGateway {
    async fn complete(&self, backend: Backend, prompt: &str) -> Result<String, GatewayError> {
        tracing::debug!(backend = backend.label(), "gateway completion");
        match backend {
            Backend::Gemini => self.gemini_generate(vec![GeneratePart::text(prompt)]).await,
            Backend::OpenRouter | Backend::DeepSeek => {
                self.openrouter_complete(backend.model_id(), prompt).await
            }
        }
    }

    async fn complete_vision(
        &self,
        backend: Backend,
        image: &[u8],
        mime_type: &str,
        prompt: &str,
    ) -> Result<String, GatewayError> {
        if !backend.supports_vision() {
            return Err(GatewayError::Transport(format!(
                "{backend} does not accept image input"
            )));
        }
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        self.gemini_generate(vec![
            GeneratePart::inline_image(mime_type, encoded),
            GeneratePart::text(prompt),
        ])
        .await
    }
}

fn join_url(base: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

/// Collapse a provider error body to one line for the failure reason.
fn summarize_error_body(status: u16, body: &str) -> String {
    let summary = serde_json::from_str::<serde_json::Value>(body.trim())
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(|v| v.as_str())
                .map(str::to_owned)
                .or_else(|| {
                    value
                        .get("message")
                        .and_then(|v| v.as_str())
                        .map(str::to_owned)
                })
        });

    match summary {
        Some(message) => format!("HTTP {status}: {}", message.split_whitespace().collect::<Vec<_>>().join(" ")),
        None if body.trim().is_empty() => format!("HTTP {status}"),
        None => {
            let trimmed = body.trim();
            let mut snippet: String = trimmed.chars().take(200).collect();
            if snippet.len() < trimmed.len() {
                snippet.push('…');
            }
            format!("HTTP {status}: {snippet}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_handles_slashes() {
        assert_eq!(join_url("https://x.test/v1", "chat"), "https://x.test/v1/chat");
        assert_eq!(join_url("https://x.test/v1/", "/chat"), "https://x.test/v1/chat");
    }

    #[test]
    fn summarize_error_body_prefers_nested_message() {
        let body = r#"{"error":{"message":"model   overloaded"}}"#;
        assert_eq!(summarize_error_body(503, body), "HTTP 503: model overloaded");
    }

    #[test]
    fn summarize_error_body_falls_back_to_snippet() {
        assert_eq!(summarize_error_body(502, ""), "HTTP 502");
        assert_eq!(
            summarize_error_body(500, "upstream exploded"),
            "HTTP 500: upstream exploded"
        );
    }

    #[test]
    fn only_gemini_takes_images() {
        assert!(Backend::Gemini.supports_vision());
        assert!(!Backend::OpenRouter.supports_vision());
        assert!(!Backend::DeepSeek.supports_vision());
    }
}
