//! A hosted-vendor transport speaking the Anthropic Messages API, grounded
//! on `anthropic_client.py`'s request/response shape.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{AgentConfig, AgentTransport, LlmReply, TransportError};

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

/// A vendor REST endpoint reached over plain JSON-over-HTTPS, authenticated
/// with a bearer-style header. One `HostedVendorTransport` per participant's
/// configured provider; `base_url`/`auth_header` let the same struct serve
/// both Anthropic-compatible and OpenAI-compatible endpoints, since both
/// vendors accept a bearer API key and return an analogous usage block.
pub struct HostedVendorTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    auth_header: &'static str,
}

impl HostedVendorTransport {
    pub fn anthropic(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "https://api.anthropic.com/v1/messages".to_string(),
            api_key: api_key.into(),
            auth_header: "x-api-key",
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl AgentTransport for HostedVendorTransport {
    async fn invoke(&self, system: &str, user: &str, config: &AgentConfig) -> Result<LlmReply, TransportError> {
        let body = MessagesRequest {
            model: &config.model,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            system,
            messages: vec![Message { role: "user", content: user }],
        };

        let response = self
            .client
            .post(&self.base_url)
            .header(self.auth_header, &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "agent transport request failed");
                TransportError::Request(e.to_string())
            })?;

        let parsed = response
            .json::<MessagesResponse>()
            .await
            .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;

        let text = parsed
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| TransportError::MalformedResponse("no text content block in reply".to_string()))?;

        Ok(LlmReply { text, prompt_tokens: parsed.usage.input_tokens, completion_tokens: parsed.usage.output_tokens })
    }
}
