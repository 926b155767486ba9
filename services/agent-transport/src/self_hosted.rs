//! A self-hosted transport: a participant's agent runs behind its own HTTP
//! endpoint accepting `{system, user, config}` and returning
//! `{text, prompt_tokens, completion_tokens}` directly — no vendor-specific
//! request/response translation needed, since the operator of that endpoint
//! owns the translation to whatever model serves it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{AgentConfig, AgentTransport, LlmReply, TransportError};

#[derive(Serialize)]
struct SelfHostedRequest<'a> {
    system: &'a str,
    user: &'a str,
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct SelfHostedResponse {
    text: String,
    prompt_tokens: u32,
    completion_tokens: u32,
}

pub struct SelfHostedTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl SelfHostedTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), endpoint: endpoint.into() }
    }
}

#[async_trait]
impl AgentTransport for SelfHostedTransport {
    async fn invoke(&self, system: &str, user: &str, config: &AgentConfig) -> Result<LlmReply, TransportError> {
        let body = SelfHostedRequest {
            system,
            user,
            model: &config.model,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, endpoint = %self.endpoint, "self-hosted agent request failed");
                TransportError::Request(e.to_string())
            })?;

        let parsed = response
            .json::<SelfHostedResponse>()
            .await
            .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;

        Ok(LlmReply { text: parsed.text, prompt_tokens: parsed.prompt_tokens, completion_tokens: parsed.completion_tokens })
    }
}
