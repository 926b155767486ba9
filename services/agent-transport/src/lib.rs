//! Agent-transport contract (C8): an abstract capability — given a system
//! prompt, a user payload, and per-participant config, produce a text reply
//! plus token counts. The core (agent-invoker) depends on this capability,
//! not on any specific vendor.
//!
//! Grounded on the original's `app/llm/base.py::BaseLLMClient` for the
//! `(text, prompt_tokens, completion_tokens)` return shape and its per-vendor
//! client split (`anthropic_client.py`, `openai_client.py`, ...), and on
//! teacher's `market-data/src/provider.rs::BinanceProvider` for the
//! reqwest-based HTTP transport idiom (a `reqwest::Client`, JSON response
//! structs, `tracing::warn!` on transport failure rather than panicking).

mod hosted;
mod self_hosted;

pub use hosted::HostedVendorTransport;
pub use self_hosted::SelfHostedTransport;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Per-participant knobs an agent's config JSON may carry (`llm_config` in
/// the original). Fields mirror `anthropic_client.py`'s `config.get(...)`
/// defaults.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 4096,
            temperature: 0.7,
            timeout: Duration::from_secs(60),
        }
    }
}

/// A successful agent call: the raw text reply plus token accounting for the
/// invocation record.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmReply {
    pub text: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Request(String),
    #[error("malformed response from provider: {0}")]
    MalformedResponse(String),
}

/// The capability C5 depends on. Implementations vary by vendor or by
/// self-hosted deployment; none of them are baked into the core.
#[async_trait]
pub trait AgentTransport: Send + Sync {
    async fn invoke(&self, system: &str, user: &str, config: &AgentConfig) -> Result<LlmReply, TransportError>;
}

/// Wrap any transport with the §5 suspension-point timeout: agent calls are
/// the one unbounded-latency external dependency the scheduler's decision
/// tick has, so every call through this contract is wall-clock bounded.
pub async fn invoke_with_timeout(
    transport: &dyn AgentTransport,
    system: &str,
    user: &str,
    config: &AgentConfig,
) -> Result<LlmReply, TransportError> {
    match tokio::time::timeout(config.timeout, transport.invoke(system, user, config)).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout(config.timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct SlowTransport(Duration);

    #[async_trait]
    impl AgentTransport for SlowTransport {
        async fn invoke(&self, _system: &str, _user: &str, _config: &AgentConfig) -> Result<LlmReply, TransportError> {
            tokio::time::sleep(self.0).await;
            Ok(LlmReply { text: "late".into(), prompt_tokens: 0, completion_tokens: 0 })
        }
    }

    struct CountingTransport(Arc<AtomicUsize>);

    #[async_trait]
    impl AgentTransport for CountingTransport {
        async fn invoke(&self, _system: &str, _user: &str, _config: &AgentConfig) -> Result<LlmReply, TransportError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(LlmReply { text: "{}".into(), prompt_tokens: 10, completion_tokens: 5 })
        }
    }

    #[tokio::test]
    async fn timeout_fires_when_the_transport_exceeds_the_configured_budget() {
        let transport = SlowTransport(Duration::from_millis(50));
        let config = AgentConfig { timeout: Duration::from_millis(5), ..Default::default() };
        let result = invoke_with_timeout(&transport, "sys", "user", &config).await;
        assert!(matches!(result, Err(TransportError::Timeout(_))));
    }

    #[tokio::test]
    async fn a_fast_transport_completes_within_budget() {
        let calls = Arc::new(AtomicUsize::new(0));
        let transport = CountingTransport(calls.clone());
        let config = AgentConfig::default();
        let reply = invoke_with_timeout(&transport, "sys", "user", &config).await.unwrap();
        assert_eq!(reply.prompt_tokens, 10);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
