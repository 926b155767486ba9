//! Shared application state (§6.2): the store, the collaborators a manually
//! triggered invocation needs, and the admin API key the whole admin surface
//! is gated behind.

use std::sync::Arc;

use agent_transport::{AgentConfig, AgentTransport};
use market_data::MarketDataProvider;
use persistence::{ParticipantLocks, Store};
use types::ids::Symbol;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub locks: Arc<ParticipantLocks>,
    pub provider: Arc<dyn MarketDataProvider>,
    pub transport: Arc<dyn AgentTransport>,
    pub agent_config: AgentConfig,
    pub symbol_universe: Vec<Symbol>,
    pub admin_api_key: String,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn Store>,
        locks: Arc<ParticipantLocks>,
        provider: Arc<dyn MarketDataProvider>,
        transport: Arc<dyn AgentTransport>,
        agent_config: AgentConfig,
        symbol_universe: Vec<Symbol>,
        admin_api_key: String,
    ) -> Self {
        Self { store, locks, provider, transport, agent_config, symbol_universe, admin_api_key }
    }
}
