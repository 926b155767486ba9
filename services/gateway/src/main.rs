mod auth;
mod error;
mod handlers;
mod models;
mod router;
mod seed;
mod state;

use std::sync::Arc;
use std::time::Duration;

use agent_transport::{AgentConfig, AgentTransport, HostedVendorTransport};
use market_data::{BinanceProvider, MarketDataProvider};
use persistence::{InMemoryStore, ParticipantLocks, PgStore, Store};
use router::create_router;
use scheduler::{Scheduler, SchedulerConfig};
use state::AppState;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Build the [`Store`] from `DATABASE_URL`: a real Postgres pool when the
/// variable is set, otherwise the zero-configuration in-process store,
/// matching the sim-runner's own quick-start fallback.
async fn build_store() -> anyhow::Result<Arc<dyn Store>> {
    match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new().max_connections(10).connect(&url).await?;
            sqlx::migrate!("../persistence/migrations").run(&pool).await?;
            tracing::info!("connected to Postgres");
            Ok(Arc::new(PgStore::new(pool)))
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set, falling back to the in-memory store");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}

fn build_transport() -> Arc<dyn AgentTransport> {
    match std::env::var("ANTHROPIC_API_KEY") {
        Ok(key) => Arc::new(HostedVendorTransport::anthropic(key)),
        Err(_) => {
            let self_hosted_url = std::env::var("SELF_HOSTED_AGENT_URL").unwrap_or_else(|_| "http://localhost:11434".to_string());
            tracing::warn!(url = %self_hosted_url, "ANTHROPIC_API_KEY not set, falling back to a self-hosted agent endpoint");
            Arc::new(agent_transport::SelfHostedTransport::new(self_hosted_url))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    tracing::info!("starting the CFD arena simulation gateway");

    let store = build_store().await?;
    let locks = Arc::new(ParticipantLocks::new());
    let provider: Arc<dyn MarketDataProvider> = Arc::new(BinanceProvider::default());
    let transport = build_transport();
    let agent_config = AgentConfig::default();
    let symbol_universe = agent_invoker::default_symbol_universe();
    let admin_api_key = std::env::var("ADMIN_API_KEY").unwrap_or_else(|_| "development-admin-key".to_string());

    let state = AppState::new(
        store.clone(),
        locks.clone(),
        provider.clone(),
        transport.clone(),
        agent_config.clone(),
        symbol_universe.clone(),
        admin_api_key,
    );

    let scheduler_config = SchedulerConfig {
        mark_to_market_interval: Duration::from_secs(
            std::env::var("MARK_TO_MARKET_INTERVAL_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(60),
        ),
        max_concurrent_decisions: std::env::var("MAX_CONCURRENT_INVOCATIONS").ok().and_then(|v| v.parse().ok()).unwrap_or(8),
    };
    let scheduler = Arc::new(Scheduler::with_locks(store, locks, provider, transport, agent_config, symbol_universe, scheduler_config));
    tokio::spawn(scheduler.run_forever());

    let app = create_router(state);

    let port: u16 = std::env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(%addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
