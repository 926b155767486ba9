//! Headless orchestration binary for quick local runs and demos.
//!
//! Unlike the gateway (a long-running server exposing the HTTP surface over
//! a persisted store), this binary seeds a disposable in-memory competition,
//! drives the scheduler's two clocks for a bounded number of decision ticks,
//! and prints a profitability report to stdout — the same shape of exercise
//! the teacher's own simulation tooling ran against the order book, adapted
//! here to the CFD arena's accounting instead of matching and fees.

mod report;
mod synthetic;

use std::sync::Arc;
use std::time::Duration;

use agent_transport::{AgentConfig, AgentTransport, HostedVendorTransport};
use chrono::{Duration as ChronoDuration, Utc};
use market_data::MarketDataProvider;
use persistence::{InMemoryStore, ParticipantLocks, PgStore, Store};
use rust_decimal_macros::dec;
use scheduler::{Scheduler, SchedulerConfig};
use synthetic::{RuleBasedTransport, SyntheticPriceProvider};
use types::competition::Competition;
use types::enums::AssetClass;
use types::numeric::Money;
use types::participant::Participant;
use types::portfolio::Portfolio;

const DEFAULT_AGENTS: &[&str] = &["Momentum Runner", "Mean Reverter", "Breakout Chaser", "Conservative Hedger"];

async fn build_store() -> anyhow::Result<Arc<dyn Store>> {
    match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new().max_connections(5).connect(&url).await?;
            sqlx::migrate!("../../services/persistence/migrations").run(&pool).await?;
            tracing::info!("connected to Postgres");
            Ok(Arc::new(PgStore::new(pool)))
        }
        Err(_) => {
            tracing::info!("DATABASE_URL not set, running against the in-memory store");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}

fn build_provider() -> Arc<dyn MarketDataProvider> {
    if std::env::var("USE_LIVE_MARKET_DATA").is_ok() {
        Arc::new(market_data::BinanceProvider::default())
    } else {
        Arc::new(SyntheticPriceProvider::seeded(42))
    }
}

fn build_transport() -> Arc<dyn AgentTransport> {
    match std::env::var("ANTHROPIC_API_KEY") {
        Ok(key) => Arc::new(HostedVendorTransport::anthropic(key)),
        Err(_) => {
            tracing::info!("ANTHROPIC_API_KEY not set, driving participants with the built-in rule-based bots");
            Arc::new(RuleBasedTransport::seeded(7))
        }
    }
}

async fn seed_competition(store: &Arc<dyn Store>) -> anyhow::Result<Competition> {
    let now = Utc::now();
    let competition = Competition::new(
        "sim-runner quick start",
        now,
        now + ChronoDuration::hours(6),
        1,
        Money::new(dec!(10_000)),
        10,
        dec!(5),
        vec![AssetClass::Crypto],
        DEFAULT_AGENTS.len() as u32,
        false,
    )?;
    store.insert_competition(&competition).await?;
    store.update_competition_status(competition.id, types::enums::CompetitionStatus::Active).await?;

    for name in DEFAULT_AGENTS {
        let participant = Participant::new(competition.id, *name, "rule-based", "local-bot-v1", serde_json::Value::Null, competition.initial_capital);
        let portfolio = Portfolio::new(participant.id, competition.initial_capital);
        store.insert_participant(&participant, &portfolio).await?;
    }

    let mut started = competition;
    started.status = types::enums::CompetitionStatus::Active;
    Ok(started)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let ticks: u32 = std::env::var("SIM_TICKS").ok().and_then(|v| v.parse().ok()).unwrap_or(5);
    let tick_interval = Duration::from_millis(std::env::var("SIM_TICK_INTERVAL_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(200));

    let store = build_store().await?;
    let locks = Arc::new(ParticipantLocks::new());
    let provider = build_provider();
    let transport = build_transport();
    let agent_config = AgentConfig::default();
    let symbol_universe = agent_invoker::default_symbol_universe();

    let competition = seed_competition(&store).await?;
    tracing::info!(competition = %competition.name, participants = DEFAULT_AGENTS.len(), "seeded competition");

    let scheduler = Scheduler::with_locks(
        store.clone(),
        locks,
        provider,
        transport,
        agent_config,
        symbol_universe,
        SchedulerConfig { mark_to_market_interval: tick_interval, ..SchedulerConfig::default() },
    );

    for tick in 1..=ticks {
        let invoked = scheduler.tick_decisions_for_eligible_competitions().await?;
        let revalued = scheduler.tick_mark_to_market().await?;
        tracing::info!(tick, invoked, revalued, "completed simulation tick");
        tokio::time::sleep(tick_interval).await;
    }

    let report = report::build(store.as_ref(), competition.id).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
