//! Scheduler (C6): two independent clocks.
//!
//! The mark-to-market job runs frequently and touches every open position
//! regardless of which competition it belongs to; the decision job runs
//! once per competition's own `invocation_interval_minutes` and calls every
//! active participant's agent, bounded in concurrency (§4.7, §5).

pub mod config;
pub mod decision;
pub mod mark_to_market;

pub use config::SchedulerConfig;
pub use decision::{run_decision_one, run_decision_tick, DecisionError};
pub use mark_to_market::{run_mark_to_market_tick, MarkToMarketError};

use std::sync::Arc;

use agent_transport::{AgentConfig, AgentTransport};
use chrono::Utc;
use market_data::MarketDataProvider;
use persistence::{ParticipantLocks, PersistenceError, Store};
use types::enums::CompetitionStatus;
use types::ids::Symbol;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Everything the two ticks share across runs: the store, the in-process
/// per-participant locks, the market-data and agent-transport
/// collaborators, and the fixed symbol universe the decision tick's market
/// snapshot is built over.
pub struct Scheduler {
    pub store: Arc<dyn Store>,
    pub locks: Arc<ParticipantLocks>,
    pub provider: Arc<dyn MarketDataProvider>,
    pub transport: Arc<dyn AgentTransport>,
    pub agent_config: AgentConfig,
    pub symbol_universe: Vec<Symbol>,
    pub config: SchedulerConfig,
}

impl Scheduler {
    /// Build a scheduler with its own private per-participant lock set. Use
    /// [`Scheduler::with_locks`] instead when another caller (e.g. the
    /// gateway's manual-invoke admin routes) also drives
    /// `run_decision_one`/`run_mark_to_market_tick` against the same store —
    /// sharing the lock set is what makes §5's "two concurrent ticks
    /// touching the same participant must serialize" hold across callers,
    /// not just within one `Scheduler`.
    pub fn new(
        store: Arc<dyn Store>,
        provider: Arc<dyn MarketDataProvider>,
        transport: Arc<dyn AgentTransport>,
        agent_config: AgentConfig,
        symbol_universe: Vec<Symbol>,
        config: SchedulerConfig,
    ) -> Self {
        Self::with_locks(store, Arc::new(ParticipantLocks::new()), provider, transport, agent_config, symbol_universe, config)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_locks(
        store: Arc<dyn Store>,
        locks: Arc<ParticipantLocks>,
        provider: Arc<dyn MarketDataProvider>,
        transport: Arc<dyn AgentTransport>,
        agent_config: AgentConfig,
        symbol_universe: Vec<Symbol>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            locks,
            provider,
            transport,
            agent_config,
            symbol_universe,
            config,
        }
    }

    /// One mark-to-market pass over every open position across every
    /// competition.
    pub async fn tick_mark_to_market(&self) -> Result<usize, SchedulerError> {
        let competitions = self.store.list_competitions_with_status(CompetitionStatus::Active).await?;
        let mut total = 0;
        for competition in competitions {
            total += run_mark_to_market_tick(
                self.store.as_ref(),
                self.locks.as_ref(),
                self.provider.as_ref(),
                competition.max_leverage,
                competition.maintenance_margin_pct,
                Utc::now(),
            )
            .await
            .map_err(|e| match e {
                mark_to_market::MarkToMarketError::Persistence(p) => SchedulerError::Persistence(p),
            })?;
        }
        Ok(total)
    }

    /// Run the decision tick for every active competition that is
    /// currently eligible (§4.7: within its `[start_time, end_time)`
    /// window). The caller is responsible for only calling this once per
    /// competition's own `invocation_interval_minutes` has elapsed — this
    /// function itself is stateless with respect to timing.
    pub async fn tick_decisions_for_eligible_competitions(&self) -> Result<usize, SchedulerError> {
        let now = Utc::now();
        let competitions = self.store.list_competitions_with_status(CompetitionStatus::Active).await?;
        let mut total = 0;
        for competition in competitions {
            if !competition.is_decision_eligible(now) {
                continue;
            }
            total += run_decision_tick(
                self.store.clone(),
                self.locks.clone(),
                self.provider.clone(),
                self.transport.clone(),
                self.agent_config.clone(),
                competition,
                self.symbol_universe.clone(),
                self.config.max_concurrent_decisions,
                now,
            )
            .await
            .map_err(|e| match e {
                decision::DecisionError::Persistence(p) => SchedulerError::Persistence(p),
            })?;
        }
        Ok(total)
    }

    /// Drive both clocks forever on their own intervals: mark-to-market on
    /// `config.mark_to_market_interval`, decisions checked once a minute
    /// (cheap enough since it is gated by `is_decision_eligible` and the
    /// caller's own per-competition interval bookkeeping).
    pub async fn run_forever(self: Arc<Self>) {
        let mtm = self.clone();
        let mtm_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(mtm.config.mark_to_market_interval);
            loop {
                interval.tick().await;
                if let Err(err) = mtm.tick_mark_to_market().await {
                    tracing::error!(error = %err, "mark-to-market tick failed");
                }
            }
        });

        let decisions = self.clone();
        let decision_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
            loop {
                interval.tick().await;
                if let Err(err) = decisions.tick_decisions_for_eligible_competitions().await {
                    tracing::error!(error = %err, "decision tick failed");
                }
            }
        });

        let _ = tokio::join!(mtm_handle, decision_handle);
    }
}
