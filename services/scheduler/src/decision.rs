//! The decision tick (§4.7): for each competition whose
//! `invocation_interval_minutes` has elapsed, invoke every active
//! participant's agent, bounded to [`SchedulerConfig::max_concurrent_decisions`]
//! calls in flight at once.
//!
//! Grounded on the `_invoke_all_participants` job of the original's
//! `SchedulerService` (`app/services/scheduler.py`), deliberately NOT
//! reproducing its synchronous per-participant `for` loop over every
//! active participant (§5, §9 REDESIGN FLAGS): a `tokio::sync::Semaphore`
//! caps concurrency and a `tokio::task::JoinSet` collects results so one
//! slow or hung agent call cannot starve the others indefinitely.

use std::sync::Arc;

use agent_invoker::InvokeInputs;
use agent_transport::{AgentConfig, AgentTransport};
use chrono::{DateTime, Utc};
use market_data::MarketDataProvider;
use persistence::{ParticipantLocks, PersistenceError, Store};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use types::competition::Competition;
use types::ids::{ParticipantId, Symbol};

#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Run one participant's decision turn end to end: load its state under
/// lock, invoke its agent, persist the updated state, the invocation
/// record, and every order/trade the agent's orders produced.
pub async fn run_decision_one(
    store: Arc<dyn Store>,
    locks: Arc<ParticipantLocks>,
    provider: Arc<dyn MarketDataProvider>,
    transport: Arc<dyn AgentTransport>,
    agent_config: AgentConfig,
    competition: Competition,
    other_participants: Vec<types::participant::Participant>,
    symbol_universe: Vec<Symbol>,
    participant_id: ParticipantId,
    now: DateTime<Utc>,
) -> Result<(), DecisionError> {
    let _guard = locks.acquire(participant_id).await;

    let Some(mut state) = store.get_participant_state(participant_id).await? else {
        return Ok(());
    };
    if !state.participant.is_active() {
        return Ok(());
    }

    let orders_before = state.positions.len();
    let inputs = InvokeInputs {
        competition: &competition,
        other_participants: &other_participants,
        symbol_universe: &symbol_universe,
        provider: provider.as_ref(),
        transport: transport.as_ref(),
        agent_config: &agent_config,
    };

    let outcome = agent_invoker::invoke(&mut state.participant, &mut state.portfolio, &mut state.positions, &inputs, now).await;
    tracing::info!(
        %participant_id,
        status = ?outcome.invocation.status,
        orders_proposed = outcome.invocation.execution_results.len(),
        positions_delta = state.positions.len() as i64 - orders_before as i64,
        "decision tick invocation complete"
    );

    // Each executed order already refreshed the portfolio internally; this
    // call is what appends the decision tick's own history checkpoint even
    // on a pure `hold` turn, so the equity curve has a point per invocation
    // interval regardless of whether any order executed.
    let history_point = portfolio_manager::update(&mut state.portfolio, &state.positions, now);
    store.save_participant_state(&state, &history_point).await?;
    store.insert_invocation(&outcome.invocation).await?;
    for order in &outcome.orders {
        store.insert_order(order).await?;
    }
    for trade in &outcome.trades {
        store.insert_trade(trade).await?;
    }

    Ok(())
}

/// Fan out the decision tick across every active participant in
/// `competition`, bounded to at most `max_concurrent` agent calls in
/// flight. A single participant's failure (surfaced as a `Persistence`
/// error) is logged and does not cancel the others.
#[allow(clippy::too_many_arguments)]
pub async fn run_decision_tick(
    store: Arc<dyn Store>,
    locks: Arc<ParticipantLocks>,
    provider: Arc<dyn MarketDataProvider>,
    transport: Arc<dyn AgentTransport>,
    agent_config: AgentConfig,
    competition: Competition,
    symbol_universe: Vec<Symbol>,
    max_concurrent: usize,
    now: DateTime<Utc>,
) -> Result<usize, DecisionError> {
    let participants = store.list_active_participants(competition.id).await?;
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut set = JoinSet::new();

    for participant in &participants {
        let other_participants: Vec<_> = participants.iter().filter(|p| p.id != participant.id).cloned().collect();
        let permit_semaphore = semaphore.clone();
        let store = store.clone();
        let locks = locks.clone();
        let provider = provider.clone();
        let transport = transport.clone();
        let agent_config = agent_config.clone();
        let competition = competition.clone();
        let symbol_universe = symbol_universe.clone();
        let participant_id = participant.id;

        set.spawn(async move {
            let _permit = permit_semaphore.acquire_owned().await.expect("semaphore never closed");
            run_decision_one(store, locks, provider, transport, agent_config, competition, other_participants, symbol_universe, participant_id, now)
                .await
        });
    }

    let mut completed = 0;
    while let Some(result) = set.join_next().await {
        match result {
            Ok(Ok(())) => completed += 1,
            Ok(Err(err)) => tracing::error!(error = %err, "decision tick failed for a participant"),
            Err(join_err) => tracing::error!(error = %join_err, "decision tick task panicked"),
        }
    }
    Ok(completed)
}
