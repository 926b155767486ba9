//! The mark-to-market tick (§4.7): revalue every open position at its
//! current price, recompute portfolio aggregates, and run the liquidation
//! sweep — independent of and more frequent than the decision tick.
//!
//! Grounded on the `_update_all_prices` job of the original's
//! `SchedulerService` (`app/services/scheduler.py`): group open positions
//! by symbol, batch-fetch prices, update each position, then update every
//! affected portfolio and its participant's equity. Generalized here into
//! participant-scoped units of work so each one can take its own
//! [`persistence::ParticipantLocks`] guard rather than locking the whole
//! sweep.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use market_data::MarketDataProvider;
use persistence::{ParticipantLocks, PersistenceError, Store};
use types::ids::ParticipantId;

#[derive(Debug, thiserror::Error)]
pub enum MarkToMarketError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Revalue and (if needed) liquidate one participant. Returns `Ok(false)`
/// when the participant had no open positions — a no-op most ticks will
/// spend most of their time on.
pub async fn mark_to_market_one(
    store: &dyn Store,
    locks: &ParticipantLocks,
    provider: &dyn MarketDataProvider,
    participant_id: ParticipantId,
    max_leverage: u32,
    maintenance_margin_pct: rust_decimal::Decimal,
    now: DateTime<Utc>,
) -> Result<bool, MarkToMarketError> {
    let _guard = locks.acquire(participant_id).await;

    let Some(mut state) = store.get_participant_state(participant_id).await? else {
        return Ok(false);
    };
    if state.positions.is_empty() {
        return Ok(false);
    }

    for position in &mut state.positions {
        match provider.price(&position.symbol).await {
            Some(price) => cfd_engine::revalue(position, price),
            None => tracing::warn!(symbol = %position.symbol, "no price available during mark-to-market"),
        }
    }

    let history_point = portfolio_manager::update(&mut state.portfolio, &state.positions, now);
    portfolio_manager::update_participant_equity(&mut state.participant, state.portfolio.equity);

    let outcome = portfolio_manager::check_and_liquidate(
        &mut state.participant,
        &mut state.portfolio,
        &mut state.positions,
        max_leverage,
        maintenance_margin_pct,
        provider,
        now,
    )
    .await;
    if outcome.liquidated {
        tracing::warn!(%participant_id, positions_closed = outcome.positions_closed, "participant liquidated");
    }

    let history_point = if outcome.liquidated {
        portfolio_manager::update(&mut state.portfolio, &state.positions, now)
    } else {
        history_point
    };

    store.save_participant_state(&state, &history_point).await?;
    Ok(true)
}

/// Sweep every participant with at least one open position, one at a time.
/// Bounded concurrency is not needed here (unlike the decision tick): this
/// work is pure arithmetic plus a DB write, not an unbounded-latency call.
pub async fn run_mark_to_market_tick(
    store: &dyn Store,
    locks: &ParticipantLocks,
    provider: &dyn MarketDataProvider,
    max_leverage: u32,
    maintenance_margin_pct: rust_decimal::Decimal,
    now: DateTime<Utc>,
) -> Result<usize, MarkToMarketError> {
    let open_positions = store.list_all_open_positions().await?;
    let participant_ids: HashSet<ParticipantId> = open_positions.iter().map(|p| p.participant_id).collect();

    let mut processed = 0;
    for participant_id in participant_ids {
        if mark_to_market_one(store, locks, provider, participant_id, max_leverage, maintenance_margin_pct, now).await? {
            processed += 1;
        }
    }
    Ok(processed)
}
