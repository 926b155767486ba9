//! Portfolio manager (C3): aggregate positions into portfolio totals, append
//! history snapshots, run the liquidation sweep.
//!
//! Grounded on the original's `app/services/portfolio_manager.py` for the
//! recompute-from-positions shape of `update`, adapted to the **reserve**
//! margin model (§9 Design Notes): `allocate_margin` leaves `cash_balance`
//! untouched, `release_margin` only ever adds to it. The original's version
//! debits cash on open; this specification fixes the reserve variant because
//! it is the only one consistent with the §3 accounting identities.

pub mod history;

use calc_kernel::{current_leverage, equity as calc_equity, margin_level as calc_margin_level};
use cfd_engine::close as cfd_close;
use chrono::{DateTime, Utc};
use market_data::MarketDataProvider;
use rust_decimal::Decimal;
use types::numeric::Money;
use types::participant::Participant;
use types::portfolio::{Portfolio, PortfolioHistoryPoint};
use types::position::Position;

/// Create a brand-new portfolio and its zero-motion first history point.
pub fn create(participant_id: types::ids::ParticipantId, initial_capital: Money, now: DateTime<Utc>) -> (Portfolio, PortfolioHistoryPoint) {
    let portfolio = Portfolio::new(participant_id, initial_capital);
    let point = history_point(&portfolio, now);
    (portfolio, point)
}

/// Recompute every aggregate in `portfolio` from `positions` (the *current*
/// set — callers pass whatever is left after an open/close), per the §3
/// accounting identities. Always appends a fresh history point; the caller
/// persists it alongside the updated portfolio row.
pub fn update(portfolio: &mut Portfolio, positions: &[Position], now: DateTime<Utc>) -> PortfolioHistoryPoint {
    let margin_used: Decimal = positions.iter().map(|p| p.margin_required.as_decimal()).sum();
    let unrealized_pnl: Decimal = positions.iter().map(|p| p.unrealized_pnl.as_decimal()).sum();
    let total_notional: Decimal = positions.iter().map(|p| p.notional_value.as_decimal()).sum();

    let equity = calc_equity(portfolio.cash_balance.as_decimal(), unrealized_pnl);

    portfolio.margin_used = Money::new(margin_used);
    portfolio.equity = Money::new(equity);
    portfolio.margin_available = portfolio.equity - portfolio.margin_used;
    portfolio.unrealized_pnl = Money::new(unrealized_pnl);
    portfolio.total_pnl = portfolio.realized_pnl + portfolio.unrealized_pnl;
    portfolio.current_leverage = current_leverage(total_notional, equity);
    portfolio.margin_level = if margin_used.is_zero() {
        None
    } else {
        Some(calc_margin_level(equity, margin_used))
    };

    history_point(portfolio, now)
}

fn history_point(portfolio: &Portfolio, now: DateTime<Utc>) -> PortfolioHistoryPoint {
    PortfolioHistoryPoint {
        participant_id: portfolio.participant_id,
        cash_balance: portfolio.cash_balance,
        equity: portfolio.equity,
        margin_used: portfolio.margin_used,
        realized_pnl: portfolio.realized_pnl,
        unrealized_pnl: portfolio.unrealized_pnl,
        total_pnl: portfolio.total_pnl,
        recorded_at: now,
    }
}

/// On open: reserve-only model. `cash_balance` is untouched; the newly added
/// position's `margin_required` is picked up by the caller's follow-up
/// `update` call, not by this function directly.
pub fn allocate_margin(_portfolio: &mut Portfolio, _margin_amount: Money) {
    // Intentionally a no-op beyond documentation: the reserve model treats
    // margin as a pointer into existing equity, not a cash transfer. Kept as
    // a named step (rather than inlined at the call site) because §4.3
    // names it as part of C3's contract and a future debit-model variant
    // would live here.
}

/// On close: credit `realized_pnl` to cash and to cumulative realized P&L.
/// Margin is not explicitly released here — the closed position has already
/// been removed, so the next `update` call will see a smaller `margin_used`.
pub fn release_margin(portfolio: &mut Portfolio, realized_pnl: Money) {
    portfolio.cash_balance = portfolio.cash_balance + realized_pnl;
    portfolio.realized_pnl = portfolio.realized_pnl + realized_pnl;
}

/// Update `participant.current_equity`, bumping `peak_equity` if it rose
/// (§3 invariant: `peak_equity >= current_equity` after every update).
pub fn update_participant_equity(participant: &mut Participant, new_equity: Money) {
    participant.update_equity(new_equity);
}

/// The outcome of one liquidation sweep over a single participant.
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidationOutcome {
    pub liquidated: bool,
    pub realized_pnl: Money,
    pub positions_closed: usize,
    pub positions_skipped: usize,
}

impl LiquidationOutcome {
    fn untouched() -> Self {
        Self { liquidated: false, realized_pnl: Money::ZERO, positions_closed: 0, positions_skipped: 0 }
    }
}

/// Check whether `portfolio` has crossed the maintenance-margin threshold
/// and, if so, force-close every position and mark the participant
/// liquidated (§4.3, §8 "Liquidation").
///
/// Returns `false` (untouched) when the participant is not active or
/// `margin_used <= 0` — a flat portfolio cannot be liquidated. Positions
/// whose symbol returns no price are skipped (logged, not fatal): the sweep
/// still closes everything it can and still flips the participant to
/// liquidated once any liquidation is triggered.
pub async fn check_and_liquidate(
    participant: &mut Participant,
    portfolio: &mut Portfolio,
    positions: &mut Vec<Position>,
    max_leverage: u32,
    maintenance_margin_pct: Decimal,
    provider: &dyn MarketDataProvider,
    now: DateTime<Utc>,
) -> LiquidationOutcome {
    if !participant.is_active() || portfolio.margin_used.as_decimal() <= Decimal::ZERO {
        return LiquidationOutcome::untouched();
    }

    let margin_level = calc_margin_level(portfolio.equity.as_decimal(), portfolio.margin_used.as_decimal());
    let initial_pct = calc_kernel::initial_margin_pct(Decimal::from(max_leverage));
    if !calc_kernel::check_liquidation(margin_level, maintenance_margin_pct, initial_pct) {
        return LiquidationOutcome::untouched();
    }

    let mut total_realized = Decimal::ZERO;
    let mut closed = 0usize;
    let mut skipped = 0usize;
    let mut remaining = Vec::with_capacity(positions.len());

    for mut position in positions.drain(..) {
        match provider.price(&position.symbol).await {
            Some(price) => {
                let result = cfd_close(&mut position, price);
                total_realized += result.realized_pnl.as_decimal();
                closed += 1;
            }
            None => {
                tracing::warn!(symbol = %position.symbol, participant_id = %participant.id, "liquidation sweep: no price, skipping position");
                skipped += 1;
                remaining.push(position);
            }
        }
    }
    *positions = remaining;

    let realized_pnl = Money::new(total_realized);
    release_margin(portfolio, realized_pnl);
    let history = update(portfolio, positions, now);
    let _ = history;
    update_participant_equity(participant, portfolio.equity);
    participant.status = types::enums::ParticipantStatus::Liquidated;

    LiquidationOutcome { liquidated: true, realized_pnl, positions_closed: closed, positions_skipped: skipped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use market_data::{Candle, Timeframe, Ticker};
    use rust_decimal_macros::dec;
    use types::enums::{AssetClass, ParticipantStatus, PositionSide};
    use types::ids::{ParticipantId, PortfolioId, PositionId, Symbol};
    use types::numeric::{Price, Quantity};

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn position(portfolio_id: PortfolioId, participant_id: ParticipantId, margin: Decimal, upnl: Decimal, notional: Decimal) -> Position {
        Position {
            id: PositionId::new(),
            portfolio_id,
            participant_id,
            symbol: Symbol::new("BTCUSDT"),
            asset_class: AssetClass::Crypto,
            side: PositionSide::Long,
            quantity: Quantity::new(dec!(1)),
            entry_price: Price::new(dec!(100)),
            current_price: Price::new(dec!(100)),
            leverage: 10,
            margin_required: Money::new(margin),
            notional_value: Money::new(notional),
            unrealized_pnl: Money::new(upnl),
            unrealized_pnl_pct: Decimal::ZERO,
            exit_plan: None,
            opened_at: now(),
        }
    }

    struct FixedPriceProvider(Option<Decimal>);

    #[async_trait]
    impl MarketDataProvider for FixedPriceProvider {
        async fn price(&self, _symbol: &Symbol) -> Option<Price> {
            self.0.map(Price::new)
        }
        async fn ticker(&self, _symbol: &Symbol) -> Option<Ticker> {
            None
        }
        async fn ohlcv(&self, _symbol: &Symbol, _timeframe: Timeframe, _limit: usize) -> Vec<Candle> {
            Vec::new()
        }
    }

    #[test]
    fn create_sets_margin_available_to_initial_capital_and_records_history() {
        let (portfolio, point) = create(ParticipantId::new(), Money::new(dec!(10_000)), now());
        assert_eq!(portfolio.margin_available.as_decimal(), dec!(10_000));
        assert_eq!(point.equity.as_decimal(), dec!(10_000));
    }

    #[test]
    fn update_recomputes_every_aggregate_from_positions() {
        let mut portfolio = Portfolio::new(ParticipantId::new(), Money::new(dec!(10_000)));
        let pos = position(portfolio.id, portfolio.participant_id, dec!(2500), dec!(250), dec!(5000));
        update(&mut portfolio, &[pos], now());

        assert_eq!(portfolio.margin_used.as_decimal(), dec!(2500));
        assert_eq!(portfolio.unrealized_pnl.as_decimal(), dec!(250));
        assert_eq!(portfolio.equity.as_decimal(), dec!(10_250));
        assert_eq!(portfolio.margin_available.as_decimal(), dec!(7750));
        assert_eq!(portfolio.margin_level, Some(dec!(410)));
    }

    #[test]
    fn update_with_no_positions_leaves_margin_level_undefined() {
        let mut portfolio = Portfolio::new(ParticipantId::new(), Money::new(dec!(10_000)));
        update(&mut portfolio, &[], now());
        assert!(portfolio.margin_level.is_none());
        assert_eq!(portfolio.current_leverage, Decimal::ZERO);
    }

    #[test]
    fn allocate_margin_does_not_touch_cash_balance() {
        let mut portfolio = Portfolio::new(ParticipantId::new(), Money::new(dec!(10_000)));
        let before = portfolio.cash_balance;
        allocate_margin(&mut portfolio, Money::new(dec!(2500)));
        assert_eq!(portfolio.cash_balance, before);
    }

    #[test]
    fn release_margin_credits_cash_and_realized_pnl() {
        let mut portfolio = Portfolio::new(ParticipantId::new(), Money::new(dec!(10_000)));
        release_margin(&mut portfolio, Money::new(dec!(250)));
        assert_eq!(portfolio.cash_balance.as_decimal(), dec!(10_250));
        assert_eq!(portfolio.realized_pnl.as_decimal(), dec!(250));
    }

    #[test]
    fn participant_equity_update_bumps_peak_only_upward() {
        let mut participant = Participant::new(
            types::ids::CompetitionId::new(), "Bot", "anthropic", "claude", serde_json::Value::Null, Money::new(dec!(10_000)),
        );
        update_participant_equity(&mut participant, Money::new(dec!(10_500)));
        update_participant_equity(&mut participant, Money::new(dec!(9_000)));
        assert_eq!(participant.current_equity.as_decimal(), dec!(9_000));
        assert_eq!(participant.peak_equity.as_decimal(), dec!(10_500));
    }

    #[tokio::test]
    async fn healthy_portfolio_is_not_liquidated() {
        let mut participant = Participant::new(
            types::ids::CompetitionId::new(), "Bot", "anthropic", "claude", serde_json::Value::Null, Money::new(dec!(10_000)),
        );
        let mut portfolio = Portfolio::new(participant.id, Money::new(dec!(10_000)));
        let mut positions = vec![position(portfolio.id, participant.id, dec!(2500), dec!(250), dec!(5000))];
        update(&mut portfolio, &positions, now());

        let provider = FixedPriceProvider(Some(dec!(105)));
        let outcome = check_and_liquidate(&mut participant, &mut portfolio, &mut positions, 10, dec!(5), &provider, now()).await;
        assert!(!outcome.liquidated);
        assert_eq!(positions.len(), 1);
        assert!(participant.is_active());
    }

    #[tokio::test]
    async fn margin_level_below_threshold_liquidates_every_position() {
        // max_leverage=10 -> initial=10%, maintenance=5% -> threshold 50%.
        let mut participant = Participant::new(
            types::ids::CompetitionId::new(), "Bot", "anthropic", "claude", serde_json::Value::Null, Money::new(dec!(10_000)),
        );
        let mut portfolio = Portfolio::new(participant.id, Money::new(dec!(10_000)));
        // margin_used = 10_000, equity drifted down to 4_000 -> margin_level 40% < 50%.
        portfolio.cash_balance = Money::new(dec!(4_000));
        let mut positions = vec![position(portfolio.id, participant.id, dec!(10_000), dec!(0), dec!(100_000))];
        update(&mut portfolio, &positions, now());
        assert_eq!(portfolio.margin_level, Some(dec!(40)));

        let provider = FixedPriceProvider(Some(dec!(100)));
        let outcome = check_and_liquidate(&mut participant, &mut portfolio, &mut positions, 10, dec!(5), &provider, now()).await;

        assert!(outcome.liquidated);
        assert_eq!(outcome.positions_closed, 1);
        assert!(positions.is_empty());
        assert_eq!(participant.status, ParticipantStatus::Liquidated);
        assert_eq!(portfolio.margin_used.as_decimal(), dec!(0));
    }

    #[tokio::test]
    async fn already_liquidated_participant_is_never_revisited() {
        let mut participant = Participant::new(
            types::ids::CompetitionId::new(), "Bot", "anthropic", "claude", serde_json::Value::Null, Money::new(dec!(10_000)),
        );
        participant.status = ParticipantStatus::Liquidated;
        let mut portfolio = Portfolio::new(participant.id, Money::new(dec!(10_000)));
        portfolio.margin_used = Money::new(dec!(10_000));
        let mut positions = vec![position(portfolio.id, participant.id, dec!(10_000), dec!(0), dec!(1000))];

        let provider = FixedPriceProvider(Some(dec!(100)));
        let outcome = check_and_liquidate(&mut participant, &mut portfolio, &mut positions, 10, dec!(5), &provider, now()).await;
        assert!(!outcome.liquidated);
        assert_eq!(positions.len(), 1);
    }

    #[tokio::test]
    async fn price_feed_miss_skips_that_position_but_continues() {
        let mut participant = Participant::new(
            types::ids::CompetitionId::new(), "Bot", "anthropic", "claude", serde_json::Value::Null, Money::new(dec!(10_000)),
        );
        let mut portfolio = Portfolio::new(participant.id, Money::new(dec!(10_000)));
        portfolio.cash_balance = Money::new(dec!(4_000));
        let mut positions = vec![position(portfolio.id, participant.id, dec!(10_000), dec!(0), dec!(100_000))];
        update(&mut portfolio, &positions, now());

        let provider = FixedPriceProvider(None);
        let outcome = check_and_liquidate(&mut participant, &mut portfolio, &mut positions, 10, dec!(5), &provider, now()).await;
        assert!(outcome.liquidated);
        assert_eq!(outcome.positions_skipped, 1);
        assert_eq!(positions.len(), 1);
    }
}
