//! Pre-execution order validation (§4.4, rules 1-4).
//!
//! Grounded on the original's `trading_engine.py::validate_order` for the
//! exact rule ordering and rejection-message wording, and on teacher's
//! `services/risk-engine/src/validator.rs` for the "return the first failing
//! check" idiom — generalized here into a `RejectionReason` enum instead of
//! the teacher's order-book-specific `RiskCheckResult`, since none of this
//! competition's rejections are about order-book position limits.

use calc_kernel::margin_required;
use market_data::MarketDataProvider;
use rust_decimal::Decimal;
use thiserror::Error;
use types::competition::Competition;
use types::enums::OrderAction;
use types::ids::{ParticipantId, PositionId, Symbol};
use types::numeric::{Money, Quantity};
use types::participant::Participant;
use types::portfolio::Portfolio;
use types::position::Position;

/// The first failing rule, in the order §4.4 lists them. Each variant's
/// `Display` is the human-readable reason persisted on the rejected `Order`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RejectionReason {
    #[error("Participant is {0:?}")]
    ParticipantNotActive(types::enums::ParticipantStatus),

    #[error("Leverage {requested} exceeds max {max_leverage}")]
    LeverageExceeded { requested: u32, max_leverage: u32 },

    #[error("Could not fetch price for {0}")]
    PriceUnavailable(Symbol),

    #[error("Insufficient margin. Required: {required}, Available: {available}")]
    InsufficientMargin { required: Money, available: Money },

    #[error("Position ID required for close/increase/decrease")]
    PositionIdRequired,

    #[error("Position {0} not found")]
    PositionNotFound(PositionId),

    #[error("Position does not belong to this participant")]
    ForeignPosition,

    #[error("{0:?} not supported in this competition")]
    ActionNotSupported(OrderAction),
}

/// Validate an incoming order. Returns `Ok(())` if every rule passes,
/// otherwise the first `RejectionReason` encountered.
#[allow(clippy::too_many_arguments)]
pub async fn validate(
    participant: &Participant,
    competition: &Competition,
    portfolio: &Portfolio,
    positions: &[Position],
    symbol: &Symbol,
    action: OrderAction,
    quantity: Option<Quantity>,
    leverage: u32,
    position_id: Option<PositionId>,
    provider: &dyn MarketDataProvider,
) -> Result<(), RejectionReason> {
    if !participant.is_active() {
        return Err(RejectionReason::ParticipantNotActive(participant.status));
    }

    if leverage > competition.max_leverage {
        return Err(RejectionReason::LeverageExceeded { requested: leverage, max_leverage: competition.max_leverage });
    }

    match action {
        OrderAction::Open => {
            let price = provider.price(symbol).await.ok_or_else(|| RejectionReason::PriceUnavailable(symbol.clone()))?;
            let quantity = quantity.unwrap_or(Quantity::ZERO);
            let notional = quantity * price;
            let required = Money::new(margin_required(notional.as_decimal(), Decimal::from(leverage)));
            if required.as_decimal() > portfolio.margin_available.as_decimal() {
                return Err(RejectionReason::InsufficientMargin { required, available: portfolio.margin_available });
            }
            Ok(())
        }
        OrderAction::Close => {
            let position_id = position_id.ok_or(RejectionReason::PositionIdRequired)?;
            let position = positions
                .iter()
                .find(|p| p.id == position_id)
                .ok_or(RejectionReason::PositionNotFound(position_id))?;
            check_ownership(position, participant.id)
        }
        OrderAction::Increase | OrderAction::Decrease => Err(RejectionReason::ActionNotSupported(action)),
    }
}

fn check_ownership(position: &Position, participant_id: ParticipantId) -> Result<(), RejectionReason> {
    if position.participant_id != participant_id {
        Err(RejectionReason::ForeignPosition)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use market_data::{Candle, Ticker, Timeframe};
    use rust_decimal_macros::dec;
    use types::enums::{AssetClass, CompetitionStatus, PositionSide};
    use types::ids::{CompetitionId, PortfolioId};
    use types::numeric::Price;

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

    fn competition() -> Competition {
        Competition {
            id: CompetitionId::new(),
            name: "Q3".into(),
            status: CompetitionStatus::Active,
            start_time: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
            end_time: DateTime::<Utc>::from_timestamp(1_800_000_000, 0).unwrap(),
            invocation_interval_minutes: 5,
            initial_capital: Money::new(dec!(10_000)),
            max_leverage: 10,
            maintenance_margin_pct: dec!(5),
            allowed_asset_classes: vec![AssetClass::Crypto],
            max_participants: 10,
            market_hours_gated: false,
        }
    }

    fn participant() -> Participant {
        Participant::new(CompetitionId::new(), "Bot", "anthropic", "claude", serde_json::Value::Null, Money::new(dec!(10_000)))
    }

    #[tokio::test]
    async fn rejects_inactive_participant() {
        let mut p = participant();
        p.status = types::enums::ParticipantStatus::Liquidated;
        let portfolio = Portfolio::new(p.id, Money::new(dec!(10_000)));
        let provider = FixedPriceProvider(Some(dec!(100_000)));
        let result = validate(
            &p, &competition(), &portfolio, &[], &Symbol::new("BTCUSDT"), OrderAction::Open,
            Some(Quantity::new(dec!(0.05))), 2, None, &provider,
        ).await;
        assert!(matches!(result, Err(RejectionReason::ParticipantNotActive(_))));
    }

    #[tokio::test]
    async fn rejects_leverage_above_competition_max() {
        let p = participant();
        let portfolio = Portfolio::new(p.id, Money::new(dec!(10_000)));
        let provider = FixedPriceProvider(Some(dec!(100_000)));
        let result = validate(
            &p, &competition(), &portfolio, &[], &Symbol::new("BTCUSDT"), OrderAction::Open,
            Some(Quantity::new(dec!(0.05))), 20, None, &provider,
        ).await;
        assert!(matches!(result, Err(RejectionReason::LeverageExceeded { .. })));
    }

    #[tokio::test]
    async fn rejects_open_with_no_price() {
        let p = participant();
        let portfolio = Portfolio::new(p.id, Money::new(dec!(10_000)));
        let provider = FixedPriceProvider(None);
        let result = validate(
            &p, &competition(), &portfolio, &[], &Symbol::new("BTCUSDT"), OrderAction::Open,
            Some(Quantity::new(dec!(0.05))), 2, None, &provider,
        ).await;
        assert!(matches!(result, Err(RejectionReason::PriceUnavailable(_))));
    }

    #[tokio::test]
    async fn rejects_open_with_insufficient_margin() {
        // E3: margin_available 7_500, requesting 0.2 @ 100_000 @ 2x = 10_000 margin required.
        let p = participant();
        let mut portfolio = Portfolio::new(p.id, Money::new(dec!(10_000)));
        portfolio.margin_available = Money::new(dec!(7_500));
        let provider = FixedPriceProvider(Some(dec!(100_000)));
        let result = validate(
            &p, &competition(), &portfolio, &[], &Symbol::new("BTCUSDT"), OrderAction::Open,
            Some(Quantity::new(dec!(0.2))), 2, None, &provider,
        ).await;
        assert!(matches!(result, Err(RejectionReason::InsufficientMargin { .. })));
    }

    #[tokio::test]
    async fn accepts_a_valid_open() {
        let p = participant();
        let portfolio = Portfolio::new(p.id, Money::new(dec!(10_000)));
        let provider = FixedPriceProvider(Some(dec!(100_000)));
        let result = validate(
            &p, &competition(), &portfolio, &[], &Symbol::new("BTCUSDT"), OrderAction::Open,
            Some(Quantity::new(dec!(0.05))), 2, None, &provider,
        ).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn close_requires_a_position_id() {
        let p = participant();
        let portfolio = Portfolio::new(p.id, Money::new(dec!(10_000)));
        let provider = FixedPriceProvider(Some(dec!(100_000)));
        let result = validate(
            &p, &competition(), &portfolio, &[], &Symbol::new("BTCUSDT"), OrderAction::Close,
            None, 1, None, &provider,
        ).await;
        assert!(matches!(result, Err(RejectionReason::PositionIdRequired)));
    }

    #[tokio::test]
    async fn close_rejects_foreign_position() {
        let p = participant();
        let portfolio = Portfolio::new(p.id, Money::new(dec!(10_000)));
        let position = Position {
            id: PositionId::new(),
            portfolio_id: PortfolioId::new(),
            participant_id: ParticipantId::new(),
            symbol: Symbol::new("ETHUSDT"),
            asset_class: AssetClass::Crypto,
            side: PositionSide::Long,
            quantity: Quantity::new(dec!(1)),
            entry_price: Price::new(dec!(4000)),
            current_price: Price::new(dec!(4000)),
            leverage: 5,
            margin_required: Money::new(dec!(800)),
            notional_value: Money::new(dec!(4000)),
            unrealized_pnl: Money::ZERO,
            unrealized_pnl_pct: Decimal::ZERO,
            exit_plan: None,
            opened_at: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
        };
        let provider = FixedPriceProvider(Some(dec!(4000)));
        let result = validate(
            &p, &competition(), &portfolio, &[position.clone()], &position.symbol, OrderAction::Close,
            None, 5, Some(position.id), &provider,
        ).await;
        assert!(matches!(result, Err(RejectionReason::ForeignPosition)));
    }

    #[tokio::test]
    async fn increase_and_decrease_are_rejected_as_unsupported() {
        let p = participant();
        let portfolio = Portfolio::new(p.id, Money::new(dec!(10_000)));
        let provider = FixedPriceProvider(Some(dec!(100_000)));
        for action in [OrderAction::Increase, OrderAction::Decrease] {
            let result = validate(
                &p, &competition(), &portfolio, &[], &Symbol::new("BTCUSDT"), action, None, 5, None, &provider,
            ).await;
            assert!(matches!(result, Err(RejectionReason::ActionNotSupported(_))));
        }
    }
}
