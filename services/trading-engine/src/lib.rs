//! Trading engine (C4): validate an incoming order and, if it passes, drive
//! the CFD engine and portfolio manager to execute it.
//!
//! This crate is the only caller of `cfd_engine::open`/`close` outside of
//! the portfolio manager's liquidation sweep — every agent-submitted order
//! flows through `validate` then `execute`.

pub mod executor;
pub mod validator;

pub use executor::{execute_close, execute_open, preview_margin_required};
pub use validator::{validate, RejectionReason};

use chrono::{DateTime, Utc};
use market_data::MarketDataProvider;
use types::competition::Competition;
use types::enums::OrderAction;
use types::order::Order;
use types::participant::Participant;
use types::portfolio::Portfolio;
use types::position::Position;
use types::trade::Trade;

/// Validate and, if accepted, execute `order` in one call. On rejection the
/// order is mutated to `Rejected` with the reason recorded and `None` is
/// returned; on success the order is mutated to `Executed` and the produced
/// `Trade` is returned.
pub async fn process(
    order: &mut Order,
    participant: &mut Participant,
    competition: &Competition,
    portfolio: &mut Portfolio,
    positions: &mut Vec<Position>,
    provider: &dyn MarketDataProvider,
    now: DateTime<Utc>,
) -> Option<Trade> {
    let leverage = order.leverage.unwrap_or(1);
    let validation = validate(
        participant,
        competition,
        portfolio,
        positions,
        &order.symbol,
        order.action,
        order.quantity,
        leverage,
        order.position_id,
        provider,
    )
    .await;

    if let Err(reason) = validation {
        order.reject(reason.to_string(), now);
        return None;
    }

    match order.action {
        OrderAction::Open => execute_open(order, participant, portfolio, positions, provider, now).await,
        OrderAction::Close => execute_close(order, participant, portfolio, positions, provider, now).await,
        OrderAction::Increase | OrderAction::Decrease => {
            order.reject(RejectionReason::ActionNotSupported(order.action).to_string(), now);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use market_data::{Candle, Ticker, Timeframe};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use types::enums::{AssetClass, CompetitionStatus, OrderSide};
    use types::ids::{CompetitionId, InvocationId, ParticipantId, Symbol};
    use types::numeric::{Money, Price, Quantity};

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    struct FixedPriceProvider(std::collections::HashMap<String, Decimal>);

    impl FixedPriceProvider {
        fn single(symbol: &str, price: Decimal) -> Self {
            let mut map = std::collections::HashMap::new();
            map.insert(symbol.to_string(), price);
            Self(map)
        }
    }

    #[async_trait]
    impl MarketDataProvider for FixedPriceProvider {
        async fn price(&self, symbol: &Symbol) -> Option<Price> {
            self.0.get(symbol.as_str()).copied().map(Price::new)
        }
        async fn ticker(&self, _symbol: &Symbol) -> Option<Ticker> {
            None
        }
        async fn ohlcv(&self, _symbol: &Symbol, _timeframe: Timeframe, _limit: usize) -> Vec<Candle> {
            Vec::new()
        }
    }

    fn competition(max_leverage: u32) -> Competition {
        Competition {
            id: CompetitionId::new(),
            name: "Q3".into(),
            status: CompetitionStatus::Active,
            start_time: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
            end_time: DateTime::<Utc>::from_timestamp(1_800_000_000, 0).unwrap(),
            invocation_interval_minutes: 5,
            initial_capital: Money::new(dec!(10_000)),
            max_leverage,
            maintenance_margin_pct: dec!(5),
            allowed_asset_classes: vec![AssetClass::Crypto],
            max_participants: 10,
            market_hours_gated: false,
        }
    }

    fn participant() -> Participant {
        Participant::new(CompetitionId::new(), "Bot", "anthropic", "claude", serde_json::Value::Null, Money::new(dec!(10_000)))
    }

    fn open_order(participant_id: ParticipantId, symbol: &str, side: OrderSide, quantity: Decimal, leverage: u32) -> Order {
        Order::new_pending(
            participant_id,
            InvocationId::new(),
            Symbol::new(symbol),
            AssetClass::Crypto,
            OrderAction::Open,
            Some(side),
            Some(Quantity::new(quantity)),
            Some(leverage),
            None,
            None,
            now(),
        )
    }

    /// E1: open a long, let the market move in its favor, close it, and check
    /// that realized P&L lands in both the trade record and the portfolio.
    #[tokio::test]
    async fn open_revalue_close_round_trip() {
        let p = participant();
        let mut portfolio = Portfolio::new(p.id, Money::new(dec!(10_000)));
        let mut positions = Vec::new();
        let competition = competition(10);

        let mut participant = p;
        let provider = FixedPriceProvider::single("BTCUSDT", dec!(100_000));
        let mut order = open_order(participant.id, "BTCUSDT", OrderSide::Buy, dec!(0.05), 2);
        let trade = process(&mut order, &mut participant, &competition, &mut portfolio, &mut positions, &provider, now())
            .await
            .expect("open should execute");
        assert_eq!(order.status, types::enums::OrderStatus::Executed);
        assert_eq!(positions.len(), 1);
        assert_eq!(trade.margin_impact.as_decimal(), dec!(2500));

        let provider = FixedPriceProvider::single("BTCUSDT", dec!(105_000));
        portfolio_manager::update(&mut portfolio, &positions, now());
        assert_eq!(positions[0].unrealized_pnl.as_decimal(), dec!(0));

        cfd_engine::revalue(&mut positions[0], Price::new(dec!(105_000)));
        portfolio_manager::update(&mut portfolio, &positions, now());
        assert_eq!(portfolio.unrealized_pnl.as_decimal(), dec!(250));

        let position_id = positions[0].id;
        let mut close_order = Order::new_pending(
            participant.id,
            InvocationId::new(),
            Symbol::new("BTCUSDT"),
            AssetClass::Crypto,
            OrderAction::Close,
            None,
            None,
            None,
            Some(position_id),
            None,
            now(),
        );
        let trade = process(&mut close_order, &mut participant, &competition, &mut portfolio, &mut positions, &provider, now())
            .await
            .expect("close should execute");
        assert!(positions.is_empty());
        assert_eq!(trade.realized_pnl.unwrap().as_decimal(), dec!(250));
        assert_eq!(portfolio.cash_balance.as_decimal(), dec!(10_250));
        assert_eq!(participant.winning_trades, 1);
    }

    /// E2: a short position profits when price falls.
    #[tokio::test]
    async fn short_position_profits_on_price_decline() {
        let mut participant = participant();
        let mut portfolio = Portfolio::new(participant.id, Money::new(dec!(10_000)));
        let mut positions = Vec::new();
        let competition = competition(10);

        let provider = FixedPriceProvider::single("ETHUSDT", dec!(4_000));
        let mut order = open_order(participant.id, "ETHUSDT", OrderSide::Sell, dec!(1), 5);
        process(&mut order, &mut participant, &competition, &mut portfolio, &mut positions, &provider, now())
            .await
            .expect("open should execute");

        let position_id = positions[0].id;
        let provider = FixedPriceProvider::single("ETHUSDT", dec!(3_800));
        let mut close_order = Order::new_pending(
            participant.id,
            InvocationId::new(),
            Symbol::new("ETHUSDT"),
            AssetClass::Crypto,
            OrderAction::Close,
            None,
            None,
            None,
            Some(position_id),
            None,
            now(),
        );
        let trade = process(&mut close_order, &mut participant, &competition, &mut portfolio, &mut positions, &provider, now())
            .await
            .expect("close should execute");
        assert!(trade.is_winner());
        assert_eq!(trade.realized_pnl.unwrap().as_decimal(), dec!(200));
    }

    /// E3: a position sized beyond available margin is rejected, not clamped.
    #[tokio::test]
    async fn insufficient_margin_rejects_the_order_outright() {
        let mut participant = participant();
        let mut portfolio = Portfolio::new(participant.id, Money::new(dec!(10_000)));
        portfolio.margin_available = Money::new(dec!(7_500));
        let mut positions = Vec::new();
        let competition = competition(10);

        let provider = FixedPriceProvider::single("BTCUSDT", dec!(100_000));
        let mut order = open_order(participant.id, "BTCUSDT", OrderSide::Buy, dec!(0.2), 2);
        let result = process(&mut order, &mut participant, &competition, &mut portfolio, &mut positions, &provider, now()).await;
        assert!(result.is_none());
        assert_eq!(order.status, types::enums::OrderStatus::Rejected);
        assert!(positions.is_empty());
        assert!(order.rejection_reason.unwrap().starts_with("Insufficient margin"));
    }

    /// E4: a close order naming the wrong symbol for its `position_id` still
    /// closes using the position's own stored symbol/side/quantity.
    #[tokio::test]
    async fn close_order_uses_the_resolved_positions_own_fields() {
        let mut participant = participant();
        let mut portfolio = Portfolio::new(participant.id, Money::new(dec!(10_000)));
        let mut positions = Vec::new();
        let competition = competition(10);

        let provider = FixedPriceProvider::single("BTCUSDT", dec!(100_000));
        let mut order = open_order(participant.id, "BTCUSDT", OrderSide::Buy, dec!(0.05), 2);
        process(&mut order, &mut participant, &competition, &mut portfolio, &mut positions, &provider, now())
            .await
            .expect("open should execute");
        let position_id = positions[0].id;

        // Close order mislabels the symbol as ETHUSDT; only BTCUSDT has a
        // price in this provider, so a naive implementation using the
        // order's symbol would fail to fetch a price at all.
        let provider = FixedPriceProvider::single("BTCUSDT", dec!(110_000));
        let mut close_order = Order::new_pending(
            participant.id,
            InvocationId::new(),
            Symbol::new("ETHUSDT"),
            AssetClass::Crypto,
            OrderAction::Close,
            None,
            None,
            None,
            Some(position_id),
            None,
            now(),
        );
        let trade = process(&mut close_order, &mut participant, &competition, &mut portfolio, &mut positions, &provider, now())
            .await
            .expect("close should execute using the position's own symbol");
        assert_eq!(trade.symbol.as_str(), "BTCUSDT");
        assert_eq!(trade.side, OrderSide::Sell);
    }

    #[tokio::test]
    async fn increase_and_decrease_orders_are_rejected_end_to_end() {
        let mut participant = participant();
        let mut portfolio = Portfolio::new(participant.id, Money::new(dec!(10_000)));
        let mut positions = Vec::new();
        let competition = competition(10);
        let provider = FixedPriceProvider::single("BTCUSDT", dec!(100_000));

        let mut order = Order::new_pending(
            participant.id,
            InvocationId::new(),
            Symbol::new("BTCUSDT"),
            AssetClass::Crypto,
            OrderAction::Increase,
            Some(OrderSide::Buy),
            Some(Quantity::new(dec!(0.01))),
            Some(2),
            None,
            None,
            now(),
        );
        let result = process(&mut order, &mut participant, &competition, &mut portfolio, &mut positions, &provider, now()).await;
        assert!(result.is_none());
        assert_eq!(order.status, types::enums::OrderStatus::Rejected);
    }
}
