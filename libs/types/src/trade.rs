//! Trade: one accounting entry produced by executing an order (§3, §4.4).

use crate::enums::{OrderSide, TradeAction};
use crate::ids::{OrderId, ParticipantId, PositionId, Symbol, TradeId};
use crate::numeric::{Money, Price, Quantity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub order_id: OrderId,
    pub participant_id: ParticipantId,
    /// Weak reference: null on close, because the position row is removed
    /// (§9, "Ownership of positions").
    pub position_id: Option<PositionId>,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub quantity: Quantity,
    pub price: Price,
    pub action: TradeAction,
    pub leverage: u32,
    pub notional_value: Money,
    /// Signed: positive on open/increase, negative on close/decrease.
    pub margin_impact: Money,
    pub realized_pnl: Option<Money>,
    pub realized_pnl_pct: Option<rust_decimal::Decimal>,
    pub executed_at: DateTime<Utc>,
}

impl Trade {
    #[allow(clippy::too_many_arguments)]
    pub fn opening(
        order_id: OrderId,
        participant_id: ParticipantId,
        position_id: PositionId,
        symbol: Symbol,
        side: OrderSide,
        quantity: Quantity,
        price: Price,
        leverage: u32,
        notional_value: Money,
        margin_required: Money,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TradeId::new(),
            order_id,
            participant_id,
            position_id: Some(position_id),
            symbol,
            side,
            quantity,
            price,
            action: TradeAction::Open,
            leverage,
            notional_value,
            margin_impact: margin_required,
            realized_pnl: None,
            realized_pnl_pct: None,
            executed_at: now,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn closing(
        order_id: OrderId,
        participant_id: ParticipantId,
        symbol: Symbol,
        side: OrderSide,
        quantity: Quantity,
        price: Price,
        leverage: u32,
        notional_value: Money,
        margin_released: Money,
        realized_pnl: Money,
        realized_pnl_pct: rust_decimal::Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TradeId::new(),
            order_id,
            participant_id,
            position_id: None,
            symbol,
            side,
            quantity,
            price,
            action: TradeAction::Close,
            leverage,
            notional_value,
            margin_impact: -margin_released,
            realized_pnl: Some(realized_pnl),
            realized_pnl_pct: Some(realized_pnl_pct),
            executed_at: now,
        }
    }

    pub fn is_winner(&self) -> bool {
        self.realized_pnl.map(|p| p.is_positive()).unwrap_or(false)
    }

    pub fn is_loser(&self) -> bool {
        self.realized_pnl
            .map(|p| p.as_decimal() < rust_decimal::Decimal::ZERO)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn opening_trade_has_positive_margin_impact_and_no_pnl() {
        let trade = Trade::opening(
            OrderId::new(),
            ParticipantId::new(),
            PositionId::new(),
            Symbol::new("BTCUSDT"),
            OrderSide::Buy,
            Quantity::new(dec!(0.05)),
            Price::new(dec!(100_000)),
            2,
            Money::new(dec!(5000)),
            Money::new(dec!(2500)),
            now(),
        );
        assert_eq!(trade.margin_impact.as_decimal(), dec!(2500));
        assert!(trade.realized_pnl.is_none());
        assert!(trade.position_id.is_some());
    }

    #[test]
    fn closing_trade_nulls_position_and_negates_margin_impact() {
        let trade = Trade::closing(
            OrderId::new(),
            ParticipantId::new(),
            Symbol::new("BTCUSDT"),
            OrderSide::Sell,
            Quantity::new(dec!(0.05)),
            Price::new(dec!(105_000)),
            2,
            Money::new(dec!(5250)),
            Money::new(dec!(2500)),
            Money::new(dec!(250)),
            dec!(10.0),
            now(),
        );
        assert!(trade.position_id.is_none());
        assert_eq!(trade.margin_impact.as_decimal(), dec!(-2500));
        assert!(trade.is_winner());
        assert!(!trade.is_loser());
    }
}
