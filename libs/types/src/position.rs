//! Position: one open CFD exposure (§3).
//!
//! This is a data-only entity. The arithmetic that creates, revalues and
//! closes a `Position` lives in the `cfd-engine` crate (C2); keeping it out
//! of this type keeps the shared-types crate free of business logic that
//! downstream crates would otherwise have to work around.

use crate::enums::{AssetClass, PositionSide};
use crate::ids::{ParticipantId, PortfolioId, PositionId, Symbol};
use crate::numeric::{Money, Price, Quantity};
use crate::order::ExitPlan;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub portfolio_id: PortfolioId,
    pub participant_id: ParticipantId,
    pub symbol: Symbol,
    pub asset_class: AssetClass,
    pub side: PositionSide,
    pub quantity: Quantity,
    pub entry_price: Price,
    pub current_price: Price,
    pub leverage: u32,
    /// Frozen at open: `entry_notional / leverage`. Never recomputed on revalue.
    pub margin_required: Money,
    pub notional_value: Money,
    pub unrealized_pnl: Money,
    pub unrealized_pnl_pct: rust_decimal::Decimal,
    pub exit_plan: Option<ExitPlan>,
    pub opened_at: DateTime<Utc>,
}

impl Position {
    pub fn entry_notional(&self) -> Money {
        self.quantity * self.entry_price
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> Position {
        Position {
            id: PositionId::new(),
            portfolio_id: PortfolioId::new(),
            participant_id: ParticipantId::new(),
            symbol: Symbol::new("BTCUSDT"),
            asset_class: AssetClass::Crypto,
            side: PositionSide::Long,
            quantity: Quantity::new(dec!(0.05)),
            entry_price: Price::new(dec!(100_000)),
            current_price: Price::new(dec!(100_000)),
            leverage: 2,
            margin_required: Money::new(dec!(2500)),
            notional_value: Money::new(dec!(5000)),
            unrealized_pnl: Money::ZERO,
            unrealized_pnl_pct: rust_decimal::Decimal::ZERO,
            exit_plan: None,
            opened_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn entry_notional_is_quantity_times_entry_price() {
        assert_eq!(sample().entry_notional().as_decimal(), dec!(5000.00));
    }
}
