//! Portfolio: one per participant, the account summary (§3).
//!
//! This struct holds only the aggregate fields; the accounting identities
//! that keep them consistent are enforced by the `portfolio-manager` crate's
//! `update` function, not by methods here.

use crate::ids::{ParticipantId, PortfolioId};
use crate::numeric::Money;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub id: PortfolioId,
    pub participant_id: ParticipantId,
    pub cash_balance: Money,
    pub equity: Money,
    pub margin_used: Money,
    pub margin_available: Money,
    pub realized_pnl: Money,
    pub unrealized_pnl: Money,
    pub total_pnl: Money,
    pub current_leverage: Decimal,
    /// `None` when `margin_used == 0` (undefined, per §3).
    pub margin_level: Option<Decimal>,
}

impl Portfolio {
    pub fn new(participant_id: ParticipantId, initial_capital: Money) -> Self {
        Self {
            id: PortfolioId::new(),
            participant_id,
            cash_balance: initial_capital,
            equity: initial_capital,
            margin_used: Money::ZERO,
            margin_available: initial_capital,
            realized_pnl: Money::ZERO,
            unrealized_pnl: Money::ZERO,
            total_pnl: Money::ZERO,
            current_leverage: Decimal::ZERO,
            margin_level: None,
        }
    }
}

/// A snapshot of a portfolio at a point in time (§3), appended after every
/// portfolio-manager update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioHistoryPoint {
    pub participant_id: ParticipantId,
    pub cash_balance: Money,
    pub equity: Money,
    pub margin_used: Money,
    pub realized_pnl: Money,
    pub unrealized_pnl: Money,
    pub total_pnl: Money,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn new_portfolio_has_full_margin_available_and_no_margin_level() {
        let p = Portfolio::new(ParticipantId::new(), Money::new(dec!(10_000)));
        assert_eq!(p.margin_available.as_decimal(), dec!(10_000));
        assert!(p.margin_level.is_none());
    }
}
