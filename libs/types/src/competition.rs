//! Competition: a time-bounded simulation configuration (§3).

use crate::enums::{AssetClass, CompetitionStatus};
use crate::errors::DomainError;
use crate::ids::CompetitionId;
use crate::numeric::Money;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competition {
    pub id: CompetitionId,
    pub name: String,
    pub status: CompetitionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// How often (minutes) the decision tick invokes this competition's agents.
    pub invocation_interval_minutes: u32,
    pub initial_capital: Money,
    pub max_leverage: u32,
    pub maintenance_margin_pct: Decimal,
    pub allowed_asset_classes: Vec<AssetClass>,
    pub max_participants: u32,
    pub market_hours_gated: bool,
}

impl Competition {
    /// Construct a competition, enforcing the invariants from §3:
    /// `end > start`, `1 <= max_leverage <= 100`, and maintenance margin
    /// strictly below the initial margin percentage implied by max leverage.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        invocation_interval_minutes: u32,
        initial_capital: Money,
        max_leverage: u32,
        maintenance_margin_pct: Decimal,
        allowed_asset_classes: Vec<AssetClass>,
        max_participants: u32,
        market_hours_gated: bool,
    ) -> Result<Self, DomainError> {
        if end_time <= start_time {
            return Err(DomainError::InvalidCompetitionWindow);
        }
        if !(1..=100).contains(&max_leverage) {
            return Err(DomainError::InvalidMaxLeverage(max_leverage));
        }
        let initial_margin_pct = Decimal::from(100) / Decimal::from(max_leverage);
        if maintenance_margin_pct >= initial_margin_pct {
            return Err(DomainError::MaintenanceMarginTooHigh {
                maintenance: maintenance_margin_pct,
                initial: initial_margin_pct,
            });
        }
        Ok(Self {
            id: CompetitionId::new(),
            name: name.into(),
            status: CompetitionStatus::Pending,
            start_time,
            end_time,
            invocation_interval_minutes,
            initial_capital,
            max_leverage,
            maintenance_margin_pct,
            allowed_asset_classes,
            max_participants,
            market_hours_gated,
        })
    }

    /// `100 / max_leverage`, the collateral an opener must put up as a
    /// fraction of notional (GLOSSARY: "Initial margin percentage").
    pub fn initial_margin_pct(&self) -> Decimal {
        Decimal::from(100) / Decimal::from(self.max_leverage)
    }

    pub fn is_decision_eligible(&self, now: DateTime<Utc>) -> bool {
        self.status == CompetitionStatus::Active && self.end_time > now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let end = DateTime::from_timestamp(1_700_600_000, 0).unwrap();
        (start, end)
    }

    #[test]
    fn rejects_end_before_start() {
        let (start, end) = window();
        let result = Competition::new(
            "x", end, start, 5, Money::new(dec!(10000)), 10, dec!(5), vec![AssetClass::Crypto], 10, false,
        );
        assert!(matches!(result, Err(DomainError::InvalidCompetitionWindow)));
    }

    #[test]
    fn rejects_leverage_out_of_range() {
        let (start, end) = window();
        let result = Competition::new(
            "x", start, end, 5, Money::new(dec!(10000)), 0, dec!(5), vec![AssetClass::Crypto], 10, false,
        );
        assert!(matches!(result, Err(DomainError::InvalidMaxLeverage(0))));
    }

    #[test]
    fn rejects_maintenance_margin_at_or_above_initial() {
        let (start, end) = window();
        // max_leverage=10 -> initial_margin_pct = 10; maintenance must be < 10.
        let result = Competition::new(
            "x", start, end, 5, Money::new(dec!(10000)), 10, dec!(10), vec![AssetClass::Crypto], 10, false,
        );
        assert!(matches!(result, Err(DomainError::MaintenanceMarginTooHigh { .. })));
    }

    #[test]
    fn accepts_a_valid_configuration() {
        let (start, end) = window();
        let comp = Competition::new(
            "Q3 Showdown", start, end, 5, Money::new(dec!(10000)), 10, dec!(5), vec![AssetClass::Crypto], 10, false,
        )
        .unwrap();
        assert_eq!(comp.initial_margin_pct(), dec!(10));
    }
}
