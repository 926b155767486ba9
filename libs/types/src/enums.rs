//! Small closed-world enums shared across entities (§3).

use serde::{Deserialize, Serialize};

/// Broad category of the traded instrument. Determines which market-data
/// provider and which trading-hours gate apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Crypto,
    Equity,
    Forex,
    Commodity,
    Index,
}

/// The direction requested on an order: what the agent asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

/// The direction of an open CFD exposure, canonicalized from `OrderSide` at
/// open time (`buy -> long`, `sell -> short`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

impl From<OrderSide> for PositionSide {
    fn from(side: OrderSide) -> Self {
        match side {
            OrderSide::Buy => PositionSide::Long,
            OrderSide::Sell => PositionSide::Short,
        }
    }
}

impl PositionSide {
    /// The order side that would close a position of this side.
    pub fn closing_order_side(self) -> OrderSide {
        match self {
            PositionSide::Long => OrderSide::Sell,
            PositionSide::Short => OrderSide::Buy,
        }
    }
}

/// Only `Market` is implemented (§3); `Limit` is modeled so the wire
/// grammar and data model are forward-compatible, but the trading engine
/// rejects it today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
}

/// What an order intends to do to a participant's position set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderAction {
    Open,
    Close,
    Increase,
    Decrease,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Executed,
    Rejected,
    Cancelled,
}

/// What a trade record represents; mirrors `OrderAction` but is attached to
/// the already-executed accounting entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Open,
    Close,
    Increase,
    Decrease,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantStatus {
    Active,
    Liquidated,
    Disqualified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompetitionStatus {
    Pending,
    Active,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationStatus {
    Pending,
    Success,
    Timeout,
    Error,
    InvalidResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_side_canonicalizes_to_position_side() {
        assert_eq!(PositionSide::from(OrderSide::Buy), PositionSide::Long);
        assert_eq!(PositionSide::from(OrderSide::Sell), PositionSide::Short);
    }

    #[test]
    fn closing_side_is_the_opposite_of_the_position() {
        assert_eq!(PositionSide::Long.closing_order_side(), OrderSide::Sell);
        assert_eq!(PositionSide::Short.closing_order_side(), OrderSide::Buy);
    }

    #[test]
    fn invocation_status_serializes_snake_case() {
        let s = serde_json::to_string(&InvocationStatus::InvalidResponse).unwrap();
        assert_eq!(s, "\"invalid_response\"");
    }
}
