//! Order: an intent to open, close, increase, or decrease a CFD position.
//!
//! Implements §3 (Order) and §6.1 (agent response grammar) of the
//! specification. Only `OrderType::Market` is executed today; `Limit`
//! orders are accepted by the data model but rejected at validation
//! (§4.4 rule set does not implement limit matching).

use crate::enums::{AssetClass, OrderAction, OrderSide, OrderStatus, OrderType};
use crate::ids::{InvocationId, OrderId, ParticipantId, PositionId, Symbol};
use crate::numeric::{Price, Quantity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The optional exit plan an agent may attach when opening a position.
/// Advisory only: nothing in the trading engine enforces it automatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitPlan {
    pub profit_target: Option<Price>,
    pub stop_loss: Option<Price>,
    pub invalidation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub participant_id: ParticipantId,
    pub invocation_id: InvocationId,
    pub symbol: Symbol,
    pub asset_class: AssetClass,
    pub order_type: OrderType,
    pub action: OrderAction,
    pub side: Option<OrderSide>,
    pub quantity: Option<Quantity>,
    pub requested_price: Option<Price>,
    pub executed_price: Option<Price>,
    pub leverage: Option<u32>,
    pub position_id: Option<PositionId>,
    pub exit_plan: Option<ExitPlan>,
    pub status: OrderStatus,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Build a freshly-parsed, not-yet-validated order in `Pending` status.
    #[allow(clippy::too_many_arguments)]
    pub fn new_pending(
        participant_id: ParticipantId,
        invocation_id: InvocationId,
        symbol: Symbol,
        asset_class: AssetClass,
        action: OrderAction,
        side: Option<OrderSide>,
        quantity: Option<Quantity>,
        leverage: Option<u32>,
        position_id: Option<PositionId>,
        exit_plan: Option<ExitPlan>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OrderId::new(),
            participant_id,
            invocation_id,
            symbol,
            asset_class,
            order_type: OrderType::Market,
            action,
            side,
            quantity,
            requested_price: None,
            executed_price: None,
            leverage,
            position_id,
            exit_plan,
            status: OrderStatus::Pending,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn reject(&mut self, reason: impl Into<String>, now: DateTime<Utc>) {
        self.status = OrderStatus::Rejected;
        self.rejection_reason = Some(reason.into());
        self.updated_at = now;
    }

    pub fn execute(&mut self, fill_price: Price, now: DateTime<Utc>) {
        self.status = OrderStatus::Executed;
        self.executed_price = Some(fill_price);
        self.updated_at = now;
    }
}
