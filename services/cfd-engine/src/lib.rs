//! CFD engine (C2): create, revalue, and close a single position.
//!
//! Grounded on `Position`'s open/revalue shape (`libs/types/src/position.rs`)
//! and on the original `cfd_engine.py`'s non-committing `close_position`: the
//! close here only *stages* the result (`CloseResult`), it does not delete
//! anything. The caller (`trading-engine`) controls the transaction boundary
//! so the position-row removal and the portfolio update land atomically.

use calc_kernel::{margin_required, notional, pnl_pct, unrealized_pnl};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use types::enums::{AssetClass, PositionSide};
use types::ids::{ParticipantId, PortfolioId, Symbol};
use types::numeric::{Money, Price, Quantity};
use types::order::ExitPlan;
use types::position::Position;

/// The staged result of closing a position. The position itself is *not*
/// mutated or dropped by this function; the caller removes the row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloseResult {
    pub realized_pnl: Money,
    pub realized_pnl_pct: Decimal,
    pub margin_released: Money,
}

/// Open a new position. `margin_required` is frozen here from the entry
/// notional and is never recomputed by `revalue`.
#[allow(clippy::too_many_arguments)]
pub fn open(
    portfolio_id: PortfolioId,
    participant_id: ParticipantId,
    symbol: Symbol,
    asset_class: AssetClass,
    side: PositionSide,
    quantity: Quantity,
    entry_price: Price,
    leverage: u32,
    exit_plan: Option<ExitPlan>,
    now: DateTime<Utc>,
) -> Position {
    let entry_notional = notional(quantity.as_decimal(), entry_price.as_decimal());
    let margin = margin_required(entry_notional, Decimal::from(leverage));

    Position {
        id: types::ids::PositionId::new(),
        portfolio_id,
        participant_id,
        symbol,
        asset_class,
        side,
        quantity,
        entry_price,
        current_price: entry_price,
        leverage,
        margin_required: Money::new(margin),
        notional_value: Money::new(entry_notional),
        unrealized_pnl: Money::ZERO,
        unrealized_pnl_pct: Decimal::ZERO,
        exit_plan,
        opened_at: now,
    }
}

/// Revalue a position at a new market price. `margin_required` is untouched:
/// it is locked at open time, not recomputed on every tick.
pub fn revalue(position: &mut Position, new_price: Price) {
    let upnl = unrealized_pnl(
        position.side,
        position.quantity.as_decimal(),
        position.entry_price.as_decimal(),
        new_price.as_decimal(),
    );
    let entry_notional = notional(position.quantity.as_decimal(), position.entry_price.as_decimal());

    position.current_price = new_price;
    position.notional_value = Money::new(notional(position.quantity.as_decimal(), new_price.as_decimal()));
    position.unrealized_pnl = Money::new(upnl);
    position.unrealized_pnl_pct = pnl_pct(upnl, entry_notional);
}

/// Apply a final revalue at the closing price and stage the realized result.
/// Does not remove or otherwise invalidate `position`; the caller decides
/// when the row disappears.
pub fn close(position: &mut Position, close_price: Price) -> CloseResult {
    revalue(position, close_price);
    CloseResult {
        realized_pnl: position.unrealized_pnl,
        realized_pnl_pct: position.unrealized_pnl_pct,
        margin_released: position.margin_required,
    }
}
