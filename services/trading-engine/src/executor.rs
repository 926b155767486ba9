//! Order execution (§4.4 rule 5 onward): turn a validated order into a
//! position mutation, a `Trade` accounting entry, and a refreshed portfolio.
//!
//! Grounded on `trading_engine.py::execute_order` / `_execute_open` /
//! `_execute_close`. The crucial adaptation from that original: on close,
//! the `Trade` record is built from the **resolved position's** stored
//! symbol/side/quantity, never from the order's — an agent can submit a
//! close order naming the wrong symbol for a `position_id` it owns, and the
//! position's own fields are what actually closed (§8, "close-symbol
//! correction").

use calc_kernel::{margin_required, notional};
use cfd_engine::{close as cfd_close, open as cfd_open};
use chrono::{DateTime, Utc};
use market_data::MarketDataProvider;
use rust_decimal::Decimal;
use types::enums::{OrderAction, PositionSide};
use types::numeric::{Money, Price};
use types::order::Order;
use types::participant::Participant;
use types::portfolio::Portfolio;
use types::position::Position;
use types::trade::Trade;

use portfolio_manager as pm;

use crate::validator::RejectionReason;

/// Fetch the current execution price, rejecting the order in place if the
/// feed has nothing for this symbol.
async fn execution_price(order: &mut Order, provider: &dyn MarketDataProvider, now: DateTime<Utc>) -> Option<Price> {
    match provider.price(&order.symbol).await {
        Some(price) => Some(price),
        None => {
            order.reject(RejectionReason::PriceUnavailable(order.symbol.clone()).to_string(), now);
            None
        }
    }
}

/// Execute an already-`validate`d open order: stage a new `Position`, append
/// it, recompute the portfolio, and record the opening `Trade`.
pub async fn execute_open(
    order: &mut Order,
    participant: &mut Participant,
    portfolio: &mut Portfolio,
    positions: &mut Vec<Position>,
    provider: &dyn MarketDataProvider,
    now: DateTime<Utc>,
) -> Option<Trade> {
    debug_assert_eq!(order.action, OrderAction::Open);
    let price = execution_price(order, provider, now).await?;
    let side = order.side?;
    let quantity = order.quantity?;
    let leverage = order.leverage.unwrap_or(1);

    let position = cfd_open(
        portfolio.id,
        participant.id,
        order.symbol.clone(),
        order.asset_class,
        PositionSide::from(side),
        quantity,
        price,
        leverage,
        order.exit_plan.clone(),
        now,
    );
    let position_id = position.id;
    let margin_required_amount = position.margin_required;
    let notional_value = position.notional_value;
    positions.push(position);

    pm::allocate_margin(portfolio, margin_required_amount);
    pm::update(portfolio, positions, now);
    pm::update_participant_equity(participant, portfolio.equity);

    order.execute(price, now);

    Some(Trade::opening(
        order.id,
        participant.id,
        position_id,
        order.symbol.clone(),
        side,
        quantity,
        price,
        leverage,
        notional_value,
        margin_required_amount,
        now,
    ))
}

/// Execute an already-`validate`d close order: resolve the position by id,
/// close it via the CFD engine, remove it from the live set, recompute the
/// portfolio, and record the closing `Trade` using the position's own
/// symbol/side/quantity rather than the order's.
pub async fn execute_close(
    order: &mut Order,
    participant: &mut Participant,
    portfolio: &mut Portfolio,
    positions: &mut Vec<Position>,
    provider: &dyn MarketDataProvider,
    now: DateTime<Utc>,
) -> Option<Trade> {
    debug_assert_eq!(order.action, OrderAction::Close);
    let position_id = order.position_id?;
    let index = positions.iter().position(|p| p.id == position_id)?;

    let symbol = positions[index].symbol.clone();
    let price = match provider.price(&symbol).await {
        Some(price) => price,
        None => {
            order.reject(RejectionReason::PriceUnavailable(symbol).to_string(), now);
            return None;
        }
    };

    let mut position = positions.remove(index);
    let result = cfd_close(&mut position, price);
    let closing_side = position.side.closing_order_side();

    pm::release_margin(portfolio, result.realized_pnl);
    pm::update(portfolio, positions, now);
    pm::update_participant_equity(participant, portfolio.equity);
    participant.record_close(result.realized_pnl.as_decimal());

    order.execute(price, now);

    Some(Trade::closing(
        order.id,
        participant.id,
        position.symbol,
        closing_side,
        position.quantity,
        price,
        position.leverage,
        notional(position.quantity.as_decimal(), price.as_decimal()).into(),
        result.margin_released,
        result.realized_pnl,
        result.realized_pnl_pct,
        now,
    ))
}

/// Recompute what margin an open of this size/leverage at the current price
/// would require, for callers that need it before `validate` (e.g. the
/// agent-invoker's portfolio snapshot). Exposed so downstream crates don't
/// reach past this crate's `validate` into `calc_kernel` directly for the
/// same formula used at validation time.
pub fn preview_margin_required(quantity: Decimal, price: Decimal, leverage: u32) -> Money {
    Money::new(margin_required(notional(quantity, price), Decimal::from(leverage)))
}
