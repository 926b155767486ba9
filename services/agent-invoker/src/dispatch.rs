//! Turns a parsed [`DecisionReply`] into executed/rejected orders (§4.5, §6.1).
//!
//! Each [`crate::parser::OrderSpec`] is converted into an `Order` and driven
//! through `trading_engine::process` one at a time, in the order the agent
//! listed them, so that an early close can free margin an later-listed open
//! in the same reply depends on.

use chrono::{DateTime, Utc};
use market_data::MarketDataProvider;
use rust_decimal::Decimal;
use types::competition::Competition;
use types::enums::{AssetClass, OrderAction, OrderSide};
use types::ids::{InvocationId, ParticipantId, PositionId, Symbol};
use types::invocation::OrderExecutionResult;
use types::numeric::Quantity;
use types::order::{ExitPlan, Order};
use types::participant::Participant;
use types::portfolio::Portfolio;
use types::position::Position;

use crate::parser::{ExitPlanSpec, OrderSpec};

#[derive(Debug, Clone, thiserror::Error)]
pub enum OrderSpecError {
    #[error("unknown order action {0:?}")]
    UnknownAction(String),
    #[error("unknown order side {0:?}")]
    UnknownSide(String),
    #[error("position_id {0:?} is not a valid identifier")]
    MalformedPositionId(String),
}

fn parse_action(raw: &str) -> Result<OrderAction, OrderSpecError> {
    match raw.to_ascii_lowercase().as_str() {
        "open" => Ok(OrderAction::Open),
        "close" => Ok(OrderAction::Close),
        "increase" => Ok(OrderAction::Increase),
        "decrease" => Ok(OrderAction::Decrease),
        other => Err(OrderSpecError::UnknownAction(other.to_string())),
    }
}

fn parse_side(raw: &str) -> Result<OrderSide, OrderSpecError> {
    match raw.to_ascii_lowercase().as_str() {
        "buy" | "long" => Ok(OrderSide::Buy),
        "sell" | "short" => Ok(OrderSide::Sell),
        other => Err(OrderSpecError::UnknownSide(other.to_string())),
    }
}

fn parse_position_id(raw: &str) -> Result<PositionId, OrderSpecError> {
    uuid::Uuid::parse_str(raw)
        .map(PositionId::from_uuid)
        .map_err(|_| OrderSpecError::MalformedPositionId(raw.to_string()))
}

fn convert_exit_plan(spec: ExitPlanSpec) -> ExitPlan {
    ExitPlan {
        profit_target: spec.profit_target.map(types::numeric::Price::new),
        stop_loss: spec.stop_loss.map(types::numeric::Price::new),
        invalidation: spec.invalidation,
    }
}

/// Build an `Order` from the agent's raw spec. A malformed action/side/
/// position-id string is not a Rust error for the caller: it is turned into
/// an already-`Rejected` order, matching §7's "unparseable fields reject the
/// order, not the invocation" stance.
fn build_order(
    spec: OrderSpec,
    participant_id: ParticipantId,
    invocation_id: InvocationId,
    now: DateTime<Utc>,
) -> Order {
    let symbol = Symbol::new(spec.symbol.clone());
    let exit_plan = spec.exit_plan.map(convert_exit_plan);

    let parsed = (|| -> Result<Order, OrderSpecError> {
        let action = parse_action(&spec.action)?;
        let side = spec.side.as_deref().map(parse_side).transpose()?;
        let position_id = spec.position_id.as_deref().map(parse_position_id).transpose()?;
        Ok(Order::new_pending(
            participant_id,
            invocation_id,
            symbol.clone(),
            AssetClass::Crypto,
            action,
            side,
            spec.quantity.map(Quantity::new),
            spec.leverage,
            position_id,
            exit_plan.clone(),
            now,
        ))
    })();

    match parsed {
        Ok(order) => order,
        Err(e) => {
            let mut order = Order::new_pending(
                participant_id,
                invocation_id,
                symbol,
                AssetClass::Crypto,
                OrderAction::Open,
                None,
                spec.quantity.map(Quantity::new),
                spec.leverage,
                None,
                exit_plan,
                now,
            );
            order.reject(e.to_string(), now);
            order
        }
    }
}

/// Close-order correction (§4.5, §6.1): if `order` names a `position_id`,
/// the stored position is authoritative. Its symbol always replaces the
/// agent's; its side/quantity only fill in what the agent left unset — if
/// the agent omitted `side` it becomes the opposite of the position's side,
/// and if it omitted `quantity` it becomes the position's own quantity.
/// `trading_engine::executor::execute_close` enforces the symbol/price
/// resolution independently; doing it here too means a rejected-before-
/// execution order (e.g. for insufficient margin on a close — impossible
/// today, but kept for robustness) still records the corrected fields
/// rather than the agent's.
fn apply_close_symbol_correction(order: &mut Order, positions: &[Position]) {
    if order.action != OrderAction::Close {
        return;
    }
    let Some(position_id) = order.position_id else { return };
    let Some(position) = positions.iter().find(|p| p.id == position_id) else { return };
    order.symbol = position.symbol.clone();
    order.asset_class = position.asset_class;
    order.side = order.side.or(Some(position.side.closing_order_side()));
    order.quantity = order.quantity.or(Some(position.quantity));
}

/// Drive one proposed order end to end: convert, correct, validate, execute.
/// Never returns an `Err` for business-rule failures — those are recorded as
/// a rejected `Order` and reflected in the returned [`OrderExecutionResult`].
#[allow(clippy::too_many_arguments)]
pub async fn dispatch_order(
    spec: OrderSpec,
    participant: &mut Participant,
    invocation_id: InvocationId,
    competition: &Competition,
    portfolio: &mut Portfolio,
    positions: &mut Vec<Position>,
    provider: &dyn MarketDataProvider,
    now: DateTime<Utc>,
) -> (Order, OrderExecutionResult, Option<types::trade::Trade>) {
    let mut order = build_order(spec, participant.id, invocation_id, now);

    if order.status == types::enums::OrderStatus::Rejected {
        let result = OrderExecutionResult {
            order_id: order.id,
            validation_passed: false,
            rejection_reason: order.rejection_reason.clone(),
            status: order.status,
            executed_price: None,
        };
        return (order, result, None);
    }

    apply_close_symbol_correction(&mut order, positions);

    let trade = trading_engine::process(&mut order, participant, competition, portfolio, positions, provider, now).await;

    let result = OrderExecutionResult {
        order_id: order.id,
        validation_passed: order.status == types::enums::OrderStatus::Executed,
        rejection_reason: order.rejection_reason.clone(),
        status: order.status,
        executed_price: order.executed_price,
    };
    (order, result, trade)
}

pub fn sum_confidence(values: &[Decimal]) -> Decimal {
    values.iter().copied().sum()
}
