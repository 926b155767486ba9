//! `Store` over a real Postgres database via `sqlx::PgPool`.
//!
//! Grounded on the runtime-query style (`sqlx::query(..).bind(..).fetch_*`,
//! `row.get::<T, _>("column")`) used for paper-trading persistence in the
//! wider example pack rather than `query!`'s compile-time checked macros,
//! since there is no live database to check against at build time here.
//!
//! `save_participant_state` is the one write path that must serialize with
//! concurrent writers at the database level even when two different
//! processes share this store (the in-process [`crate::participant_lock`]
//! only protects a single process): it opens a transaction and takes
//! `SELECT ... FOR UPDATE` on the participant row before writing.

use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use types::competition::Competition;
use types::enums::{
    AssetClass, CompetitionStatus, InvocationStatus, OrderAction, OrderSide, OrderStatus,
    OrderType, ParticipantStatus, PositionSide, TradeAction,
};
use types::ids::{CompetitionId, InvocationId, OrderId, ParticipantId, PortfolioId, PositionId, Symbol, TradeId};
use types::invocation::Invocation;
use types::numeric::{Money, Price, Quantity};
use types::order::{ExitPlan, Order};
use types::participant::Participant;
use types::portfolio::{Portfolio, PortfolioHistoryPoint};
use types::position::Position;
use types::trade::Trade;

use crate::error::PersistenceError;
use crate::store::{ParticipantState, Store};

#[derive(Debug, thiserror::Error)]
#[error("unrecognized enum value in column: {0}")]
struct UnrecognizedEnumValue(String);

fn decode_err(value: &str) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(UnrecognizedEnumValue(value.to_string())))
}

fn asset_class_str(v: AssetClass) -> &'static str {
    match v {
        AssetClass::Crypto => "crypto",
        AssetClass::Equity => "equity",
        AssetClass::Forex => "forex",
        AssetClass::Commodity => "commodity",
        AssetClass::Index => "index",
    }
}

fn asset_class_from_str(s: &str) -> Result<AssetClass, sqlx::Error> {
    Ok(match s {
        "crypto" => AssetClass::Crypto,
        "equity" => AssetClass::Equity,
        "forex" => AssetClass::Forex,
        "commodity" => AssetClass::Commodity,
        "index" => AssetClass::Index,
        other => return Err(decode_err(other)),
    })
}

fn order_side_str(v: OrderSide) -> &'static str {
    match v {
        OrderSide::Buy => "buy",
        OrderSide::Sell => "sell",
    }
}

fn order_side_from_str(s: &str) -> Result<OrderSide, sqlx::Error> {
    Ok(match s {
        "buy" => OrderSide::Buy,
        "sell" => OrderSide::Sell,
        other => return Err(decode_err(other)),
    })
}

fn position_side_str(v: PositionSide) -> &'static str {
    match v {
        PositionSide::Long => "long",
        PositionSide::Short => "short",
    }
}

fn position_side_from_str(s: &str) -> Result<PositionSide, sqlx::Error> {
    Ok(match s {
        "long" => PositionSide::Long,
        "short" => PositionSide::Short,
        other => return Err(decode_err(other)),
    })
}

fn order_type_str(v: OrderType) -> &'static str {
    match v {
        OrderType::Market => "market",
        OrderType::Limit => "limit",
    }
}

fn order_type_from_str(s: &str) -> Result<OrderType, sqlx::Error> {
    Ok(match s {
        "market" => OrderType::Market,
        "limit" => OrderType::Limit,
        other => return Err(decode_err(other)),
    })
}

fn order_action_str(v: OrderAction) -> &'static str {
    match v {
        OrderAction::Open => "open",
        OrderAction::Close => "close",
        OrderAction::Increase => "increase",
        OrderAction::Decrease => "decrease",
    }
}

fn order_action_from_str(s: &str) -> Result<OrderAction, sqlx::Error> {
    Ok(match s {
        "open" => OrderAction::Open,
        "close" => OrderAction::Close,
        "increase" => OrderAction::Increase,
        "decrease" => OrderAction::Decrease,
        other => return Err(decode_err(other)),
    })
}

fn order_status_str(v: OrderStatus) -> &'static str {
    match v {
        OrderStatus::Pending => "pending",
        OrderStatus::Executed => "executed",
        OrderStatus::Rejected => "rejected",
        OrderStatus::Cancelled => "cancelled",
    }
}

fn order_status_from_str(s: &str) -> Result<OrderStatus, sqlx::Error> {
    Ok(match s {
        "pending" => OrderStatus::Pending,
        "executed" => OrderStatus::Executed,
        "rejected" => OrderStatus::Rejected,
        "cancelled" => OrderStatus::Cancelled,
        other => return Err(decode_err(other)),
    })
}

fn trade_action_str(v: TradeAction) -> &'static str {
    match v {
        TradeAction::Open => "open",
        TradeAction::Close => "close",
        TradeAction::Increase => "increase",
        TradeAction::Decrease => "decrease",
    }
}

fn trade_action_from_str(s: &str) -> Result<TradeAction, sqlx::Error> {
    Ok(match s {
        "open" => TradeAction::Open,
        "close" => TradeAction::Close,
        "increase" => TradeAction::Increase,
        "decrease" => TradeAction::Decrease,
        other => return Err(decode_err(other)),
    })
}

fn participant_status_str(v: ParticipantStatus) -> &'static str {
    match v {
        ParticipantStatus::Active => "active",
        ParticipantStatus::Liquidated => "liquidated",
        ParticipantStatus::Disqualified => "disqualified",
    }
}

fn participant_status_from_str(s: &str) -> Result<ParticipantStatus, sqlx::Error> {
    Ok(match s {
        "active" => ParticipantStatus::Active,
        "liquidated" => ParticipantStatus::Liquidated,
        "disqualified" => ParticipantStatus::Disqualified,
        other => return Err(decode_err(other)),
    })
}

fn competition_status_str(v: CompetitionStatus) -> &'static str {
    match v {
        CompetitionStatus::Pending => "pending",
        CompetitionStatus::Active => "active",
        CompetitionStatus::Completed => "completed",
        CompetitionStatus::Cancelled => "cancelled",
    }
}

fn competition_status_from_str(s: &str) -> Result<CompetitionStatus, sqlx::Error> {
    Ok(match s {
        "pending" => CompetitionStatus::Pending,
        "active" => CompetitionStatus::Active,
        "completed" => CompetitionStatus::Completed,
        "cancelled" => CompetitionStatus::Cancelled,
        other => return Err(decode_err(other)),
    })
}

fn invocation_status_str(v: InvocationStatus) -> &'static str {
    match v {
        InvocationStatus::Pending => "pending",
        InvocationStatus::Success => "success",
        InvocationStatus::Timeout => "timeout",
        InvocationStatus::Error => "error",
        InvocationStatus::InvalidResponse => "invalid_response",
    }
}

fn invocation_status_from_str(s: &str) -> Result<InvocationStatus, sqlx::Error> {
    Ok(match s {
        "pending" => InvocationStatus::Pending,
        "success" => InvocationStatus::Success,
        "timeout" => InvocationStatus::Timeout,
        "error" => InvocationStatus::Error,
        "invalid_response" => InvocationStatus::InvalidResponse,
        other => return Err(decode_err(other)),
    })
}

fn competition_from_row(row: &sqlx::postgres::PgRow) -> Result<Competition, sqlx::Error> {
    let allowed_asset_classes: Vec<String> = row.try_get("allowed_asset_classes")?;
    let allowed_asset_classes = allowed_asset_classes
        .iter()
        .map(|s| asset_class_from_str(s))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Competition {
        id: CompetitionId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        status: competition_status_from_str(row.try_get::<String, _>("status")?.as_str())?,
        start_time: row.try_get("start_time")?,
        end_time: row.try_get("end_time")?,
        invocation_interval_minutes: row.try_get::<i32, _>("invocation_interval_minutes")? as u32,
        initial_capital: Money::new(row.try_get("initial_capital")?),
        max_leverage: row.try_get::<i32, _>("max_leverage")? as u32,
        maintenance_margin_pct: row.try_get("maintenance_margin_pct")?,
        allowed_asset_classes,
        max_participants: row.try_get::<i32, _>("max_participants")? as u32,
        market_hours_gated: row.try_get("market_hours_gated")?,
    })
}

fn participant_from_row(row: &sqlx::postgres::PgRow) -> Result<Participant, sqlx::Error> {
    Ok(Participant {
        id: ParticipantId::from_uuid(row.try_get("id")?),
        competition_id: CompetitionId::from_uuid(row.try_get("competition_id")?),
        display_name: row.try_get("display_name")?,
        agent_provider: row.try_get("agent_provider")?,
        agent_model: row.try_get("agent_model")?,
        agent_config: row.try_get("agent_config")?,
        status: participant_status_from_str(row.try_get::<String, _>("status")?.as_str())?,
        initial_capital: Money::new(row.try_get("initial_capital")?),
        current_equity: Money::new(row.try_get("current_equity")?),
        peak_equity: Money::new(row.try_get("peak_equity")?),
        total_trades: row.try_get::<i32, _>("total_trades")? as u32,
        winning_trades: row.try_get::<i32, _>("winning_trades")? as u32,
        losing_trades: row.try_get::<i32, _>("losing_trades")? as u32,
    })
}

fn portfolio_from_row(row: &sqlx::postgres::PgRow) -> Result<Portfolio, sqlx::Error> {
    let margin_level: Option<Decimal> = row.try_get("margin_level")?;
    Ok(Portfolio {
        id: PortfolioId::from_uuid(row.try_get("id")?),
        participant_id: ParticipantId::from_uuid(row.try_get("participant_id")?),
        cash_balance: Money::new(row.try_get("cash_balance")?),
        equity: Money::new(row.try_get("equity")?),
        margin_used: Money::new(row.try_get("margin_used")?),
        margin_available: Money::new(row.try_get("margin_available")?),
        realized_pnl: Money::new(row.try_get("realized_pnl")?),
        unrealized_pnl: Money::new(row.try_get("unrealized_pnl")?),
        total_pnl: Money::new(row.try_get("total_pnl")?),
        current_leverage: row.try_get("current_leverage")?,
        margin_level,
    })
}

fn position_from_row(row: &sqlx::postgres::PgRow) -> Result<Position, sqlx::Error> {
    let exit_plan: Option<serde_json::Value> = row.try_get("exit_plan")?;
    Ok(Position {
        id: PositionId::from_uuid(row.try_get("id")?),
        portfolio_id: PortfolioId::from_uuid(row.try_get("portfolio_id")?),
        participant_id: ParticipantId::from_uuid(row.try_get("participant_id")?),
        symbol: Symbol::new(row.try_get::<String, _>("symbol")?),
        asset_class: asset_class_from_str(row.try_get::<String, _>("asset_class")?.as_str())?,
        side: position_side_from_str(row.try_get::<String, _>("side")?.as_str())?,
        quantity: Quantity::new(row.try_get("quantity")?),
        entry_price: Price::new(row.try_get("entry_price")?),
        current_price: Price::new(row.try_get("current_price")?),
        leverage: row.try_get::<i32, _>("leverage")? as u32,
        margin_required: Money::new(row.try_get("margin_required")?),
        notional_value: Money::new(row.try_get("notional_value")?),
        unrealized_pnl: Money::new(row.try_get("unrealized_pnl")?),
        unrealized_pnl_pct: row.try_get("unrealized_pnl_pct")?,
        exit_plan: exit_plan.map(serde_json::from_value).transpose().map_err(sqlx::Error::Decode)?,
        opened_at: row.try_get("opened_at")?,
    })
}

fn order_from_row(row: &sqlx::postgres::PgRow) -> Result<Order, sqlx::Error> {
    let side: Option<String> = row.try_get("side")?;
    let quantity: Option<Decimal> = row.try_get("quantity")?;
    let requested_price: Option<Decimal> = row.try_get("requested_price")?;
    let executed_price: Option<Decimal> = row.try_get("executed_price")?;
    let leverage: Option<i32> = row.try_get("leverage")?;
    let position_id: Option<uuid::Uuid> = row.try_get("position_id")?;
    let exit_plan: Option<serde_json::Value> = row.try_get("exit_plan")?;
    Ok(Order {
        id: OrderId::from_uuid(row.try_get("id")?),
        participant_id: ParticipantId::from_uuid(row.try_get("participant_id")?),
        invocation_id: InvocationId::from_uuid(row.try_get("invocation_id")?),
        symbol: Symbol::new(row.try_get::<String, _>("symbol")?),
        asset_class: asset_class_from_str(row.try_get::<String, _>("asset_class")?.as_str())?,
        order_type: order_type_from_str(row.try_get::<String, _>("order_type")?.as_str())?,
        action: order_action_from_str(row.try_get::<String, _>("action")?.as_str())?,
        side: side.map(|s| order_side_from_str(&s)).transpose()?,
        quantity: quantity.map(Quantity::new),
        requested_price: requested_price.map(Price::new),
        executed_price: executed_price.map(Price::new),
        leverage: leverage.map(|v| v as u32),
        position_id: position_id.map(PositionId::from_uuid),
        exit_plan: exit_plan.map(serde_json::from_value).transpose().map_err(sqlx::Error::Decode)?,
        status: order_status_from_str(row.try_get::<String, _>("status")?.as_str())?,
        rejection_reason: row.try_get("rejection_reason")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn trade_from_row(row: &sqlx::postgres::PgRow) -> Result<Trade, sqlx::Error> {
    let position_id: Option<uuid::Uuid> = row.try_get("position_id")?;
    let realized_pnl: Option<Decimal> = row.try_get("realized_pnl")?;
    let realized_pnl_pct: Option<Decimal> = row.try_get("realized_pnl_pct")?;
    Ok(Trade {
        id: TradeId::from_uuid(row.try_get("id")?),
        order_id: OrderId::from_uuid(row.try_get("order_id")?),
        participant_id: ParticipantId::from_uuid(row.try_get("participant_id")?),
        position_id: position_id.map(PositionId::from_uuid),
        symbol: Symbol::new(row.try_get::<String, _>("symbol")?),
        side: order_side_from_str(row.try_get::<String, _>("side")?.as_str())?,
        quantity: Quantity::new(row.try_get("quantity")?),
        price: Price::new(row.try_get("price")?),
        action: trade_action_from_str(row.try_get::<String, _>("action")?.as_str())?,
        leverage: row.try_get::<i32, _>("leverage")? as u32,
        notional_value: Money::new(row.try_get("notional_value")?),
        margin_impact: Money::new(row.try_get("margin_impact")?),
        realized_pnl: realized_pnl.map(Money::new),
        realized_pnl_pct,
        executed_at: row.try_get("executed_at")?,
    })
}

fn history_point_from_row(row: &sqlx::postgres::PgRow) -> Result<PortfolioHistoryPoint, sqlx::Error> {
    Ok(PortfolioHistoryPoint {
        participant_id: ParticipantId::from_uuid(row.try_get("participant_id")?),
        cash_balance: Money::new(row.try_get("cash_balance")?),
        equity: Money::new(row.try_get("equity")?),
        margin_used: Money::new(row.try_get("margin_used")?),
        realized_pnl: Money::new(row.try_get("realized_pnl")?),
        unrealized_pnl: Money::new(row.try_get("unrealized_pnl")?),
        total_pnl: Money::new(row.try_get("total_pnl")?),
        recorded_at: row.try_get("recorded_at")?,
    })
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<(), PersistenceError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Store for PgStore {
    async fn insert_competition(&self, competition: &Competition) -> Result<(), PersistenceError> {
        let allowed: Vec<&str> = competition.allowed_asset_classes.iter().copied().map(asset_class_str).collect();
        sqlx::query(
            "INSERT INTO competitions (id, name, status, start_time, end_time, invocation_interval_minutes, \
             initial_capital, max_leverage, maintenance_margin_pct, allowed_asset_classes, max_participants, \
             market_hours_gated) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(competition.id.as_uuid())
        .bind(&competition.name)
        .bind(competition_status_str(competition.status))
        .bind(competition.start_time)
        .bind(competition.end_time)
        .bind(competition.invocation_interval_minutes as i32)
        .bind(competition.initial_capital.as_decimal())
        .bind(competition.max_leverage as i32)
        .bind(competition.maintenance_margin_pct)
        .bind(&allowed)
        .bind(competition.max_participants as i32)
        .bind(competition.market_hours_gated)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_competition(&self, id: CompetitionId) -> Result<Option<Competition>, PersistenceError> {
        let row = sqlx::query("SELECT * FROM competitions WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(competition_from_row).transpose().map_err(PersistenceError::from)
    }

    async fn list_competitions_with_status(&self, status: CompetitionStatus) -> Result<Vec<Competition>, PersistenceError> {
        let rows = sqlx::query("SELECT * FROM competitions WHERE status = $1")
            .bind(competition_status_str(status))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(competition_from_row).collect::<Result<_, _>>().map_err(PersistenceError::from)
    }

    async fn update_competition_status(&self, id: CompetitionId, status: CompetitionStatus) -> Result<(), PersistenceError> {
        let result = sqlx::query("UPDATE competitions SET status = $1 WHERE id = $2")
            .bind(competition_status_str(status))
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(PersistenceError::NotFound(format!("competition {id}")));
        }
        Ok(())
    }

    async fn insert_participant(&self, participant: &Participant, portfolio: &Portfolio) -> Result<(), PersistenceError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO participants (id, competition_id, display_name, agent_provider, agent_model, \
             agent_config, status, initial_capital, current_equity, peak_equity, total_trades, winning_trades, \
             losing_trades) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(participant.id.as_uuid())
        .bind(participant.competition_id.as_uuid())
        .bind(&participant.display_name)
        .bind(&participant.agent_provider)
        .bind(&participant.agent_model)
        .bind(&participant.agent_config)
        .bind(participant_status_str(participant.status))
        .bind(participant.initial_capital.as_decimal())
        .bind(participant.current_equity.as_decimal())
        .bind(participant.peak_equity.as_decimal())
        .bind(participant.total_trades as i32)
        .bind(participant.winning_trades as i32)
        .bind(participant.losing_trades as i32)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO portfolios (id, participant_id, cash_balance, equity, margin_used, margin_available, \
             realized_pnl, unrealized_pnl, total_pnl, current_leverage, margin_level) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(portfolio.id.as_uuid())
        .bind(portfolio.participant_id.as_uuid())
        .bind(portfolio.cash_balance.as_decimal())
        .bind(portfolio.equity.as_decimal())
        .bind(portfolio.margin_used.as_decimal())
        .bind(portfolio.margin_available.as_decimal())
        .bind(portfolio.realized_pnl.as_decimal())
        .bind(portfolio.unrealized_pnl.as_decimal())
        .bind(portfolio.total_pnl.as_decimal())
        .bind(portfolio.current_leverage)
        .bind(portfolio.margin_level)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_participant_state(&self, id: ParticipantId) -> Result<Option<ParticipantState>, PersistenceError> {
        let Some(participant_row) = sqlx::query("SELECT * FROM participants WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };
        let participant = participant_from_row(&participant_row)?;

        let portfolio_row = sqlx::query("SELECT * FROM portfolios WHERE participant_id = $1")
            .bind(id.as_uuid())
            .fetch_one(&self.pool)
            .await?;
        let portfolio = portfolio_from_row(&portfolio_row)?;

        let position_rows = sqlx::query("SELECT * FROM positions WHERE participant_id = $1")
            .bind(id.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        let positions = position_rows.iter().map(position_from_row).collect::<Result<_, _>>()?;

        Ok(Some(ParticipantState { participant, portfolio, positions }))
    }

    async fn list_participants(&self, competition_id: CompetitionId) -> Result<Vec<Participant>, PersistenceError> {
        let rows = sqlx::query("SELECT * FROM participants WHERE competition_id = $1")
            .bind(competition_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(participant_from_row).collect::<Result<_, _>>().map_err(PersistenceError::from)
    }

    async fn list_active_participants(&self, competition_id: CompetitionId) -> Result<Vec<Participant>, PersistenceError> {
        let rows = sqlx::query("SELECT * FROM participants WHERE competition_id = $1 AND status = $2")
            .bind(competition_id.as_uuid())
            .bind(participant_status_str(ParticipantStatus::Active))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(participant_from_row).collect::<Result<_, _>>().map_err(PersistenceError::from)
    }

    async fn save_participant_state(
        &self,
        state: &ParticipantState,
        history_point: &PortfolioHistoryPoint,
    ) -> Result<(), PersistenceError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT id FROM participants WHERE id = $1 FOR UPDATE")
            .bind(state.participant.id.as_uuid())
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE participants SET status = $1, current_equity = $2, peak_equity = $3, total_trades = $4, \
             winning_trades = $5, losing_trades = $6 WHERE id = $7",
        )
        .bind(participant_status_str(state.participant.status))
        .bind(state.participant.current_equity.as_decimal())
        .bind(state.participant.peak_equity.as_decimal())
        .bind(state.participant.total_trades as i32)
        .bind(state.participant.winning_trades as i32)
        .bind(state.participant.losing_trades as i32)
        .bind(state.participant.id.as_uuid())
        .execute(&mut *tx)
        .await?;

        let portfolio = &state.portfolio;
        sqlx::query(
            "UPDATE portfolios SET cash_balance = $1, equity = $2, margin_used = $3, margin_available = $4, \
             realized_pnl = $5, unrealized_pnl = $6, total_pnl = $7, current_leverage = $8, margin_level = $9 \
             WHERE participant_id = $10",
        )
        .bind(portfolio.cash_balance.as_decimal())
        .bind(portfolio.equity.as_decimal())
        .bind(portfolio.margin_used.as_decimal())
        .bind(portfolio.margin_available.as_decimal())
        .bind(portfolio.realized_pnl.as_decimal())
        .bind(portfolio.unrealized_pnl.as_decimal())
        .bind(portfolio.total_pnl.as_decimal())
        .bind(portfolio.current_leverage)
        .bind(portfolio.margin_level)
        .bind(portfolio.participant_id.as_uuid())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM positions WHERE participant_id = $1")
            .bind(state.participant.id.as_uuid())
            .execute(&mut *tx)
            .await?;

        for position in &state.positions {
            let exit_plan = position.exit_plan.as_ref().map(serde_json::to_value).transpose().map_err(sqlx::Error::Decode)?;
            sqlx::query(
                "INSERT INTO positions (id, portfolio_id, participant_id, symbol, asset_class, side, quantity, \
                 entry_price, current_price, leverage, margin_required, notional_value, unrealized_pnl, \
                 unrealized_pnl_pct, exit_plan, opened_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
            )
            .bind(position.id.as_uuid())
            .bind(position.portfolio_id.as_uuid())
            .bind(position.participant_id.as_uuid())
            .bind(position.symbol.as_str())
            .bind(asset_class_str(position.asset_class))
            .bind(position_side_str(position.side))
            .bind(position.quantity.as_decimal())
            .bind(position.entry_price.as_decimal())
            .bind(position.current_price.as_decimal())
            .bind(position.leverage as i32)
            .bind(position.margin_required.as_decimal())
            .bind(position.notional_value.as_decimal())
            .bind(position.unrealized_pnl.as_decimal())
            .bind(position.unrealized_pnl_pct)
            .bind(exit_plan)
            .bind(position.opened_at)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            "INSERT INTO portfolio_history (participant_id, cash_balance, equity, margin_used, realized_pnl, \
             unrealized_pnl, total_pnl, recorded_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(history_point.participant_id.as_uuid())
        .bind(history_point.cash_balance.as_decimal())
        .bind(history_point.equity.as_decimal())
        .bind(history_point.margin_used.as_decimal())
        .bind(history_point.realized_pnl.as_decimal())
        .bind(history_point.unrealized_pnl.as_decimal())
        .bind(history_point.total_pnl.as_decimal())
        .bind(history_point.recorded_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_all_open_positions(&self) -> Result<Vec<Position>, PersistenceError> {
        let rows = sqlx::query("SELECT * FROM positions").fetch_all(&self.pool).await?;
        rows.iter().map(position_from_row).collect::<Result<_, _>>().map_err(PersistenceError::from)
    }

    async fn list_portfolio_history(&self, participant_id: ParticipantId) -> Result<Vec<PortfolioHistoryPoint>, PersistenceError> {
        let rows = sqlx::query("SELECT * FROM portfolio_history WHERE participant_id = $1 ORDER BY recorded_at")
            .bind(participant_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(history_point_from_row).collect::<Result<_, _>>().map_err(PersistenceError::from)
    }

    async fn insert_order(&self, order: &Order) -> Result<(), PersistenceError> {
        let exit_plan = order.exit_plan.as_ref().map(serde_json::to_value).transpose().map_err(sqlx::Error::Decode)?;
        sqlx::query(
            "INSERT INTO orders (id, participant_id, invocation_id, symbol, asset_class, order_type, action, \
             side, quantity, requested_price, executed_price, leverage, position_id, exit_plan, status, \
             rejection_reason, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)",
        )
        .bind(order.id.as_uuid())
        .bind(order.participant_id.as_uuid())
        .bind(order.invocation_id.as_uuid())
        .bind(order.symbol.as_str())
        .bind(asset_class_str(order.asset_class))
        .bind(order_type_str(order.order_type))
        .bind(order_action_str(order.action))
        .bind(order.side.map(order_side_str))
        .bind(order.quantity.map(|q| q.as_decimal()))
        .bind(order.requested_price.map(|p| p.as_decimal()))
        .bind(order.executed_price.map(|p| p.as_decimal()))
        .bind(order.leverage.map(|l| l as i32))
        .bind(order.position_id.map(|p| *p.as_uuid()))
        .bind(exit_plan)
        .bind(order_status_str(order.status))
        .bind(&order.rejection_reason)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_trade(&self, trade: &Trade) -> Result<(), PersistenceError> {
        sqlx::query(
            "INSERT INTO trades (id, order_id, participant_id, position_id, symbol, side, quantity, price, \
             action, leverage, notional_value, margin_impact, realized_pnl, realized_pnl_pct, executed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(trade.id.as_uuid())
        .bind(trade.order_id.as_uuid())
        .bind(trade.participant_id.as_uuid())
        .bind(trade.position_id.map(|p| *p.as_uuid()))
        .bind(trade.symbol.as_str())
        .bind(order_side_str(trade.side))
        .bind(trade.quantity.as_decimal())
        .bind(trade.price.as_decimal())
        .bind(trade_action_str(trade.action))
        .bind(trade.leverage as i32)
        .bind(trade.notional_value.as_decimal())
        .bind(trade.margin_impact.as_decimal())
        .bind(trade.realized_pnl.map(|p| p.as_decimal()))
        .bind(trade.realized_pnl_pct)
        .bind(trade.executed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_trades(&self, participant_id: ParticipantId) -> Result<Vec<Trade>, PersistenceError> {
        let rows = sqlx::query("SELECT * FROM trades WHERE participant_id = $1 ORDER BY executed_at DESC")
            .bind(participant_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(trade_from_row).collect::<Result<_, _>>().map_err(PersistenceError::from)
    }

    async fn insert_invocation(&self, invocation: &Invocation) -> Result<(), PersistenceError> {
        let execution_results = serde_json::to_value(&invocation.execution_results).map_err(sqlx::Error::Decode)?;
        sqlx::query(
            "INSERT INTO invocations (id, participant_id, competition_id, prompt, request_tokens, \
             completion_tokens, market_snapshot, portfolio_snapshot, response_text, parsed_decision, \
             execution_results, invoked_at, response_time_ms, status, error_message, estimated_cost) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
        )
        .bind(invocation.id.as_uuid())
        .bind(invocation.participant_id.as_uuid())
        .bind(invocation.competition_id.as_uuid())
        .bind(&invocation.prompt)
        .bind(invocation.request_tokens.map(|v| v as i32))
        .bind(invocation.completion_tokens.map(|v| v as i32))
        .bind(&invocation.market_snapshot)
        .bind(&invocation.portfolio_snapshot)
        .bind(&invocation.response_text)
        .bind(&invocation.parsed_decision)
        .bind(execution_results)
        .bind(invocation.invoked_at)
        .bind(invocation.response_time_ms.map(|v| v as i64))
        .bind(invocation_status_str(invocation.status))
        .bind(&invocation.error_message)
        .bind(invocation.estimated_cost)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_invocation(&self, invocation: &Invocation) -> Result<(), PersistenceError> {
        let execution_results = serde_json::to_value(&invocation.execution_results).map_err(sqlx::Error::Decode)?;
        let result = sqlx::query(
            "UPDATE invocations SET request_tokens = $1, completion_tokens = $2, response_text = $3, \
             parsed_decision = $4, execution_results = $5, response_time_ms = $6, status = $7, \
             error_message = $8, estimated_cost = $9 WHERE id = $10",
        )
        .bind(invocation.request_tokens.map(|v| v as i32))
        .bind(invocation.completion_tokens.map(|v| v as i32))
        .bind(&invocation.response_text)
        .bind(&invocation.parsed_decision)
        .bind(execution_results)
        .bind(invocation.response_time_ms.map(|v| v as i64))
        .bind(invocation_status_str(invocation.status))
        .bind(&invocation.error_message)
        .bind(invocation.estimated_cost)
        .bind(invocation.id.as_uuid())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(PersistenceError::NotFound(format!("invocation {}", invocation.id)));
        }
        Ok(())
    }

    async fn reset_all(&self) -> Result<(), PersistenceError> {
        sqlx::query(
            "TRUNCATE TABLE competitions, participants, portfolios, positions, orders, \
             trades, invocations, portfolio_history RESTART IDENTITY CASCADE",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
