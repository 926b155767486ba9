//! Assembles the structured context handed to the agent (§4.5).
//!
//! Grounded field-for-field on the original's `llm_invoker.py::invoke_participant`
//! context build and `prompt_builder.py`'s `_build_competition_context` /
//! `_build_portfolio_context` / `_build_trading_rules` / `_get_leaderboard`.

use calc_kernel::pnl_pct;
use chrono::{DateTime, Utc};
use market_data::SymbolSnapshot;
use rust_decimal::Decimal;
use serde::Serialize;
use types::competition::Competition;
use types::enums::AssetClass;
use types::order::ExitPlan;
use types::participant::Participant;
use types::portfolio::Portfolio;
use types::position::Position;

/// The fixed symbol universe the agent's market snapshot is built over when a
/// competition does not carry its own (§4.5 expansion).
pub fn default_symbol_universe() -> Vec<types::ids::Symbol> {
    ["BTCUSDT", "ETHUSDT", "BNBUSDT", "SOLUSDT"].into_iter().map(types::ids::Symbol::new).collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct CompetitionContext {
    pub name: String,
    pub max_leverage: u32,
    pub maintenance_margin_pct: Decimal,
    pub allowed_asset_classes: Vec<AssetClass>,
    pub minutes_remaining: i64,
}

pub fn build_competition_context(competition: &Competition, now: DateTime<Utc>) -> CompetitionContext {
    let minutes_remaining = (competition.end_time - now).num_minutes().max(0);
    CompetitionContext {
        name: competition.name.clone(),
        max_leverage: competition.max_leverage,
        maintenance_margin_pct: competition.maintenance_margin_pct,
        allowed_asset_classes: competition.allowed_asset_classes.clone(),
        minutes_remaining,
    }
}

/// One open position as shown to the agent, echoing back its own exit plan
/// (the "trading journal" feedback loop from the original).
#[derive(Debug, Clone, Serialize)]
pub struct OpenPositionView {
    pub position_id: types::ids::PositionId,
    pub symbol: types::ids::Symbol,
    pub side: types::enums::PositionSide,
    pub quantity: rust_decimal::Decimal,
    pub entry_price: rust_decimal::Decimal,
    pub current_price: rust_decimal::Decimal,
    pub leverage: u32,
    pub unrealized_pnl: rust_decimal::Decimal,
    pub unrealized_pnl_pct: Decimal,
    pub exit_plan: Option<ExitPlan>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioContext {
    pub cash_balance: Decimal,
    pub equity: Decimal,
    pub margin_used: Decimal,
    pub margin_available: Decimal,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    pub total_pnl: Decimal,
    pub current_leverage: Decimal,
    pub margin_level: Option<Decimal>,
    pub positions: Vec<OpenPositionView>,
}

pub fn build_portfolio_context(portfolio: &Portfolio, positions: &[Position]) -> PortfolioContext {
    PortfolioContext {
        cash_balance: portfolio.cash_balance.as_decimal(),
        equity: portfolio.equity.as_decimal(),
        margin_used: portfolio.margin_used.as_decimal(),
        margin_available: portfolio.margin_available.as_decimal(),
        realized_pnl: portfolio.realized_pnl.as_decimal(),
        unrealized_pnl: portfolio.unrealized_pnl.as_decimal(),
        total_pnl: portfolio.total_pnl.as_decimal(),
        current_leverage: portfolio.current_leverage,
        margin_level: portfolio.margin_level,
        positions: positions
            .iter()
            .map(|p| OpenPositionView {
                position_id: p.id,
                symbol: p.symbol.clone(),
                side: p.side,
                quantity: p.quantity.as_decimal(),
                entry_price: p.entry_price.as_decimal(),
                current_price: p.current_price.as_decimal(),
                leverage: p.leverage,
                unrealized_pnl: p.unrealized_pnl.as_decimal(),
                unrealized_pnl_pct: p.unrealized_pnl_pct,
                exit_plan: p.exit_plan.clone(),
            })
            .collect(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TradingRules {
    pub max_leverage: u32,
    pub maintenance_margin_pct: Decimal,
    pub allowed_asset_classes: Vec<AssetClass>,
    pub symbol_universe: Vec<types::ids::Symbol>,
}

pub fn build_trading_rules(competition: &Competition, symbol_universe: &[types::ids::Symbol]) -> TradingRules {
    TradingRules {
        max_leverage: competition.max_leverage,
        maintenance_margin_pct: competition.maintenance_margin_pct,
        allowed_asset_classes: competition.allowed_asset_classes.clone(),
        symbol_universe: symbol_universe.to_vec(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub name: String,
    pub equity: Decimal,
    pub pnl_pct: Decimal,
}

/// Rank `participants` (same competition) by `current_equity` descending.
pub fn build_leaderboard(participants: &[Participant]) -> Vec<LeaderboardEntry> {
    let mut ranked: Vec<&Participant> = participants.iter().collect();
    ranked.sort_by(|a, b| b.current_equity.as_decimal().cmp(&a.current_equity.as_decimal()));
    ranked
        .into_iter()
        .enumerate()
        .map(|(i, p)| LeaderboardEntry {
            rank: (i + 1) as u32,
            name: p.display_name.clone(),
            equity: p.current_equity.as_decimal(),
            pnl_pct: pnl_pct(
                p.current_equity.as_decimal() - p.initial_capital.as_decimal(),
                p.initial_capital.as_decimal(),
            ),
        })
        .collect()
}

/// The full document assembled for one invocation (§4.5): competition,
/// portfolio, market data, trading rules and leaderboard.
#[derive(Debug, Clone, Serialize)]
pub struct InvocationContext {
    pub competition: CompetitionContext,
    pub portfolio: PortfolioContext,
    pub market_data: Vec<SymbolSnapshot>,
    pub trading_rules: TradingRules,
    pub leaderboard: Vec<LeaderboardEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use types::ids::CompetitionId;
    use types::numeric::Money;

    fn participant(name: &str, equity: Decimal) -> Participant {
        let mut p = Participant::new(CompetitionId::new(), name, "anthropic", "claude", serde_json::Value::Null, Money::new(dec!(10_000)));
        p.current_equity = Money::new(equity);
        p
    }

    #[test]
    fn leaderboard_ranks_by_equity_descending() {
        let participants = vec![participant("Alpha", dec!(9_000)), participant("Beta", dec!(11_000))];
        let board = build_leaderboard(&participants);
        assert_eq!(board[0].name, "Beta");
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[1].name, "Alpha");
    }

    #[test]
    fn leaderboard_pnl_pct_is_relative_to_initial_capital() {
        let participants = vec![participant("Alpha", dec!(11_000))];
        let board = build_leaderboard(&participants);
        assert_eq!(board[0].pnl_pct, dec!(10));
    }
}
