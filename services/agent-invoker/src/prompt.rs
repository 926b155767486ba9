//! The fixed system prompt and the per-invocation user payload (§6.1).
//!
//! Grounded on the original's `llm/prompt_builder.py::build_system_prompt`:
//! static instructions plus a JSON-serialized context document. The
//! leverage guidance ("prefer at least 5x") is advisory text only; nothing
//! downstream enforces a minimum (§9 Design Notes, Open Question resolved).

use crate::context::InvocationContext;

pub const SYSTEM_PROMPT: &str = "\
You are an autonomous trading agent in a leveraged CFD trading competition. \
Each turn you receive your portfolio, open positions, a leaderboard, and a \
multi-timeframe market snapshot for a fixed set of symbols. Decide whether \
to open, close, increase or decrease positions, or hold.

Rules:
- You may only trade symbols and asset classes in the competition's allowed list.
- Leverage must not exceed the competition's max_leverage. Prefer at least 5x \
when opening a position to make meaningful use of the capital allocated to you; \
this is guidance, not an enforced minimum.
- A close order must reference the position_id of the position you intend to close.
- margin_required = notional / leverage must stay within your available margin.
- You are evaluated on risk-adjusted equity growth, not raw position count.

Respond with exactly one JSON object, either inside a `[Response]` section, a \
fenced ```json code block, or as the only JSON content in your reply, matching:

{
  \"decision\": \"hold\" | \"trade\",
  \"reasoning\": string,
  \"confidence\": number (0-1, optional),
  \"orders\": [
    {
      \"action\": \"open\" | \"close\" | \"increase\" | \"decrease\",
      \"symbol\": string,
      \"side\": \"buy\" | \"sell\" (required for open),
      \"quantity\": number (omit for close, which closes the full position),
      \"leverage\": integer (required for open),
      \"position_id\": string (required for close/increase/decrease),
      \"exit_plan\": { \"profit_target\": number, \"stop_loss\": number, \"invalidation\": string } (optional, open only)
    }
  ]
}";

/// Serialize the context document as the user-turn payload. The original
/// hands the LLM a pretty-printed JSON blob rather than prose; kept here
/// since it is what `parser`'s counterpart grammar expects to reason about.
pub fn build_user_payload(context: &InvocationContext) -> String {
    serde_json::to_string_pretty(context).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{CompetitionContext, LeaderboardEntry, PortfolioContext, TradingRules};
    use rust_decimal_macros::dec;

    fn sample_context() -> InvocationContext {
        InvocationContext {
            competition: CompetitionContext {
                name: "Q3 Showdown".into(),
                max_leverage: 10,
                maintenance_margin_pct: dec!(5),
                allowed_asset_classes: vec![types::enums::AssetClass::Crypto],
                minutes_remaining: 120,
            },
            portfolio: PortfolioContext {
                cash_balance: dec!(10_000),
                equity: dec!(10_000),
                margin_used: dec!(0),
                margin_available: dec!(10_000),
                realized_pnl: dec!(0),
                unrealized_pnl: dec!(0),
                total_pnl: dec!(0),
                current_leverage: dec!(0),
                margin_level: None,
                positions: vec![],
            },
            market_data: vec![],
            trading_rules: TradingRules {
                max_leverage: 10,
                maintenance_margin_pct: dec!(5),
                allowed_asset_classes: vec![types::enums::AssetClass::Crypto],
                symbol_universe: vec![types::ids::Symbol::new("BTCUSDT")],
            },
            leaderboard: vec![LeaderboardEntry {
                rank: 1,
                name: "Alpha".into(),
                equity: dec!(10_000),
                pnl_pct: dec!(0),
            }],
        }
    }

    #[test]
    fn user_payload_is_valid_json_containing_the_competition_name() {
        let payload = build_user_payload(&sample_context());
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["competition"]["name"], "Q3 Showdown");
    }

    #[test]
    fn system_prompt_describes_the_response_grammar() {
        assert!(SYSTEM_PROMPT.contains("\"decision\""));
        assert!(SYSTEM_PROMPT.contains("position_id"));
    }
}
