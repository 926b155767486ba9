//! Agent invoker (C5): builds one participant's turn context, calls its
//! agent through C8, parses the reply, and drives every proposed order
//! through C4, producing one [`Invocation`] record.
//!
//! Grounded on the original's `app/services/llm_invoker.py::invoke_participant`
//! for the overall sequence (§4.5): build context, call the agent under a
//! timeout, parse the reply with the §6.1 grammar, dispatch each order in
//! listed order, persist the invocation. Transport failures and unparseable
//! replies never propagate as a Rust error (§7) — they downgrade the
//! invocation's status instead.

pub mod context;
pub mod dispatch;
pub mod parser;
pub mod prompt;

use agent_transport::{invoke_with_timeout, AgentConfig, AgentTransport};
use chrono::{DateTime, Utc};
use market_data::MarketDataProvider;
use types::competition::Competition;
use types::enums::InvocationStatus;
use types::ids::Symbol;
use types::invocation::Invocation;
use types::order::Order;
use types::participant::Participant;
use types::portfolio::Portfolio;
use types::position::Position;
use types::trade::Trade;

pub use context::default_symbol_universe;

/// Everything one agent turn produced: the [`Invocation`] record plus every
/// [`Order`] it proposed (executed or rejected) and every [`Trade`] an
/// executed order generated. The scheduler persists all three; nothing here
/// touches the store itself (§6.3 stays the caller's concern).
#[derive(Debug, Clone)]
pub struct InvocationOutcome {
    pub invocation: Invocation,
    pub orders: Vec<Order>,
    pub trades: Vec<Trade>,
}

/// Everything a single invocation needs beyond the participant's own
/// mutable state: the competition, the other participants for the
/// leaderboard, the symbol universe to snapshot, and the two capability
/// collaborators (market data, agent transport).
pub struct InvokeInputs<'a> {
    pub competition: &'a Competition,
    pub other_participants: &'a [Participant],
    pub symbol_universe: &'a [Symbol],
    pub provider: &'a dyn MarketDataProvider,
    pub transport: &'a dyn AgentTransport,
    pub agent_config: &'a AgentConfig,
}

/// Run one full agent turn for `participant`, mutating its portfolio and
/// open-position set in place and returning the [`Invocation`] record to
/// persist. Never returns an `Err`: every failure mode this component can
/// hit (timeout, malformed reply, rejected order) is represented as an
/// `Invocation` with the matching [`InvocationStatus`], per §7.
pub async fn invoke(
    participant: &mut Participant,
    portfolio: &mut Portfolio,
    positions: &mut Vec<Position>,
    inputs: &InvokeInputs<'_>,
    now: DateTime<Utc>,
) -> InvocationOutcome {
    let competition_ctx = context::build_competition_context(inputs.competition, now);
    let portfolio_ctx = context::build_portfolio_context(portfolio, positions);
    let market_data = market_data::build_snapshots(inputs.provider, inputs.symbol_universe).await;
    let trading_rules = context::build_trading_rules(inputs.competition, inputs.symbol_universe);
    let leaderboard = context::build_leaderboard(inputs.other_participants);

    let invocation_ctx = context::InvocationContext {
        competition: competition_ctx,
        portfolio: portfolio_ctx,
        market_data,
        trading_rules,
        leaderboard,
    };

    let user_payload = prompt::build_user_payload(&invocation_ctx);
    let market_snapshot_json = serde_json::to_value(&invocation_ctx.market_data).unwrap_or(serde_json::Value::Null);
    let portfolio_snapshot_json = serde_json::to_value(&invocation_ctx.portfolio).unwrap_or(serde_json::Value::Null);

    let mut invocation = Invocation::new_pending(
        participant.id,
        participant.competition_id,
        format!("{}\n\n{}", prompt::SYSTEM_PROMPT, user_payload),
        market_snapshot_json,
        portfolio_snapshot_json,
        now,
    );

    let call_start = std::time::Instant::now();
    let reply = match invoke_with_timeout(inputs.transport, prompt::SYSTEM_PROMPT, &user_payload, inputs.agent_config).await {
        Ok(reply) => reply,
        Err(err) => {
            let is_timeout = matches!(err, agent_transport::TransportError::Timeout(_));
            invocation.status = if is_timeout { InvocationStatus::Timeout } else { InvocationStatus::Error };
            invocation.error_message = Some(err.to_string());
            invocation.response_time_ms = Some(call_start.elapsed().as_millis() as u64);
            return InvocationOutcome { invocation, orders: Vec::new(), trades: Vec::new() };
        }
    };

    invocation.response_text = Some(reply.text.clone());
    invocation.request_tokens = Some(reply.prompt_tokens);
    invocation.completion_tokens = Some(reply.completion_tokens);
    invocation.response_time_ms = Some(call_start.elapsed().as_millis() as u64);

    let decision = match parser::parse_reply(&reply.text) {
        Ok(decision) => decision,
        Err(err) => {
            invocation.status = InvocationStatus::InvalidResponse;
            invocation.error_message = Some(err.to_string());
            return InvocationOutcome { invocation, orders: Vec::new(), trades: Vec::new() };
        }
    };

    invocation.parsed_decision = serde_json::to_value(&DecisionMirror {
        decision: decision.decision.clone(),
        reasoning: decision.reasoning.clone(),
        confidence: decision.confidence,
    })
    .ok();

    let mut orders = Vec::new();
    let mut trades = Vec::new();
    for order_spec in decision.orders {
        let invocation_id = invocation.id;
        let (order, result, trade) =
            dispatch::dispatch_order(order_spec, participant, invocation_id, inputs.competition, portfolio, positions, inputs.provider, now).await;
        tracing::debug!(order_id = %order.id, status = ?order.status, "order dispatched");
        invocation.execution_results.push(result);
        orders.push(order);
        if let Some(trade) = trade {
            trades.push(trade);
        }
    }

    invocation.status = InvocationStatus::Success;
    InvocationOutcome { invocation, orders, trades }
}

#[derive(serde::Serialize)]
struct DecisionMirror {
    decision: String,
    reasoning: String,
    confidence: Option<rust_decimal::Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use market_data::{Candle, Ticker, Timeframe};
    use rust_decimal_macros::dec;
    use std::time::Duration;
    use types::enums::{AssetClass, CompetitionStatus};
    use types::ids::CompetitionId;
    use types::numeric::{Money, Price};

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn competition() -> Competition {
        Competition {
            id: CompetitionId::new(),
            name: "Q3".into(),
            status: CompetitionStatus::Active,
            start_time: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
            end_time: DateTime::<Utc>::from_timestamp(1_800_000_000, 0).unwrap(),
            invocation_interval_minutes: 5,
            initial_capital: Money::new(dec!(10_000)),
            max_leverage: 10,
            maintenance_margin_pct: dec!(5),
            allowed_asset_classes: vec![AssetClass::Crypto],
            max_participants: 10,
            market_hours_gated: false,
        }
    }

    struct FixedPriceProvider;

    #[async_trait]
    impl MarketDataProvider for FixedPriceProvider {
        async fn price(&self, _symbol: &Symbol) -> Option<Price> {
            Some(Price::new(dec!(100_000)))
        }
        async fn ticker(&self, _symbol: &Symbol) -> Option<Ticker> {
            None
        }
        async fn ohlcv(&self, _symbol: &Symbol, _timeframe: Timeframe, _limit: usize) -> Vec<Candle> {
            Vec::new()
        }
    }

    struct ScriptedTransport(String);

    #[async_trait]
    impl AgentTransport for ScriptedTransport {
        async fn invoke(&self, _system: &str, _user: &str, _config: &AgentConfig) -> Result<agent_transport::LlmReply, agent_transport::TransportError> {
            Ok(agent_transport::LlmReply { text: self.0.clone(), prompt_tokens: 100, completion_tokens: 50 })
        }
    }

    struct TimeoutTransport;

    #[async_trait]
    impl AgentTransport for TimeoutTransport {
        async fn invoke(&self, _system: &str, _user: &str, _config: &AgentConfig) -> Result<agent_transport::LlmReply, agent_transport::TransportError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(agent_transport::LlmReply { text: "{}".into(), prompt_tokens: 0, completion_tokens: 0 })
        }
    }

    #[tokio::test]
    async fn a_hold_decision_executes_no_orders_and_succeeds() {
        let mut participant =
            Participant::new(CompetitionId::new(), "Bot", "anthropic", "claude", serde_json::Value::Null, Money::new(dec!(10_000)));
        let mut portfolio = Portfolio::new(participant.id, Money::new(dec!(10_000)));
        let mut positions = Vec::new();
        let competition = competition();
        let provider = FixedPriceProvider;
        let transport = ScriptedTransport("{\"decision\": \"hold\", \"reasoning\": \"no edge\", \"orders\": []}".into());
        let config = AgentConfig::default();
        let symbols = vec![Symbol::new("BTCUSDT")];

        let inputs = InvokeInputs {
            competition: &competition,
            other_participants: &[],
            symbol_universe: &symbols,
            provider: &provider,
            transport: &transport,
            agent_config: &config,
        };

        let outcome = invoke(&mut participant, &mut portfolio, &mut positions, &inputs, now()).await;
        assert_eq!(outcome.invocation.status, InvocationStatus::Success);
        assert!(outcome.invocation.execution_results.is_empty());
        assert!(outcome.orders.is_empty());
        assert!(outcome.trades.is_empty());
    }

    #[tokio::test]
    async fn a_trade_decision_opens_a_position_and_records_one_result() {
        let mut participant =
            Participant::new(CompetitionId::new(), "Bot", "anthropic", "claude", serde_json::Value::Null, Money::new(dec!(10_000)));
        let mut portfolio = Portfolio::new(participant.id, Money::new(dec!(10_000)));
        let mut positions = Vec::new();
        let competition = competition();
        let provider = FixedPriceProvider;
        let reply = "[Response]\n{\"decision\": \"trade\", \"reasoning\": \"momentum\", \"orders\": [{\"action\": \"open\", \"symbol\": \"BTCUSDT\", \"side\": \"buy\", \"quantity\": 0.05, \"leverage\": 2}]}";
        let transport = ScriptedTransport(reply.into());
        let config = AgentConfig::default();
        let symbols = vec![Symbol::new("BTCUSDT")];

        let inputs = InvokeInputs {
            competition: &competition,
            other_participants: &[],
            symbol_universe: &symbols,
            provider: &provider,
            transport: &transport,
            agent_config: &config,
        };

        let outcome = invoke(&mut participant, &mut portfolio, &mut positions, &inputs, now()).await;
        assert_eq!(outcome.invocation.status, InvocationStatus::Success);
        assert_eq!(outcome.invocation.execution_results.len(), 1);
        assert!(outcome.invocation.execution_results[0].validation_passed);
        assert_eq!(positions.len(), 1);
        assert_eq!(outcome.orders.len(), 1);
        assert_eq!(outcome.trades.len(), 1);
    }

    #[tokio::test]
    async fn a_transport_timeout_produces_a_timeout_invocation_with_no_orders_touched() {
        let mut participant =
            Participant::new(CompetitionId::new(), "Bot", "anthropic", "claude", serde_json::Value::Null, Money::new(dec!(10_000)));
        let mut portfolio = Portfolio::new(participant.id, Money::new(dec!(10_000)));
        let mut positions = Vec::new();
        let competition = competition();
        let provider = FixedPriceProvider;
        let transport = TimeoutTransport;
        let config = AgentConfig { timeout: Duration::from_millis(5), ..Default::default() };
        let symbols = vec![Symbol::new("BTCUSDT")];

        let inputs = InvokeInputs {
            competition: &competition,
            other_participants: &[],
            symbol_universe: &symbols,
            provider: &provider,
            transport: &transport,
            agent_config: &config,
        };

        let outcome = invoke(&mut participant, &mut portfolio, &mut positions, &inputs, now()).await;
        assert_eq!(outcome.invocation.status, InvocationStatus::Timeout);
        assert!(outcome.invocation.execution_results.is_empty());
        assert!(positions.is_empty());
        assert!(outcome.orders.is_empty());
    }

    #[tokio::test]
    async fn an_unparseable_reply_produces_an_invalid_response_invocation() {
        let mut participant =
            Participant::new(CompetitionId::new(), "Bot", "anthropic", "claude", serde_json::Value::Null, Money::new(dec!(10_000)));
        let mut portfolio = Portfolio::new(participant.id, Money::new(dec!(10_000)));
        let mut positions = Vec::new();
        let competition = competition();
        let provider = FixedPriceProvider;
        let transport = ScriptedTransport("I'm not going to reply in JSON today.".into());
        let config = AgentConfig::default();
        let symbols = vec![Symbol::new("BTCUSDT")];

        let inputs = InvokeInputs {
            competition: &competition,
            other_participants: &[],
            symbol_universe: &symbols,
            provider: &provider,
            transport: &transport,
            agent_config: &config,
        };

        let outcome = invoke(&mut participant, &mut portfolio, &mut positions, &inputs, now()).await;
        assert_eq!(outcome.invocation.status, InvocationStatus::InvalidResponse);
    }
}
