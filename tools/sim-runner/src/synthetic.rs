//! Deterministic stand-ins for the market-data and agent-transport
//! collaborators, used when no live exchange connection or LLM API key is
//! configured. Grounded on the teacher's simulation bots (`retail_trader`,
//! `market_maker`): a seeded `rand_chacha` generator driving plausible,
//! reproducible behavior instead of a live external dependency.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use market_data::{Candle, MarketDataProvider, Ticker, Timeframe};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use types::ids::Symbol;
use types::numeric::Price;

fn base_price(symbol: &Symbol) -> Decimal {
    match symbol.as_str() {
        "BTCUSDT" => Decimal::new(100_000, 0),
        "ETHUSDT" => Decimal::new(3_500, 0),
        "BNBUSDT" => Decimal::new(600, 0),
        "SOLUSDT" => Decimal::new(150, 0),
        _ => Decimal::new(100, 0),
    }
}

/// A random-walk price feed, one independent walk per symbol, seeded for
/// reproducible runs. Every call to [`price`](MarketDataProvider::price)
/// advances that symbol's walk by one step.
pub struct SyntheticPriceProvider {
    last: Mutex<HashMap<Symbol, Decimal>>,
    rng: Mutex<ChaCha8Rng>,
}

impl SyntheticPriceProvider {
    pub fn seeded(seed: u64) -> Self {
        Self { last: Mutex::new(HashMap::new()), rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)) }
    }

    fn step(&self, symbol: &Symbol) -> Decimal {
        let mut last = self.last.lock().unwrap();
        let mut rng = self.rng.lock().unwrap();
        let current = *last.entry(symbol.clone()).or_insert_with(|| base_price(symbol));
        let step_bps = rng.gen_range(-150i64..=150i64);
        let next = (current * (Decimal::new(10_000 + step_bps, 0) / Decimal::new(10_000, 0))).max(Decimal::new(1, 0));
        last.insert(symbol.clone(), next);
        next
    }
}

#[async_trait]
impl MarketDataProvider for SyntheticPriceProvider {
    async fn price(&self, symbol: &Symbol) -> Option<Price> {
        Some(Price::new(self.step(symbol)))
    }

    async fn ticker(&self, symbol: &Symbol) -> Option<Ticker> {
        let last = self.step(symbol);
        Some(Ticker {
            last: Price::new(last),
            bid: Some(Price::new(last * Decimal::new(9_999, 4))),
            ask: Some(Price::new(last * Decimal::new(10_001, 4))),
            high_24h: None,
            low_24h: None,
            volume_24h: None,
            change_24h_pct: None,
        })
    }

    async fn ohlcv(&self, symbol: &Symbol, _timeframe: Timeframe, limit: usize) -> Vec<Candle> {
        let count = limit.max(60);
        let mut out = Vec::with_capacity(count);
        let now = Utc::now();
        for i in (0..count).rev() {
            let close = self.step(symbol);
            let open = close * Decimal::new(9_995, 4);
            out.push(Candle {
                open_time: now - chrono::Duration::minutes(i as i64),
                open: Price::new(open),
                high: Price::new(close.max(open) * Decimal::new(10_002, 4)),
                low: Price::new(close.min(open) * Decimal::new(9_998, 4)),
                close: Price::new(close),
                volume: Decimal::new(1, 0),
            });
        }
        out
    }
}

/// Drives every participant with a fixed hold-and-occasionally-open policy
/// instead of a real language model, so the full decision tick (parsing,
/// dispatch, execution) still runs end to end without an API key. Each
/// invocation either holds or opens a small long on the first entry in its
/// market snapshot, decided by a seeded coin flip per call.
pub struct RuleBasedTransport {
    rng: Mutex<ChaCha8Rng>,
}

impl RuleBasedTransport {
    pub fn seeded(seed: u64) -> Self {
        Self { rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)) }
    }
}

#[async_trait]
impl agent_transport::AgentTransport for RuleBasedTransport {
    async fn invoke(
        &self,
        _system: &str,
        user: &str,
        _config: &agent_transport::AgentConfig,
    ) -> Result<agent_transport::LlmReply, agent_transport::TransportError> {
        let should_trade = self.rng.lock().unwrap().gen_bool(0.3);
        let symbol = extract_first_symbol(user).unwrap_or_else(|| "BTCUSDT".to_string());

        let text = if should_trade {
            format!(
                "{{\"decision\": \"trade\", \"reasoning\": \"rule-based entry\", \"orders\": [{{\"action\": \"open\", \"symbol\": \"{symbol}\", \"side\": \"long\", \"quantity\": \"0.01\", \"leverage\": 3}}]}}"
            )
        } else {
            "{\"decision\": \"hold\", \"reasoning\": \"rule-based hold\", \"orders\": []}".to_string()
        };

        Ok(agent_transport::LlmReply { text, prompt_tokens: user.len() as u32 / 4, completion_tokens: 24 })
    }
}

/// Best-effort scrape of the first `"symbol": "..."` occurrence out of the
/// rendered market snapshot, so the bot trades something actually present
/// in its own context instead of a hardcoded symbol.
fn extract_first_symbol(user_payload: &str) -> Option<String> {
    let key = "\"symbol\":";
    let idx = user_payload.find(key)?;
    let rest = &user_payload[idx + key.len()..];
    let start = rest.find('"')? + 1;
    let end = rest[start..].find('"')? + start;
    Some(rest[start..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn synthetic_price_provider_walks_without_going_nonpositive() {
        let provider = SyntheticPriceProvider::seeded(1);
        let symbol = Symbol::new("BTCUSDT");
        for _ in 0..1000 {
            let price = provider.price(&symbol).await.unwrap();
            assert!(price.as_decimal() > Decimal::ZERO);
        }
    }

    #[tokio::test]
    async fn synthetic_ohlcv_returns_at_least_the_requested_candle_count() {
        let provider = SyntheticPriceProvider::seeded(2);
        let candles = provider.ohlcv(&Symbol::new("ETHUSDT"), Timeframe::M1, 60).await;
        assert_eq!(candles.len(), 60);
    }

    #[test]
    fn extract_first_symbol_finds_a_quoted_symbol_field() {
        let payload = r#"{"snapshots": [{"symbol": "SOLUSDT", "price": "150"}]}"#;
        assert_eq!(extract_first_symbol(payload), Some("SOLUSDT".to_string()));
    }

    #[test]
    fn extract_first_symbol_is_none_when_absent() {
        assert_eq!(extract_first_symbol("{}"), None);
    }
}
