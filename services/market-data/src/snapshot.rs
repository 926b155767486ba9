//! Multi-timeframe market snapshot assembly (§4.6), the shape the agent
//! invoker hands to C8 inside the user prompt payload.
//!
//! Grounded on the original's `market_data_service.get_enhanced_market_data`
//! / `technical_indicators.format_market_data_with_indicators`: for each
//! symbol x timeframe, fetch >= 50 candles (enough for MACD's 26+9 warm-up),
//! compute indicators over the full series, and surface only the last five
//! candles plus the latest indicator values.

use rust_decimal::Decimal;
use serde::Serialize;
use types::ids::Symbol;
use types::numeric::Price;

use crate::candles::{Candle, Timeframe};
use crate::indicators::{latest_indicators, IndicatorSet};
use crate::provider::MarketDataProvider;

/// Candles fetched per timeframe to give MACD(12,26,9) a 50-candle warm-up.
const CANDLES_TO_FETCH: usize = 50;
/// Candles surfaced in the prompt payload, most recent last.
const CANDLES_TO_SHOW: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct TimeframeSnapshot {
    pub price_history: Vec<Candle>,
    pub ema_20: Option<Decimal>,
    pub rsi_7: Option<Decimal>,
    pub rsi_14: Option<Decimal>,
    pub macd: Option<Decimal>,
    pub macd_signal: Option<Decimal>,
    pub macd_histogram: Option<Decimal>,
}

impl TimeframeSnapshot {
    fn from_candles(mut candles: Vec<Candle>) -> Self {
        let closes: Vec<Decimal> = candles.iter().map(|c| c.close.as_decimal()).collect();
        let IndicatorSet {
            ema_20,
            rsi_7,
            rsi_14,
            macd,
            macd_signal,
            macd_histogram,
        } = latest_indicators(&closes);
        if candles.len() > CANDLES_TO_SHOW {
            candles = candles.split_off(candles.len() - CANDLES_TO_SHOW);
        }
        Self {
            price_history: candles,
            ema_20,
            rsi_7,
            rsi_14,
            macd,
            macd_signal,
            macd_histogram,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolSnapshot {
    pub symbol: Symbol,
    pub current_price: Option<Price>,
    pub timeframes: std::collections::BTreeMap<Timeframe, TimeframeSnapshot>,
}

/// Build the full multi-timeframe snapshot for one symbol across
/// `Timeframe::all()` (M1, M5, M15, H1).
pub async fn build_symbol_snapshot(provider: &dyn MarketDataProvider, symbol: &Symbol) -> SymbolSnapshot {
    let current_price = provider.price(symbol).await;
    let mut timeframes = std::collections::BTreeMap::new();
    for &tf in Timeframe::all() {
        let candles = provider.ohlcv(symbol, tf, CANDLES_TO_FETCH).await;
        timeframes.insert(tf, TimeframeSnapshot::from_candles(candles));
    }
    SymbolSnapshot {
        symbol: symbol.clone(),
        current_price,
        timeframes,
    }
}

pub async fn build_snapshots(provider: &dyn MarketDataProvider, symbols: &[Symbol]) -> Vec<SymbolSnapshot> {
    let mut out = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        out.push(build_symbol_snapshot(provider, symbol).await);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    struct FakeProvider {
        candles: Mutex<Vec<Candle>>,
    }

    fn candle(i: i64, close: Decimal) -> Candle {
        Candle {
            open_time: DateTime::<Utc>::from_timestamp(1_700_000_000 + i * 60, 0).unwrap(),
            open: Price::new(close),
            high: Price::new(close),
            low: Price::new(close),
            close: Price::new(close),
            volume: dec!(1),
        }
    }

    #[async_trait]
    impl MarketDataProvider for FakeProvider {
        async fn price(&self, _symbol: &Symbol) -> Option<Price> {
            Some(Price::new(dec!(100)))
        }
        async fn ticker(&self, _symbol: &Symbol) -> Option<crate::provider::Ticker> {
            None
        }
        async fn ohlcv(&self, _symbol: &Symbol, _timeframe: Timeframe, _limit: usize) -> Vec<Candle> {
            self.candles.lock().unwrap().clone()
        }
    }

    #[tokio::test]
    async fn snapshot_surfaces_only_the_last_five_candles() {
        let candles: Vec<Candle> = (0..50).map(|i| candle(i, Decimal::from(100 + i))).collect();
        let provider = FakeProvider { candles: Mutex::new(candles) };
        let snapshot = build_symbol_snapshot(&provider, &Symbol::new("BTCUSDT")).await;
        let tf = snapshot.timeframes.get(&Timeframe::M1).unwrap();
        assert_eq!(tf.price_history.len(), 5);
        assert!(tf.ema_20.is_some());
    }

    #[tokio::test]
    async fn indicators_are_none_with_fewer_than_twenty_candles() {
        let candles: Vec<Candle> = (0..10).map(|i| candle(i, Decimal::from(100 + i))).collect();
        let provider = FakeProvider { candles: Mutex::new(candles) };
        let snapshot = build_symbol_snapshot(&provider, &Symbol::new("ETHUSDT")).await;
        let tf = snapshot.timeframes.get(&Timeframe::M1).unwrap();
        assert!(tf.ema_20.is_none());
        assert_eq!(tf.price_history.len(), 5);
    }
}
