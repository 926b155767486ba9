//! The abstract market-data contract (§4.6) plus one concrete provider.
//!
//! `MarketDataProvider` is the capability downstream crates (`cfd-engine`
//! callers via `portfolio-manager`, `trading-engine`, `agent-invoker`)
//! depend on. `BinanceProvider` is a reference implementation grounded in
//! the original's `app/market/binance.py`; the specification treats the
//! real-world provider as an external collaborator, so this is kept minimal.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use types::ids::Symbol;
use types::numeric::Price;

use crate::candles::{Candle, Timeframe};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Ticker {
    pub last: Price,
    pub bid: Option<Price>,
    pub ask: Option<Price>,
    pub high_24h: Option<Price>,
    pub low_24h: Option<Price>,
    pub volume_24h: Option<Decimal>,
    pub change_24h_pct: Option<Decimal>,
}

#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("no data for symbol {0}")]
    NoData(String),
}

/// §4.6's abstract provider: current price, 24h ticker, OHLCV.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn price(&self, symbol: &Symbol) -> Option<Price>;
    async fn ticker(&self, symbol: &Symbol) -> Option<Ticker>;
    async fn ohlcv(&self, symbol: &Symbol, timeframe: Timeframe, limit: usize) -> Vec<Candle>;
}

/// Batch helper built on top of the per-symbol contract: a price-feed miss
/// for one symbol must not prevent others from resolving (§7).
pub async fn multiple_prices(
    provider: &dyn MarketDataProvider,
    symbols: &[Symbol],
) -> HashMap<Symbol, Price> {
    let mut out = HashMap::new();
    for symbol in symbols {
        if let Some(price) = provider.price(symbol).await {
            out.insert(symbol.clone(), price);
        } else {
            tracing::warn!(%symbol, "no price available");
        }
    }
    out
}

const PRICE_CACHE_TTL: Duration = Duration::from_secs(60);

/// A public-endpoint Binance spot provider, cached per the original's
/// 60-second `PRICE_CACHE_TTL`.
pub struct BinanceProvider {
    client: reqwest::Client,
    base_url: String,
    price_cache: RwLock<HashMap<Symbol, (Price, Instant)>>,
}

impl Default for BinanceProvider {
    fn default() -> Self {
        Self::new("https://api.binance.com")
    }
}

impl BinanceProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            price_cache: RwLock::new(HashMap::new()),
        }
    }

    fn cached_price(&self, symbol: &Symbol) -> Option<Price> {
        let cache = self.price_cache.read().ok()?;
        let (price, at) = cache.get(symbol)?;
        if at.elapsed() < PRICE_CACHE_TTL {
            Some(*price)
        } else {
            None
        }
    }

    fn store_price(&self, symbol: &Symbol, price: Price) {
        if let Ok(mut cache) = self.price_cache.write() {
            cache.insert(symbol.clone(), (price, Instant::now()));
        }
    }
}

#[derive(Deserialize)]
struct TickerPriceResponse {
    price: String,
}

#[derive(Deserialize)]
struct Ticker24hResponse {
    #[serde(rename = "lastPrice")]
    last_price: String,
    #[serde(rename = "bidPrice")]
    bid_price: Option<String>,
    #[serde(rename = "askPrice")]
    ask_price: Option<String>,
    #[serde(rename = "highPrice")]
    high_price: Option<String>,
    #[serde(rename = "lowPrice")]
    low_price: Option<String>,
    #[serde(rename = "quoteVolume")]
    quote_volume: Option<String>,
    #[serde(rename = "priceChangePercent")]
    price_change_percent: Option<String>,
}

#[async_trait]
impl MarketDataProvider for BinanceProvider {
    async fn price(&self, symbol: &Symbol) -> Option<Price> {
        if let Some(cached) = self.cached_price(symbol) {
            return Some(cached);
        }
        let url = format!("{}/api/v3/ticker/price", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("symbol", symbol.as_str())])
            .send()
            .await
            .inspect_err(|e| tracing::warn!(%symbol, error = %e, "price fetch failed"))
            .ok()?
            .json::<TickerPriceResponse>()
            .await
            .ok()?;
        let price = Price::new(resp.price.parse::<Decimal>().ok()?);
        self.store_price(symbol, price);
        Some(price)
    }

    async fn ticker(&self, symbol: &Symbol) -> Option<Ticker> {
        let url = format!("{}/api/v3/ticker/24hr", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("symbol", symbol.as_str())])
            .send()
            .await
            .inspect_err(|e| tracing::warn!(%symbol, error = %e, "ticker fetch failed"))
            .ok()?
            .json::<Ticker24hResponse>()
            .await
            .ok()?;
        Some(Ticker {
            last: Price::new(resp.last_price.parse().ok()?),
            bid: resp.bid_price.and_then(|v| v.parse().ok()).map(Price::new),
            ask: resp.ask_price.and_then(|v| v.parse().ok()).map(Price::new),
            high_24h: resp.high_price.and_then(|v| v.parse().ok()).map(Price::new),
            low_24h: resp.low_price.and_then(|v| v.parse().ok()).map(Price::new),
            volume_24h: resp.quote_volume.and_then(|v| v.parse().ok()),
            change_24h_pct: resp.price_change_percent.and_then(|v| v.parse().ok()),
        })
    }

    async fn ohlcv(&self, symbol: &Symbol, timeframe: Timeframe, limit: usize) -> Vec<Candle> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("symbol", symbol.as_str().to_string()),
                ("interval", timeframe.as_provider_str().to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await
            .inspect_err(|e| tracing::warn!(%symbol, error = %e, "ohlcv fetch failed"));
        let Ok(resp) = resp else {
            return Vec::new();
        };
        let Ok(rows) = resp.json::<Vec<Vec<serde_json::Value>>>().await else {
            return Vec::new();
        };
        rows.iter().filter_map(|row| parse_kline_row(row)).collect()
    }
}

fn parse_kline_row(row: &[serde_json::Value]) -> Option<Candle> {
    let open_time_ms = row.first()?.as_i64()?;
    let parse = |v: &serde_json::Value| -> Option<Decimal> { v.as_str()?.parse().ok() };
    Some(Candle {
        open_time: chrono::DateTime::from_timestamp_millis(open_time_ms)?,
        open: Price::new(parse(row.get(1)?)?),
        high: Price::new(parse(row.get(2)?)?),
        low: Price::new(parse(row.get(3)?)?),
        close: Price::new(parse(row.get(4)?)?),
        volume: parse(row.get(5)?)?,
    })
}
