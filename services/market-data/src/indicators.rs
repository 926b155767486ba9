//! Technical indicators over a closing-price series (§4.6).
//!
//! Grounded on the original's `app/services/technical_indicators.py` (which
//! delegates to `pandas_ta`): EMA seeded by the SMA of the first N closes,
//! Wilder-smoothed RSI, and standard 12/26/9 MACD. Reimplemented directly
//! over `Decimal` closes rather than via a dataframe library, since the
//! series here is always the last handful of candles the snapshot needs.
//!
//! All indicators require at least 20 candles (the original's guard) and
//! return `None` below that, matching §4.6: "Indicators for a timeframe with
//! fewer than 20 candles are null."

use rust_decimal::prelude::*;
use rust_decimal::Decimal;

const MIN_CANDLES: usize = 20;

/// `EMA_t = price_t * k + EMA_{t-1} * (1-k)`, `k = 2/(N+1)`, seeded by the
/// SMA of the first `period` closes.
pub fn ema(closes: &[Decimal], period: usize) -> Option<Decimal> {
    if closes.len() < period.max(1) {
        return None;
    }
    let k = Decimal::from(2) / Decimal::from(period as u64 + 1);
    let seed: Decimal = closes[..period].iter().sum::<Decimal>() / Decimal::from(period as u64);
    let mut value = seed;
    for price in &closes[period..] {
        value = *price * k + value * (Decimal::ONE - k);
    }
    Some(value)
}

/// Full EMA series (same length as `closes`, first `period - 1` entries are
/// the seed repeated) — used internally to build MACD's line and signal.
fn ema_series(closes: &[Decimal], period: usize) -> Vec<Decimal> {
    if closes.is_empty() || period == 0 {
        return Vec::new();
    }
    let k = Decimal::from(2) / Decimal::from(period as u64 + 1);
    let mut out = Vec::with_capacity(closes.len());
    let seed_len = period.min(closes.len());
    let seed: Decimal = closes[..seed_len].iter().sum::<Decimal>() / Decimal::from(seed_len as u64);
    out.extend(std::iter::repeat(seed).take(seed_len));
    let mut value = seed;
    for price in &closes[seed_len..] {
        value = *price * k + value * (Decimal::ONE - k);
        out.push(value);
    }
    out
}

/// Wilder's smoothed RSI over `period` periods. RSI is 100 when the average
/// loss is zero (per the original's guard against division by zero).
pub fn rsi(closes: &[Decimal], period: usize) -> Option<Decimal> {
    if closes.len() < period + 1 {
        return None;
    }
    let deltas: Vec<Decimal> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let (first_gains, first_losses): (Vec<Decimal>, Vec<Decimal>) = deltas[..period]
        .iter()
        .map(|d| {
            if *d > Decimal::ZERO {
                (*d, Decimal::ZERO)
            } else {
                (Decimal::ZERO, -*d)
            }
        })
        .unzip();
    let mut avg_gain = first_gains.iter().sum::<Decimal>() / Decimal::from(period as u64);
    let mut avg_loss = first_losses.iter().sum::<Decimal>() / Decimal::from(period as u64);

    for d in &deltas[period..] {
        let (gain, loss) = if *d > Decimal::ZERO {
            (*d, Decimal::ZERO)
        } else {
            (Decimal::ZERO, -*d)
        };
        avg_gain = (avg_gain * Decimal::from(period as u64 - 1) + gain) / Decimal::from(period as u64);
        avg_loss = (avg_loss * Decimal::from(period as u64 - 1) + loss) / Decimal::from(period as u64);
    }

    if avg_loss.is_zero() {
        return Some(Decimal::from(100));
    }
    let rs = avg_gain / avg_loss;
    Some(Decimal::from(100) - (Decimal::from(100) / (Decimal::ONE + rs)))
}

/// `(macd, signal, histogram)` for the standard 12/26/9 configuration.
/// `macd = EMA_12 - EMA_26`; `signal = EMA_9` of the MACD line;
/// `histogram = macd - signal`.
pub fn macd(closes: &[Decimal]) -> Option<(Decimal, Decimal, Decimal)> {
    if closes.len() < 26 {
        return None;
    }
    let fast = ema_series(closes, 12);
    let slow = ema_series(closes, 26);
    let macd_line: Vec<Decimal> = fast.iter().zip(slow.iter()).map(|(f, s)| f - s).collect();
    let signal_series = ema_series(&macd_line, 9);
    let macd_value = *macd_line.last()?;
    let signal_value = *signal_series.last()?;
    Some((macd_value, signal_value, macd_value - signal_value))
}

/// The latest-value bundle the snapshot attaches to each timeframe, `None`
/// wholesale when fewer than 20 candles are available (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IndicatorSet {
    pub ema_20: Option<Decimal>,
    pub rsi_7: Option<Decimal>,
    pub rsi_14: Option<Decimal>,
    pub macd: Option<Decimal>,
    pub macd_signal: Option<Decimal>,
    pub macd_histogram: Option<Decimal>,
}

pub fn latest_indicators(closes: &[Decimal]) -> IndicatorSet {
    if closes.len() < MIN_CANDLES {
        return IndicatorSet::default();
    }
    let (macd_v, signal_v, hist_v) = macd(closes).map_or((None, None, None), |(m, s, h)| (Some(m), Some(s), Some(h)));
    IndicatorSet {
        ema_20: ema(closes, 20),
        rsi_7: rsi(closes, 7),
        rsi_14: rsi(closes, 14),
        macd: macd_v,
        macd_signal: signal_v,
        macd_histogram: hist_v,
    }
}
