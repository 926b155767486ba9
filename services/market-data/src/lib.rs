//! Market-data contract (C7).
//!
//! Out of scope per the specification beyond the abstract interface: the
//! real-world provider behind this trait is a third-party collaborator. This
//! crate owns the contract (`MarketDataProvider`), the multi-timeframe
//! technical-indicator math the agent invoker needs (§4.6), and one concrete
//! provider (`BinanceProvider`) grounded in the original's
//! `app/market/binance.py`, kept only so the workspace has something
//! runnable end to end.

pub mod candles;
pub mod indicators;
pub mod provider;
pub mod snapshot;

pub use candles::{Candle, Timeframe};
pub use provider::{BinanceProvider, MarketDataError, MarketDataProvider, Ticker};
pub use snapshot::{SymbolSnapshot, TimeframeSnapshot};
