//! Ticker-price read view over the configured symbol universe (§6.2).

use axum::extract::{Path, State};
use axum::Json;
use market_data::Ticker;
use types::ids::Symbol;

use crate::error::AppError;
use crate::state::AppState;

pub async fn get_ticker(State(state): State<AppState>, Path(symbol): Path<String>) -> Result<Json<Ticker>, AppError> {
    let symbol = Symbol::new(symbol);
    state
        .provider
        .ticker(&symbol)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no ticker for {symbol}")))
}

pub async fn list_tickers(State(state): State<AppState>) -> Result<Json<Vec<Ticker>>, AppError> {
    let mut out = Vec::with_capacity(state.symbol_universe.len());
    for symbol in &state.symbol_universe {
        if let Some(ticker) = state.provider.ticker(symbol).await {
            out.push(ticker);
        }
    }
    Ok(Json(out))
}
