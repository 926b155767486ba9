//! Request/response DTOs for the gateway surface (§6.2).
//!
//! Most views are the domain types themselves — `Competition`, `Participant`,
//! `Portfolio`, `Position` and `Trade` already derive `Serialize` and carry
//! nothing a client shouldn't see, so handlers return them directly. This
//! module only adds the shapes that don't already exist on a domain type:
//! admin request bodies and the downsampled-history envelope.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::enums::AssetClass;
use types::ids::CompetitionId;
use types::numeric::Money;
use types::portfolio::PortfolioHistoryPoint;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCompetitionRequest {
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub invocation_interval_minutes: u32,
    pub initial_capital: Decimal,
    pub max_leverage: u32,
    pub maintenance_margin_pct: Decimal,
    pub allowed_asset_classes: Vec<AssetClass>,
    pub max_participants: u32,
    pub market_hours_gated: bool,
}

impl CreateCompetitionRequest {
    pub fn initial_capital_money(&self) -> Money {
        Money::new(self.initial_capital)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    /// Approximate number of points the caller wants back; the actual count
    /// depends on which bucket width the ladder picks (§4.8).
    pub target_points: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    pub points: Vec<PortfolioHistoryPoint>,
    /// 0 means the raw series was returned untouched.
    pub bucket_minutes: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompetitionCreatedResponse {
    pub id: CompetitionId,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvocationCountResponse {
    pub invocations_run: usize,
}
