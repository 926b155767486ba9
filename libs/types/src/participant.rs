//! Participant: one agent enrolled in one competition (§3).

use crate::enums::ParticipantStatus;
use crate::ids::{CompetitionId, ParticipantId};
use crate::numeric::Money;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub competition_id: CompetitionId,
    pub display_name: String,
    pub agent_provider: String,
    pub agent_model: String,
    pub agent_config: Value,
    pub status: ParticipantStatus,
    /// Frozen at creation; never mutated afterward.
    pub initial_capital: Money,
    pub current_equity: Money,
    pub peak_equity: Money,
    pub total_trades: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,
}

impl Participant {
    pub fn new(
        competition_id: CompetitionId,
        display_name: impl Into<String>,
        agent_provider: impl Into<String>,
        agent_model: impl Into<String>,
        agent_config: Value,
        initial_capital: Money,
    ) -> Self {
        Self {
            id: ParticipantId::new(),
            competition_id,
            display_name: display_name.into(),
            agent_provider: agent_provider.into(),
            agent_model: agent_model.into(),
            agent_config,
            status: ParticipantStatus::Active,
            initial_capital,
            current_equity: initial_capital,
            peak_equity: initial_capital,
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ParticipantStatus::Active
    }

    /// §3 invariant: `peak_equity >= current_equity` must hold after every
    /// portfolio-manager update. Called by C3's `update_participant_equity`.
    pub fn update_equity(&mut self, new_equity: Money) {
        self.current_equity = new_equity;
        if new_equity.as_decimal() > self.peak_equity.as_decimal() {
            self.peak_equity = new_equity;
        }
    }

    pub fn record_close(&mut self, realized_pnl: rust_decimal::Decimal) {
        self.total_trades += 1;
        if realized_pnl > rust_decimal::Decimal::ZERO {
            self.winning_trades += 1;
        } else if realized_pnl < rust_decimal::Decimal::ZERO {
            self.losing_trades += 1;
        }
    }

    /// `win / n * 100`, 0 if no trades (§4.1).
    pub fn win_rate(&self) -> rust_decimal::Decimal {
        if self.total_trades == 0 {
            rust_decimal::Decimal::ZERO
        } else {
            rust_decimal::Decimal::from(self.winning_trades) * rust_decimal::Decimal::from(100)
                / rust_decimal::Decimal::from(self.total_trades)
        }
    }
}
