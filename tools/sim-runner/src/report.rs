//! End-of-run profitability report: one row per participant plus a
//! competition-wide roll-up, in the shape of the teacher's own
//! `reports::profitability::analyze` — a pure summary built from persisted
//! state rather than from a live event stream.

use calc_kernel::{pnl_pct, win_rate};
use persistence::Store;
use rust_decimal::Decimal;
use serde::Serialize;
use types::ids::CompetitionId;

#[derive(Debug, Serialize)]
pub struct ParticipantProfit {
    pub display_name: String,
    pub initial_capital: Decimal,
    pub current_equity: Decimal,
    pub realized_pnl_pct: Decimal,
    pub total_trades: u32,
    pub win_rate_pct: Decimal,
    pub open_positions: usize,
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub competition_id: CompetitionId,
    pub participants: Vec<ParticipantProfit>,
    pub best_performer: Option<String>,
}

pub async fn build(store: &dyn Store, competition_id: CompetitionId) -> anyhow::Result<RunReport> {
    let participants = store.list_participants(competition_id).await?;

    let mut rows = Vec::with_capacity(participants.len());
    for participant in &participants {
        let Some(state) = store.get_participant_state(participant.id).await? else {
            continue;
        };
        rows.push(ParticipantProfit {
            display_name: participant.display_name.clone(),
            initial_capital: participant.initial_capital.as_decimal(),
            current_equity: state.portfolio.equity.as_decimal(),
            realized_pnl_pct: pnl_pct(state.portfolio.realized_pnl.as_decimal(), participant.initial_capital.as_decimal()),
            total_trades: participant.total_trades,
            win_rate_pct: win_rate(participant.winning_trades, participant.total_trades),
            open_positions: state.positions.len(),
        });
    }

    let best_performer = rows
        .iter()
        .max_by(|a, b| a.current_equity.cmp(&b.current_equity))
        .map(|row| row.display_name.clone());

    Ok(RunReport { competition_id, participants: rows, best_performer })
}
