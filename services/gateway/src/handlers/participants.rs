//! Per-participant read views: portfolio snapshot and open positions.

use axum::extract::{Path, State};
use axum::Json;
use persistence::Store;
use types::ids::ParticipantId;
use types::participant::Participant;
use types::portfolio::Portfolio;
use types::position::Position;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, serde::Serialize)]
pub struct ParticipantView {
    pub participant: Participant,
    pub portfolio: Portfolio,
    pub positions: Vec<Position>,
}

pub async fn get_participant(State(state): State<AppState>, Path(id): Path<ParticipantId>) -> Result<Json<ParticipantView>, AppError> {
    let participant_state = state
        .store
        .get_participant_state(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("participant {id} not found")))?;
    Ok(Json(ParticipantView {
        participant: participant_state.participant,
        portfolio: participant_state.portfolio,
        positions: participant_state.positions,
    }))
}

pub async fn list_open_positions(State(state): State<AppState>, Path(id): Path<ParticipantId>) -> Result<Json<Vec<Position>>, AppError> {
    let participant_state = state
        .store
        .get_participant_state(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("participant {id} not found")))?;
    Ok(Json(participant_state.positions))
}
