//! Read views and admin lifecycle actions over competitions (§6.2).

use axum::extract::{Path, Query, State};
use axum::Json;
use types::enums::CompetitionStatus;
use types::ids::CompetitionId;

use crate::auth::AdminUser;
use crate::error::AppError;
use crate::models::{CompetitionCreatedResponse, CreateCompetitionRequest, HistoryQuery, HistoryResponse, InvocationCountResponse};
use crate::state::AppState;

pub async fn list_competitions(State(state): State<AppState>) -> Result<Json<Vec<types::competition::Competition>>, AppError> {
    let active = state.store.list_competitions_with_status(CompetitionStatus::Active).await?;
    let pending = state.store.list_competitions_with_status(CompetitionStatus::Pending).await?;
    let completed = state.store.list_competitions_with_status(CompetitionStatus::Completed).await?;
    let cancelled = state.store.list_competitions_with_status(CompetitionStatus::Cancelled).await?;
    let mut all = active;
    all.extend(pending);
    all.extend(completed);
    all.extend(cancelled);
    Ok(Json(all))
}

pub async fn get_competition(
    State(state): State<AppState>,
    Path(id): Path<CompetitionId>,
) -> Result<Json<types::competition::Competition>, AppError> {
    let competition = state
        .store
        .get_competition(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("competition {id} not found")))?;
    Ok(Json(competition))
}

pub async fn list_participants(
    State(state): State<AppState>,
    Path(id): Path<CompetitionId>,
) -> Result<Json<Vec<types::participant::Participant>>, AppError> {
    Ok(Json(state.store.list_participants(id).await?))
}

pub async fn leaderboard(
    State(state): State<AppState>,
    Path(id): Path<CompetitionId>,
) -> Result<Json<Vec<agent_invoker::context::LeaderboardEntry>>, AppError> {
    let participants = state.store.list_participants(id).await?;
    Ok(Json(agent_invoker::context::build_leaderboard(&participants)))
}

pub async fn portfolio_history(
    State(state): State<AppState>,
    Path(participant_id): Path<types::ids::ParticipantId>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    let records = state.store.list_portfolio_history(participant_id).await?;
    let target_points = query.target_points.unwrap_or(200);
    let (points, bucket_minutes) = portfolio_manager::history::adaptive_downsample(records, target_points);
    Ok(Json(HistoryResponse { points, bucket_minutes }))
}

pub async fn list_trades(
    State(state): State<AppState>,
    Path(participant_id): Path<types::ids::ParticipantId>,
) -> Result<Json<Vec<types::trade::Trade>>, AppError> {
    Ok(Json(state.store.list_trades(participant_id).await?))
}

pub async fn create_competition(
    _admin: AdminUser,
    State(state): State<AppState>,
    Json(request): Json<CreateCompetitionRequest>,
) -> Result<Json<CompetitionCreatedResponse>, AppError> {
    let competition = types::competition::Competition::new(
        request.name,
        request.start_time,
        request.end_time,
        request.invocation_interval_minutes,
        request.initial_capital_money(),
        request.max_leverage,
        request.maintenance_margin_pct,
        request.allowed_asset_classes,
        request.max_participants,
        request.market_hours_gated,
    )
    .map_err(|e| AppError::BadRequest(e.to_string()))?;

    state.store.insert_competition(&competition).await?;
    Ok(Json(CompetitionCreatedResponse { id: competition.id }))
}

pub async fn start_competition(_admin: AdminUser, State(state): State<AppState>, Path(id): Path<CompetitionId>) -> Result<(), AppError> {
    state.store.update_competition_status(id, CompetitionStatus::Active).await?;
    Ok(())
}

pub async fn stop_competition(_admin: AdminUser, State(state): State<AppState>, Path(id): Path<CompetitionId>) -> Result<(), AppError> {
    state.store.update_competition_status(id, CompetitionStatus::Completed).await?;
    Ok(())
}

/// Hard wipe of every table, then reseed the one baked-in default
/// competition and its agent roster (§6.2).
pub async fn reset_competition(_admin: AdminUser, State(state): State<AppState>) -> Result<Json<CompetitionCreatedResponse>, AppError> {
    state.store.reset_all().await?;
    let competition = crate::seed::seed_default_competition(&state.store).await?;
    Ok(Json(CompetitionCreatedResponse { id: competition.id }))
}

/// Manually invoke every active participant of one competition, regardless
/// of whether its own `invocation_interval_minutes` has elapsed.
pub async fn invoke_all(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<CompetitionId>,
) -> Result<Json<InvocationCountResponse>, AppError> {
    let competition = state
        .store
        .get_competition(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("competition {id} not found")))?;

    let invocations_run = scheduler::run_decision_tick(
        state.store.clone(),
        state.locks.clone(),
        state.provider.clone(),
        state.transport.clone(),
        state.agent_config.clone(),
        competition,
        state.symbol_universe.clone(),
        8,
        chrono::Utc::now(),
    )
    .await
    .map_err(|e| AppError::InternalError(anyhow::anyhow!(e.to_string())))?;

    Ok(Json(InvocationCountResponse { invocations_run }))
}

/// Manually trigger one invocation for a single participant.
pub async fn invoke_one(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(participant_id): Path<types::ids::ParticipantId>,
) -> Result<(), AppError> {
    let state_for_participant = state
        .store
        .get_participant_state(participant_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("participant {participant_id} not found")))?;
    let competition = state
        .store
        .get_competition(state_for_participant.participant.competition_id)
        .await?
        .ok_or_else(|| AppError::NotFound("competition not found".into()))?;
    let other_participants = state
        .store
        .list_active_participants(competition.id)
        .await?
        .into_iter()
        .filter(|p| p.id != participant_id)
        .collect::<Vec<_>>();

    scheduler::run_decision_one(
        state.store.clone(),
        state.locks.clone(),
        state.provider.clone(),
        state.transport.clone(),
        state.agent_config.clone(),
        competition,
        other_participants,
        state.symbol_universe.clone(),
        participant_id,
        chrono::Utc::now(),
    )
    .await
    .map_err(|e| AppError::InternalError(anyhow::anyhow!(e.to_string())))?;

    Ok(())
}
