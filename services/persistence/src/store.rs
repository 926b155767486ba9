//! The logical store contract (§3, §6.3): whatever sits behind this trait
//! must give row-level writes and foreign-key cascade. Two implementations
//! are provided — [`crate::postgres::PgStore`] for a real deployment and
//! [`crate::memory::InMemoryStore`] for the sim-runner's zero-dependency
//! quick start and for tests that don't need a live database.
//!
//! Row-level serialization for a single participant (§5: "writes from
//! mark-to-market and writes from order execution are totally ordered
//! under the per-participant lock") is **not** part of this trait — it is
//! a cross-cutting concern orchestrated by [`crate::participant_lock::ParticipantLocks`]
//! at the call site (scheduler, agent-invoker), the same way a caller
//! wraps a `PgPool` transaction around a `SELECT ... FOR UPDATE` rather
//! than having the repository layer decide when to lock.

use async_trait::async_trait;
use types::competition::Competition;
use types::ids::{CompetitionId, ParticipantId};
use types::invocation::Invocation;
use types::order::Order;
use types::participant::Participant;
use types::portfolio::{Portfolio, PortfolioHistoryPoint};
use types::position::Position;
use types::trade::Trade;

use crate::error::PersistenceError;

/// One participant's full mutable working set: its portfolio and its
/// currently open positions. The unit `check_and_liquidate`,
/// `portfolio_manager::update` and `trading_engine::process` all operate
/// over.
#[derive(Debug, Clone)]
pub struct ParticipantState {
    pub participant: Participant,
    pub portfolio: Portfolio,
    pub positions: Vec<Position>,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_competition(&self, competition: &Competition) -> Result<(), PersistenceError>;
    async fn get_competition(&self, id: CompetitionId) -> Result<Option<Competition>, PersistenceError>;
    async fn list_competitions_with_status(
        &self,
        status: types::enums::CompetitionStatus,
    ) -> Result<Vec<Competition>, PersistenceError>;
    async fn update_competition_status(
        &self,
        id: CompetitionId,
        status: types::enums::CompetitionStatus,
    ) -> Result<(), PersistenceError>;

    async fn insert_participant(&self, participant: &Participant, portfolio: &Portfolio) -> Result<(), PersistenceError>;
    async fn get_participant_state(&self, id: ParticipantId) -> Result<Option<ParticipantState>, PersistenceError>;
    async fn list_participants(&self, competition_id: CompetitionId) -> Result<Vec<Participant>, PersistenceError>;
    async fn list_active_participants(&self, competition_id: CompetitionId) -> Result<Vec<Participant>, PersistenceError>;

    /// Persist the result of one mark-to-market or order-execution unit of
    /// work: the participant row, its portfolio row, its current position
    /// set (replacing whatever was there), and one new history point — all
    /// under the per-participant lock the caller already holds.
    async fn save_participant_state(
        &self,
        state: &ParticipantState,
        history_point: &PortfolioHistoryPoint,
    ) -> Result<(), PersistenceError>;

    async fn list_all_open_positions(&self) -> Result<Vec<Position>, PersistenceError>;
    async fn list_portfolio_history(&self, participant_id: ParticipantId) -> Result<Vec<PortfolioHistoryPoint>, PersistenceError>;

    async fn insert_order(&self, order: &Order) -> Result<(), PersistenceError>;
    async fn insert_trade(&self, trade: &Trade) -> Result<(), PersistenceError>;
    async fn list_trades(&self, participant_id: ParticipantId) -> Result<Vec<Trade>, PersistenceError>;

    async fn insert_invocation(&self, invocation: &Invocation) -> Result<(), PersistenceError>;
    async fn update_invocation(&self, invocation: &Invocation) -> Result<(), PersistenceError>;

    /// Hard wipe of every table (§6.2's admin "reset competition": wipe then
    /// reseed). Cascade is implicit here — there is nothing left to cascade
    /// from once every table is empty.
    async fn reset_all(&self) -> Result<(), PersistenceError>;
}
