//! An in-process `Store` implementation: no database, no migrations,
//! everything behind a `tokio::sync::RwLock<HashMap<...>>`. This is the
//! sim-runner's zero-configuration default and the store every other
//! crate's integration tests reach for instead of standing up Postgres.
//!
//! Foreign-key cascade (§3's "Competition owns Participants (cascade
//! delete)" etc.) is not needed here because nothing in the core ever
//! deletes a competition or a participant row; cascade only matters for
//! the admin "reset competition" surface, which lives in `gateway`, itself
//! explicitly out of scope for exhaustive coverage (§6.2).

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use types::competition::Competition;
use types::enums::{CompetitionStatus, ParticipantStatus};
use types::ids::{CompetitionId, ParticipantId};
use types::invocation::Invocation;
use types::order::Order;
use types::participant::Participant;
use types::portfolio::{Portfolio, PortfolioHistoryPoint};
use types::position::Position;
use types::trade::Trade;

use crate::error::PersistenceError;
use crate::store::{ParticipantState, Store};

#[derive(Default)]
struct Tables {
    competitions: HashMap<CompetitionId, Competition>,
    participants: HashMap<ParticipantId, Participant>,
    portfolios: HashMap<ParticipantId, Portfolio>,
    positions: HashMap<ParticipantId, Vec<Position>>,
    history: HashMap<ParticipantId, Vec<PortfolioHistoryPoint>>,
    orders: Vec<Order>,
    trades: HashMap<ParticipantId, Vec<Trade>>,
    invocations: HashMap<types::ids::InvocationId, Invocation>,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_competition(&self, competition: &Competition) -> Result<(), PersistenceError> {
        self.tables.write().await.competitions.insert(competition.id, competition.clone());
        Ok(())
    }

    async fn get_competition(&self, id: CompetitionId) -> Result<Option<Competition>, PersistenceError> {
        Ok(self.tables.read().await.competitions.get(&id).cloned())
    }

    async fn list_competitions_with_status(&self, status: CompetitionStatus) -> Result<Vec<Competition>, PersistenceError> {
        Ok(self.tables.read().await.competitions.values().filter(|c| c.status == status).cloned().collect())
    }

    async fn update_competition_status(&self, id: CompetitionId, status: CompetitionStatus) -> Result<(), PersistenceError> {
        let mut tables = self.tables.write().await;
        let competition = tables
            .competitions
            .get_mut(&id)
            .ok_or_else(|| PersistenceError::NotFound(format!("competition {id}")))?;
        competition.status = status;
        Ok(())
    }

    async fn insert_participant(&self, participant: &Participant, portfolio: &Portfolio) -> Result<(), PersistenceError> {
        let mut tables = self.tables.write().await;
        tables.participants.insert(participant.id, participant.clone());
        tables.portfolios.insert(participant.id, portfolio.clone());
        tables.positions.insert(participant.id, Vec::new());
        Ok(())
    }

    async fn get_participant_state(&self, id: ParticipantId) -> Result<Option<ParticipantState>, PersistenceError> {
        let tables = self.tables.read().await;
        let Some(participant) = tables.participants.get(&id).cloned() else {
            return Ok(None);
        };
        let portfolio = tables
            .portfolios
            .get(&id)
            .cloned()
            .ok_or_else(|| PersistenceError::NotFound(format!("portfolio for participant {id}")))?;
        let positions = tables.positions.get(&id).cloned().unwrap_or_default();
        Ok(Some(ParticipantState { participant, portfolio, positions }))
    }

    async fn list_participants(&self, competition_id: CompetitionId) -> Result<Vec<Participant>, PersistenceError> {
        Ok(self
            .tables
            .read()
            .await
            .participants
            .values()
            .filter(|p| p.competition_id == competition_id)
            .cloned()
            .collect())
    }

    async fn list_active_participants(&self, competition_id: CompetitionId) -> Result<Vec<Participant>, PersistenceError> {
        Ok(self
            .tables
            .read()
            .await
            .participants
            .values()
            .filter(|p| p.competition_id == competition_id && p.status == ParticipantStatus::Active)
            .cloned()
            .collect())
    }

    async fn save_participant_state(
        &self,
        state: &ParticipantState,
        history_point: &PortfolioHistoryPoint,
    ) -> Result<(), PersistenceError> {
        let mut tables = self.tables.write().await;
        let id = state.participant.id;
        tables.participants.insert(id, state.participant.clone());
        tables.portfolios.insert(id, state.portfolio.clone());
        tables.positions.insert(id, state.positions.clone());
        tables.history.entry(id).or_default().push(history_point.clone());
        Ok(())
    }

    async fn list_all_open_positions(&self) -> Result<Vec<Position>, PersistenceError> {
        Ok(self.tables.read().await.positions.values().flatten().cloned().collect())
    }

    async fn list_portfolio_history(&self, participant_id: ParticipantId) -> Result<Vec<PortfolioHistoryPoint>, PersistenceError> {
        Ok(self.tables.read().await.history.get(&participant_id).cloned().unwrap_or_default())
    }

    async fn insert_order(&self, order: &Order) -> Result<(), PersistenceError> {
        self.tables.write().await.orders.push(order.clone());
        Ok(())
    }

    async fn insert_trade(&self, trade: &Trade) -> Result<(), PersistenceError> {
        self.tables.write().await.trades.entry(trade.participant_id).or_default().push(trade.clone());
        Ok(())
    }

    async fn list_trades(&self, participant_id: ParticipantId) -> Result<Vec<Trade>, PersistenceError> {
        Ok(self.tables.read().await.trades.get(&participant_id).cloned().unwrap_or_default())
    }

    async fn insert_invocation(&self, invocation: &Invocation) -> Result<(), PersistenceError> {
        self.tables.write().await.invocations.insert(invocation.id, invocation.clone());
        Ok(())
    }

    async fn update_invocation(&self, invocation: &Invocation) -> Result<(), PersistenceError> {
        self.tables.write().await.invocations.insert(invocation.id, invocation.clone());
        Ok(())
    }

    async fn reset_all(&self) -> Result<(), PersistenceError> {
        *self.tables.write().await = Tables::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use rust_decimal_macros::dec;
    use types::numeric::Money;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[tokio::test]
    async fn round_trips_a_participant_and_its_portfolio() {
        let store = InMemoryStore::new();
        let participant = Participant::new(
            CompetitionId::new(), "Bot", "anthropic", "claude", serde_json::Value::Null, Money::new(dec!(10_000)),
        );
        let portfolio = Portfolio::new(participant.id, Money::new(dec!(10_000)));
        store.insert_participant(&participant, &portfolio).await.unwrap();

        let state = store.get_participant_state(participant.id).await.unwrap().unwrap();
        assert_eq!(state.participant.id, participant.id);
        assert_eq!(state.portfolio.cash_balance.as_decimal(), dec!(10_000));
        assert!(state.positions.is_empty());
    }

    #[tokio::test]
    async fn save_participant_state_appends_one_history_point_per_call() {
        let store = InMemoryStore::new();
        let participant = Participant::new(
            CompetitionId::new(), "Bot", "anthropic", "claude", serde_json::Value::Null, Money::new(dec!(10_000)),
        );
        let portfolio = Portfolio::new(participant.id, Money::new(dec!(10_000)));
        store.insert_participant(&participant, &portfolio).await.unwrap();

        let point = PortfolioHistoryPoint {
            participant_id: participant.id,
            cash_balance: portfolio.cash_balance,
            equity: portfolio.equity,
            margin_used: portfolio.margin_used,
            realized_pnl: portfolio.realized_pnl,
            unrealized_pnl: portfolio.unrealized_pnl,
            total_pnl: portfolio.total_pnl,
            recorded_at: now(),
        };
        let state = ParticipantState { participant, portfolio, positions: Vec::new() };
        store.save_participant_state(&state, &point).await.unwrap();
        store.save_participant_state(&state, &point).await.unwrap();

        let history = store.list_portfolio_history(state.participant.id).await.unwrap();
        assert_eq!(history.len(), 2);
    }
}
