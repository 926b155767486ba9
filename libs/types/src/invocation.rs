//! Invocation: one record per agent call (§3, §4.5).

use crate::enums::InvocationStatus;
use crate::ids::{CompetitionId, InvocationId, ParticipantId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The per-order outcome recorded into an invocation's `execution_results`
/// (§4.5, §7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderExecutionResult {
    pub order_id: crate::ids::OrderId,
    pub validation_passed: bool,
    pub rejection_reason: Option<String>,
    pub status: crate::enums::OrderStatus,
    pub executed_price: Option<crate::numeric::Price>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    pub id: InvocationId,
    pub participant_id: ParticipantId,
    pub competition_id: CompetitionId,
    pub prompt: String,
    pub request_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub market_snapshot: Value,
    pub portfolio_snapshot: Value,
    pub response_text: Option<String>,
    pub parsed_decision: Option<Value>,
    pub execution_results: Vec<OrderExecutionResult>,
    pub invoked_at: chrono::DateTime<chrono::Utc>,
    pub response_time_ms: Option<u64>,
    pub status: InvocationStatus,
    pub error_message: Option<String>,
    pub estimated_cost: Option<rust_decimal::Decimal>,
}

impl Invocation {
    pub fn new_pending(
        participant_id: ParticipantId,
        competition_id: CompetitionId,
        prompt: String,
        market_snapshot: Value,
        portfolio_snapshot: Value,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        Self {
            id: InvocationId::new(),
            participant_id,
            competition_id,
            prompt,
            request_tokens: None,
            completion_tokens: None,
            market_snapshot,
            portfolio_snapshot,
            response_text: None,
            parsed_decision: None,
            execution_results: Vec::new(),
            invoked_at: now,
            response_time_ms: None,
            status: InvocationStatus::Pending,
            error_message: None,
            estimated_cost: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_pending_invocation_has_empty_execution_results() {
        let inv = Invocation::new_pending(
            ParticipantId::new(),
            CompetitionId::new(),
            "system+user".to_string(),
            Value::Null,
            Value::Null,
            chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        );
        assert_eq!(inv.status, InvocationStatus::Pending);
        assert!(inv.execution_results.is_empty());
    }
}
