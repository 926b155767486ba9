//! Per-participant serialization (§5): "Two concurrent ticks touching the
//! same participant must serialize on that participant's row". Against a
//! live Postgres store that is a `SELECT ... FOR UPDATE` inside the
//! transaction `PgStore` opens around a save; this map is the in-process
//! equivalent the scheduler and agent-invoker take *before* talking to
//! whichever `Store` is configured, so the two ticks never interleave
//! their read-modify-write cycle for one participant regardless of which
//! store backs them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use types::ids::ParticipantId;

#[derive(Default)]
pub struct ParticipantLocks {
    locks: Mutex<HashMap<ParticipantId, Arc<AsyncMutex<()>>>>,
}

impl ParticipantLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, participant_id: ParticipantId) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(participant_id).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }

    /// Acquire the lock for `participant_id`, blocking until any other
    /// holder (another tick, another task) releases it. The returned guard
    /// releases the lock on drop.
    pub async fn acquire(&self, participant_id: ParticipantId) -> OwnedMutexGuard<()> {
        self.entry(participant_id).lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn a_second_acquire_for_the_same_participant_waits_for_the_first_to_drop() {
        let locks = Arc::new(ParticipantLocks::new());
        let participant_id = ParticipantId::new();

        let guard = locks.acquire(participant_id).await;
        let locks2 = locks.clone();
        let handle = tokio::spawn(async move {
            let _guard = locks2.acquire(participant_id).await;
            "acquired"
        });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!handle.is_finished());
        drop(guard);
        assert_eq!(handle.await.unwrap(), "acquired");
    }

    #[tokio::test]
    async fn different_participants_do_not_contend() {
        let locks = ParticipantLocks::new();
        let a = ParticipantId::new();
        let b = ParticipantId::new();
        let _guard_a = locks.acquire(a).await;
        let guard_b = locks.acquire(b).await;
        drop(guard_b);
    }
}
