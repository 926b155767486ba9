//! Scheduler tuning knobs (§4.7, §5).

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How often the mark-to-market job revalues every open position,
    /// independent of any competition's `invocation_interval_minutes`.
    pub mark_to_market_interval: Duration,
    /// Upper bound on agent calls in flight at once (§5: the original's
    /// unbounded per-tick fan-out is deliberately not reproduced here).
    pub max_concurrent_decisions: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            mark_to_market_interval: Duration::from_secs(10),
            max_concurrent_decisions: 8,
        }
    }
}
