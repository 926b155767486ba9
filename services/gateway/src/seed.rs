//! The baked-in default competition and agent roster (§6.2) the admin
//! "reset competition" action reseeds after `Store::reset_all`.

use std::sync::Arc;

use chrono::{Duration, Utc};
use persistence::{PersistenceError, Store};
use rust_decimal_macros::dec;
use types::competition::Competition;
use types::enums::AssetClass;
use types::numeric::Money;
use types::participant::Participant;
use types::portfolio::Portfolio;

const DEFAULT_AGENTS: &[(&str, &str, &str)] = &[
    ("Momentum Bot", "anthropic", "claude-sonnet-4"),
    ("Mean Reversion Bot", "anthropic", "claude-sonnet-4"),
    ("Breakout Bot", "anthropic", "claude-sonnet-4"),
    ("Conservative Bot", "anthropic", "claude-sonnet-4"),
];

/// Create the default competition plus one participant per
/// [`DEFAULT_AGENTS`] entry, each starting from the competition's own
/// `initial_capital`. Returns the new competition's id.
pub async fn seed_default_competition(store: &Arc<dyn Store>) -> Result<Competition, PersistenceError> {
    let now = Utc::now();
    let competition = Competition::new(
        "Open Trading Arena",
        now,
        now + Duration::days(30),
        5,
        Money::new(dec!(10_000)),
        10,
        dec!(5),
        vec![AssetClass::Crypto],
        DEFAULT_AGENTS.len() as u32,
        false,
    )
    .expect("baked-in default competition configuration is valid");

    store.insert_competition(&competition).await?;

    for (name, provider, model) in DEFAULT_AGENTS {
        let participant = Participant::new(
            competition.id,
            *name,
            *provider,
            *model,
            serde_json::Value::Null,
            competition.initial_capital,
        );
        let portfolio = Portfolio::new(participant.id, competition.initial_capital);
        store.insert_participant(&participant, &portfolio).await?;
    }

    let mut started = competition;
    store.update_competition_status(started.id, types::enums::CompetitionStatus::Active).await?;
    started.status = types::enums::CompetitionStatus::Active;
    Ok(started)
}
