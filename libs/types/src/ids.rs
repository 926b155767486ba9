//! Unique identifier types for simulation entities.
//!
//! All IDs use UUID v7 for time-sortable ordering, which keeps
//! `ORDER BY id` equivalent to `ORDER BY created_at` without a join.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! id_type {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new, time-ordered identifier.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

id_type!(CompetitionId, "Identifies one time-bounded competition.");
id_type!(ParticipantId, "Identifies one agent enrolled in one competition.");
id_type!(PortfolioId, "Identifies a participant's single portfolio.");
id_type!(PositionId, "Identifies one open CFD position.");
id_type!(OrderId, "Identifies one order, executed or rejected.");
id_type!(TradeId, "Identifies one accounting entry produced by an executed order.");
id_type!(InvocationId, "Identifies one agent call and its outcome.");

/// A market symbol such as `"BTCUSDT"`. Free-form: asset classes other than
/// crypto spot (equities, FX) do not share crypto's `BASE/QUOTE` convention,
/// so no structural validation is imposed here beyond non-emptiness.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(ParticipantId::new(), ParticipantId::new());
        assert_ne!(PositionId::new(), PositionId::new());
    }

    #[test]
    fn ids_round_trip_through_json() {
        let id = CompetitionId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: CompetitionId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn ids_are_time_sortable() {
        let a = TradeId::new();
        let b = TradeId::new();
        assert!(a.as_uuid() < b.as_uuid());
    }

    #[test]
    fn symbol_serializes_as_bare_string() {
        let s = Symbol::new("BTCUSDT");
        assert_eq!(serde_json::to_string(&s).unwrap(), "\"BTCUSDT\"");
    }
}
