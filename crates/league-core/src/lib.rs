#![deny(warnings)]

//! Core domain models and invariants for the league manager.
//!
//! This crate defines the serializable entities shared by the rules engine,
//! the store and the CLI: reference data (factions, rosters, skills,
//! injuries), roster members with their level-up history, matches with their
//! state machine, and the ledger of match events.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod catalog;
pub mod fixture;
pub mod ledger;
pub mod roster;

pub use catalog::*;
pub use fixture::*;
pub use ledger::*;
pub use roster::*;

macro_rules! entity_id {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(pub i64);

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )*
    };
}

entity_id!(
    /// Identifier of a faction (team archetype).
    FactionId,
    /// Identifier of a roster slot within a faction.
    PlayerTypeId,
    /// Identifier of a skill in the skill catalog.
    SkillId,
    /// Identifier of an injury type.
    InjuryTypeId,
    /// Identifier of a league.
    LeagueId,
    /// Identifier of a team.
    TeamId,
    /// Identifier of a player.
    PlayerId,
    /// Identifier of a level-up record.
    LevelUpId,
    /// Identifier of a match.
    MatchId,
    /// Identifier of a single match event record.
    EventId,
);

/// Errors surfaced by league operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LeagueError {
    /// A referenced entity does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    /// The operation is not allowed in the entity's current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// The requested choice is not available to the entity.
    #[error("invalid choice: {0}")]
    InvalidChoice(String),
    /// A uniqueness or capacity constraint would be broken.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
}

impl LeagueError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        LeagueError::NotFound { entity, id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_transparently() {
        let s = serde_json::to_string(&PlayerId(42)).unwrap();
        assert_eq!(s, "42");
        let back: TeamId = serde_json::from_str("7").unwrap();
        assert_eq!(back, TeamId(7));
    }

    #[test]
    fn not_found_message_names_entity() {
        let err = LeagueError::not_found("team", 3);
        assert_eq!(err.to_string(), "team 3 not found");
    }
}
