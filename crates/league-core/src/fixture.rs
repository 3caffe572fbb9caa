//! Matches and their lifecycle.
//!
//! A match moves `scheduled -> in_progress -> completed`, or sideways to
//! `invalid` before completion. Cancelling (deleting) is handled by the store
//! and is only allowed while the match is not completed.

use crate::catalog::ValidationError;
use crate::{LeagueError, LeagueId, MatchId, PlayerId, TeamId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Scheduled,
    InProgress,
    Completed,
    Invalid,
}

impl MatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::InProgress => "in_progress",
            MatchStatus::Completed => "completed",
            MatchStatus::Invalid => "invalid",
        }
    }

    /// Events may only be recorded while the match is being played.
    pub fn accepts_events(self) -> bool {
        self == MatchStatus::InProgress
    }

    /// Completed matches are permanent; everything else may be deleted.
    pub fn is_cancellable(self) -> bool {
        self != MatchStatus::Completed
    }

    /// Status reached by applying `transition`, or `InvalidState` if the
    /// transition is not allowed from here.
    pub fn after(self, transition: &MatchTransition) -> Result<MatchStatus, LeagueError> {
        use MatchStatus::*;
        match (self, transition) {
            (Scheduled, MatchTransition::Start { .. }) => Ok(InProgress),
            (InProgress, MatchTransition::Complete { .. }) => Ok(Completed),
            (Scheduled | InProgress, MatchTransition::Invalidate) => Ok(Invalid),
            _ => Err(LeagueError::InvalidState(format!(
                "cannot {} a {} match",
                transition.verb(),
                self
            ))),
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "scheduled" => Ok(MatchStatus::Scheduled),
            "in_progress" => Ok(MatchStatus::InProgress),
            "completed" => Ok(MatchStatus::Completed),
            "invalid" => Ok(MatchStatus::Invalid),
            other => Err(ValidationError::UnknownVariant {
                kind: "match status",
                value: other.to_string(),
            }),
        }
    }
}

/// Pre-match weather roll result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weather {
    SwelteringHeat,
    VerySunny,
    #[default]
    Nice,
    PouringRain,
    Blizzard,
}

impl Weather {
    pub fn as_str(self) -> &'static str {
        match self {
            Weather::SwelteringHeat => "sweltering_heat",
            Weather::VerySunny => "very_sunny",
            Weather::Nice => "nice",
            Weather::PouringRain => "pouring_rain",
            Weather::Blizzard => "blizzard",
        }
    }
}

impl fmt::Display for Weather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Weather {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match key.as_str() {
            "sweltering_heat" => Ok(Weather::SwelteringHeat),
            "very_sunny" => Ok(Weather::VerySunny),
            "nice" => Ok(Weather::Nice),
            "pouring_rain" => Ok(Weather::PouringRain),
            "blizzard" => Ok(Weather::Blizzard),
            _ => Err(ValidationError::UnknownVariant {
                kind: "weather",
                value: s.to_string(),
            }),
        }
    }
}

/// Which of the two teams in a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Team1,
    Team2,
}

/// One team's record in a match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSide {
    /// The team playing this side.
    pub team_id: TeamId,
    /// Fame rolled at kick-off.
    pub fame: i32,
    /// Gold earned, in thousands.
    pub winnings: i64,
    /// Added to the team's fan factor on completion.
    pub fan_factor_change: i32,
}

impl MatchSide {
    pub fn new(team_id: TeamId) -> Self {
        Self {
            team_id,
            fame: 0,
            winnings: 0,
            fan_factor_change: 0,
        }
    }
}

/// What one coach reports when the match ends.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMatchReport {
    pub winnings: i64,
    pub fan_factor_change: i32,
    pub mvp: Option<PlayerId>,
}

/// Input that moves a match along its lifecycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "transition", rename_all = "snake_case")]
pub enum MatchTransition {
    Start {
        team1_fame: i32,
        team2_fame: i32,
        weather: Weather,
    },
    Complete {
        team1: PostMatchReport,
        team2: PostMatchReport,
    },
    Invalidate,
}

impl MatchTransition {
    fn verb(&self) -> &'static str {
        match self {
            MatchTransition::Start { .. } => "start",
            MatchTransition::Complete { .. } => "complete",
            MatchTransition::Invalidate => "invalidate",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub league_id: LeagueId,
    pub team1: MatchSide,
    pub team2: MatchSide,
    pub weather: Weather,
    pub status: MatchStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Match {
    /// A freshly scheduled match between two distinct teams.
    pub fn schedule(
        id: MatchId,
        league_id: LeagueId,
        team1: TeamId,
        team2: TeamId,
        at: DateTime<Utc>,
    ) -> Result<Self, LeagueError> {
        if team1 == team2 {
            return Err(LeagueError::InvalidChoice(format!(
                "team {team1} cannot play itself"
            )));
        }
        Ok(Self {
            id,
            league_id,
            team1: MatchSide::new(team1),
            team2: MatchSide::new(team2),
            weather: Weather::default(),
            status: MatchStatus::Scheduled,
            created_at: at,
            started_at: None,
            completed_at: None,
        })
    }

    pub fn side(&self, side: Side) -> &MatchSide {
        match side {
            Side::Team1 => &self.team1,
            Side::Team2 => &self.team2,
        }
    }

    /// Which side `team` plays on, if it plays in this match at all.
    pub fn side_of(&self, team: TeamId) -> Option<Side> {
        if self.team1.team_id == team {
            Some(Side::Team1)
        } else if self.team2.team_id == team {
            Some(Side::Team2)
        } else {
            None
        }
    }

    pub fn involves(&self, team: TeamId) -> bool {
        self.side_of(team).is_some()
    }

    pub fn ensure_accepts_events(&self) -> Result<(), LeagueError> {
        if self.status.accepts_events() {
            Ok(())
        } else {
            Err(LeagueError::InvalidState(format!(
                "match {} is {}, events can only be recorded in_progress",
                self.id, self.status
            )))
        }
    }

    /// Apply a transition to this match's own fields.
    ///
    /// Team-level side effects of completion (treasury, fan factor, MVP
    /// records, miss-next flags) are the store's job.
    pub fn apply(
        &mut self,
        transition: &MatchTransition,
        at: DateTime<Utc>,
    ) -> Result<MatchStatus, LeagueError> {
        let next = self.status.after(transition)?;
        match transition {
            MatchTransition::Start {
                team1_fame,
                team2_fame,
                weather,
            } => {
                self.team1.fame = *team1_fame;
                self.team2.fame = *team2_fame;
                self.weather = *weather;
                self.started_at = Some(at);
            }
            MatchTransition::Complete { team1, team2 } => {
                self.team1.winnings = team1.winnings;
                self.team1.fan_factor_change = team1.fan_factor_change;
                self.team2.winnings = team2.winnings;
                self.team2.fan_factor_change = team2.fan_factor_change;
                self.completed_at = Some(at);
            }
            MatchTransition::Invalidate => {}
        }
        self.status = next;
        Ok(next)
    }
}
