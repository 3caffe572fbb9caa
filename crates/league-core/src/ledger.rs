//! Match ledger: the immutable facts recorded while a match is played.
//!
//! A [`MatchLedger`] is an in-memory view over some set of matches and their
//! events, loaded by the store for whatever a query needs (one player's
//! career, one league's season). Every aggregate is derived from it on read.

use crate::catalog::InjuryType;
use crate::fixture::{Match, MatchStatus, Side};
use crate::{EventId, LeagueError, MatchId, PlayerId, TeamId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Touchdown,
    Completion,
    Casualty,
    Interception,
    Mvp,
    Injury,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::Touchdown,
        EventKind::Completion,
        EventKind::Casualty,
        EventKind::Interception,
        EventKind::Mvp,
        EventKind::Injury,
    ];
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::Touchdown => "touchdown",
            EventKind::Completion => "completion",
            EventKind::Casualty => "casualty",
            EventKind::Interception => "interception",
            EventKind::Mvp => "mvp",
            EventKind::Injury => "injury",
        };
        f.write_str(s)
    }
}

/// A single fact from a match. Each role carries its own team so that
/// players on either side can be referenced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchEvent {
    Touchdown {
        scorer: PlayerId,
        team: TeamId,
    },
    Completion {
        thrower: PlayerId,
        receiver: PlayerId,
        team: TeamId,
    },
    Casualty {
        causer: PlayerId,
        causing_team: TeamId,
        victim: PlayerId,
        victim_team: TeamId,
    },
    Interception {
        interceptor: PlayerId,
        intercepting_team: TeamId,
        thrower: PlayerId,
        throwing_team: TeamId,
    },
    Mvp {
        player: PlayerId,
        team: TeamId,
    },
    Injury {
        player: PlayerId,
        team: TeamId,
        injury: InjuryType,
    },
}

impl MatchEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            MatchEvent::Touchdown { .. } => EventKind::Touchdown,
            MatchEvent::Completion { .. } => EventKind::Completion,
            MatchEvent::Casualty { .. } => EventKind::Casualty,
            MatchEvent::Interception { .. } => EventKind::Interception,
            MatchEvent::Mvp { .. } => EventKind::Mvp,
            MatchEvent::Injury { .. } => EventKind::Injury,
        }
    }

    /// The team the event is booked to when splitting a match by side.
    pub fn team_of_record(&self) -> TeamId {
        match self {
            MatchEvent::Touchdown { team, .. }
            | MatchEvent::Completion { team, .. }
            | MatchEvent::Mvp { team, .. }
            | MatchEvent::Injury { team, .. } => *team,
            MatchEvent::Casualty { causing_team, .. } => *causing_team,
            MatchEvent::Interception {
                intercepting_team, ..
            } => *intercepting_team,
        }
    }

    /// The player who earns star player points for this event, if any.
    pub fn credited_player(&self) -> Option<PlayerId> {
        match self {
            MatchEvent::Touchdown { scorer, .. } => Some(*scorer),
            MatchEvent::Completion { thrower, .. } => Some(*thrower),
            MatchEvent::Casualty { causer, .. } => Some(*causer),
            MatchEvent::Interception { interceptor, .. } => Some(*interceptor),
            MatchEvent::Mvp { player, .. } => Some(*player),
            MatchEvent::Injury { .. } => None,
        }
    }

    /// Every (player, team) pair the event references.
    pub fn participants(&self) -> Vec<(PlayerId, TeamId)> {
        match self {
            MatchEvent::Touchdown { scorer, team } => vec![(*scorer, *team)],
            MatchEvent::Completion {
                thrower,
                receiver,
                team,
            } => vec![(*thrower, *team), (*receiver, *team)],
            MatchEvent::Casualty {
                causer,
                causing_team,
                victim,
                victim_team,
            } => vec![(*causer, *causing_team), (*victim, *victim_team)],
            MatchEvent::Interception {
                interceptor,
                intercepting_team,
                thrower,
                throwing_team,
            } => vec![(*interceptor, *intercepting_team), (*thrower, *throwing_team)],
            MatchEvent::Mvp { player, team } | MatchEvent::Injury { player, team, .. } => {
                vec![(*player, *team)]
            }
        }
    }
}

/// A stored event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EventId,
    pub match_id: MatchId,
    pub event: MatchEvent,
}

/// Events of one kind in one match, split by team of record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Partition<'a> {
    pub team1: Vec<&'a LedgerEntry>,
    pub team2: Vec<&'a LedgerEntry>,
}

/// Touchdowns per side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub team1: u32,
    pub team2: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "team", rename_all = "snake_case")]
pub enum MatchResult {
    Winner(TeamId),
    Draw,
}

/// A player's event counts across completed matches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareerTally {
    pub completions: u32,
    pub touchdowns: u32,
    pub interceptions: u32,
    pub casualties: u32,
    pub mvps: u32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MatchLedger {
    matches: BTreeMap<MatchId, Match>,
    entries: Vec<LedgerEntry>,
}

impl MatchLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(
        matches: impl IntoIterator<Item = Match>,
        entries: impl IntoIterator<Item = LedgerEntry>,
    ) -> Self {
        Self {
            matches: matches.into_iter().map(|m| (m.id, m)).collect(),
            entries: entries.into_iter().collect(),
        }
    }

    pub fn insert_match(&mut self, m: Match) {
        self.matches.insert(m.id, m);
    }

    /// Append an event. The match must already be known to the ledger and
    /// accept events.
    pub fn record(&mut self, entry: LedgerEntry) -> Result<(), LeagueError> {
        let m = self.fixture(entry.match_id)?;
        m.ensure_accepts_events()?;
        for (_, team) in entry.event.participants() {
            if !m.involves(team) {
                return Err(LeagueError::InvalidChoice(format!(
                    "team {team} does not play in match {}",
                    m.id
                )));
            }
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn fixture(&self, id: MatchId) -> Result<&Match, LeagueError> {
        self.matches
            .get(&id)
            .ok_or_else(|| LeagueError::not_found("match", id.0))
    }

    pub fn fixture_mut(&mut self, id: MatchId) -> Result<&mut Match, LeagueError> {
        self.matches
            .get_mut(&id)
            .ok_or_else(|| LeagueError::not_found("match", id.0))
    }

    pub fn matches(&self) -> impl Iterator<Item = &Match> {
        self.matches.values()
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn entries_for(&self, id: MatchId) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter().filter(move |e| e.match_id == id)
    }

    /// Events of `kind` in a match, split by the side they are booked to.
    pub fn events_for(&self, id: MatchId, kind: EventKind) -> Result<Partition<'_>, LeagueError> {
        Ok(self.partition_of(self.fixture(id)?, kind))
    }

    fn partition_of(&self, m: &Match, kind: EventKind) -> Partition<'_> {
        let mut partition = Partition::default();
        for entry in self.entries_for(m.id).filter(|e| e.event.kind() == kind) {
            match m.side_of(entry.event.team_of_record()) {
                Some(Side::Team1) => partition.team1.push(entry),
                Some(Side::Team2) => partition.team2.push(entry),
                None => {}
            }
        }
        partition
    }

    /// Touchdowns per side. Counts whatever is recorded, whatever the status.
    pub fn score(&self, id: MatchId) -> Result<Score, LeagueError> {
        Ok(self.score_of(self.fixture(id)?))
    }

    /// Touchdowns per side for a match already in hand.
    pub fn score_of(&self, m: &Match) -> Score {
        let tds = self.partition_of(m, EventKind::Touchdown);
        Score {
            team1: tds.team1.len() as u32,
            team2: tds.team2.len() as u32,
        }
    }

    pub fn result(&self, id: MatchId) -> Result<MatchResult, LeagueError> {
        let m = self.fixture(id)?;
        let score = self.score(id)?;
        Ok(if score.team1 > score.team2 {
            MatchResult::Winner(m.team1.team_id)
        } else if score.team2 > score.team1 {
            MatchResult::Winner(m.team2.team_id)
        } else {
            MatchResult::Draw
        })
    }

    fn is_completed(&self, id: MatchId) -> bool {
        self.matches
            .get(&id)
            .is_some_and(|m| m.status == MatchStatus::Completed)
    }

    /// Entries whose match has been completed.
    pub fn completed_entries(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries
            .iter()
            .filter(move |e| self.is_completed(e.match_id))
    }

    /// Star-player-point events credited to `player` in completed matches.
    pub fn career(&self, player: PlayerId) -> CareerTally {
        let mut tally = CareerTally::default();
        for entry in self.completed_entries() {
            if entry.event.credited_player() != Some(player) {
                continue;
            }
            match entry.event.kind() {
                EventKind::Touchdown => tally.touchdowns += 1,
                EventKind::Completion => tally.completions += 1,
                EventKind::Casualty => tally.casualties += 1,
                EventKind::Interception => tally.interceptions += 1,
                EventKind::Mvp => tally.mvps += 1,
                EventKind::Injury => {}
            }
        }
        tally
    }

    /// Injuries suffered by `player` in completed matches.
    pub fn injuries_of(&self, player: PlayerId) -> impl Iterator<Item = &InjuryType> {
        self.completed_entries().filter_map(move |e| match &e.event {
            MatchEvent::Injury {
                player: p, injury, ..
            } if *p == player => Some(injury),
            _ => None,
        })
    }

    /// Players who suffered a casualty in a match, each listed once.
    pub fn casualty_victims(&self, id: MatchId) -> Vec<PlayerId> {
        let mut victims: Vec<PlayerId> = self
            .entries_for(id)
            .filter_map(|e| match e.event {
                MatchEvent::Casualty { victim, .. } => Some(victim),
                _ => None,
            })
            .collect();
        victims.sort();
        victims.dedup();
        victims
    }
}
