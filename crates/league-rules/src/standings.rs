//! League table.

use league_core::{LeagueId, MatchLedger, MatchStatus, Side, Team, TeamId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub const POINTS_PER_WIN: u32 = 3;
pub const POINTS_PER_DRAW: u32 = 1;

/// One team's line in the league table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingRow {
    /// Team the row belongs to.
    pub team_id: TeamId,
    /// Team name at the time the table was built.
    pub team_name: String,
    /// Completed matches won.
    pub wins: u32,
    /// Completed matches lost.
    pub losses: u32,
    /// Completed matches drawn.
    pub draws: u32,
    /// Three per win, one per draw.
    pub points: u32,
    /// Touchdowns scored in completed matches.
    pub tds_scored: u32,
    /// Touchdowns conceded in completed matches.
    pub tds_against: u32,
}

impl StandingRow {
    pub fn played(&self) -> u32 {
        self.wins + self.losses + self.draws
    }

    pub fn td_difference(&self) -> i64 {
        i64::from(self.tds_scored) - i64::from(self.tds_against)
    }
}

/// Table for `league` from its completed matches.
///
/// Rows are sorted by points, then touchdowns scored, both descending.
/// Teams level on both keep the order they were passed in.
pub fn standings(league: LeagueId, teams: &[Team], ledger: &MatchLedger) -> Vec<StandingRow> {
    let completed: Vec<_> = ledger
        .matches()
        .filter(|m| m.league_id == league && m.status == MatchStatus::Completed)
        .collect();

    let mut rows: Vec<StandingRow> = teams
        .iter()
        .map(|team| {
            let mut row = StandingRow {
                team_id: team.id,
                team_name: team.name.clone(),
                wins: 0,
                losses: 0,
                draws: 0,
                points: 0,
                tds_scored: 0,
                tds_against: 0,
            };
            for m in &completed {
                let Some(side) = m.side_of(team.id) else {
                    continue;
                };
                let score = ledger.score_of(m);
                let (scored, against) = match side {
                    Side::Team1 => (score.team1, score.team2),
                    Side::Team2 => (score.team2, score.team1),
                };
                match scored.cmp(&against) {
                    Ordering::Greater => row.wins += 1,
                    Ordering::Less => row.losses += 1,
                    Ordering::Equal => row.draws += 1,
                }
                row.tds_scored += scored;
                row.tds_against += against;
            }
            row.points = POINTS_PER_WIN * row.wins + POINTS_PER_DRAW * row.draws;
            row
        })
        .collect();

    rows.sort_by(|a, b| (b.points, b.tds_scored).cmp(&(a.points, a.tds_scored)));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use league_core::*;
    use proptest::prelude::*;

    const LEAGUE: LeagueId = LeagueId(1);

    fn team(id: i64, name: &str) -> Team {
        Team {
            id: TeamId(id),
            name: name.into(),
            faction_id: FactionId(1),
            coach: "Coach".into(),
            league_id: Some(LEAGUE),
            assets: TeamAssets::default(),
        }
    }

    /// Play a match with the given score; touchdowns are credited to player
    /// `team * 100`.
    fn play(ledger: &mut MatchLedger, id: i64, t1: i64, t2: i64, score: (u32, u32), complete: bool) {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let mut m = Match::schedule(MatchId(id), LEAGUE, TeamId(t1), TeamId(t2), at).unwrap();
        m.apply(
            &MatchTransition::Start {
                team1_fame: 0,
                team2_fame: 0,
                weather: Weather::Nice,
            },
            at,
        )
        .unwrap();
        ledger.insert_match(m);
        let mut next = ledger.entries().len() as i64;
        for (team, n) in [(t1, score.0), (t2, score.1)] {
            for _ in 0..n {
                next += 1;
                ledger
                    .record(LedgerEntry {
                        id: EventId(next),
                        match_id: MatchId(id),
                        event: MatchEvent::Touchdown {
                            scorer: PlayerId(team * 100),
                            team: TeamId(team),
                        },
                    })
                    .unwrap();
            }
        }
        if complete {
            ledger
                .fixture_mut(MatchId(id))
                .unwrap()
                .apply(
                    &MatchTransition::Complete {
                        team1: PostMatchReport::default(),
                        team2: PostMatchReport::default(),
                    },
                    at,
                )
                .unwrap();
        }
    }

    #[test]
    fn table_counts_results_and_touchdowns() {
        let teams = vec![team(1, "Orcs"), team(2, "Elves"), team(3, "Dwarfs")];
        let mut ledger = MatchLedger::new();
        play(&mut ledger, 1, 1, 2, (2, 1), true);
        play(&mut ledger, 2, 2, 3, (2, 2), true);
        play(&mut ledger, 3, 3, 1, (0, 1), true);
        // still being played: ignored
        play(&mut ledger, 4, 3, 2, (4, 0), false);

        let table = standings(LEAGUE, &teams, &ledger);
        let names: Vec<_> = table.iter().map(|r| r.team_name.as_str()).collect();
        assert_eq!(names, vec!["Orcs", "Elves", "Dwarfs"]);

        let orcs = &table[0];
        assert_eq!((orcs.wins, orcs.losses, orcs.draws), (2, 0, 0));
        assert_eq!(orcs.points, 6);
        assert_eq!((orcs.tds_scored, orcs.tds_against), (3, 1));

        let elves = &table[1];
        assert_eq!((elves.wins, elves.losses, elves.draws), (0, 1, 1));
        assert_eq!((elves.tds_scored, elves.tds_against), (3, 4));

        let dwarfs = &table[2];
        assert_eq!(dwarfs.points, 1);
        assert_eq!(dwarfs.td_difference(), -1);
    }

    #[test]
    fn touchdowns_break_points_ties() {
        let teams = vec![team(1, "Low"), team(2, "High")];
        let mut ledger = MatchLedger::new();
        play(&mut ledger, 1, 1, 2, (1, 1), true);
        play(&mut ledger, 2, 1, 2, (0, 2), true);
        play(&mut ledger, 3, 1, 2, (3, 0), true);
        let table = standings(LEAGUE, &teams, &ledger);
        // both on 4 points, High scored 3 vs Low's 4
        assert_eq!(table[0].points, table[1].points);
        assert_eq!(table[0].team_name, "Low");
    }

    #[test]
    fn full_ties_keep_input_order() {
        let teams = vec![team(2, "B"), team(1, "A")];
        let table = standings(LEAGUE, &teams, &MatchLedger::new());
        assert_eq!(table[0].team_name, "B");
        assert_eq!(table[1].team_name, "A");
        assert_eq!(table[0].played(), 0);
    }

    #[test]
    fn other_leagues_are_ignored() {
        let teams = vec![team(1, "Orcs"), team(2, "Elves")];
        let mut ledger = MatchLedger::new();
        play(&mut ledger, 1, 1, 2, (1, 0), true);
        let table = standings(LeagueId(2), &teams, &ledger);
        assert!(table.iter().all(|r| r.played() == 0));
    }

    proptest! {
        #[test]
        fn every_completed_match_counts_twice(
            games in proptest::collection::vec((0i64..4, 0i64..4, 0u32..4, 0u32..4, any::<bool>()), 0..12)
        ) {
            let teams: Vec<Team> = (0..4).map(|i| team(i, &format!("T{i}"))).collect();
            let mut ledger = MatchLedger::new();
            let mut completed = 0u32;
            for (i, (a, b, s1, s2, done)) in games.into_iter().enumerate() {
                if a == b {
                    continue;
                }
                play(&mut ledger, i as i64 + 1, a, b, (s1, s2), done);
                if done {
                    completed += 1;
                }
            }
            let table = standings(LEAGUE, &teams, &ledger);
            let played: u32 = table.iter().map(StandingRow::played).sum();
            prop_assert_eq!(played, 2 * completed);
            let scored: u32 = table.iter().map(|r| r.tds_scored).sum();
            let against: u32 = table.iter().map(|r| r.tds_against).sum();
            prop_assert_eq!(scored, against);
        }
    }
}
