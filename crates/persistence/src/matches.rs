//! Fixtures, their lifecycle, and the events recorded while they are played.

use crate::roster::{load_league, load_player, load_team};
use crate::rows::{EventColumns, EventRow, MatchRow, EVENT_SELECT, MATCH_COLUMNS};
use crate::{claim_row, LeagueStore, Result};
use chrono::{DateTime, Utc};
use league_core::*;
use serde::Serialize;
use sqlx::SqliteConnection;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Events of one kind, split by the side they count for.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SideEvents {
    pub team1: Vec<LedgerEntry>,
    pub team2: Vec<LedgerEntry>,
}

/// Everything known about one match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MatchSummary {
    pub fixture: Match,
    pub score: Score,
    /// Leader so far while the match is being played.
    pub result: MatchResult,
    pub events: BTreeMap<EventKind, SideEvents>,
}

pub(crate) async fn load_match(conn: &mut SqliteConnection, id: MatchId) -> Result<Match> {
    let row: Option<MatchRow> =
        sqlx::query_as(&format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&mut *conn)
            .await?;
    match row {
        Some(r) => Match::try_from(r),
        None => Err(LeagueError::not_found("match", id.0).into()),
    }
}

fn into_ledger(matches: Vec<MatchRow>, events: Vec<EventRow>) -> Result<MatchLedger> {
    let matches = matches
        .into_iter()
        .map(Match::try_from)
        .collect::<Result<Vec<_>>>()?;
    let entries = events
        .into_iter()
        .map(LedgerEntry::try_from)
        .collect::<Result<Vec<_>>>()?;
    Ok(MatchLedger::from_parts(matches, entries))
}

/// One match and all of its events.
pub(crate) async fn load_match_ledger(
    conn: &mut SqliteConnection,
    id: MatchId,
) -> Result<MatchLedger> {
    let fixture = load_match(conn, id).await?;
    let events: Vec<EventRow> =
        sqlx::query_as(&format!("{EVENT_SELECT} WHERE e.match_id = ? ORDER BY e.id"))
            .bind(id.0)
            .fetch_all(&mut *conn)
            .await?;
    let entries = events
        .into_iter()
        .map(LedgerEntry::try_from)
        .collect::<Result<Vec<_>>>()?;
    Ok(MatchLedger::from_parts([fixture], entries))
}

/// Every event naming `player`, with the matches they belong to.
pub(crate) async fn load_player_ledger(
    conn: &mut SqliteConnection,
    player: PlayerId,
) -> Result<MatchLedger> {
    let matches: Vec<MatchRow> = sqlx::query_as(&format!(
        "SELECT {MATCH_COLUMNS} FROM matches WHERE id IN \
         (SELECT match_id FROM match_events WHERE player_id = ? OR other_player_id = ?)"
    ))
    .bind(player.0)
    .bind(player.0)
    .fetch_all(&mut *conn)
    .await?;
    let events: Vec<EventRow> = sqlx::query_as(&format!(
        "{EVENT_SELECT} WHERE e.player_id = ? OR e.other_player_id = ? ORDER BY e.id"
    ))
    .bind(player.0)
    .bind(player.0)
    .fetch_all(&mut *conn)
    .await?;
    into_ledger(matches, events)
}

/// A league's season: all of its matches and their events.
pub(crate) async fn load_league_ledger(
    conn: &mut SqliteConnection,
    league: LeagueId,
) -> Result<MatchLedger> {
    let matches: Vec<MatchRow> = sqlx::query_as(&format!(
        "SELECT {MATCH_COLUMNS} FROM matches WHERE league_id = ? ORDER BY id"
    ))
    .bind(league.0)
    .fetch_all(&mut *conn)
    .await?;
    let events: Vec<EventRow> = sqlx::query_as(&format!(
        "{EVENT_SELECT} WHERE e.match_id IN (SELECT id FROM matches WHERE league_id = ?) \
         ORDER BY e.id"
    ))
    .bind(league.0)
    .fetch_all(&mut *conn)
    .await?;
    into_ledger(matches, events)
}

async fn insert_event(
    conn: &mut SqliteConnection,
    match_id: MatchId,
    event: &MatchEvent,
) -> Result<EventId> {
    let cols = EventColumns::of(event);
    let id = sqlx::query(
        "INSERT INTO match_events (match_id, kind, player_id, team_id, other_player_id, \
         other_team_id, injury_type_id) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(match_id.0)
    .bind(cols.kind.to_string())
    .bind(cols.player.0)
    .bind(cols.team.0)
    .bind(cols.other.map(|(p, _)| p.0))
    .bind(cols.other.map(|(_, t)| t.0))
    .bind(cols.injury.map(|i| i.0))
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();
    Ok(EventId(id))
}

/// Every role in an event must be filled by an active member of that team.
async fn ensure_participants_rostered(
    conn: &mut SqliteConnection,
    event: &MatchEvent,
) -> Result<()> {
    for (player, team) in event.participants() {
        let p = load_player(conn, player).await?;
        if !p.is_rostered_on(team) {
            return Err(LeagueError::InvalidChoice(format!(
                "player {player} is not an active member of team {team}"
            ))
            .into());
        }
    }
    Ok(())
}

async fn write_fixture(conn: &mut SqliteConnection, m: &Match, from: MatchStatus) -> Result<u64> {
    Ok(sqlx::query(
        "UPDATE matches SET status = ?, team1_fame = ?, team2_fame = ?, weather = ?, \
         team1_winnings = ?, team2_winnings = ?, team1_fan_factor_change = ?, \
         team2_fan_factor_change = ?, started_at = ?, completed_at = ? \
         WHERE id = ? AND status = ?",
    )
    .bind(m.status.as_str())
    .bind(m.team1.fame)
    .bind(m.team2.fame)
    .bind(m.weather.as_str())
    .bind(m.team1.winnings)
    .bind(m.team2.winnings)
    .bind(m.team1.fan_factor_change)
    .bind(m.team2.fan_factor_change)
    .bind(m.started_at)
    .bind(m.completed_at)
    .bind(m.id.0)
    .bind(from.as_str())
    .execute(&mut *conn)
    .await?
    .rows_affected())
}

/// Team-level effects of a completed match.
async fn settle(
    conn: &mut SqliteConnection,
    ledger: &MatchLedger,
    fixture: &Match,
    reports: [&PostMatchReport; 2],
) -> Result<()> {
    let sides = [&fixture.team1, &fixture.team2];
    for (side, report) in sides.into_iter().zip(reports) {
        if let Some(mvp) = report.mvp {
            let event = MatchEvent::Mvp {
                player: mvp,
                team: side.team_id,
            };
            ensure_participants_rostered(conn, &event).await?;
            insert_event(conn, fixture.id, &event).await?;
        }
        sqlx::query(
            "UPDATE teams SET treasury = treasury + ?, fan_factor = fan_factor + ? WHERE id = ?",
        )
        .bind(side.winnings)
        .bind(side.fan_factor_change)
        .bind(side.team_id.0)
        .execute(&mut *conn)
        .await?;
    }

    sqlx::query("UPDATE players SET miss_next = 0 WHERE team_id IN (?, ?)")
        .bind(fixture.team1.team_id.0)
        .bind(fixture.team2.team_id.0)
        .execute(&mut *conn)
        .await?;
    let victims = ledger.casualty_victims(fixture.id);
    for victim in &victims {
        sqlx::query("UPDATE players SET miss_next = 1 WHERE id = ?")
            .bind(victim.0)
            .execute(&mut *conn)
            .await?;
    }
    debug!(match_id = %fixture.id, victims = victims.len(), "match settled");
    Ok(())
}

fn now() -> DateTime<Utc> {
    Utc::now()
}

impl LeagueStore {
    /// Put a fixture between two teams of the same league on the calendar.
    pub async fn schedule_match(
        &self,
        league: LeagueId,
        team1: TeamId,
        team2: TeamId,
    ) -> Result<Match> {
        let mut tx = self.pool.begin().await?;
        claim_row(&mut tx, "leagues", league.0).await?;
        load_league(&mut tx, league).await?;
        let draft = Match::schedule(MatchId(0), league, team1, team2, now())?;
        for team in [team1, team2] {
            let t = load_team(&mut tx, team).await?;
            if t.league_id != Some(league) {
                return Err(LeagueError::InvalidChoice(format!(
                    "team {} is not registered in league {league}",
                    t.name
                ))
                .into());
            }
        }
        let id = sqlx::query(
            "INSERT INTO matches (league_id, team1_id, team2_id, weather, status, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(league.0)
        .bind(team1.0)
        .bind(team2.0)
        .bind(draft.weather.as_str())
        .bind(draft.status.as_str())
        .bind(draft.created_at)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();
        tx.commit().await?;
        info!(match_id = id, league = %league, %team1, %team2, "match scheduled");
        Ok(Match {
            id: MatchId(id),
            ..draft
        })
    }

    pub async fn fixture(&self, id: MatchId) -> Result<Match> {
        let mut conn = self.pool.acquire().await?;
        load_match(&mut conn, id).await
    }

    /// League matches, optionally only those in `status`.
    pub async fn matches(&self, league: LeagueId, status: Option<MatchStatus>) -> Result<Vec<Match>> {
        let status = status.map(MatchStatus::as_str);
        let rows: Vec<MatchRow> = sqlx::query_as(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE league_id = ? \
             AND (? IS NULL OR status = ?) ORDER BY id"
        ))
        .bind(league.0)
        .bind(status)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Match::try_from).collect()
    }

    /// Move a match along its lifecycle.
    ///
    /// The update only lands if the stored status is still the one the
    /// transition was checked against, so completion effects apply once.
    pub async fn transition_match(&self, id: MatchId, transition: MatchTransition) -> Result<Match> {
        let mut tx = self.pool.begin().await?;
        claim_row(&mut tx, "matches", id.0).await?;
        let mut ledger = load_match_ledger(&mut tx, id).await?;
        let fixture = ledger.fixture_mut(id)?;
        let from = fixture.status;
        let to = fixture.apply(&transition, now())?;
        let fixture = fixture.clone();

        if write_fixture(&mut tx, &fixture, from).await? != 1 {
            return Err(LeagueError::InvalidState(format!(
                "match {id} is no longer {from}"
            ))
            .into());
        }
        if let MatchTransition::Complete { team1, team2 } = &transition {
            settle(&mut tx, &ledger, &fixture, [team1, team2]).await?;
        }
        tx.commit().await?;
        info!(match_id = %id, %from, %to, "match transitioned");
        Ok(fixture)
    }

    /// Delete a match that has not been completed, with its events.
    pub async fn cancel_match(&self, id: MatchId) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        claim_row(&mut tx, "matches", id.0).await?;
        let fixture = load_match(&mut tx, id).await?;
        if !fixture.status.is_cancellable() {
            return Err(LeagueError::InvalidState(format!(
                "match {id} is completed and cannot be cancelled"
            ))
            .into());
        }
        let deleted = sqlx::query("DELETE FROM matches WHERE id = ? AND status <> 'completed'")
            .bind(id.0)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted != 1 {
            return Err(LeagueError::InvalidState(format!("match {id} changed concurrently")).into());
        }
        tx.commit().await?;
        info!(match_id = %id, "match cancelled");
        Ok(())
    }

    /// Append an event to a match being played.
    pub async fn record_event(&self, match_id: MatchId, event: MatchEvent) -> Result<LedgerEntry> {
        let mut tx = self.pool.begin().await?;
        claim_row(&mut tx, "matches", match_id.0).await?;
        let fixture = load_match(&mut tx, match_id).await?;
        let mut ledger = MatchLedger::from_parts([fixture], Vec::<LedgerEntry>::new());
        ledger.record(LedgerEntry {
            id: EventId(0),
            match_id,
            event: event.clone(),
        })?;
        ensure_participants_rostered(&mut tx, &event).await?;
        let id = insert_event(&mut tx, match_id, &event).await?;
        tx.commit().await?;
        debug!(match_id = %match_id, event = %event.kind(), "event recorded");
        Ok(LedgerEntry {
            id,
            match_id,
            event,
        })
    }

    pub async fn record_touchdown(
        &self,
        match_id: MatchId,
        scorer: PlayerId,
        team: TeamId,
    ) -> Result<LedgerEntry> {
        self.record_event(match_id, MatchEvent::Touchdown { scorer, team })
            .await
    }

    pub async fn record_completion(
        &self,
        match_id: MatchId,
        thrower: PlayerId,
        receiver: PlayerId,
        team: TeamId,
    ) -> Result<LedgerEntry> {
        self.record_event(
            match_id,
            MatchEvent::Completion {
                thrower,
                receiver,
                team,
            },
        )
        .await
    }

    pub async fn record_casualty(
        &self,
        match_id: MatchId,
        causer: PlayerId,
        causing_team: TeamId,
        victim: PlayerId,
        victim_team: TeamId,
    ) -> Result<LedgerEntry> {
        self.record_event(
            match_id,
            MatchEvent::Casualty {
                causer,
                causing_team,
                victim,
                victim_team,
            },
        )
        .await
    }

    pub async fn record_interception(
        &self,
        match_id: MatchId,
        interceptor: PlayerId,
        intercepting_team: TeamId,
        thrower: PlayerId,
        throwing_team: TeamId,
    ) -> Result<LedgerEntry> {
        self.record_event(
            match_id,
            MatchEvent::Interception {
                interceptor,
                intercepting_team,
                thrower,
                throwing_team,
            },
        )
        .await
    }

    pub async fn record_mvp(
        &self,
        match_id: MatchId,
        player: PlayerId,
        team: TeamId,
    ) -> Result<LedgerEntry> {
        self.record_event(match_id, MatchEvent::Mvp { player, team })
            .await
    }

    pub async fn record_injury(
        &self,
        match_id: MatchId,
        player: PlayerId,
        team: TeamId,
        injury_type: InjuryTypeId,
    ) -> Result<LedgerEntry> {
        let injury = self.injury_type(injury_type).await?;
        self.record_event(
            match_id,
            MatchEvent::Injury {
                player,
                team,
                injury,
            },
        )
        .await
    }

    /// Score, result and events of one match, split by side.
    pub async fn match_summary(&self, id: MatchId) -> Result<MatchSummary> {
        let mut conn = self.pool.acquire().await?;
        let ledger = load_match_ledger(&mut conn, id).await?;
        let mut events = BTreeMap::new();
        for kind in EventKind::ALL {
            let partition = ledger.events_for(id, kind)?;
            events.insert(
                kind,
                SideEvents {
                    team1: partition.team1.into_iter().cloned().collect(),
                    team2: partition.team2.into_iter().cloned().collect(),
                },
            );
        }
        Ok(MatchSummary {
            fixture: ledger.fixture(id)?.clone(),
            score: ledger.score(id)?,
            result: ledger.result(id)?,
            events,
        })
    }
}
