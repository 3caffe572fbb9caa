//! Leagues, teams and roster lifecycle.

use crate::catalog::{load_faction, load_player_type, load_player_types_of, load_skill};
use crate::matches::load_player_ledger;
use crate::rows::{
    LeagueRow, LevelUpRow, PlayerRow, TeamRow, LEVEL_UP_SELECT, PLAYER_COLUMNS, TEAM_COLUMNS,
};
use crate::{claim_row, LeagueStore, Result, StoreError};
use league_core::*;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use std::collections::HashMap;
use tracing::{debug, info};

/// Manual corrections to a player record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerEdit {
    pub name: Option<String>,
    pub miss_next: Option<bool>,
}

/// Turn a unique-index violation into a domain error.
pub(crate) fn unique_violation(e: sqlx::Error, what: impl FnOnce() -> String) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            LeagueError::ConstraintViolation(what()).into()
        }
        _ => e.into(),
    }
}

fn non_blank(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LeagueError::InvalidChoice(format!("{field} must not be empty")).into());
    }
    Ok(trimmed.to_string())
}

pub(crate) async fn load_league(conn: &mut SqliteConnection, id: LeagueId) -> Result<League> {
    let row: Option<LeagueRow> =
        sqlx::query_as("SELECT id, name, managers, current FROM leagues WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&mut *conn)
            .await?;
    match row {
        Some(r) => League::try_from(r),
        None => Err(LeagueError::not_found("league", id.0).into()),
    }
}

pub(crate) async fn load_team(conn: &mut SqliteConnection, id: TeamId) -> Result<Team> {
    let row: Option<TeamRow> =
        sqlx::query_as(&format!("SELECT {TEAM_COLUMNS} FROM teams WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&mut *conn)
            .await?;
    match row {
        Some(r) => Team::try_from(r),
        None => Err(LeagueError::not_found("team", id.0).into()),
    }
}

pub(crate) async fn load_league_teams(
    conn: &mut SqliteConnection,
    league: LeagueId,
) -> Result<Vec<Team>> {
    let rows: Vec<TeamRow> = sqlx::query_as(&format!(
        "SELECT {TEAM_COLUMNS} FROM teams WHERE league_id = ? ORDER BY id"
    ))
    .bind(league.0)
    .fetch_all(&mut *conn)
    .await?;
    rows.into_iter().map(Team::try_from).collect()
}

async fn load_level_ups(conn: &mut SqliteConnection, player: PlayerId) -> Result<Vec<LevelUp>> {
    let rows: Vec<LevelUpRow> = sqlx::query_as(&format!(
        "{LEVEL_UP_SELECT} WHERE l.player_id = ? ORDER BY l.level"
    ))
    .bind(player.0)
    .fetch_all(&mut *conn)
    .await?;
    rows.into_iter().map(LevelUp::try_from).collect()
}

pub(crate) async fn load_player(conn: &mut SqliteConnection, id: PlayerId) -> Result<Player> {
    let row: Option<PlayerRow> =
        sqlx::query_as(&format!("SELECT {PLAYER_COLUMNS} FROM players WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&mut *conn)
            .await?;
    let row = row.ok_or_else(|| StoreError::from(LeagueError::not_found("player", id.0)))?;
    let level_ups = load_level_ups(conn, id).await?;
    row.into_player(level_ups)
}

/// Players currently assigned to `team`, by jersey number.
pub(crate) async fn load_roster(conn: &mut SqliteConnection, team: TeamId) -> Result<Vec<Player>> {
    let rows: Vec<PlayerRow> = sqlx::query_as(&format!(
        "SELECT {PLAYER_COLUMNS} FROM players WHERE team_id = ? ORDER BY number"
    ))
    .bind(team.0)
    .fetch_all(&mut *conn)
    .await?;
    let level_rows: Vec<LevelUpRow> = sqlx::query_as(&format!(
        "{LEVEL_UP_SELECT} WHERE l.player_id IN (SELECT id FROM players WHERE team_id = ?) \
         ORDER BY l.player_id, l.level"
    ))
    .bind(team.0)
    .fetch_all(&mut *conn)
    .await?;
    let mut by_player: HashMap<PlayerId, Vec<LevelUp>> = HashMap::new();
    for r in level_rows {
        let level_up = LevelUp::try_from(r)?;
        by_player.entry(level_up.player_id).or_default().push(level_up);
    }
    rows.into_iter()
        .map(|r| {
            let level_ups = by_player.remove(&PlayerId(r.id)).unwrap_or_default();
            r.into_player(level_ups)
        })
        .collect()
}

/// Active players on `team` hired into `player_type`.
async fn count_of_type(
    conn: &mut SqliteConnection,
    team: TeamId,
    player_type: PlayerTypeId,
) -> Result<u32> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM players WHERE team_id = ? AND player_type_id = ? AND status = 'Active'",
    )
    .bind(team.0)
    .bind(player_type.0)
    .fetch_one(&mut *conn)
    .await?;
    crate::rows::to_u32(count, "count")
}

impl LeagueStore {
    pub async fn create_league(&self, name: &str, managers: Vec<String>) -> Result<League> {
        let name = non_blank(name, "league name")?;
        let managers_json = serde_json::to_string(&managers)
            .map_err(|e| StoreError::Corrupt(format!("managers: {e}")))?;
        let id = sqlx::query("INSERT INTO leagues (name, managers) VALUES (?, ?)")
            .bind(&name)
            .bind(managers_json)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();
        info!(league = id, %name, "league created");
        Ok(League {
            id: LeagueId(id),
            name,
            managers,
            current: false,
        })
    }

    pub async fn league(&self, id: LeagueId) -> Result<League> {
        let mut conn = self.pool.acquire().await?;
        load_league(&mut conn, id).await
    }

    pub async fn leagues(&self) -> Result<Vec<League>> {
        let rows: Vec<LeagueRow> =
            sqlx::query_as("SELECT id, name, managers, current FROM leagues ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(League::try_from).collect()
    }

    /// Mark one league as the one being played; clears the flag elsewhere.
    pub async fn set_current_league(&self, id: LeagueId) -> Result<League> {
        let mut tx = self.pool.begin().await?;
        claim_row(&mut tx, "leagues", id.0).await?;
        load_league(&mut tx, id).await?;
        sqlx::query("UPDATE leagues SET current = (id = ?)")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;
        let league = load_league(&mut tx, id).await?;
        tx.commit().await?;
        info!(league = %id, "current league set");
        Ok(league)
    }

    pub async fn current_league(&self) -> Result<Option<League>> {
        let row: Option<LeagueRow> = sqlx::query_as(
            "SELECT id, name, managers, current FROM leagues WHERE current = 1 ORDER BY id LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        row.map(League::try_from).transpose()
    }

    pub async fn create_team(&self, name: &str, coach: &str, faction: FactionId) -> Result<Team> {
        let name = non_blank(name, "team name")?;
        let coach = non_blank(coach, "coach")?;
        let mut tx = self.pool.begin().await?;
        claim_row(&mut tx, "factions", faction.0).await?;
        load_faction(&mut tx, faction).await?;
        let id = sqlx::query("INSERT INTO teams (name, faction_id, coach) VALUES (?, ?, ?)")
            .bind(&name)
            .bind(faction.0)
            .bind(&coach)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();
        let team = load_team(&mut tx, TeamId(id)).await?;
        tx.commit().await?;
        info!(team = id, %name, faction = %faction, "team created");
        Ok(team)
    }

    pub async fn team(&self, id: TeamId) -> Result<Team> {
        let mut conn = self.pool.acquire().await?;
        load_team(&mut conn, id).await
    }

    pub async fn league_teams(&self, league: LeagueId) -> Result<Vec<Team>> {
        let mut conn = self.pool.acquire().await?;
        load_league(&mut conn, league).await?;
        load_league_teams(&mut conn, league).await
    }

    /// Register a team in a league. A team plays in at most one league.
    pub async fn join_league(&self, team: TeamId, league: LeagueId) -> Result<Team> {
        let mut tx = self.pool.begin().await?;
        claim_row(&mut tx, "teams", team.0).await?;
        let current = load_team(&mut tx, team).await?;
        load_league(&mut tx, league).await?;
        match current.league_id {
            Some(l) if l == league => return Ok(current),
            Some(l) => {
                return Err(LeagueError::InvalidState(format!(
                    "team {team} already plays in league {l}"
                ))
                .into())
            }
            None => {}
        }
        sqlx::query("UPDATE teams SET league_id = ? WHERE id = ?")
            .bind(league.0)
            .bind(team.0)
            .execute(&mut *tx)
            .await?;
        let updated = load_team(&mut tx, team).await?;
        tx.commit().await?;
        info!(team = %team, league = %league, "team joined league");
        Ok(updated)
    }

    /// Replace a team's staff, rerolls, fans and treasury.
    pub async fn update_team_assets(&self, team: TeamId, assets: TeamAssets) -> Result<Team> {
        if assets.treasury < 0 {
            return Err(LeagueError::InvalidChoice(format!(
                "treasury cannot be negative ({})",
                assets.treasury
            ))
            .into());
        }
        let mut tx = self.pool.begin().await?;
        claim_row(&mut tx, "teams", team.0).await?;
        let current = load_team(&mut tx, team).await?;
        let faction = load_faction(&mut tx, current.faction_id).await?;
        if assets.apothecary && !faction.apothecary_available {
            return Err(LeagueError::InvalidChoice(format!(
                "{} teams cannot hire an apothecary",
                faction.name
            ))
            .into());
        }
        sqlx::query(
            "UPDATE teams SET rerolls = ?, apothecary = ?, assistant_coaches = ?, \
             cheerleaders = ?, fan_factor = ?, treasury = ? WHERE id = ?",
        )
        .bind(i64::from(assets.rerolls))
        .bind(assets.apothecary)
        .bind(i64::from(assets.assistant_coaches))
        .bind(i64::from(assets.cheerleaders))
        .bind(assets.fan_factor)
        .bind(assets.treasury)
        .bind(team.0)
        .execute(&mut *tx)
        .await?;
        let updated = load_team(&mut tx, team).await?;
        tx.commit().await?;
        debug!(team = %team, ?assets, "team assets updated");
        Ok(updated)
    }

    /// Current roster ordered by jersey number.
    pub async fn roster(&self, team: TeamId) -> Result<Vec<Player>> {
        let mut conn = self.pool.acquire().await?;
        load_team(&mut conn, team).await?;
        load_roster(&mut conn, team).await
    }

    /// Roster slots of the team's faction that still have room.
    pub async fn hireable_player_types(&self, team: TeamId) -> Result<Vec<PlayerType>> {
        let mut conn = self.pool.acquire().await?;
        let t = load_team(&mut conn, team).await?;
        let mut hireable = Vec::new();
        for pt in load_player_types_of(&mut conn, t.faction_id).await? {
            if count_of_type(&mut conn, team, pt.id).await? < pt.max_quantity {
                hireable.push(pt);
            }
        }
        Ok(hireable)
    }

    pub async fn player(&self, id: PlayerId) -> Result<Player> {
        let mut conn = self.pool.acquire().await?;
        load_player(&mut conn, id).await
    }

    /// Hire a player into the lowest free jersey number.
    pub async fn add_player_to_team(
        &self,
        team: TeamId,
        player_type: PlayerTypeId,
        name: &str,
    ) -> Result<Player> {
        let name = non_blank(name, "player name")?;
        let mut tx = self.pool.begin().await?;
        claim_row(&mut tx, "teams", team.0).await?;
        let t = load_team(&mut tx, team).await?;
        let pt = load_player_type(&mut tx, player_type).await?;
        if pt.faction_id != t.faction_id {
            return Err(LeagueError::InvalidChoice(format!(
                "{} is not available to team {}",
                pt.name, t.name
            ))
            .into());
        }
        let hired = count_of_type(&mut tx, team, player_type).await?;
        if hired >= pt.max_quantity {
            return Err(LeagueError::ConstraintViolation(format!(
                "team {} already has {hired} of {} {}",
                t.name, pt.max_quantity, pt.name
            ))
            .into());
        }
        let used: Vec<(i64,)> = sqlx::query_as("SELECT number FROM players WHERE team_id = ?")
            .bind(team.0)
            .fetch_all(&mut *tx)
            .await?;
        let number = lowest_free_number(
            used.into_iter()
                .filter_map(|(n,)| u32::try_from(n).ok()),
        );
        let draft = Player::hire(PlayerId(0), team, &pt, name, number);
        let id = sqlx::query(
            "INSERT INTO players (team_id, player_type_id, name, number, position, base_value, \
             movement, strength, agility, armour, skills, normal_access, double_access, status, \
             miss_next) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(team.0)
        .bind(pt.id.0)
        .bind(&draft.name)
        .bind(i64::from(draft.number))
        .bind(&draft.position)
        .bind(draft.base_value)
        .bind(draft.attributes.movement)
        .bind(draft.attributes.strength)
        .bind(draft.attributes.agility)
        .bind(draft.attributes.armour)
        .bind(format_skill_list(&draft.skills))
        .bind(draft.normal_access.to_string())
        .bind(draft.double_access.to_string())
        .bind(draft.status.as_str())
        .bind(draft.miss_next)
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_violation(e, || format!("jersey {number} is taken on team {team}")))?
        .last_insert_rowid();
        tx.commit().await?;
        info!(player = id, team = %team, number, position = %draft.position, "player hired");
        Ok(Player {
            id: PlayerId(id),
            ..draft
        })
    }

    /// Take a player off their team for good. History stays.
    pub async fn retire_or_kill_player(&self, id: PlayerId, status: PlayerStatus) -> Result<Player> {
        if !status.is_terminal() {
            return Err(LeagueError::InvalidChoice(format!(
                "players leave a team as Retired or Dead, not {status}"
            ))
            .into());
        }
        let mut tx = self.pool.begin().await?;
        claim_row(&mut tx, "players", id.0).await?;
        let player = load_player(&mut tx, id).await?;
        if player.status.is_terminal() {
            return Err(LeagueError::InvalidState(format!(
                "player {id} is already {}",
                player.status
            ))
            .into());
        }
        let changed = sqlx::query(
            "UPDATE players SET status = ?, team_id = NULL WHERE id = ? AND status = 'Active'",
        )
        .bind(status.as_str())
        .bind(id.0)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if changed != 1 {
            return Err(LeagueError::InvalidState(format!("player {id} changed concurrently")).into());
        }
        let updated = load_player(&mut tx, id).await?;
        tx.commit().await?;
        info!(player = %id, %status, "player removed from roster");
        Ok(updated)
    }

    pub async fn modify_player(&self, id: PlayerId, edit: PlayerEdit) -> Result<Player> {
        let name = edit.name.as_deref().map(|n| non_blank(n, "player name")).transpose()?;
        let mut tx = self.pool.begin().await?;
        claim_row(&mut tx, "players", id.0).await?;
        let player = load_player(&mut tx, id).await?;
        sqlx::query("UPDATE players SET name = ?, miss_next = ? WHERE id = ?")
            .bind(name.unwrap_or(player.name))
            .bind(edit.miss_next.unwrap_or(player.miss_next))
            .bind(id.0)
            .execute(&mut *tx)
            .await?;
        let updated = load_player(&mut tx, id).await?;
        tx.commit().await?;
        debug!(player = %id, "player modified");
        Ok(updated)
    }

    /// Spend an earned level on a skill or a characteristic increase.
    pub async fn grant_level_up(&self, id: PlayerId, choice: LevelUpChoice) -> Result<LevelUp> {
        let mut tx = self.pool.begin().await?;
        claim_row(&mut tx, "players", id.0).await?;
        let player = load_player(&mut tx, id).await?;
        let reward = match choice {
            LevelUpChoice::Skill(skill) => LevelUpReward::Skill(load_skill(&mut tx, skill).await?),
            LevelUpChoice::Stat(stat) => LevelUpReward::Stat(stat),
        };
        let ledger = load_player_ledger(&mut tx, id).await?;
        self.rules.check_level_up(&player, &reward, &ledger)?;

        let level = player.level_ups.len() as u32 + 1;
        let (skill_id, stat) = match &reward {
            LevelUpReward::Skill(s) => (Some(s.id.0), None),
            LevelUpReward::Stat(s) => (None, Some(s.as_str())),
        };
        let level_up_id = sqlx::query(
            "INSERT INTO level_ups (player_id, level, skill_id, stat) VALUES (?, ?, ?, ?)",
        )
        .bind(id.0)
        .bind(i64::from(level))
        .bind(skill_id)
        .bind(stat)
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_violation(e, || format!("player {id} already took level {level}")))?
        .last_insert_rowid();
        tx.commit().await?;
        info!(player = %id, level, ?reward, "level-up granted");
        Ok(LevelUp {
            id: LevelUpId(level_up_id),
            player_id: id,
            level,
            reward,
        })
    }
}
