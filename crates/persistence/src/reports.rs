//! Derived views: player sheets, team value, inducements and standings.
//! Nothing here is stored; each call reloads the ledger slice it needs.

use crate::catalog::load_faction;
use crate::matches::{load_league_ledger, load_match, load_player_ledger};
use crate::roster::{load_league, load_league_teams, load_player, load_roster, load_team};
use crate::{LeagueStore, Result};
use league_core::*;
use league_rules::{Inducement, PlayerReport, StandingRow, TeamValuation};
use sqlx::SqliteConnection;
use tracing::debug;

async fn valuation_of(conn: &mut SqliteConnection, team: TeamId) -> Result<TeamValuation> {
    let t = load_team(conn, team).await?;
    let faction = load_faction(conn, t.faction_id).await?;
    let roster = load_roster(conn, team).await?;
    Ok(league_rules::team_valuation(&t, &faction, &roster))
}

impl LeagueStore {
    /// SPP, levels, effective stats, skills, value and career tallies.
    pub async fn player_report(&self, id: PlayerId) -> Result<PlayerReport> {
        let mut conn = self.pool.acquire().await?;
        let player = load_player(&mut conn, id).await?;
        let ledger = load_player_ledger(&mut conn, id).await?;
        Ok(self.rules.report(&player, &ledger))
    }

    pub async fn team_valuation(&self, team: TeamId) -> Result<TeamValuation> {
        let mut conn = self.pool.acquire().await?;
        valuation_of(&mut conn, team).await
    }

    /// Team value in thousands of gold.
    pub async fn total_team_value(&self, team: TeamId) -> Result<i64> {
        Ok(self.team_valuation(team).await?.total)
    }

    /// Inducement owed before `match_id`, from current team values.
    pub async fn inducement(&self, match_id: MatchId) -> Result<Inducement> {
        let mut conn = self.pool.acquire().await?;
        let fixture = load_match(&mut conn, match_id).await?;
        let (a, b) = (fixture.team1.team_id, fixture.team2.team_id);
        let value_a = valuation_of(&mut conn, a).await?.total;
        let value_b = valuation_of(&mut conn, b).await?.total;
        let owed = league_rules::inducement((a, value_a), (b, value_b));
        debug!(match_id = %match_id, value_a, value_b, gap = owed.gap, "inducement");
        Ok(owed)
    }

    pub async fn standings(&self, league: LeagueId) -> Result<Vec<StandingRow>> {
        let mut conn = self.pool.acquire().await?;
        load_league(&mut conn, league).await?;
        let teams = load_league_teams(&mut conn, league).await?;
        let ledger = load_league_ledger(&mut conn, league).await?;
        Ok(league_rules::standings(league, &teams, &ledger))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matches::tests::{full_time, kickoff, started_pitch};
    use crate::testing::player_type_id;

    fn skill(catalog: &Catalog, name: &str) -> SkillId {
        catalog.skill_by_name(name).unwrap().id
    }

    #[tokio::test]
    async fn linewoman_earns_and_spends_a_level() {
        let p = started_pitch().await;
        for _ in 0..3 {
            p.store.record_touchdown(p.fixture, p.hilda, p.amazons).await.unwrap();
        }
        let during = p.store.player_report(p.hilda).await.unwrap();
        assert_eq!(during.spp, 0);
        assert!(!during.can_level_up);

        p.store
            .transition_match(p.fixture, full_time((50, 20), (None, None)))
            .await
            .unwrap();
        let report = p.store.player_report(p.hilda).await.unwrap();
        assert_eq!(report.career.touchdowns, 3);
        assert_eq!(report.spp, 9);
        assert_eq!(report.expected_level, 1);
        assert_eq!(report.actual_level, 0);
        assert!(report.can_level_up);
        assert_eq!(report.value, 50);
        assert_eq!(report.next_threshold, Some(16));

        let mutation = p
            .store
            .grant_level_up(p.hilda, LevelUpChoice::Skill(skill(&p.catalog, "Claw")))
            .await
            .unwrap_err();
        assert!(matches!(mutation.league(), Some(LeagueError::InvalidChoice(_))));
        let duplicate = p
            .store
            .grant_level_up(p.hilda, LevelUpChoice::Skill(skill(&p.catalog, "Dodge")))
            .await
            .unwrap_err();
        assert!(matches!(duplicate.league(), Some(LeagueError::InvalidChoice(_))));

        let level_up = p
            .store
            .grant_level_up(p.hilda, LevelUpChoice::Skill(skill(&p.catalog, "Block")))
            .await
            .unwrap();
        assert_eq!(level_up.level, 1);

        let after = p.store.player_report(p.hilda).await.unwrap();
        assert_eq!(after.value, 70);
        assert_eq!(after.actual_level, 1);
        assert!(!after.can_level_up);
        assert!(after.skills.contains("Block"));
        assert!(after.skills.contains("Dodge"));

        let again = p
            .store
            .grant_level_up(p.hilda, LevelUpChoice::Stat(StatIncrease::Movement))
            .await
            .unwrap_err();
        assert!(matches!(again.league(), Some(LeagueError::InvalidState(_))));
    }

    #[tokio::test]
    async fn injuries_and_stat_increases_shape_effective_stats() {
        let p = started_pitch().await;
        let hip = p
            .catalog
            .injury_types
            .iter()
            .find(|i| i.name == "Smashed Hip")
            .unwrap()
            .id;
        for _ in 0..2 {
            p.store.record_touchdown(p.fixture, p.hilda, p.amazons).await.unwrap();
        }
        p.store
            .record_injury(p.fixture, p.hilda, p.amazons, hip)
            .await
            .unwrap();
        p.store
            .transition_match(p.fixture, full_time((0, 0), (None, None)))
            .await
            .unwrap();
        let report = p.store.player_report(p.hilda).await.unwrap();
        assert_eq!(report.attributes, Attributes::new(5, 3, 3, 7));

        p.store
            .grant_level_up(p.hilda, LevelUpChoice::Stat(StatIncrease::Movement))
            .await
            .unwrap();
        let report = p.store.player_report(p.hilda).await.unwrap();
        assert_eq!(report.attributes, Attributes::new(6, 3, 3, 7));
        assert_eq!(report.value, 50 + StatIncrease::Movement.value());
    }

    #[tokio::test]
    async fn lower_valued_team_gets_inducements() {
        let p = started_pitch().await;
        let amazons = p.store.team(p.amazons).await.unwrap();
        p.store
            .update_team_assets(
                p.amazons,
                TeamAssets {
                    rerolls: 1,
                    ..amazons.assets
                },
            )
            .await
            .unwrap();
        let orcs = p.store.team(p.orcs).await.unwrap();
        p.store
            .update_team_assets(
                p.orcs,
                TeamAssets {
                    fan_factor: 7,
                    ..orcs.assets
                },
            )
            .await
            .unwrap();

        assert_eq!(p.store.total_team_value(p.amazons).await.unwrap(), 100);
        assert_eq!(p.store.total_team_value(p.orcs).await.unwrap(), 120);
        let owed = p.store.inducement(p.fixture).await.unwrap();
        assert_eq!(owed.inducing, Some(p.amazons));
        assert_eq!(owed.gap, 20);
        assert_eq!(owed.budget, 20_000);
    }

    #[tokio::test]
    async fn departed_players_leave_team_value() {
        let p = started_pitch().await;
        let blitzer = p
            .store
            .add_player_to_team(p.orcs, player_type_id(&p.catalog, "OrcBlitzer"), "Snag")
            .await
            .unwrap();
        let valuation = p.store.team_valuation(p.orcs).await.unwrap();
        assert_eq!(valuation.players, 130);
        p.store
            .retire_or_kill_player(blitzer.id, PlayerStatus::Retired)
            .await
            .unwrap();
        assert_eq!(p.store.total_team_value(p.orcs).await.unwrap(), 50);
    }

    #[tokio::test]
    async fn standings_count_completed_matches_only() {
        let p = started_pitch().await;
        for _ in 0..2 {
            p.store.record_touchdown(p.fixture, p.hilda, p.amazons).await.unwrap();
            p.store.record_touchdown(p.fixture, p.grub, p.orcs).await.unwrap();
        }
        assert!(p
            .store
            .standings(p.league)
            .await
            .unwrap()
            .iter()
            .all(|r| r.played() == 0));

        p.store
            .transition_match(p.fixture, full_time((0, 0), (None, None)))
            .await
            .unwrap();
        let table = p.store.standings(p.league).await.unwrap();
        assert!(table.iter().all(|r| r.draws == 1 && r.points == 1 && r.tds_scored == 2));

        let second = p.store.schedule_match(p.league, p.orcs, p.amazons).await.unwrap();
        p.store.transition_match(second.id, kickoff()).await.unwrap();
        p.store.record_touchdown(second.id, p.grub, p.orcs).await.unwrap();
        p.store
            .transition_match(second.id, full_time((0, 0), (None, None)))
            .await
            .unwrap();
        let table = p.store.standings(p.league).await.unwrap();
        assert_eq!(table[0].team_id, p.orcs);
        assert_eq!(table[0].points, 4);
        assert_eq!(table[1].points, 1);
        assert_eq!(table.iter().map(StandingRow::played).sum::<u32>(), 4);
    }
}
