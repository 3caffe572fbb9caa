//! Reference data: seeding and lookups.

use crate::rows::{corrupt, FactionRow, InjuryTypeRow, PlayerTypeRow, SkillRow};
use crate::{LeagueStore, Result};
use league_core::*;
use serde::Serialize;
use sqlx::SqliteConnection;
use std::collections::HashMap;
use tracing::info;

/// Rows inserted by a seed run. Entries already present are skipped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub factions: u64,
    pub player_types: u64,
    pub skills: u64,
    pub injury_types: u64,
}

impl SeedReport {
    pub fn total(&self) -> u64 {
        self.factions + self.player_types + self.skills + self.injury_types
    }
}

const PLAYER_TYPE_COLUMNS: &str = "id, faction_id, name, position, max_quantity, price, \
     movement, strength, agility, armour, starting_skills, normal_access, double_access";

pub(crate) async fn load_faction(conn: &mut SqliteConnection, id: FactionId) -> Result<Faction> {
    let row: Option<FactionRow> = sqlx::query_as(
        "SELECT id, name, reroll_cost, apothecary_available, icon FROM factions WHERE id = ?",
    )
    .bind(id.0)
    .fetch_optional(&mut *conn)
    .await?;
    row.map(Faction::from)
        .ok_or_else(|| LeagueError::not_found("faction", id.0).into())
}

pub(crate) async fn load_player_type(
    conn: &mut SqliteConnection,
    id: PlayerTypeId,
) -> Result<PlayerType> {
    let row: Option<PlayerTypeRow> = sqlx::query_as(&format!(
        "SELECT {PLAYER_TYPE_COLUMNS} FROM player_types WHERE id = ?"
    ))
    .bind(id.0)
    .fetch_optional(&mut *conn)
    .await?;
    match row {
        Some(r) => PlayerType::try_from(r),
        None => Err(LeagueError::not_found("player type", id.0).into()),
    }
}

pub(crate) async fn load_player_types_of(
    conn: &mut SqliteConnection,
    faction: FactionId,
) -> Result<Vec<PlayerType>> {
    let rows: Vec<PlayerTypeRow> = sqlx::query_as(&format!(
        "SELECT {PLAYER_TYPE_COLUMNS} FROM player_types WHERE faction_id = ? ORDER BY id"
    ))
    .bind(faction.0)
    .fetch_all(&mut *conn)
    .await?;
    rows.into_iter().map(PlayerType::try_from).collect()
}

pub(crate) async fn load_skill(conn: &mut SqliteConnection, id: SkillId) -> Result<Skill> {
    let row: Option<SkillRow> =
        sqlx::query_as("SELECT id, name, category, description FROM skills WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&mut *conn)
            .await?;
    match row {
        Some(r) => Skill::try_from(r),
        None => Err(LeagueError::not_found("skill", id.0).into()),
    }
}

pub(crate) async fn load_injury_type(
    conn: &mut SqliteConnection,
    id: InjuryTypeId,
) -> Result<InjuryType> {
    let row: Option<InjuryTypeRow> = sqlx::query_as(
        "SELECT id, name, niggling, ma_modifier, st_modifier, ag_modifier, av_modifier, dead, \
         description FROM injury_types WHERE id = ?",
    )
    .bind(id.0)
    .fetch_optional(&mut *conn)
    .await?;
    row.map(InjuryType::from)
        .ok_or_else(|| LeagueError::not_found("injury type", id.0).into())
}

impl LeagueStore {
    /// Insert reference data that is not there yet, matching on names.
    ///
    /// The catalog's own ids are only used to resolve player types to their
    /// faction; stored ids are assigned by the database.
    pub async fn seed_catalog(&self, catalog: &Catalog) -> Result<SeedReport> {
        catalog
            .validate()
            .map_err(|e| LeagueError::InvalidChoice(e.to_string()))?;
        let mut tx = self.pool.begin().await?;
        let mut report = SeedReport::default();

        for f in &catalog.factions {
            report.factions += sqlx::query(
                "INSERT INTO factions (name, reroll_cost, apothecary_available, icon) \
                 VALUES (?, ?, ?, ?) ON CONFLICT(name) DO NOTHING",
            )
            .bind(&f.name)
            .bind(f.reroll_cost)
            .bind(f.apothecary_available)
            .bind(&f.icon)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        let stored: Vec<(i64, String)> = sqlx::query_as("SELECT id, name FROM factions")
            .fetch_all(&mut *tx)
            .await?;
        let stored: HashMap<String, i64> = stored.into_iter().map(|(id, n)| (n, id)).collect();
        for p in &catalog.player_types {
            let faction = catalog
                .faction(p.faction_id)
                .and_then(|f| stored.get(&f.name))
                .ok_or_else(|| corrupt(format!("player type {} lost its faction", p.name)))?;
            report.player_types += sqlx::query(
                "INSERT INTO player_types (faction_id, name, position, max_quantity, price, \
                 movement, strength, agility, armour, starting_skills, normal_access, \
                 double_access) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
                 ON CONFLICT(name) DO NOTHING",
            )
            .bind(*faction)
            .bind(&p.name)
            .bind(&p.position)
            .bind(i64::from(p.max_quantity))
            .bind(p.price)
            .bind(p.attributes.movement)
            .bind(p.attributes.strength)
            .bind(p.attributes.agility)
            .bind(p.attributes.armour)
            .bind(format_skill_list(&p.starting_skills))
            .bind(p.normal_access.to_string())
            .bind(p.double_access.to_string())
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        for s in &catalog.skills {
            report.skills += sqlx::query(
                "INSERT INTO skills (name, category, description) VALUES (?, ?, ?) \
                 ON CONFLICT(name) DO NOTHING",
            )
            .bind(&s.name)
            .bind(s.category.letter().to_string())
            .bind(&s.description)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        for i in &catalog.injury_types {
            report.injury_types += sqlx::query(
                "INSERT INTO injury_types (name, niggling, ma_modifier, st_modifier, \
                 ag_modifier, av_modifier, dead, description) VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
                 ON CONFLICT(name) DO NOTHING",
            )
            .bind(&i.name)
            .bind(i.niggling)
            .bind(i.modifier.movement)
            .bind(i.modifier.strength)
            .bind(i.modifier.agility)
            .bind(i.modifier.armour)
            .bind(i.dead)
            .bind(&i.description)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;
        info!(
            factions = report.factions,
            player_types = report.player_types,
            skills = report.skills,
            injury_types = report.injury_types,
            "catalog seeded"
        );
        Ok(report)
    }

    /// Everything in the reference tables, with stored ids.
    pub async fn catalog(&self) -> Result<Catalog> {
        let mut conn = self.pool.acquire().await?;
        let factions: Vec<FactionRow> = sqlx::query_as(
            "SELECT id, name, reroll_cost, apothecary_available, icon FROM factions ORDER BY id",
        )
        .fetch_all(&mut *conn)
        .await?;
        let player_types: Vec<PlayerTypeRow> = sqlx::query_as(&format!(
            "SELECT {PLAYER_TYPE_COLUMNS} FROM player_types ORDER BY id"
        ))
        .fetch_all(&mut *conn)
        .await?;
        let skills: Vec<SkillRow> =
            sqlx::query_as("SELECT id, name, category, description FROM skills ORDER BY id")
                .fetch_all(&mut *conn)
                .await?;
        let injury_types: Vec<InjuryTypeRow> = sqlx::query_as(
            "SELECT id, name, niggling, ma_modifier, st_modifier, ag_modifier, av_modifier, \
             dead, description FROM injury_types ORDER BY id",
        )
        .fetch_all(&mut *conn)
        .await?;
        Ok(Catalog {
            factions: factions.into_iter().map(Faction::from).collect(),
            player_types: player_types
                .into_iter()
                .map(PlayerType::try_from)
                .collect::<Result<_>>()?,
            skills: skills
                .into_iter()
                .map(Skill::try_from)
                .collect::<Result<_>>()?,
            injury_types: injury_types.into_iter().map(InjuryType::from).collect(),
        })
    }

    pub async fn faction(&self, id: FactionId) -> Result<Faction> {
        let mut conn = self.pool.acquire().await?;
        load_faction(&mut conn, id).await
    }

    pub async fn player_type(&self, id: PlayerTypeId) -> Result<PlayerType> {
        let mut conn = self.pool.acquire().await?;
        load_player_type(&mut conn, id).await
    }

    pub async fn skill(&self, id: SkillId) -> Result<Skill> {
        let mut conn = self.pool.acquire().await?;
        load_skill(&mut conn, id).await
    }

    pub async fn injury_type(&self, id: InjuryTypeId) -> Result<InjuryType> {
        let mut conn = self.pool.acquire().await?;
        load_injury_type(&mut conn, id).await
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{memory_store, seeded_store};

    #[tokio::test]
    async fn seeding_twice_inserts_nothing_new() {
        let store = memory_store().await;
        let catalog = seed_data::load_default().unwrap();
        let first = store.seed_catalog(&catalog).await.unwrap();
        assert_eq!(first.factions, 21);
        assert_eq!(first.injury_types, 18);
        let second = store.seed_catalog(&catalog).await.unwrap();
        assert_eq!(second.total(), 0);
    }

    #[tokio::test]
    async fn stored_catalog_round_trips_rosters() {
        let (store, catalog) = seeded_store().await;
        catalog.validate().unwrap();
        let lw = catalog
            .player_types
            .iter()
            .find(|p| p.name == "AmazonLinewoman")
            .unwrap();
        let fetched = store.player_type(lw.id).await.unwrap();
        assert_eq!(&fetched, lw);
        assert_eq!(fetched.starting_skills, vec!["Dodge".to_string()]);
        let faction = store.faction(lw.faction_id).await.unwrap();
        assert_eq!(faction.name, "Amazon");
        let block = catalog.skill_by_name("block").unwrap();
        assert_eq!(store.skill(block.id).await.unwrap().name, "Block");
    }

    #[tokio::test]
    async fn unknown_reference_ids_are_not_found() {
        let (store, _) = seeded_store().await;
        let err = store
            .injury_type(league_core::InjuryTypeId(999))
            .await
            .unwrap_err();
        assert!(matches!(
            err.league(),
            Some(league_core::LeagueError::NotFound { entity: "injury type", .. })
        ));
    }
}
