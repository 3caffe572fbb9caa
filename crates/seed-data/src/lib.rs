#![deny(warnings)]

//! Reference data for a new league: factions, rosters, skills and the injury
//! table, read from YAML and turned into a validated [`Catalog`].
//!
//! Entries are numbered in file order. Those ids are only meaningful inside
//! the returned catalog; the store keys reference data by name.

use anyhow::{anyhow, Context, Result};
use league_core::{
    parse_skill_list, Attributes, Catalog, Faction, FactionId, InjuryType, InjuryTypeId,
    PlayerType, PlayerTypeId, Skill, SkillAccess, SkillCategory, SkillId,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// The seed shipped with the workspace.
pub const DEFAULT_SEED: &str = include_str!("../data/league.yaml");

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedFile {
    #[serde(default)]
    pub factions: Vec<FactionSeed>,
    #[serde(default)]
    pub player_types: Vec<PlayerTypeSeed>,
    #[serde(default)]
    pub skills: Vec<SkillSeed>,
    #[serde(default)]
    pub injuries: Vec<InjurySeed>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FactionSeed {
    pub name: String,
    pub reroll_cost: i64,
    pub apothecary: bool,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlayerTypeSeed {
    pub faction: String,
    pub name: String,
    pub position: String,
    pub max_quantity: u32,
    pub price: i64,
    pub ma: i32,
    pub st: i32,
    pub ag: i32,
    pub av: i32,
    #[serde(default)]
    pub skills: String,
    pub normal: String,
    #[serde(default)]
    pub double: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SkillSeed {
    pub name: String,
    /// Letter or full name.
    pub category: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InjurySeed {
    pub name: String,
    #[serde(default)]
    pub niggling: bool,
    #[serde(default)]
    pub ma: i32,
    #[serde(default)]
    pub st: i32,
    #[serde(default)]
    pub ag: i32,
    #[serde(default)]
    pub av: i32,
    #[serde(default)]
    pub dead: bool,
    #[serde(default)]
    pub description: String,
}

fn next_id(index: usize) -> i64 {
    index as i64 + 1
}

impl SeedFile {
    /// Resolve names, parse access strings and validate the result.
    pub fn into_catalog(self) -> Result<Catalog> {
        let factions: Vec<Faction> = self
            .factions
            .into_iter()
            .enumerate()
            .map(|(i, f)| Faction {
                id: FactionId(next_id(i)),
                name: f.name,
                reroll_cost: f.reroll_cost,
                apothecary_available: f.apothecary,
                icon: f.icon,
            })
            .collect();
        let by_name: HashMap<&str, FactionId> =
            factions.iter().map(|f| (f.name.as_str(), f.id)).collect();

        let mut player_types = Vec::with_capacity(self.player_types.len());
        for (i, p) in self.player_types.into_iter().enumerate() {
            let faction_id = *by_name
                .get(p.faction.as_str())
                .ok_or_else(|| anyhow!("player type {}: unknown faction {}", p.name, p.faction))?;
            let normal_access: SkillAccess = p
                .normal
                .parse()
                .with_context(|| format!("player type {}: normal access", p.name))?;
            let double_access: SkillAccess = p
                .double
                .parse()
                .with_context(|| format!("player type {}: double access", p.name))?;
            player_types.push(PlayerType {
                id: PlayerTypeId(next_id(i)),
                faction_id,
                name: p.name,
                position: p.position,
                max_quantity: p.max_quantity,
                price: p.price,
                attributes: Attributes::new(p.ma, p.st, p.ag, p.av),
                starting_skills: parse_skill_list(&p.skills),
                normal_access,
                double_access,
            });
        }

        let mut skills = Vec::with_capacity(self.skills.len());
        for (i, s) in self.skills.into_iter().enumerate() {
            let category: SkillCategory = s
                .category
                .parse()
                .with_context(|| format!("skill {}", s.name))?;
            skills.push(Skill {
                id: SkillId(next_id(i)),
                name: s.name,
                category,
                description: s.description,
            });
        }

        let injury_types = self
            .injuries
            .into_iter()
            .enumerate()
            .map(|(i, inj)| InjuryType {
                id: InjuryTypeId(next_id(i)),
                name: inj.name,
                niggling: inj.niggling,
                modifier: Attributes::new(inj.ma, inj.st, inj.ag, inj.av),
                dead: inj.dead,
                description: inj.description,
            })
            .collect();

        let catalog = Catalog {
            factions,
            player_types,
            skills,
            injury_types,
        };
        catalog.validate().context("invalid seed data")?;
        for pt in &catalog.player_types {
            for name in &pt.starting_skills {
                if catalog.skill_by_name(name).is_none() {
                    warn!(player_type = %pt.name, skill = %name, "starting skill not in skill list");
                }
            }
        }
        debug!(
            factions = catalog.factions.len(),
            player_types = catalog.player_types.len(),
            skills = catalog.skills.len(),
            injuries = catalog.injury_types.len(),
            "seed parsed"
        );
        Ok(catalog)
    }
}

/// Parse seed YAML into a validated catalog.
pub fn parse(text: &str) -> Result<Catalog> {
    let seed: SeedFile = serde_yaml::from_str(text).context("malformed seed yaml")?;
    seed.into_catalog()
}

pub fn load_default() -> Result<Catalog> {
    parse(DEFAULT_SEED)
}

pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Catalog> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse(&text).with_context(|| format!("loading {}", path.display()))
}
