//! Leagues, teams and the players on their rosters.

use crate::catalog::{Attributes, PlayerType, Skill, SkillAccess, StatIncrease, ValidationError};
use crate::{FactionId, LeagueId, LevelUpId, PlayerId, PlayerTypeId, SkillId, TeamId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A league groups teams and the matches played between them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct League {
    pub id: LeagueId,
    pub name: String,
    pub managers: Vec<String>,
    /// Marks the league currently being played.
    pub current: bool,
}

/// A franchise with its staff and finances.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub faction_id: FactionId,
    pub coach: String,
    pub league_id: Option<LeagueId>,
    #[serde(flatten)]
    pub assets: TeamAssets,
}

/// The mutable, purchasable side of a team.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamAssets {
    pub rerolls: u32,
    pub apothecary: bool,
    pub assistant_coaches: u32,
    pub cheerleaders: u32,
    pub fan_factor: i32,
    /// Gold in the bank, in thousands.
    pub treasury: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerStatus {
    Active,
    Retired,
    Dead,
}

impl PlayerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PlayerStatus::Active => "Active",
            PlayerStatus::Retired => "Retired",
            PlayerStatus::Dead => "Dead",
        }
    }

    /// Retired and Dead players have left their team for good.
    pub fn is_terminal(self) -> bool {
        !matches!(self, PlayerStatus::Active)
    }
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlayerStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(PlayerStatus::Active),
            "retired" => Ok(PlayerStatus::Retired),
            "dead" => Ok(PlayerStatus::Dead),
            other => Err(ValidationError::UnknownVariant {
                kind: "player status",
                value: other.to_string(),
            }),
        }
    }
}

/// What a level-up granted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum LevelUpReward {
    Skill(Skill),
    Stat(StatIncrease),
}

/// What a coach asks for when spending a level-up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum LevelUpChoice {
    Skill(SkillId),
    Stat(StatIncrease),
}

/// One spent level. Never edited or removed once recorded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUp {
    pub id: LevelUpId,
    pub player_id: PlayerId,
    /// 1 for the first level-up, 2 for the second, and so on.
    pub level: u32,
    pub reward: LevelUpReward,
}

impl LevelUp {
    pub fn skill(&self) -> Option<&Skill> {
        match &self.reward {
            LevelUpReward::Skill(s) => Some(s),
            LevelUpReward::Stat(_) => None,
        }
    }

    pub fn stat(&self) -> Option<StatIncrease> {
        match self.reward {
            LevelUpReward::Stat(s) => Some(s),
            LevelUpReward::Skill(_) => None,
        }
    }
}

/// A roster member.
///
/// Attributes, skills, price and access sets are copied from the
/// [`PlayerType`] at hire time and never re-read from it afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    /// `None` once released, retired or dead.
    pub team_id: Option<TeamId>,
    pub player_type_id: PlayerTypeId,
    pub name: String,
    /// Jersey number, unique among a team's current roster.
    pub number: u32,
    pub position: String,
    /// Hiring price snapshot, in thousands of gold.
    pub base_value: i64,
    pub attributes: Attributes,
    pub skills: Vec<String>,
    pub normal_access: SkillAccess,
    pub double_access: SkillAccess,
    pub status: PlayerStatus,
    pub miss_next: bool,
    /// Level-ups in the order they were taken.
    pub level_ups: Vec<LevelUp>,
}

impl Player {
    /// A freshly hired player built from a roster slot.
    pub fn hire(
        id: PlayerId,
        team_id: TeamId,
        player_type: &PlayerType,
        name: impl Into<String>,
        number: u32,
    ) -> Self {
        Self {
            id,
            team_id: Some(team_id),
            player_type_id: player_type.id,
            name: name.into(),
            number,
            position: player_type.position.clone(),
            base_value: player_type.price,
            attributes: player_type.attributes,
            skills: player_type.starting_skills.clone(),
            normal_access: player_type.normal_access,
            double_access: player_type.double_access,
            status: PlayerStatus::Active,
            miss_next: false,
            level_ups: Vec::new(),
        }
    }

    /// Currently on a team and able to play.
    pub fn is_rostered_on(&self, team: TeamId) -> bool {
        self.team_id == Some(team) && self.status == PlayerStatus::Active
    }

    /// Whether the player already holds a skill, from the start or by level-up.
    pub fn has_skill(&self, name: &str) -> bool {
        self.skills.iter().any(|s| s.eq_ignore_ascii_case(name))
            || self
                .level_ups
                .iter()
                .filter_map(LevelUp::skill)
                .any(|s| s.name.eq_ignore_ascii_case(name))
    }
}

/// Lowest positive jersey number not already in `used`.
pub fn lowest_free_number<I: IntoIterator<Item = u32>>(used: I) -> u32 {
    let used: BTreeSet<u32> = used.into_iter().collect();
    let mut number = 1;
    while used.contains(&number) {
        number += 1;
    }
    number
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SkillCategory;
    use proptest::prelude::*;

    fn blitzer() -> PlayerType {
        PlayerType {
            id: PlayerTypeId(4),
            faction_id: FactionId(1),
            name: "AmazonBlitzer".into(),
            position: "Blitzer".into(),
            max_quantity: 4,
            price: 90,
            attributes: Attributes::new(6, 3, 3, 7),
            starting_skills: vec!["Dodge".into(), "Block".into()],
            normal_access: "GS".parse().unwrap(),
            double_access: "AP".parse().unwrap(),
        }
    }

    #[test]
    fn hire_snapshots_player_type() {
        let mut pt = blitzer();
        let p = Player::hire(PlayerId(1), TeamId(2), &pt, "Valka", 3);
        pt.price = 120;
        pt.attributes.strength = 4;
        assert_ne!(pt.price, p.base_value);
        assert_eq!(p.base_value, 90);
        assert_eq!(p.attributes, Attributes::new(6, 3, 3, 7));
        assert_eq!(p.position, "Blitzer");
        assert_eq!(p.status, PlayerStatus::Active);
        assert!(!p.miss_next);
        assert!(p.level_ups.is_empty());
        assert!(p.is_rostered_on(TeamId(2)));
    }

    #[test]
    fn has_skill_sees_level_ups() {
        let mut p = Player::hire(PlayerId(1), TeamId(2), &blitzer(), "Valka", 3);
        assert!(p.has_skill("block"));
        assert!(!p.has_skill("Guard"));
        p.level_ups.push(LevelUp {
            id: LevelUpId(1),
            player_id: p.id,
            level: 1,
            reward: LevelUpReward::Skill(Skill {
                id: SkillId(9),
                name: "Guard".into(),
                category: SkillCategory::Strength,
                description: String::new(),
            }),
        });
        assert!(p.has_skill("Guard"));
    }

    #[test]
    fn lowest_free_number_fills_first_gap() {
        assert_eq!(lowest_free_number(Vec::new()), 1);
        assert_eq!(lowest_free_number([1, 2, 3]), 4);
        assert_eq!(lowest_free_number([1, 3, 4]), 2);
        assert_eq!(lowest_free_number([2, 5]), 1);
    }

    #[test]
    fn status_parsing() {
        assert_eq!("dead".parse::<PlayerStatus>().unwrap(), PlayerStatus::Dead);
        assert!(PlayerStatus::Retired.is_terminal());
        assert!(!PlayerStatus::Active.is_terminal());
        assert!("benched".parse::<PlayerStatus>().is_err());
    }

    proptest! {
        #[test]
        fn free_number_is_unused_and_minimal(used in proptest::collection::btree_set(1u32..40, 0..30)) {
            let n = lowest_free_number(used.iter().copied());
            prop_assert!(n >= 1);
            prop_assert!(!used.contains(&n));
            for k in 1..n {
                prop_assert!(used.contains(&k));
            }
        }
    }
}
