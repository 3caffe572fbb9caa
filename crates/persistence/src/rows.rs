//! Row types and their conversion into domain values.

use crate::{Result, StoreError};
use chrono::{DateTime, Utc};
use league_core::*;
use sqlx::FromRow;
use std::str::FromStr;

pub(crate) fn corrupt(what: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(what.to_string())
}

pub(crate) fn to_u32(value: i64, column: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| corrupt(format!("{column} out of range: {value}")))
}

fn parse<T>(text: &str, column: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    text.parse()
        .map_err(|e| corrupt(format!("{column} '{text}': {e}")))
}

#[derive(Debug, FromRow)]
pub(crate) struct FactionRow {
    pub id: i64,
    pub name: String,
    pub reroll_cost: i64,
    pub apothecary_available: bool,
    pub icon: Option<String>,
}

impl From<FactionRow> for Faction {
    fn from(r: FactionRow) -> Self {
        Faction {
            id: FactionId(r.id),
            name: r.name,
            reroll_cost: r.reroll_cost,
            apothecary_available: r.apothecary_available,
            icon: r.icon,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct PlayerTypeRow {
    pub id: i64,
    pub faction_id: i64,
    pub name: String,
    pub position: String,
    pub max_quantity: i64,
    pub price: i64,
    pub movement: i32,
    pub strength: i32,
    pub agility: i32,
    pub armour: i32,
    pub starting_skills: String,
    pub normal_access: String,
    pub double_access: String,
}

impl TryFrom<PlayerTypeRow> for PlayerType {
    type Error = StoreError;

    fn try_from(r: PlayerTypeRow) -> Result<Self> {
        Ok(PlayerType {
            id: PlayerTypeId(r.id),
            faction_id: FactionId(r.faction_id),
            max_quantity: to_u32(r.max_quantity, "max_quantity")?,
            price: r.price,
            attributes: Attributes::new(r.movement, r.strength, r.agility, r.armour),
            starting_skills: parse_skill_list(&r.starting_skills),
            normal_access: parse(&r.normal_access, "normal_access")?,
            double_access: parse(&r.double_access, "double_access")?,
            name: r.name,
            position: r.position,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct SkillRow {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub description: String,
}

impl TryFrom<SkillRow> for Skill {
    type Error = StoreError;

    fn try_from(r: SkillRow) -> Result<Self> {
        Ok(Skill {
            id: SkillId(r.id),
            category: parse(&r.category, "category")?,
            name: r.name,
            description: r.description,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct InjuryTypeRow {
    pub id: i64,
    pub name: String,
    pub niggling: bool,
    pub ma_modifier: i32,
    pub st_modifier: i32,
    pub ag_modifier: i32,
    pub av_modifier: i32,
    pub dead: bool,
    pub description: String,
}

impl From<InjuryTypeRow> for InjuryType {
    fn from(r: InjuryTypeRow) -> Self {
        InjuryType {
            id: InjuryTypeId(r.id),
            name: r.name,
            niggling: r.niggling,
            modifier: Attributes::new(r.ma_modifier, r.st_modifier, r.ag_modifier, r.av_modifier),
            dead: r.dead,
            description: r.description,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct LeagueRow {
    pub id: i64,
    pub name: String,
    pub managers: String,
    pub current: bool,
}

impl TryFrom<LeagueRow> for League {
    type Error = StoreError;

    fn try_from(r: LeagueRow) -> Result<Self> {
        let managers: Vec<String> = serde_json::from_str(&r.managers)
            .map_err(|e| corrupt(format!("league {} managers: {e}", r.id)))?;
        Ok(League {
            id: LeagueId(r.id),
            name: r.name,
            managers,
            current: r.current,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct TeamRow {
    pub id: i64,
    pub name: String,
    pub faction_id: i64,
    pub coach: String,
    pub league_id: Option<i64>,
    pub rerolls: i64,
    pub apothecary: bool,
    pub assistant_coaches: i64,
    pub cheerleaders: i64,
    pub fan_factor: i32,
    pub treasury: i64,
}

impl TryFrom<TeamRow> for Team {
    type Error = StoreError;

    fn try_from(r: TeamRow) -> Result<Self> {
        Ok(Team {
            id: TeamId(r.id),
            name: r.name,
            faction_id: FactionId(r.faction_id),
            coach: r.coach,
            league_id: r.league_id.map(LeagueId),
            assets: TeamAssets {
                rerolls: to_u32(r.rerolls, "rerolls")?,
                apothecary: r.apothecary,
                assistant_coaches: to_u32(r.assistant_coaches, "assistant_coaches")?,
                cheerleaders: to_u32(r.cheerleaders, "cheerleaders")?,
                fan_factor: r.fan_factor,
                treasury: r.treasury,
            },
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct PlayerRow {
    pub id: i64,
    pub team_id: Option<i64>,
    pub player_type_id: i64,
    pub name: String,
    pub number: i64,
    pub position: String,
    pub base_value: i64,
    pub movement: i32,
    pub strength: i32,
    pub agility: i32,
    pub armour: i32,
    pub skills: String,
    pub normal_access: String,
    pub double_access: String,
    pub status: String,
    pub miss_next: bool,
}

impl PlayerRow {
    /// Build the player; level-ups are attached by the caller.
    pub fn into_player(self, level_ups: Vec<LevelUp>) -> Result<Player> {
        Ok(Player {
            id: PlayerId(self.id),
            team_id: self.team_id.map(TeamId),
            player_type_id: PlayerTypeId(self.player_type_id),
            number: to_u32(self.number, "number")?,
            base_value: self.base_value,
            attributes: Attributes::new(self.movement, self.strength, self.agility, self.armour),
            skills: parse_skill_list(&self.skills),
            normal_access: parse(&self.normal_access, "normal_access")?,
            double_access: parse(&self.double_access, "double_access")?,
            status: parse(&self.status, "status")?,
            miss_next: self.miss_next,
            name: self.name,
            position: self.position,
            level_ups,
        })
    }
}

/// A level-up joined with its skill, if it granted one.
#[derive(Debug, FromRow)]
pub(crate) struct LevelUpRow {
    pub id: i64,
    pub player_id: i64,
    pub level: i64,
    pub stat: Option<String>,
    pub skill_id: Option<i64>,
    pub skill_name: Option<String>,
    pub skill_category: Option<String>,
    pub skill_description: Option<String>,
}

impl TryFrom<LevelUpRow> for LevelUp {
    type Error = StoreError;

    fn try_from(r: LevelUpRow) -> Result<Self> {
        let reward = match (r.skill_id, r.stat) {
            (Some(id), None) => LevelUpReward::Skill(Skill::try_from(SkillRow {
                id,
                name: r.skill_name.unwrap_or_default(),
                category: r.skill_category.unwrap_or_default(),
                description: r.skill_description.unwrap_or_default(),
            })?),
            (None, Some(stat)) => LevelUpReward::Stat(parse(&stat, "stat")?),
            _ => return Err(corrupt(format!("level-up {} has no single reward", r.id))),
        };
        Ok(LevelUp {
            id: LevelUpId(r.id),
            player_id: PlayerId(r.player_id),
            level: to_u32(r.level, "level")?,
            reward,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct MatchRow {
    pub id: i64,
    pub league_id: i64,
    pub team1_id: i64,
    pub team2_id: i64,
    pub team1_fame: i32,
    pub team2_fame: i32,
    pub weather: String,
    pub team1_winnings: i64,
    pub team2_winnings: i64,
    pub team1_fan_factor_change: i32,
    pub team2_fan_factor_change: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<MatchRow> for Match {
    type Error = StoreError;

    fn try_from(r: MatchRow) -> Result<Self> {
        Ok(Match {
            id: MatchId(r.id),
            league_id: LeagueId(r.league_id),
            team1: MatchSide {
                team_id: TeamId(r.team1_id),
                fame: r.team1_fame,
                winnings: r.team1_winnings,
                fan_factor_change: r.team1_fan_factor_change,
            },
            team2: MatchSide {
                team_id: TeamId(r.team2_id),
                fame: r.team2_fame,
                winnings: r.team2_winnings,
                fan_factor_change: r.team2_fan_factor_change,
            },
            weather: parse(&r.weather, "weather")?,
            status: parse(&r.status, "status")?,
            created_at: r.created_at,
            started_at: r.started_at,
            completed_at: r.completed_at,
        })
    }
}

/// An event row, joined with its injury type for injuries.
#[derive(Debug, FromRow)]
pub(crate) struct EventRow {
    pub id: i64,
    pub match_id: i64,
    pub kind: String,
    pub player_id: i64,
    pub team_id: i64,
    pub other_player_id: Option<i64>,
    pub other_team_id: Option<i64>,
    pub injury_type_id: Option<i64>,
    pub injury_name: Option<String>,
    pub injury_niggling: Option<bool>,
    pub injury_ma: Option<i32>,
    pub injury_st: Option<i32>,
    pub injury_ag: Option<i32>,
    pub injury_av: Option<i32>,
    pub injury_dead: Option<bool>,
    pub injury_description: Option<String>,
}

impl EventRow {
    fn injury(&self) -> Result<InjuryType> {
        let id = self
            .injury_type_id
            .ok_or_else(|| corrupt(format!("injury event {} has no injury type", self.id)))?;
        Ok(InjuryType::from(InjuryTypeRow {
            id,
            name: self.injury_name.clone().unwrap_or_default(),
            niggling: self.injury_niggling.unwrap_or_default(),
            ma_modifier: self.injury_ma.unwrap_or_default(),
            st_modifier: self.injury_st.unwrap_or_default(),
            ag_modifier: self.injury_ag.unwrap_or_default(),
            av_modifier: self.injury_av.unwrap_or_default(),
            dead: self.injury_dead.unwrap_or_default(),
            description: self.injury_description.clone().unwrap_or_default(),
        }))
    }
}

impl TryFrom<EventRow> for LedgerEntry {
    type Error = StoreError;

    fn try_from(r: EventRow) -> Result<Self> {
        let player = PlayerId(r.player_id);
        let team = TeamId(r.team_id);
        let other = || -> Result<(PlayerId, TeamId)> {
            match (r.other_player_id, r.other_team_id) {
                (Some(p), Some(t)) => Ok((PlayerId(p), TeamId(t))),
                _ => Err(corrupt(format!("{} event {} lacks its second role", r.kind, r.id))),
            }
        };
        let event = match r.kind.as_str() {
            "touchdown" => MatchEvent::Touchdown {
                scorer: player,
                team,
            },
            "completion" => MatchEvent::Completion {
                thrower: player,
                receiver: other()?.0,
                team,
            },
            "casualty" => {
                let (victim, victim_team) = other()?;
                MatchEvent::Casualty {
                    causer: player,
                    causing_team: team,
                    victim,
                    victim_team,
                }
            }
            "interception" => {
                let (thrower, throwing_team) = other()?;
                MatchEvent::Interception {
                    interceptor: player,
                    intercepting_team: team,
                    thrower,
                    throwing_team,
                }
            }
            "mvp" => MatchEvent::Mvp { player, team },
            "injury" => MatchEvent::Injury {
                player,
                team,
                injury: r.injury()?,
            },
            other => return Err(corrupt(format!("event {} has unknown kind {other}", r.id))),
        };
        Ok(LedgerEntry {
            id: EventId(r.id),
            match_id: MatchId(r.match_id),
            event,
        })
    }
}

/// Columns written for an event: credited role, second role, injury type.
pub(crate) struct EventColumns {
    pub kind: EventKind,
    pub player: PlayerId,
    pub team: TeamId,
    pub other: Option<(PlayerId, TeamId)>,
    pub injury: Option<InjuryTypeId>,
}

impl EventColumns {
    pub fn of(event: &MatchEvent) -> Self {
        let (player, team, other, injury) = match event {
            MatchEvent::Touchdown { scorer, team } => (*scorer, *team, None, None),
            MatchEvent::Completion {
                thrower,
                receiver,
                team,
            } => (*thrower, *team, Some((*receiver, *team)), None),
            MatchEvent::Casualty {
                causer,
                causing_team,
                victim,
                victim_team,
            } => (*causer, *causing_team, Some((*victim, *victim_team)), None),
            MatchEvent::Interception {
                interceptor,
                intercepting_team,
                thrower,
                throwing_team,
            } => (
                *interceptor,
                *intercepting_team,
                Some((*thrower, *throwing_team)),
                None,
            ),
            MatchEvent::Mvp { player, team } => (*player, *team, None, None),
            MatchEvent::Injury {
                player,
                team,
                injury,
            } => (*player, *team, None, Some(injury.id)),
        };
        Self {
            kind: event.kind(),
            player,
            team,
            other,
            injury,
        }
    }
}

/// Select list for [`EventRow`].
pub(crate) const EVENT_SELECT: &str = "SELECT e.id, e.match_id, e.kind, e.player_id, e.team_id, \
     e.other_player_id, e.other_team_id, e.injury_type_id, \
     i.name AS injury_name, i.niggling AS injury_niggling, \
     i.ma_modifier AS injury_ma, i.st_modifier AS injury_st, \
     i.ag_modifier AS injury_ag, i.av_modifier AS injury_av, \
     i.dead AS injury_dead, i.description AS injury_description \
     FROM match_events e LEFT JOIN injury_types i ON i.id = e.injury_type_id";

/// Select list for [`LevelUpRow`].
pub(crate) const LEVEL_UP_SELECT: &str = "SELECT l.id, l.player_id, l.level, l.stat, l.skill_id, \
     s.name AS skill_name, s.category AS skill_category, s.description AS skill_description \
     FROM level_ups l LEFT JOIN skills s ON s.id = l.skill_id";

pub(crate) const PLAYER_COLUMNS: &str = "id, team_id, player_type_id, name, number, position, \
     base_value, movement, strength, agility, armour, skills, normal_access, double_access, \
     status, miss_next";

pub(crate) const MATCH_COLUMNS: &str = "id, league_id, team1_id, team2_id, team1_fame, \
     team2_fame, weather, team1_winnings, team2_winnings, team1_fan_factor_change, \
     team2_fan_factor_change, status, created_at, started_at, completed_at";

pub(crate) const TEAM_COLUMNS: &str = "id, name, faction_id, coach, league_id, rerolls, \
     apothecary, assistant_coaches, cheerleaders, fan_factor, treasury";

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn counts_fit_u32_or_are_corrupt(v in any::<i64>()) {
            let in_range = (0..=i64::from(u32::MAX)).contains(&v);
            prop_assert_eq!(to_u32(v, "count").is_ok(), in_range);
        }
    }

    #[test]
    fn event_columns_keep_both_roles() {
        let cols = EventColumns::of(&MatchEvent::Interception {
            interceptor: PlayerId(3),
            intercepting_team: TeamId(1),
            thrower: PlayerId(9),
            throwing_team: TeamId(2),
        });
        assert_eq!(cols.kind, EventKind::Interception);
        assert_eq!(cols.player, PlayerId(3));
        assert_eq!(cols.team, TeamId(1));
        assert_eq!(cols.other, Some((PlayerId(9), TeamId(2))));
        assert!(cols.injury.is_none());
    }

    #[test]
    fn level_up_row_needs_exactly_one_reward() {
        let row = LevelUpRow {
            id: 1,
            player_id: 1,
            level: 1,
            stat: None,
            skill_id: None,
            skill_name: None,
            skill_category: None,
            skill_description: None,
        };
        assert!(matches!(LevelUp::try_from(row), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn unknown_status_is_corrupt() {
        let row = PlayerRow {
            id: 1,
            team_id: None,
            player_type_id: 1,
            name: "Ghost".into(),
            number: 1,
            position: "Lineman".into(),
            base_value: 50,
            movement: 6,
            strength: 3,
            agility: 3,
            armour: 8,
            skills: "-".into(),
            normal_access: "G".into(),
            double_access: "ASP".into(),
            status: "Missing".into(),
            miss_next: false,
        };
        assert!(matches!(row.into_player(vec![]), Err(StoreError::Corrupt(_))));
    }
}
