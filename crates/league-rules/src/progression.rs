//! Star player points, levels, and what a player is worth right now.
//!
//! A player's current state is always derived from three inputs: the
//! snapshot taken at hire time, their level-up history, and the completed
//! matches in the ledger.

use crate::RulesError;
use league_core::{
    Attributes, CareerTally, LeagueError, LevelUp, LevelUpReward, MatchLedger, Player, PlayerId,
    PlayerStatus,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

pub const SPP_PER_COMPLETION: u32 = 1;
pub const SPP_PER_TOUCHDOWN: u32 = 3;
pub const SPP_PER_INTERCEPTION: u32 = 2;
pub const SPP_PER_CASUALTY: u32 = 2;
pub const SPP_PER_MVP: u32 = 5;

/// SPP needed for levels 0..=7.
pub const DEFAULT_LEVEL_THRESHOLDS: [u32; 8] = [0, 6, 16, 31, 51, 76, 126, 176];

/// Value added by a skill from a normal-access category.
pub const NORMAL_SKILL_VALUE: i64 = 20;
/// Value added by a skill from a double-access category.
pub const DOUBLE_SKILL_VALUE: i64 = 30;

/// How effective characteristics are bounded after injuries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", content = "min", rename_all = "snake_case")]
pub enum AttributePolicy {
    /// Report the raw sum, even if it goes to zero or below.
    #[default]
    Unclamped,
    /// Never report a characteristic below this value.
    Floor(i32),
}

impl AttributePolicy {
    pub fn apply(self, attrs: Attributes) -> Attributes {
        match self {
            AttributePolicy::Unclamped => attrs,
            AttributePolicy::Floor(min) => attrs.floored(min),
        }
    }
}

/// Tunable parts of the progression rules.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionRules {
    /// Ascending SPP thresholds; index is the level reached.
    pub level_thresholds: Vec<u32>,
    pub attribute_policy: AttributePolicy,
}

impl Default for ProgressionRules {
    fn default() -> Self {
        Self {
            level_thresholds: DEFAULT_LEVEL_THRESHOLDS.to_vec(),
            attribute_policy: AttributePolicy::Unclamped,
        }
    }
}

/// Everything the progression rules say about one player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerReport {
    pub player_id: PlayerId,
    pub name: String,
    pub position: String,
    pub number: u32,
    pub status: PlayerStatus,
    pub miss_next: bool,
    pub career: CareerTally,
    pub spp: u32,
    pub expected_level: u32,
    pub actual_level: u32,
    pub can_level_up: bool,
    /// SPP at which the next level unlocks, if the table goes that far.
    pub next_threshold: Option<u32>,
    pub attributes: Attributes,
    pub skills: BTreeSet<String>,
    pub value: i64,
}

impl ProgressionRules {
    /// Thresholds must start at 0 and strictly increase.
    pub fn validate(&self) -> Result<(), RulesError> {
        let t = &self.level_thresholds;
        let ascending = t.windows(2).all(|w| w[0] < w[1]);
        if t.first() != Some(&0) || !ascending {
            return Err(RulesError::InvalidThresholds(t.clone()));
        }
        if let AttributePolicy::Floor(min) = self.attribute_policy {
            if !(0..=10).contains(&min) {
                return Err(RulesError::InvalidFloor(min));
            }
        }
        Ok(())
    }

    /// Level of the greatest threshold not above `spp`.
    pub fn expected_level(&self, spp: u32) -> u32 {
        self.level_thresholds
            .iter()
            .rposition(|&t| t <= spp)
            .map_or(0, |i| i as u32)
    }

    /// First threshold strictly above `spp`.
    pub fn next_threshold(&self, spp: u32) -> Option<u32> {
        self.level_thresholds.iter().copied().find(|&t| t > spp)
    }

    pub fn can_level_up(&self, player: &Player, ledger: &MatchLedger) -> bool {
        self.expected_level(compute_spp(player, ledger)) > actual_level(player)
    }

    /// Snapshot characteristics plus level-up increases plus injuries from
    /// completed matches, bounded by the configured policy.
    pub fn effective_stats(&self, player: &Player, ledger: &MatchLedger) -> Attributes {
        let from_levels: Attributes = player
            .level_ups
            .iter()
            .filter_map(LevelUp::stat)
            .map(|s| s.modifier())
            .sum();
        let from_injuries: Attributes = ledger.injuries_of(player.id).map(|i| i.modifier).sum();
        self.attribute_policy
            .apply(player.attributes + from_levels + from_injuries)
    }

    /// Reject a level-up the player is not entitled to.
    ///
    /// The player must be active, have an unspent level, and (for skills)
    /// pick from a category they can access and do not already hold.
    pub fn check_level_up(
        &self,
        player: &Player,
        reward: &LevelUpReward,
        ledger: &MatchLedger,
    ) -> Result<(), LeagueError> {
        if player.status != PlayerStatus::Active {
            return Err(LeagueError::InvalidState(format!(
                "player {} is {}",
                player.id, player.status
            )));
        }
        let spp = compute_spp(player, ledger);
        let expected = self.expected_level(spp);
        let actual = actual_level(player);
        if expected <= actual {
            return Err(LeagueError::InvalidState(format!(
                "player {} has no level-up available ({spp} SPP, level {actual})",
                player.id
            )));
        }
        if let LevelUpReward::Skill(skill) = reward {
            let access = player.normal_access.union(player.double_access);
            if !access.contains(skill.category) {
                return Err(LeagueError::InvalidChoice(format!(
                    "{} skills are not available to player {} (access {}/{})",
                    skill.category, player.id, player.normal_access, player.double_access
                )));
            }
            if player.has_skill(&skill.name) {
                return Err(LeagueError::InvalidChoice(format!(
                    "player {} already has {}",
                    player.id, skill.name
                )));
            }
        }
        Ok(())
    }

    pub fn report(&self, player: &Player, ledger: &MatchLedger) -> PlayerReport {
        let career = ledger.career(player.id);
        let spp = spp_of(&career);
        let expected_level = self.expected_level(spp);
        let actual_level = actual_level(player);
        debug!(player = %player.id, spp, expected_level, actual_level, "player report");
        PlayerReport {
            player_id: player.id,
            name: player.name.clone(),
            position: player.position.clone(),
            number: player.number,
            status: player.status,
            miss_next: player.miss_next,
            career,
            spp,
            expected_level,
            actual_level,
            can_level_up: expected_level > actual_level,
            next_threshold: self.next_threshold(spp),
            attributes: self.effective_stats(player, ledger),
            skills: effective_skills(player),
            value: effective_value(player),
        }
    }
}

/// SPP earned from a tally of completed-match events.
pub fn spp_of(tally: &CareerTally) -> u32 {
    SPP_PER_COMPLETION * tally.completions
        + SPP_PER_TOUCHDOWN * tally.touchdowns
        + SPP_PER_INTERCEPTION * tally.interceptions
        + SPP_PER_CASUALTY * tally.casualties
        + SPP_PER_MVP * tally.mvps
}

/// Star player points from completed matches only.
pub fn compute_spp(player: &Player, ledger: &MatchLedger) -> u32 {
    spp_of(&ledger.career(player.id))
}

/// Level implied by the player's SPP under the default thresholds.
pub fn expected_level(player: &Player, ledger: &MatchLedger) -> u32 {
    ProgressionRules::default().expected_level(compute_spp(player, ledger))
}

/// Levels actually taken.
pub fn actual_level(player: &Player) -> u32 {
    player.level_ups.len() as u32
}

pub fn can_level_up(player: &Player, ledger: &MatchLedger) -> bool {
    ProgressionRules::default().can_level_up(player, ledger)
}

/// Unclamped effective characteristics.
pub fn effective_stats(player: &Player, ledger: &MatchLedger) -> Attributes {
    ProgressionRules::default().effective_stats(player, ledger)
}

/// Starting skills plus every skill taken on level-up.
pub fn effective_skills(player: &Player) -> BTreeSet<String> {
    player
        .skills
        .iter()
        .cloned()
        .chain(
            player
                .level_ups
                .iter()
                .filter_map(LevelUp::skill)
                .map(|s| s.name.clone()),
        )
        .collect()
}

/// Value one level-up adds to this player.
///
/// Skill categories are checked normal access first, then double access;
/// the first match wins. A skill in neither adds nothing.
pub fn level_up_value(player: &Player, level_up: &LevelUp) -> i64 {
    match &level_up.reward {
        LevelUpReward::Skill(skill) if player.normal_access.contains(skill.category) => {
            NORMAL_SKILL_VALUE
        }
        LevelUpReward::Skill(skill) if player.double_access.contains(skill.category) => {
            DOUBLE_SKILL_VALUE
        }
        LevelUpReward::Skill(_) => 0,
        LevelUpReward::Stat(stat) => stat.value(),
    }
}

/// Hiring price snapshot plus the value of every level-up.
pub fn effective_value(player: &Player) -> i64 {
    player.base_value
        + player
            .level_ups
            .iter()
            .map(|lu| level_up_value(player, lu))
            .sum::<i64>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use league_core::*;
    use proptest::prelude::*;

    const TEAM: TeamId = TeamId(1);
    const OPP: TeamId = TeamId(2);

    fn linewoman() -> PlayerType {
        PlayerType {
            id: PlayerTypeId(1),
            faction_id: FactionId(1),
            name: "AmazonLinewoman".into(),
            position: "Linewoman".into(),
            max_quantity: 16,
            price: 50,
            attributes: Attributes::new(6, 3, 3, 7),
            starting_skills: vec!["Dodge".into()],
            normal_access: "G".parse().unwrap(),
            double_access: "ASP".parse().unwrap(),
        }
    }

    fn player() -> Player {
        Player::hire(PlayerId(7), TEAM, &linewoman(), "Hippolyta", 1)
    }

    fn skill(id: i64, name: &str, category: SkillCategory) -> Skill {
        Skill {
            id: SkillId(id),
            name: name.into(),
            category,
            description: String::new(),
        }
    }

    fn level_up(p: &Player, reward: LevelUpReward) -> LevelUp {
        LevelUp {
            id: LevelUpId(p.level_ups.len() as i64 + 1),
            player_id: p.id,
            level: p.level_ups.len() as u32 + 1,
            reward,
        }
    }

    /// A ledger with one match in which `events` were recorded.
    fn ledger_with(events: Vec<MatchEvent>, completed: bool) -> MatchLedger {
        let at = Utc.with_ymd_and_hms(2025, 2, 1, 18, 0, 0).unwrap();
        let mut m = Match::schedule(MatchId(1), LeagueId(1), TEAM, OPP, at).unwrap();
        m.apply(
            &MatchTransition::Start {
                team1_fame: 0,
                team2_fame: 0,
                weather: Weather::Nice,
            },
            at,
        )
        .unwrap();
        let mut ledger = MatchLedger::new();
        ledger.insert_match(m);
        for (i, event) in events.into_iter().enumerate() {
            ledger
                .record(LedgerEntry {
                    id: EventId(i as i64 + 1),
                    match_id: MatchId(1),
                    event,
                })
                .unwrap();
        }
        if completed {
            ledger
                .fixture_mut(MatchId(1))
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
        ledger
    }

    fn touchdowns(n: usize) -> Vec<MatchEvent> {
        (0..n)
            .map(|_| MatchEvent::Touchdown {
                scorer: PlayerId(7),
                team: TEAM,
            })
            .collect()
    }

    #[test]
    fn spp_formula_weights() {
        let tally = CareerTally {
            completions: 2,
            touchdowns: 1,
            interceptions: 1,
            casualties: 3,
            mvps: 1,
        };
        assert_eq!(spp_of(&tally), 2 + 3 + 2 + 6 + 5);
    }

    #[test]
    fn level_lookup_is_a_floor() {
        let rules = ProgressionRules::default();
        assert_eq!(rules.expected_level(0), 0);
        assert_eq!(rules.expected_level(5), 0);
        assert_eq!(rules.expected_level(6), 1);
        assert_eq!(rules.expected_level(15), 1);
        assert_eq!(rules.expected_level(16), 2);
        assert_eq!(rules.expected_level(31), 3);
        assert_eq!(rules.expected_level(1000), 7);
        assert_eq!(rules.next_threshold(9), Some(16));
        assert_eq!(rules.next_threshold(500), None);
    }

    #[test]
    fn fresh_player_matches_player_type() {
        let p = player();
        let ledger = MatchLedger::new();
        assert_eq!(effective_stats(&p, &ledger), linewoman().attributes);
        assert_eq!(effective_value(&p), 50);
        assert_eq!(actual_level(&p), 0);
        assert!(!can_level_up(&p, &ledger));
    }

    #[test]
    fn three_touchdowns_then_general_skill() {
        let mut p = player();
        let ledger = ledger_with(touchdowns(3), true);
        assert_eq!(compute_spp(&p, &ledger), 9);
        assert_eq!(expected_level(&p, &ledger), 1);
        assert!(can_level_up(&p, &ledger));

        let rules = ProgressionRules::default();
        let reward = LevelUpReward::Skill(skill(1, "Block", SkillCategory::General));
        rules.check_level_up(&p, &reward, &ledger).unwrap();
        p.level_ups.push(level_up(&p, reward));

        assert_eq!(effective_value(&p), 70);
        assert_eq!(actual_level(&p), 1);
        assert!(!can_level_up(&p, &ledger));
        assert!(effective_skills(&p).contains("Block"));
        assert!(effective_skills(&p).contains("Dodge"));
    }

    #[test]
    fn touchdowns_in_progress_do_not_count() {
        let p = player();
        let ledger = ledger_with(touchdowns(3), false);
        assert_eq!(compute_spp(&p, &ledger), 0);
        assert!(!can_level_up(&p, &ledger));
    }

    #[test]
    fn gate_reopens_only_past_the_next_threshold() {
        let rules = ProgressionRules::default();
        let mut p = player();
        let nine = ledger_with(touchdowns(3), true);
        assert_eq!(compute_spp(&p, &nine), 9);
        assert!(rules.can_level_up(&p, &nine));
        p.level_ups.push(level_up(&p, LevelUpReward::Stat(StatIncrease::Movement)));
        assert!(!rules.can_level_up(&p, &nine));

        let fifteen = ledger_with(touchdowns(5), true);
        assert_eq!(compute_spp(&p, &fifteen), 15);
        assert!(!rules.can_level_up(&p, &fifteen));

        let eighteen = ledger_with(touchdowns(6), true);
        assert_eq!(compute_spp(&p, &eighteen), 18);
        assert_eq!(rules.expected_level(18), 2);
        assert!(rules.can_level_up(&p, &eighteen));
    }

    #[test]
    fn double_access_skill_costs_more() {
        let mut p = player();
        let r = LevelUpReward::Skill(skill(2, "Catch", SkillCategory::Agility));
        p.level_ups.push(level_up(&p, r));
        assert_eq!(effective_value(&p), 80);
    }

    #[test]
    fn stat_increases_add_value_and_modifiers() {
        let mut p = player();
        p.level_ups
            .push(level_up(&p, LevelUpReward::Stat(StatIncrease::Strength)));
        p.level_ups
            .push(level_up(&p, LevelUpReward::Stat(StatIncrease::Movement)));
        assert_eq!(effective_value(&p), 50 + 50 + 30);
        let stats = effective_stats(&p, &MatchLedger::new());
        assert_eq!(stats, Attributes::new(7, 4, 3, 7));
    }

    #[test]
    fn injuries_reduce_stats_once_completed() {
        let p = player();
        let neck = InjuryType {
            id: InjuryTypeId(15),
            name: "Broken Neck".into(),
            niggling: false,
            modifier: Attributes::new(0, 0, -1, 0),
            dead: false,
            description: "-AG".into(),
        };
        let events = vec![
            MatchEvent::Injury {
                player: p.id,
                team: TEAM,
                injury: neck.clone(),
            },
            MatchEvent::Injury {
                player: p.id,
                team: TEAM,
                injury: neck.clone(),
            },
            MatchEvent::Injury {
                player: p.id,
                team: TEAM,
                injury: neck,
            },
            MatchEvent::Injury {
                player: p.id,
                team: TEAM,
                injury: InjuryType {
                    id: InjuryTypeId(13),
                    name: "Serious Concussion".into(),
                    niggling: false,
                    modifier: Attributes::new(0, 0, 0, -1),
                    dead: false,
                    description: "-AV".into(),
                },
            },
        ];
        let pending = ledger_with(events.clone(), false);
        assert_eq!(effective_stats(&p, &pending), Attributes::new(6, 3, 3, 7));

        let done = ledger_with(events, true);
        assert_eq!(effective_stats(&p, &done), Attributes::new(6, 3, 0, 6));

        let floored = ProgressionRules {
            attribute_policy: AttributePolicy::Floor(1),
            ..ProgressionRules::default()
        };
        assert_eq!(
            floored.effective_stats(&p, &done),
            Attributes::new(6, 3, 1, 6)
        );
    }

    #[test]
    fn level_up_outside_access_is_rejected() {
        let p = player();
        let ledger = ledger_with(touchdowns(2), true);
        let rules = ProgressionRules::default();
        let mutation = LevelUpReward::Skill(skill(3, "Claw", SkillCategory::Mutation));
        assert!(matches!(
            rules.check_level_up(&p, &mutation, &ledger),
            Err(LeagueError::InvalidChoice(_))
        ));
        let owned = LevelUpReward::Skill(skill(4, "Dodge", SkillCategory::Agility));
        assert!(matches!(
            rules.check_level_up(&p, &owned, &ledger),
            Err(LeagueError::InvalidChoice(_))
        ));
    }

    #[test]
    fn level_up_without_spp_is_rejected() {
        let p = player();
        let rules = ProgressionRules::default();
        let stat = LevelUpReward::Stat(StatIncrease::Agility);
        assert!(matches!(
            rules.check_level_up(&p, &stat, &MatchLedger::new()),
            Err(LeagueError::InvalidState(_))
        ));
    }

    #[test]
    fn retired_players_cannot_level() {
        let mut p = player();
        p.status = PlayerStatus::Retired;
        p.team_id = None;
        let ledger = ledger_with(touchdowns(2), true);
        let stat = LevelUpReward::Stat(StatIncrease::Agility);
        assert!(ProgressionRules::default()
            .check_level_up(&p, &stat, &ledger)
            .is_err());
    }

    #[test]
    fn report_collects_everything() {
        let p = player();
        let mut events = touchdowns(2);
        events.push(MatchEvent::Mvp {
            player: p.id,
            team: TEAM,
        });
        let ledger = ledger_with(events, true);
        let report = ProgressionRules::default().report(&p, &ledger);
        assert_eq!(report.spp, 11);
        assert_eq!(report.career.mvps, 1);
        assert_eq!(report.expected_level, 1);
        assert!(report.can_level_up);
        assert_eq!(report.next_threshold, Some(16));
        assert_eq!(report.value, 50);
    }

    #[test]
    fn rules_validation() {
        assert!(ProgressionRules::default().validate().is_ok());
        let bad = ProgressionRules {
            level_thresholds: vec![0, 6, 6],
            ..ProgressionRules::default()
        };
        assert!(bad.validate().is_err());
        let no_zero = ProgressionRules {
            level_thresholds: vec![1, 6],
            ..ProgressionRules::default()
        };
        assert!(no_zero.validate().is_err());
    }

    fn any_reward() -> impl Strategy<Value = LevelUpReward> {
        prop_oneof![
            (0usize..6).prop_map(|i| LevelUpReward::Skill(skill(
                i as i64,
                "Any",
                SkillCategory::ALL[i]
            ))),
            (0usize..4).prop_map(|i| LevelUpReward::Stat(StatIncrease::ALL[i])),
        ]
    }

    proptest! {
        #[test]
        fn value_never_drops_below_price(rewards in proptest::collection::vec(any_reward(), 0..10)) {
            let mut p = player();
            let mut last = effective_value(&p);
            prop_assert_eq!(last, 50);
            for r in rewards {
                p.level_ups.push(level_up(&p, r));
                let v = effective_value(&p);
                prop_assert!(v >= last);
                prop_assert!(v >= p.base_value);
                last = v;
            }
        }

        #[test]
        fn expected_level_is_monotonic(a in 0u32..300, b in 0u32..300) {
            let rules = ProgressionRules::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(rules.expected_level(lo) <= rules.expected_level(hi));
        }

        #[test]
        fn taking_the_level_closes_the_gate(tds in 0usize..40) {
            let mut p = player();
            let ledger = ledger_with(touchdowns(tds), true);
            let rules = ProgressionRules::default();
            let expected = rules.expected_level(compute_spp(&p, &ledger));
            while actual_level(&p) < expected {
                prop_assert!(rules.can_level_up(&p, &ledger));
                p.level_ups.push(level_up(&p, LevelUpReward::Stat(StatIncrease::Armour)));
            }
            prop_assert!(!rules.can_level_up(&p, &ledger));
        }
    }
}
