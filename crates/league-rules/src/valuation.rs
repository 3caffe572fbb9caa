//! Team value and pre-match inducements.

use crate::progression::effective_value;
use league_core::{Faction, Player, Team, TeamId};
use serde::{Deserialize, Serialize};

pub const APOTHECARY_VALUE: i64 = 50;
pub const ASSISTANT_COACH_VALUE: i64 = 10;
pub const CHEERLEADER_VALUE: i64 = 10;
pub const FAN_FACTOR_VALUE: i64 = 10;

/// Values are kept in thousands of gold; inducement budgets are paid in gold.
pub const GOLD_PER_VALUE_UNIT: i64 = 1000;

/// Breakdown of a team's value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamValuation {
    pub players: i64,
    pub rerolls: i64,
    pub staff: i64,
    pub fan_factor: i64,
    pub total: i64,
}

/// Value every rostered player and add rerolls, staff and fans.
///
/// `roster` may contain players who have since left the team; only players
/// currently assigned to `team` and active are counted.
pub fn team_valuation(team: &Team, faction: &Faction, roster: &[Player]) -> TeamValuation {
    let players: i64 = roster
        .iter()
        .filter(|p| p.is_rostered_on(team.id))
        .map(effective_value)
        .sum();
    let a = &team.assets;
    let rerolls = faction.reroll_cost * i64::from(a.rerolls);
    let staff = APOTHECARY_VALUE * i64::from(a.apothecary)
        + ASSISTANT_COACH_VALUE * i64::from(a.assistant_coaches)
        + CHEERLEADER_VALUE * i64::from(a.cheerleaders);
    let fan_factor = FAN_FACTOR_VALUE * i64::from(a.fan_factor);
    TeamValuation {
        players,
        rerolls,
        staff,
        fan_factor,
        total: players + rerolls + staff + fan_factor,
    }
}

pub fn total_team_value(team: &Team, faction: &Faction, roster: &[Player]) -> i64 {
    team_valuation(team, faction, roster).total
}

/// Who gets inducements before a match, and how much.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inducement {
    /// The lower-valued team, or `None` when values are equal.
    pub inducing: Option<TeamId>,
    /// Value gap in thousands of gold.
    pub gap: i64,
    /// Gap paid out in gold.
    pub budget: i64,
}

pub fn inducement(a: (TeamId, i64), b: (TeamId, i64)) -> Inducement {
    let (inducing, gap) = match a.1.cmp(&b.1) {
        std::cmp::Ordering::Less => (Some(a.0), b.1 - a.1),
        std::cmp::Ordering::Greater => (Some(b.0), a.1 - b.1),
        std::cmp::Ordering::Equal => (None, 0),
    };
    Inducement {
        inducing,
        gap,
        budget: gap * GOLD_PER_VALUE_UNIT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use league_core::*;
    use proptest::prelude::*;

    fn humans() -> Faction {
        Faction {
            id: FactionId(10),
            name: "Humans".into(),
            reroll_cost: 50,
            apothecary_available: true,
            icon: None,
        }
    }

    fn team(assets: TeamAssets) -> Team {
        Team {
            id: TeamId(1),
            name: "Reikland Reavers".into(),
            faction_id: FactionId(10),
            coach: "Griff".into(),
            league_id: None,
            assets,
        }
    }

    fn lineman(id: i64, team_id: TeamId) -> Player {
        let pt = PlayerType {
            id: PlayerTypeId(1),
            faction_id: FactionId(10),
            name: "HumanLineman".into(),
            position: "Lineman".into(),
            max_quantity: 16,
            price: 50,
            attributes: Attributes::new(6, 3, 3, 8),
            starting_skills: vec![],
            normal_access: "G".parse().unwrap(),
            double_access: "ASP".parse().unwrap(),
        };
        Player::hire(PlayerId(id), team_id, &pt, format!("Lineman {id}"), id as u32)
    }

    #[test]
    fn assets_are_priced() {
        let t = team(TeamAssets {
            rerolls: 3,
            apothecary: true,
            assistant_coaches: 2,
            cheerleaders: 1,
            fan_factor: 4,
            treasury: 120,
        });
        let roster = vec![lineman(1, t.id), lineman(2, t.id)];
        let v = team_valuation(&t, &humans(), &roster);
        assert_eq!(v.players, 100);
        assert_eq!(v.rerolls, 150);
        assert_eq!(v.staff, 50 + 20 + 10);
        assert_eq!(v.fan_factor, 40);
        assert_eq!(v.total, 100 + 150 + 80 + 40);
    }

    #[test]
    fn departed_players_are_not_counted() {
        let t = team(TeamAssets::default());
        let mut retired = lineman(2, t.id);
        retired.status = PlayerStatus::Retired;
        retired.team_id = None;
        let elsewhere = lineman(3, TeamId(99));
        let roster = vec![lineman(1, t.id), retired, elsewhere];
        assert_eq!(total_team_value(&t, &humans(), &roster), 50);
    }

    #[test]
    fn treasury_is_not_team_value() {
        let poor = team(TeamAssets::default());
        let rich = team(TeamAssets {
            treasury: 1_000,
            ..TeamAssets::default()
        });
        assert_eq!(
            total_team_value(&poor, &humans(), &[]),
            total_team_value(&rich, &humans(), &[])
        );
    }

    #[test]
    fn lower_team_induces_the_gap() {
        let i = inducement((TeamId(1), 100), (TeamId(2), 120));
        assert_eq!(i.inducing, Some(TeamId(1)));
        assert_eq!(i.gap, 20);
        assert_eq!(i.budget, 20_000);
        let j = inducement((TeamId(2), 120), (TeamId(1), 100));
        assert_eq!(j, i);
    }

    #[test]
    fn equal_values_induce_nothing() {
        let i = inducement((TeamId(1), 110), (TeamId(2), 110));
        assert_eq!(i.inducing, None);
        assert_eq!(i.gap, 0);
        assert_eq!(i.budget, 0);
    }

    proptest! {
        #[test]
        fn gap_is_absolute_difference(a in 0i64..3000, b in 0i64..3000) {
            let i = inducement((TeamId(1), a), (TeamId(2), b));
            prop_assert_eq!(i.gap, (a - b).abs());
            prop_assert_eq!(i.inducing.is_none(), a == b);
        }
    }
}
