//! Reference data: factions, roster slots, skills, stat increases and injuries.
//!
//! Everything here is immutable once seeded. Players snapshot what they need
//! from a [`PlayerType`] when they are hired, so later catalog edits never
//! reach existing players.

use crate::{FactionId, InjuryTypeId, PlayerTypeId, SkillId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;
use thiserror::Error;

/// Validation errors for reference data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Letter outside the G/A/S/P/M/E alphabet.
    #[error("unknown skill category '{0}'")]
    UnknownCategory(String),
    /// Required name field is blank.
    #[error("{0} name must not be empty")]
    EmptyName(&'static str),
    /// Price or cost must be non-negative.
    #[error("{field} must be non-negative, got {value}")]
    Negative { field: &'static str, value: i64 },
    /// A roster slot must allow at least one player.
    #[error("max quantity must be at least 1")]
    ZeroQuantity,
    /// Base attributes must be strictly positive.
    #[error("base attributes must be positive: {0}")]
    NonPositiveAttributes(Attributes),
    /// Same name used twice within one catalog.
    #[error("duplicate {kind}: {name}")]
    Duplicate { kind: &'static str, name: String },
    /// Cross reference to an entry that is not in the catalog.
    #[error("unknown {kind}: {name}")]
    UnknownReference { kind: &'static str, name: String },
    /// Unrecognised enum text.
    #[error("unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },
}

/// The four player characteristics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attributes {
    /// MA
    pub movement: i32,
    /// ST
    pub strength: i32,
    /// AG
    pub agility: i32,
    /// AV
    pub armour: i32,
}

impl Attributes {
    pub const ZERO: Attributes = Attributes::new(0, 0, 0, 0);

    pub const fn new(movement: i32, strength: i32, agility: i32, armour: i32) -> Self {
        Self {
            movement,
            strength,
            agility,
            armour,
        }
    }

    /// Raise every characteristic to at least `min`.
    pub fn floored(self, min: i32) -> Self {
        Self {
            movement: self.movement.max(min),
            strength: self.strength.max(min),
            agility: self.agility.max(min),
            armour: self.armour.max(min),
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    fn all_positive(&self) -> bool {
        self.movement > 0 && self.strength > 0 && self.agility > 0 && self.armour > 0
    }
}

impl Add for Attributes {
    type Output = Attributes;

    fn add(self, rhs: Attributes) -> Attributes {
        Attributes {
            movement: self.movement + rhs.movement,
            strength: self.strength + rhs.strength,
            agility: self.agility + rhs.agility,
            armour: self.armour + rhs.armour,
        }
    }
}

impl AddAssign for Attributes {
    fn add_assign(&mut self, rhs: Attributes) {
        *self = *self + rhs;
    }
}

impl Sum for Attributes {
    fn sum<I: Iterator<Item = Attributes>>(iter: I) -> Attributes {
        iter.fold(Attributes::ZERO, |acc, a| acc + a)
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MA {} ST {} AG {} AV {}",
            self.movement, self.strength, self.agility, self.armour
        )
    }
}

/// Skill categories. The letter is what roster sheets use in access strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SkillCategory {
    General,
    Agility,
    Strength,
    Passing,
    Mutation,
    Extraordinary,
}

impl SkillCategory {
    pub const ALL: [SkillCategory; 6] = [
        SkillCategory::General,
        SkillCategory::Agility,
        SkillCategory::Strength,
        SkillCategory::Passing,
        SkillCategory::Mutation,
        SkillCategory::Extraordinary,
    ];

    pub fn letter(self) -> char {
        match self {
            SkillCategory::General => 'G',
            SkillCategory::Agility => 'A',
            SkillCategory::Strength => 'S',
            SkillCategory::Passing => 'P',
            SkillCategory::Mutation => 'M',
            SkillCategory::Extraordinary => 'E',
        }
    }

    pub fn from_letter(c: char) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|cat| cat.letter() == c.to_ascii_uppercase())
    }

    pub fn name(self) -> &'static str {
        match self {
            SkillCategory::General => "General",
            SkillCategory::Agility => "Agility",
            SkillCategory::Strength => "Strength",
            SkillCategory::Passing => "Passing",
            SkillCategory::Mutation => "Mutation",
            SkillCategory::Extraordinary => "Extraordinary",
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for SkillCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SkillCategory {
    type Err = ValidationError;

    /// Accepts either the single letter or the full name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        let mut chars = t.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Self::from_letter(c).ok_or_else(|| ValidationError::UnknownCategory(t.into()));
        }
        Self::ALL
            .into_iter()
            .find(|cat| cat.name().eq_ignore_ascii_case(t))
            .ok_or_else(|| ValidationError::UnknownCategory(t.into()))
    }
}

/// Set of skill categories a player may draw from, e.g. "GS" or "APM".
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SkillAccess(u8);

impl SkillAccess {
    pub const NONE: SkillAccess = SkillAccess(0);

    pub fn of(categories: &[SkillCategory]) -> Self {
        let mut access = Self::NONE;
        for &c in categories {
            access.insert(c);
        }
        access
    }

    pub fn insert(&mut self, category: SkillCategory) {
        self.0 |= category.bit();
    }

    pub fn contains(self, category: SkillCategory) -> bool {
        self.0 & category.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn union(self, other: SkillAccess) -> SkillAccess {
        SkillAccess(self.0 | other.0)
    }

    pub fn iter(self) -> impl Iterator<Item = SkillCategory> {
        SkillCategory::ALL
            .into_iter()
            .filter(move |&c| self.contains(c))
    }
}

impl FromStr for SkillAccess {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut access = SkillAccess::NONE;
        for c in s.chars() {
            if c.is_whitespace() || c == ',' || c == '-' {
                continue;
            }
            let cat = SkillCategory::from_letter(c)
                .ok_or_else(|| ValidationError::UnknownCategory(c.to_string()))?;
            access.insert(cat);
        }
        Ok(access)
    }
}

impl TryFrom<String> for SkillAccess {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SkillAccess> for String {
    fn from(access: SkillAccess) -> String {
        access.to_string()
    }
}

impl fmt::Display for SkillAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("-");
        }
        for c in self.iter() {
            write!(f, "{}", c.letter())?;
        }
        Ok(())
    }
}

impl fmt::Debug for SkillAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SkillAccess").field(&self.to_string()).finish()
    }
}

/// A team archetype with its reroll price.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faction {
    pub id: FactionId,
    pub name: String,
    /// Cost of one team reroll, in thousands of gold.
    pub reroll_cost: i64,
    /// Whether teams of this faction may hire an apothecary.
    pub apothecary_available: bool,
    /// Optional icon asset reference.
    pub icon: Option<String>,
}

/// A roster slot: the position a faction can hire and what it starts with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerType {
    pub id: PlayerTypeId,
    pub faction_id: FactionId,
    pub name: String,
    pub position: String,
    /// How many of this position a team may field.
    pub max_quantity: u32,
    /// Hiring price in thousands of gold.
    pub price: i64,
    pub attributes: Attributes,
    pub starting_skills: Vec<String>,
    pub normal_access: SkillAccess,
    pub double_access: SkillAccess,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Skill {
    pub id: SkillId,
    pub name: String,
    pub category: SkillCategory,
    pub description: String,
}

/// Characteristic increase a player can take instead of a skill.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatIncrease {
    Movement,
    Strength,
    Agility,
    Armour,
}

impl StatIncrease {
    pub const ALL: [StatIncrease; 4] = [
        StatIncrease::Movement,
        StatIncrease::Strength,
        StatIncrease::Agility,
        StatIncrease::Armour,
    ];

    /// Characteristic change granted.
    pub fn modifier(self) -> Attributes {
        match self {
            StatIncrease::Movement => Attributes::new(1, 0, 0, 0),
            StatIncrease::Strength => Attributes::new(0, 1, 0, 0),
            StatIncrease::Agility => Attributes::new(0, 0, 1, 0),
            StatIncrease::Armour => Attributes::new(0, 0, 0, 1),
        }
    }

    /// Player value added, in thousands of gold.
    pub fn value(self) -> i64 {
        match self {
            StatIncrease::Movement | StatIncrease::Armour => 30,
            StatIncrease::Agility => 40,
            StatIncrease::Strength => 50,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatIncrease::Movement => "movement",
            StatIncrease::Strength => "strength",
            StatIncrease::Agility => "agility",
            StatIncrease::Armour => "armour",
        }
    }
}

impl fmt::Display for StatIncrease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StatIncrease::Movement => "+MA",
            StatIncrease::Strength => "+ST",
            StatIncrease::Agility => "+AG",
            StatIncrease::Armour => "+AV",
        };
        f.write_str(label)
    }
}

impl FromStr for StatIncrease {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "movement" | "ma" | "+ma" => Ok(StatIncrease::Movement),
            "strength" | "st" | "+st" => Ok(StatIncrease::Strength),
            "agility" | "ag" | "+ag" => Ok(StatIncrease::Agility),
            "armour" | "armor" | "av" | "+av" => Ok(StatIncrease::Armour),
            other => Err(ValidationError::UnknownVariant {
                kind: "stat increase",
                value: other.to_string(),
            }),
        }
    }
}

/// Lasting injury outcome that can be attached to a player in a match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjuryType {
    pub id: InjuryTypeId,
    pub name: String,
    /// Tracked, but carries no characteristic change here.
    pub niggling: bool,
    /// Signed characteristic change applied for every such injury.
    pub modifier: Attributes,
    pub dead: bool,
    pub description: String,
}

/// Split a roster-sheet skill list ("Dodge, Catch" or "-") into names.
pub fn parse_skill_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty() && *name != "-" && !name.eq_ignore_ascii_case("none"))
        .map(str::to_string)
        .collect()
}

/// Inverse of [`parse_skill_list`].
pub fn format_skill_list<S: AsRef<str>>(skills: &[S]) -> String {
    if skills.is_empty() {
        return "-".to_string();
    }
    skills
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validate a faction.
pub fn validate_faction(f: &Faction) -> Result<(), ValidationError> {
    if f.name.trim().is_empty() {
        return Err(ValidationError::EmptyName("faction"));
    }
    if f.reroll_cost < 0 {
        return Err(ValidationError::Negative {
            field: "reroll cost",
            value: f.reroll_cost,
        });
    }
    Ok(())
}

/// Validate a roster slot.
pub fn validate_player_type(p: &PlayerType) -> Result<(), ValidationError> {
    if p.name.trim().is_empty() || p.position.trim().is_empty() {
        return Err(ValidationError::EmptyName("player type"));
    }
    if p.max_quantity == 0 {
        return Err(ValidationError::ZeroQuantity);
    }
    if p.price < 0 {
        return Err(ValidationError::Negative {
            field: "price",
            value: p.price,
        });
    }
    if !p.attributes.all_positive() {
        return Err(ValidationError::NonPositiveAttributes(p.attributes));
    }
    Ok(())
}

/// Validate a skill.
pub fn validate_skill(s: &Skill) -> Result<(), ValidationError> {
    if s.name.trim().is_empty() {
        return Err(ValidationError::EmptyName("skill"));
    }
    Ok(())
}

/// Validate an injury type.
pub fn validate_injury_type(i: &InjuryType) -> Result<(), ValidationError> {
    if i.name.trim().is_empty() {
        return Err(ValidationError::EmptyName("injury type"));
    }
    Ok(())
}

/// All reference data as one unit, as loaded from a seed file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub factions: Vec<Faction>,
    pub player_types: Vec<PlayerType>,
    pub skills: Vec<Skill>,
    pub injury_types: Vec<InjuryType>,
}

impl Catalog {
    pub fn faction(&self, id: FactionId) -> Option<&Faction> {
        self.factions.iter().find(|f| f.id == id)
    }

    pub fn skill_by_name(&self, name: &str) -> Option<&Skill> {
        self.skills.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Validate every entry, uniqueness of names, and cross references.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut names = BTreeSet::new();
        for f in &self.factions {
            validate_faction(f)?;
            if !names.insert(f.name.as_str()) {
                return Err(ValidationError::Duplicate {
                    kind: "faction",
                    name: f.name.clone(),
                });
            }
        }

        let mut names = BTreeSet::new();
        for p in &self.player_types {
            validate_player_type(p)?;
            if self.faction(p.faction_id).is_none() {
                return Err(ValidationError::UnknownReference {
                    kind: "faction",
                    name: p.faction_id.to_string(),
                });
            }
            if !names.insert(p.name.as_str()) {
                return Err(ValidationError::Duplicate {
                    kind: "player type",
                    name: p.name.clone(),
                });
            }
        }

        let mut names = BTreeSet::new();
        for s in &self.skills {
            validate_skill(s)?;
            if !names.insert(s.name.to_ascii_lowercase()) {
                return Err(ValidationError::Duplicate {
                    kind: "skill",
                    name: s.name.clone(),
                });
            }
        }

        let mut names = BTreeSet::new();
        for i in &self.injury_types {
            validate_injury_type(i)?;
            if !names.insert(i.name.as_str()) {
                return Err(ValidationError::Duplicate {
                    kind: "injury type",
                    name: i.name.clone(),
                });
            }
        }
        Ok(())
    }
}
