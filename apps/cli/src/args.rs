//! Hand-rolled argument parsing.
//!
//! `league [--config PATH] [--db URL] [--json] <group> <action> [args] [--flag value]`

use anyhow::{anyhow, bail, Context, Result};
use league_core::*;
use persistence::PlayerEdit;
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

pub const USAGE: &str = "\
usage: league [--config PATH] [--db URL] [--json] <command>

  seed [PATH]
  league create <name> [manager...] | list | current [<league>] | join <league> <team>
  team create <name> <coach> <faction> | show <team> | roster <team> | hireable <team>
  team value <team>
  team assets <team> [--rerolls N] [--apothecary BOOL] [--assistants N]
                     [--cheerleaders N] [--fans N] [--treasury N]
  player hire <team> <player-type> <name> | retire <player> | kill <player>
  player edit <player> [--name NAME] [--miss-next BOOL] | report <player>
  player level-up <player> skill <name> | stat <ma|st|ag|av>
  match schedule <league> <team1> <team2> | list <league> [status]
  match start <match> [--fame1 N] [--fame2 N] [--weather W]
  match complete <match> [--winnings1 N] [--winnings2 N] [--fans1 N] [--fans2 N]
                         [--mvp1 PLAYER] [--mvp2 PLAYER]
  match invalidate <match> | cancel <match> | summary <match> | inducement <match>
  record touchdown <match> <player> <team>
  record completion <match> <thrower> <receiver> <team>
  record casualty <match> <causer> <team> <victim> <victim-team>
  record interception <match> <interceptor> <team> <thrower> <thrower-team>
  record mvp <match> <player> <team>
  record injury <match> <player> <team> <injury>
  standings <league>
  version";

/// Staff and finance changes; unset fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetChanges {
    pub rerolls: Option<u32>,
    pub apothecary: Option<bool>,
    pub assistant_coaches: Option<u32>,
    pub cheerleaders: Option<u32>,
    pub fan_factor: Option<i32>,
    pub treasury: Option<i64>,
}

impl AssetChanges {
    pub fn apply(&self, current: TeamAssets) -> TeamAssets {
        TeamAssets {
            rerolls: self.rerolls.unwrap_or(current.rerolls),
            apothecary: self.apothecary.unwrap_or(current.apothecary),
            assistant_coaches: self.assistant_coaches.unwrap_or(current.assistant_coaches),
            cheerleaders: self.cheerleaders.unwrap_or(current.cheerleaders),
            fan_factor: self.fan_factor.unwrap_or(current.fan_factor),
            treasury: self.treasury.unwrap_or(current.treasury),
        }
    }
}

/// Level-up request before the skill name is looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoiceArg {
    Skill(String),
    Stat(StatIncrease),
}

/// Event to record; injuries are named and resolved against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventArg {
    Event(MatchEvent),
    Injury {
        player: PlayerId,
        team: TeamId,
        injury: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Version,
    Seed {
        path: Option<PathBuf>,
    },
    LeagueCreate {
        name: String,
        managers: Vec<String>,
    },
    LeagueList,
    LeagueCurrent {
        set: Option<LeagueId>,
    },
    LeagueJoin {
        league: LeagueId,
        team: TeamId,
    },
    TeamCreate {
        name: String,
        coach: String,
        faction: String,
    },
    TeamShow(TeamId),
    TeamAssets {
        team: TeamId,
        changes: AssetChanges,
    },
    TeamRoster(TeamId),
    TeamHireable(TeamId),
    TeamValue(TeamId),
    PlayerHire {
        team: TeamId,
        player_type: String,
        name: String,
    },
    PlayerRemove {
        player: PlayerId,
        status: PlayerStatus,
    },
    PlayerEdit {
        player: PlayerId,
        edit: PlayerEdit,
    },
    PlayerReport(PlayerId),
    PlayerLevelUp {
        player: PlayerId,
        choice: ChoiceArg,
    },
    MatchSchedule {
        league: LeagueId,
        team1: TeamId,
        team2: TeamId,
    },
    MatchTransition {
        id: MatchId,
        transition: MatchTransition,
    },
    MatchCancel(MatchId),
    MatchList {
        league: LeagueId,
        status: Option<MatchStatus>,
    },
    MatchSummary(MatchId),
    Inducement(MatchId),
    Record {
        match_id: MatchId,
        event: EventArg,
    },
    Standings(LeagueId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub config: Option<PathBuf>,
    pub db: Option<String>,
    pub json: bool,
    pub command: Command,
}

/// Positional words and `--flag value` pairs of one invocation.
struct Words {
    positional: Vec<String>,
    flags: HashMap<String, String>,
    next: usize,
}

impl Words {
    fn word(&mut self, what: &str) -> Result<String> {
        let w = self
            .positional
            .get(self.next)
            .cloned()
            .ok_or_else(|| anyhow!("missing <{what}>"))?;
        self.next += 1;
        Ok(w)
    }

    fn optional_word(&mut self) -> Option<String> {
        let w = self.positional.get(self.next).cloned();
        if w.is_some() {
            self.next += 1;
        }
        w
    }

    fn rest(&mut self) -> Vec<String> {
        let rest = self.positional[self.next.min(self.positional.len())..].to_vec();
        self.next = self.positional.len();
        rest
    }

    fn value<T>(&mut self, what: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let w = self.word(what)?;
        w.parse()
            .map_err(|e| anyhow!("bad <{what}> '{w}': {e}"))
    }

    fn id(&mut self, what: &str) -> Result<i64> {
        self.value(what)
    }

    fn flag<T>(&mut self, name: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.flags
            .remove(name)
            .map(|v| {
                v.parse()
                    .map_err(|e| anyhow!("bad --{name} '{v}': {e}"))
            })
            .transpose()
    }

    fn finish(self, command: Command) -> Result<Command> {
        if let Some(extra) = self.positional.get(self.next) {
            bail!("unexpected argument '{extra}'");
        }
        if let Some(flag) = self.flags.keys().next() {
            bail!("unknown flag --{flag}");
        }
        Ok(command)
    }
}

pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Options> {
    let mut positional = Vec::new();
    let mut flags = HashMap::new();
    let mut json = false;
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.strip_prefix("--") {
            Some("json") => json = true,
            Some("help") => positional.insert(0, "help".to_string()),
            Some(name) => {
                let value = it
                    .next()
                    .with_context(|| format!("--{name} needs a value"))?;
                flags.insert(name.to_string(), value);
            }
            None => positional.push(arg),
        }
    }
    let config = flags.remove("config").map(PathBuf::from);
    let db = flags.remove("db");
    let mut words = Words {
        positional,
        flags,
        next: 0,
    };
    let command = parse_command(&mut words)?;
    let command = words.finish(command)?;
    Ok(Options {
        config,
        db,
        json,
        command,
    })
}

fn parse_command(w: &mut Words) -> Result<Command> {
    let Some(group) = w.optional_word() else {
        return Ok(Command::Help);
    };
    let cmd = match group.as_str() {
        "help" => {
            w.rest();
            Command::Help
        }
        "version" => Command::Version,
        "seed" => Command::Seed {
            path: w.optional_word().map(PathBuf::from),
        },
        "standings" => Command::Standings(LeagueId(w.id("league")?)),
        "league" => match w.word("action")?.as_str() {
            "create" => Command::LeagueCreate {
                name: w.word("name")?,
                managers: w.rest(),
            },
            "list" => Command::LeagueList,
            "current" => Command::LeagueCurrent {
                set: match w.optional_word() {
                    Some(id) => Some(LeagueId(
                        id.parse().with_context(|| format!("bad <league> '{id}'"))?,
                    )),
                    None => None,
                },
            },
            "join" => Command::LeagueJoin {
                league: LeagueId(w.id("league")?),
                team: TeamId(w.id("team")?),
            },
            other => bail!("unknown league action '{other}'"),
        },
        "team" => match w.word("action")?.as_str() {
            "create" => Command::TeamCreate {
                name: w.word("name")?,
                coach: w.word("coach")?,
                faction: w.word("faction")?,
            },
            "show" => Command::TeamShow(TeamId(w.id("team")?)),
            "roster" => Command::TeamRoster(TeamId(w.id("team")?)),
            "hireable" => Command::TeamHireable(TeamId(w.id("team")?)),
            "value" => Command::TeamValue(TeamId(w.id("team")?)),
            "assets" => Command::TeamAssets {
                team: TeamId(w.id("team")?),
                changes: AssetChanges {
                    rerolls: w.flag("rerolls")?,
                    apothecary: w.flag("apothecary")?,
                    assistant_coaches: w.flag("assistants")?,
                    cheerleaders: w.flag("cheerleaders")?,
                    fan_factor: w.flag("fans")?,
                    treasury: w.flag("treasury")?,
                },
            },
            other => bail!("unknown team action '{other}'"),
        },
        "player" => match w.word("action")?.as_str() {
            "hire" => Command::PlayerHire {
                team: TeamId(w.id("team")?),
                player_type: w.word("player-type")?,
                name: w.rest().join(" "),
            },
            "retire" => Command::PlayerRemove {
                player: PlayerId(w.id("player")?),
                status: PlayerStatus::Retired,
            },
            "kill" => Command::PlayerRemove {
                player: PlayerId(w.id("player")?),
                status: PlayerStatus::Dead,
            },
            "edit" => Command::PlayerEdit {
                player: PlayerId(w.id("player")?),
                edit: PlayerEdit {
                    name: w.flag("name")?,
                    miss_next: w.flag("miss-next")?,
                },
            },
            "report" => Command::PlayerReport(PlayerId(w.id("player")?)),
            "level-up" => {
                let player = PlayerId(w.id("player")?);
                let choice = match w.word("skill|stat")?.as_str() {
                    "skill" => ChoiceArg::Skill(w.rest().join(" ")),
                    "stat" => ChoiceArg::Stat(w.value("stat")?),
                    other => bail!("level-up takes 'skill' or 'stat', not '{other}'"),
                };
                Command::PlayerLevelUp { player, choice }
            }
            other => bail!("unknown player action '{other}'"),
        },
        "match" => match w.word("action")?.as_str() {
            "schedule" => Command::MatchSchedule {
                league: LeagueId(w.id("league")?),
                team1: TeamId(w.id("team1")?),
                team2: TeamId(w.id("team2")?),
            },
            "list" => Command::MatchList {
                league: LeagueId(w.id("league")?),
                status: match w.optional_word() {
                    Some(s) => Some(s.parse()?),
                    None => None,
                },
            },
            "start" => Command::MatchTransition {
                id: MatchId(w.id("match")?),
                transition: MatchTransition::Start {
                    team1_fame: w.flag("fame1")?.unwrap_or(0),
                    team2_fame: w.flag("fame2")?.unwrap_or(0),
                    weather: w.flag("weather")?.unwrap_or_default(),
                },
            },
            "complete" => Command::MatchTransition {
                id: MatchId(w.id("match")?),
                transition: MatchTransition::Complete {
                    team1: PostMatchReport {
                        winnings: w.flag("winnings1")?.unwrap_or(0),
                        fan_factor_change: w.flag("fans1")?.unwrap_or(0),
                        mvp: w.flag::<i64>("mvp1")?.map(PlayerId),
                    },
                    team2: PostMatchReport {
                        winnings: w.flag("winnings2")?.unwrap_or(0),
                        fan_factor_change: w.flag("fans2")?.unwrap_or(0),
                        mvp: w.flag::<i64>("mvp2")?.map(PlayerId),
                    },
                },
            },
            "invalidate" => Command::MatchTransition {
                id: MatchId(w.id("match")?),
                transition: MatchTransition::Invalidate,
            },
            "cancel" => Command::MatchCancel(MatchId(w.id("match")?)),
            "summary" => Command::MatchSummary(MatchId(w.id("match")?)),
            "inducement" => Command::Inducement(MatchId(w.id("match")?)),
            other => bail!("unknown match action '{other}'"),
        },
        "record" => parse_record(w)?,
        other => bail!("unknown command '{other}'\n{USAGE}"),
    };
    Ok(cmd)
}

/// A player id followed by the id of the team they play for.
fn role(w: &mut Words, what: &str) -> Result<(PlayerId, TeamId)> {
    let player = PlayerId(w.id(what)?);
    let team = TeamId(w.id("team")?);
    Ok((player, team))
}

fn parse_record(w: &mut Words) -> Result<Command> {
    let kind = w.word("event")?;
    let match_id = MatchId(w.id("match")?);
    let event = match kind.as_str() {
        "touchdown" => {
            let (scorer, team) = role(w, "player")?;
            EventArg::Event(MatchEvent::Touchdown { scorer, team })
        }
        "completion" => {
            let thrower = PlayerId(w.id("thrower")?);
            let receiver = PlayerId(w.id("receiver")?);
            let team = TeamId(w.id("team")?);
            EventArg::Event(MatchEvent::Completion {
                thrower,
                receiver,
                team,
            })
        }
        "casualty" => {
            let (causer, causing_team) = role(w, "causer")?;
            let (victim, victim_team) = role(w, "victim")?;
            EventArg::Event(MatchEvent::Casualty {
                causer,
                causing_team,
                victim,
                victim_team,
            })
        }
        "interception" => {
            let (interceptor, intercepting_team) = role(w, "interceptor")?;
            let (thrower, throwing_team) = role(w, "thrower")?;
            EventArg::Event(MatchEvent::Interception {
                interceptor,
                intercepting_team,
                thrower,
                throwing_team,
            })
        }
        "mvp" => {
            let (player, team) = role(w, "player")?;
            EventArg::Event(MatchEvent::Mvp { player, team })
        }
        "injury" => {
            let (player, team) = role(w, "player")?;
            EventArg::Injury {
                player,
                team,
                injury: w.rest().join(" "),
            }
        }
        other => bail!("unknown event '{other}'"),
    };
    Ok(Command::Record { match_id, event })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(line: &str) -> Result<Options> {
        parse(line.split_whitespace().map(String::from))
    }

    #[test]
    fn no_arguments_prints_help() {
        assert_eq!(parse_str("").unwrap().command, Command::Help);
    }

    #[test]
    fn global_flags_anywhere() {
        let opts = parse_str("team roster 3 --json --db sqlite::memory:").unwrap();
        assert!(opts.json);
        assert_eq!(opts.db.as_deref(), Some("sqlite::memory:"));
        assert_eq!(opts.command, Command::TeamRoster(TeamId(3)));
    }

    #[test]
    fn names_may_span_words() {
        let opts = parse_str("player hire 1 AmazonLinewoman Hilda the Bold").unwrap();
        assert_eq!(
            opts.command,
            Command::PlayerHire {
                team: TeamId(1),
                player_type: "AmazonLinewoman".into(),
                name: "Hilda the Bold".into(),
            }
        );
    }

    #[test]
    fn start_defaults_to_nice_weather() {
        let opts = parse_str("match start 4 --fame1 2").unwrap();
        assert_eq!(
            opts.command,
            Command::MatchTransition {
                id: MatchId(4),
                transition: MatchTransition::Start {
                    team1_fame: 2,
                    team2_fame: 0,
                    weather: Weather::Nice,
                },
            }
        );
    }

    #[test]
    fn completion_reports_mvps() {
        let opts = parse_str("match complete 4 --winnings1 60 --mvp2 9 --fans2 -1").unwrap();
        let Command::MatchTransition {
            transition: MatchTransition::Complete { team1, team2 },
            ..
        } = opts.command
        else {
            panic!("not a completion");
        };
        assert_eq!(team1.winnings, 60);
        assert_eq!(team1.mvp, None);
        assert_eq!(team2.mvp, Some(PlayerId(9)));
        assert_eq!(team2.fan_factor_change, -1);
    }

    #[test]
    fn casualty_takes_both_roles() {
        let opts = parse_str("record casualty 1 5 2 8 3").unwrap();
        assert_eq!(
            opts.command,
            Command::Record {
                match_id: MatchId(1),
                event: EventArg::Event(MatchEvent::Casualty {
                    causer: PlayerId(5),
                    causing_team: TeamId(2),
                    victim: PlayerId(8),
                    victim_team: TeamId(3),
                }),
            }
        );
    }

    #[test]
    fn level_up_stat_and_skill() {
        let stat = parse_str("player level-up 7 stat ag").unwrap();
        assert_eq!(
            stat.command,
            Command::PlayerLevelUp {
                player: PlayerId(7),
                choice: ChoiceArg::Stat(StatIncrease::Agility),
            }
        );
        let skill = parse_str("player level-up 7 skill Sure Hands").unwrap();
        assert_eq!(
            skill.command,
            Command::PlayerLevelUp {
                player: PlayerId(7),
                choice: ChoiceArg::Skill("Sure Hands".into()),
            }
        );
    }

    #[test]
    fn asset_changes_keep_unset_fields() {
        let opts = parse_str("team assets 2 --rerolls 3 --apothecary true").unwrap();
        let Command::TeamAssets { changes, .. } = opts.command else {
            panic!("not an asset change");
        };
        let current = TeamAssets {
            treasury: 120,
            ..TeamAssets::default()
        };
        let next = changes.apply(current);
        assert_eq!(next.rerolls, 3);
        assert!(next.apothecary);
        assert_eq!(next.treasury, 120);
    }

    #[test]
    fn bad_input_is_reported() {
        assert!(parse_str("team show abc").is_err());
        assert!(parse_str("team show 1 2").is_err());
        assert!(parse_str("team show 1 --colour red").is_err());
        assert!(parse_str("match list 1 finished").is_err());
        assert!(parse_str("match start 1 --weather").is_err());
        assert!(parse_str("frobnicate").is_err());
    }
}
