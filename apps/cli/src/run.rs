//! Execute a parsed command against the store and print the outcome.

use crate::args::{ChoiceArg, Command, EventArg, USAGE};
use anyhow::{anyhow, bail, Context, Result};
use league_core::*;
use league_rules::PlayerReport;
use persistence::{LeagueStore, MatchSummary};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// JSON when asked for, otherwise the human rendering.
fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce(&T) -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", human(value));
    }
    Ok(())
}

/// Numeric id, or a case-insensitive name match.
fn lookup<T>(
    items: &[T],
    key: &str,
    what: &str,
    id: impl Fn(&T) -> i64,
    name: impl Fn(&T) -> &str,
) -> Result<i64> {
    if let Ok(n) = key.parse::<i64>() {
        return Ok(n);
    }
    items
        .iter()
        .find(|i| name(*i).eq_ignore_ascii_case(key.trim()))
        .map(id)
        .ok_or_else(|| anyhow!("no {what} named '{key}'"))
}

fn team_line(t: &Team) -> String {
    let a = &t.assets;
    format!(
        "#{} {} (coach {}) rerolls {} apothecary {} assistants {} cheerleaders {} fans {} treasury {}k",
        t.id,
        t.name,
        t.coach,
        a.rerolls,
        if a.apothecary { "yes" } else { "no" },
        a.assistant_coaches,
        a.cheerleaders,
        a.fan_factor,
        a.treasury
    )
}

fn player_line(p: &Player) -> String {
    format!(
        "{:>2} {:<20} {:<12} {} [{}]{}",
        p.number,
        p.name,
        p.position,
        p.attributes,
        format_skill_list(&p.skills),
        if p.miss_next { " MNG" } else { "" }
    )
}

fn match_line(m: &Match) -> String {
    format!(
        "#{} team {} v team {} | {} | {}",
        m.id, m.team1.team_id, m.team2.team_id, m.status, m.weather
    )
}

fn report_text(r: &PlayerReport) -> String {
    let c = &r.career;
    let skills: Vec<&str> = r.skills.iter().map(String::as_str).collect();
    format!(
        "#{} {} ({}) {}{}\n  {} | {}\n  CP {} TD {} INT {} CAS {} MVP {} | SPP {} | level {} of {}{}{}\n  value {}k",
        r.number,
        r.name,
        r.position,
        r.status,
        if r.miss_next { ", misses next game" } else { "" },
        r.attributes,
        skills.join(", "),
        c.completions,
        c.touchdowns,
        c.interceptions,
        c.casualties,
        c.mvps,
        r.spp,
        r.actual_level,
        r.expected_level,
        r.next_threshold
            .map(|t| format!(" (next at {t})"))
            .unwrap_or_default(),
        if r.can_level_up { " | level-up available" } else { "" },
        r.value
    )
}

fn summary_text(s: &MatchSummary, team1: &Team, team2: &Team) -> String {
    let m = &s.fixture;
    let result = match s.result {
        MatchResult::Winner(t) if t == team1.id => format!("{} wins", team1.name),
        MatchResult::Winner(_) => format!("{} wins", team2.name),
        MatchResult::Draw => "draw".to_string(),
    };
    let mut out = format!(
        "{}\n{} {} - {} {} | {result}",
        match_line(m),
        team1.name,
        s.score.team1,
        s.score.team2,
        team2.name
    );
    for (kind, sides) in &s.events {
        if sides.team1.is_empty() && sides.team2.is_empty() {
            continue;
        }
        out.push_str(&format!(
            "\n  {kind}: {} / {}",
            sides.team1.len(),
            sides.team2.len()
        ));
    }
    out
}

async fn seed(store: &LeagueStore, path: Option<&Path>, json: bool) -> Result<()> {
    let catalog = match path {
        Some(p) => seed_data::load_from_path(p)?,
        None => seed_data::load_default()?,
    };
    let report = store.seed_catalog(&catalog).await?;
    emit(json, &report, |r| {
        format!(
            "seeded {} factions, {} player types, {} skills, {} injuries",
            r.factions, r.player_types, r.skills, r.injury_types
        )
    })
}

/// Commands that never touch the database.
pub fn run_offline(command: &Command) -> Result<()> {
    match command {
        Command::Version => println!(
            "league {} ({} {})",
            env!("CARGO_PKG_VERSION"),
            env!("GIT_SHA"),
            env!("BUILD_DATE")
        ),
        _ => println!("{USAGE}"),
    }
    Ok(())
}

pub async fn run(store: &LeagueStore, command: Command, json: bool) -> Result<()> {
    match command {
        Command::Help | Command::Version => run_offline(&command)?,
        Command::Seed { path } => seed(store, path.as_deref(), json).await?,

        Command::LeagueCreate { name, managers } => {
            let league = store.create_league(&name, managers).await?;
            emit(json, &league, |l| format!("created league #{} {}", l.id, l.name))?;
        }
        Command::LeagueList => {
            let leagues = store.leagues().await?;
            emit(json, &leagues, |ls| {
                ls.iter()
                    .map(|l| {
                        format!(
                            "{} #{} {} [{}]",
                            if l.current { "*" } else { " " },
                            l.id,
                            l.name,
                            l.managers.join(", ")
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
        }
        Command::LeagueCurrent { set } => {
            let current = match set {
                Some(id) => Some(store.set_current_league(id).await?),
                None => store.current_league().await?,
            };
            emit(json, &current, |c| match c {
                Some(l) => format!("current league #{} {}", l.id, l.name),
                None => "no current league".to_string(),
            })?;
        }
        Command::LeagueJoin { league, team } => {
            let t = store.join_league(team, league).await?;
            emit(json, &t, |t| format!("{} joined league #{league}", t.name))?;
        }

        Command::TeamCreate {
            name,
            coach,
            faction,
        } => {
            let catalog = store.catalog().await?;
            let faction = FactionId(lookup(
                &catalog.factions,
                &faction,
                "faction",
                |f| f.id.0,
                |f| &f.name,
            )?);
            let team = store.create_team(&name, &coach, faction).await?;
            emit(json, &team, team_line)?;
        }
        Command::TeamShow(id) => {
            let team = store.team(id).await?;
            emit(json, &team, team_line)?;
        }
        Command::TeamAssets { team, changes } => {
            let current = store.team(team).await?;
            let updated = store
                .update_team_assets(team, changes.apply(current.assets))
                .await?;
            emit(json, &updated, team_line)?;
        }
        Command::TeamRoster(team) => {
            let roster = store.roster(team).await?;
            emit(json, &roster, |r| {
                r.iter().map(player_line).collect::<Vec<_>>().join("\n")
            })?;
        }
        Command::TeamHireable(team) => {
            let types = store.hireable_player_types(team).await?;
            emit(json, &types, |ts| {
                ts.iter()
                    .map(|pt| {
                        format!(
                            "{:<20} {:<12} {}k  {} [{}] max {}",
                            pt.name,
                            pt.position,
                            pt.price,
                            pt.attributes,
                            format_skill_list(&pt.starting_skills),
                            pt.max_quantity
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
        }
        Command::TeamValue(team) => {
            let v = store.team_valuation(team).await?;
            emit(json, &v, |v| {
                format!(
                    "players {}k + rerolls {}k + staff {}k + fans {}k = {}k",
                    v.players, v.rerolls, v.staff, v.fan_factor, v.total
                )
            })?;
        }

        Command::PlayerHire {
            team,
            player_type,
            name,
        } => {
            let catalog = store.catalog().await?;
            let pt = PlayerTypeId(lookup(
                &catalog.player_types,
                &player_type,
                "player type",
                |p| p.id.0,
                |p| &p.name,
            )?);
            let player = store.add_player_to_team(team, pt, &name).await?;
            emit(json, &player, player_line)?;
        }
        Command::PlayerRemove { player, status } => {
            let p = store.retire_or_kill_player(player, status).await?;
            emit(json, &p, |p| format!("{} is now {}", p.name, p.status))?;
        }
        Command::PlayerEdit { player, edit } => {
            let p = store.modify_player(player, edit).await?;
            emit(json, &p, player_line)?;
        }
        Command::PlayerReport(player) => {
            let report = store.player_report(player).await?;
            emit(json, &report, report_text)?;
        }
        Command::PlayerLevelUp { player, choice } => {
            let choice = match choice {
                ChoiceArg::Stat(stat) => LevelUpChoice::Stat(stat),
                ChoiceArg::Skill(name) => {
                    let catalog = store.catalog().await?;
                    let skill = catalog
                        .skill_by_name(&name)
                        .with_context(|| format!("no skill named '{name}'"))?;
                    LevelUpChoice::Skill(skill.id)
                }
            };
            let level_up = store.grant_level_up(player, choice).await?;
            emit(json, &level_up, |l| {
                let reward = match &l.reward {
                    LevelUpReward::Skill(s) => s.name.clone(),
                    LevelUpReward::Stat(s) => s.to_string(),
                };
                format!("player {} reached level {}: {reward}", l.player_id, l.level)
            })?;
        }

        Command::MatchSchedule {
            league,
            team1,
            team2,
        } => {
            let m = store.schedule_match(league, team1, team2).await?;
            emit(json, &m, match_line)?;
        }
        Command::MatchTransition { id, transition } => {
            let m = store.transition_match(id, transition).await?;
            emit(json, &m, match_line)?;
        }
        Command::MatchCancel(id) => {
            store.cancel_match(id).await?;
            emit(json, &id, |id| format!("match {id} cancelled"))?;
        }
        Command::MatchList { league, status } => {
            let matches = store.matches(league, status).await?;
            emit(json, &matches, |ms| {
                ms.iter().map(match_line).collect::<Vec<_>>().join("\n")
            })?;
        }
        Command::MatchSummary(id) => {
            let summary = store.match_summary(id).await?;
            let team1 = store.team(summary.fixture.team1.team_id).await?;
            let team2 = store.team(summary.fixture.team2.team_id).await?;
            emit(json, &summary, |s| summary_text(s, &team1, &team2))?;
        }
        Command::Inducement(id) => {
            let owed = store.inducement(id).await?;
            emit(json, &owed, |o| match o.inducing {
                Some(team) => format!(
                    "team {team} is inducing: gap {}k, budget {} gold",
                    o.gap, o.budget
                ),
                None => "teams are level, no inducements".to_string(),
            })?;
        }
        Command::Record { match_id, event } => {
            let entry = match event {
                EventArg::Event(event) => store.record_event(match_id, event).await?,
                EventArg::Injury {
                    player,
                    team,
                    injury,
                } => {
                    let catalog = store.catalog().await?;
                    let injury = InjuryTypeId(lookup(
                        &catalog.injury_types,
                        &injury,
                        "injury",
                        |i| i.id.0,
                        |i| &i.name,
                    )?);
                    store.record_injury(match_id, player, team, injury).await?
                }
            };
            emit(json, &entry, |e| {
                format!("recorded {} #{} in match {}", e.event.kind(), e.id, e.match_id)
            })?;
        }

        Command::Standings(league) => {
            let table = store.standings(league).await?;
            emit(json, &table, |rows| {
                let mut out = format!(
                    "{:<24} {:>2} {:>2} {:>2} {:>3} {:>4}",
                    "team", "W", "D", "L", "Pts", "TD+"
                );
                for r in rows {
                    out.push_str(&format!(
                        "\n{:<24} {:>2} {:>2} {:>2} {:>3} {:>4}",
                        r.team_name, r.wins, r.draws, r.losses, r.points, r.tds_scored
                    ));
                }
                out
            })?;
        }
    }
    info!("done");
    Ok(())
}

/// Refuse to run anything but `seed` against an empty catalog.
pub async fn ensure_seeded(store: &LeagueStore, command: &Command) -> Result<()> {
    if matches!(command, Command::Seed { .. } | Command::Help | Command::Version) {
        return Ok(());
    }
    if store.catalog().await?.factions.is_empty() {
        bail!("no reference data yet, run `league seed` first");
    }
    Ok(())
}
