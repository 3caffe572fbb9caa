//! `league.yaml`: where the database lives and how progression is tuned.

use anyhow::{Context, Result};
use league_rules::ProgressionRules;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeagueConfig {
    pub database_url: String,
    /// `level_thresholds` and `attribute_policy` at the top level.
    #[serde(flatten)]
    pub rules: ProgressionRules,
}

impl Default for LeagueConfig {
    fn default() -> Self {
        Self {
            database_url: persistence::default_sqlite_url().to_string(),
            rules: ProgressionRules::default(),
        }
    }
}

impl LeagueConfig {
    pub fn parse(text: &str) -> Result<Self> {
        let cfg: LeagueConfig = serde_yaml::from_str(text).context("malformed config yaml")?;
        cfg.rules.validate()?;
        Ok(cfg)
    }

    /// Defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                let text =
                    fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?;
                Self::parse(&text).with_context(|| format!("loading {}", p.display()))
            }
            None => Ok(Self::default()),
        }
    }

    /// `--db` wins over the file.
    pub fn with_database(mut self, url: Option<String>) -> Self {
        if let Some(url) = url {
            self.database_url = url;
        }
        self
    }
}

/// Create the directory holding a file-backed SQLite database.
pub fn ensure_parent_dir(url: &str) -> Result<()> {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .map(|p| p.split('?').next().unwrap_or(p));
    if let Some(path) = path.filter(|p| !p.is_empty() && !p.starts_with(":memory:")) {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use league_rules::{AttributePolicy, DEFAULT_LEVEL_THRESHOLDS};

    #[test]
    fn empty_file_means_defaults() {
        let cfg = LeagueConfig::parse("{}").unwrap();
        assert_eq!(cfg, LeagueConfig::default());
        assert_eq!(cfg.rules.level_thresholds, DEFAULT_LEVEL_THRESHOLDS.to_vec());
        assert!(cfg.database_url.starts_with("sqlite://"));
    }

    #[test]
    fn rules_sit_at_top_level() {
        let yaml = r#"
database_url: "sqlite://./tmp/test.db"
level_thresholds: [0, 5, 15, 30]
attribute_policy: { policy: floor, min: 1 }
"#;
        let cfg = LeagueConfig::parse(yaml).unwrap();
        assert_eq!(cfg.database_url, "sqlite://./tmp/test.db");
        assert_eq!(cfg.rules.level_thresholds, vec![0, 5, 15, 30]);
        assert_eq!(cfg.rules.attribute_policy, AttributePolicy::Floor(1));
    }

    #[test]
    fn thresholds_must_ascend() {
        let err = LeagueConfig::parse("level_thresholds: [0, 10, 5]").unwrap_err();
        assert!(format!("{err:#}").contains("invalid level thresholds"));
    }

    #[test]
    fn db_flag_overrides_file() {
        let cfg = LeagueConfig::default().with_database(Some("sqlite::memory:".into()));
        assert_eq!(cfg.database_url, "sqlite::memory:");
        let kept = cfg.clone().with_database(None);
        assert_eq!(kept, cfg);
    }

    #[test]
    fn memory_urls_need_no_directory() {
        ensure_parent_dir("sqlite::memory:").unwrap();
    }
}
