#![deny(warnings)]

//! `league`: command-line front end for running a league.

use anyhow::Result;
use persistence::LeagueStore;
use tracing::{info, Subscriber};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod args;
mod config;
mod run;

use args::Command;
use config::LeagueConfig;

/// `RUST_LOG`-style directives, `info` when absent or unparsable.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn subscriber(filter: EnvFilter) -> impl Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logging setup
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    subscriber(log_filter(rust_log.as_deref())).init();

    let opts = args::parse(std::env::args().skip(1))?;
    if matches!(opts.command, Command::Help | Command::Version) {
        return run::run_offline(&opts.command);
    }

    let cfg = LeagueConfig::load(opts.config.as_deref())?.with_database(opts.db);
    info!(db = %cfg.database_url, command = ?opts.command, "starting CLI");
    config::ensure_parent_dir(&cfg.database_url)?;
    let store = LeagueStore::open(&cfg.database_url, cfg.rules).await?;
    run::ensure_seeded(&store, &opts.command).await?;
    run::run(&store, opts.command, opts.json).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn rust_log_controls_verbosity() {
        tracing::subscriber::with_default(subscriber(log_filter(Some("debug"))), || {
            assert!(tracing::enabled!(Level::DEBUG));
        });
        tracing::subscriber::with_default(subscriber(log_filter(None)), || {
            assert!(tracing::enabled!(Level::INFO));
            assert!(!tracing::enabled!(Level::DEBUG));
        });
    }

    #[test]
    fn bad_directives_fall_back_to_info() {
        tracing::subscriber::with_default(subscriber(log_filter(Some("league=loud"))), || {
            assert!(tracing::enabled!(Level::INFO));
            assert!(!tracing::enabled!(Level::DEBUG));
        });
    }
}
