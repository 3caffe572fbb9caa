#![deny(warnings)]

//! Persistence layer: SQLite schema, migrations and the league store.
//!
//! Every operation is one short transaction against the pool. Aggregates
//! (SPP, levels, values, standings) are never stored; reads load the
//! relevant slice of the match ledger and hand it to `league-rules`.

use league_core::LeagueError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::SqliteConnection;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

mod catalog;
mod matches;
mod reports;
mod roster;
mod rows;

pub use catalog::SeedReport;
pub use matches::{MatchSummary, SideEvents};
pub use roster::PlayerEdit;

use league_rules::ProgressionRules;

/// Returns the default SQLite URL used for local leagues.
pub fn default_sqlite_url() -> &'static str {
    "sqlite://./saves/league.db"
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// A league rule refused the operation.
    #[error(transparent)]
    League(#[from] LeagueError),
    /// The database itself failed.
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    /// Embedded migrations could not be applied.
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    /// A stored row could not be turned back into a domain value.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// The domain error, if this is one.
    pub fn league(&self) -> Option<&LeagueError> {
        match self {
            StoreError::League(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Open (creating if needed) and migrate a database.
pub async fn init_db(url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);
    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;
    migrate(&pool).await?;
    Ok(pool)
}

/// How long a transaction waits for another writer before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Take the database write lock as the first statement of a transaction.
///
/// Read-then-write transactions that start here queue behind one another on
/// the busy timeout instead of failing with `database is locked` on their
/// first write.
pub(crate) async fn claim_row(
    conn: &mut SqliteConnection,
    table: &'static str,
    id: i64,
) -> Result<()> {
    sqlx::query(&format!("UPDATE {table} SET id = id WHERE id = ?"))
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Run embedded migrations.
pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("database migrated");
    Ok(())
}

/// The league store. Cheap to clone; clones share the pool.
#[derive(Clone, Debug)]
pub struct LeagueStore {
    pool: SqlitePool,
    rules: ProgressionRules,
}

impl LeagueStore {
    pub fn new(pool: SqlitePool, rules: ProgressionRules) -> Self {
        Self { pool, rules }
    }

    pub async fn open(url: &str, rules: ProgressionRules) -> Result<Self> {
        Ok(Self::new(init_db(url).await?, rules))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn rules(&self) -> &ProgressionRules {
        &self.rules
    }
}
