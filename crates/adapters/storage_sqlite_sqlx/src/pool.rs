//! `SQLite` connection pool setup and migration runner.

use std::str::FromStr;

use chrono_tz::Tz;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;

use crate::error::StorageError;
use crate::legacy_migration;

/// Configuration for the `SQLite` storage adapter.
pub struct Config {
    /// `SQLite` connection URL (e.g. `sqlite:hearth.db` or `sqlite::memory:`).
    pub database_url: String,
    /// Zone legacy schedule tuples were written in.
    pub timezone: Tz,
}

impl Config {
    /// Build a [`Database`] from this configuration.
    ///
    /// Creates the connection pool, creates the database file if missing,
    /// runs all pending migrations and upgrades legacy schedule records.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the connection, migrations or upgrade fail.
    pub async fn build(self) -> Result<Database, StorageError> {
        let options = SqliteConnectOptions::from_str(&self.database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        Database::initialize(pool, self.timezone).await
    }
}

/// Holds the `SQLite` connection pool and provides access to it.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Run migrations on an open pool, then convert legacy schedule records.
    ///
    /// Safe to run on every startup.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if migrations or the upgrade fail.
    pub async fn initialize(pool: SqlitePool, timezone: Tz) -> Result<Self, StorageError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        let report =
            legacy_migration::upgrade_legacy_automations(&pool, &timezone, hearth_domain::time::now())
                .await?;
        if report.converted > 0 {
            tracing::info!(converted = report.converted, "legacy schedules upgraded to cron triggers");
        }
        Ok(Self { pool })
    }

    /// Borrow the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
