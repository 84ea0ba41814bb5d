//! SQLite pool factory and module migration runner.

use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use shelf_kernel::settings::DatabaseSettings;
use shelf_kernel::Migration;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

const LEDGER_TABLE: &str = "_shelf_migrations";

/// Open a connection pool for the configured database.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<SqlitePool> {
    let mut options = SqliteConnectOptions::from_str(&settings.url)
        .with_context(|| format!("invalid database url '{}'", settings.url))?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_millis(settings.busy_timeout_ms));
    if !settings.is_in_memory() {
        // Readers keep going while a writer holds the lock
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    let mut pool_options = SqlitePoolOptions::new().max_connections(settings.max_connections);
    if settings.is_in_memory() {
        // Every connection to `:memory:` is a separate database; keep the one alive.
        pool_options = pool_options
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    let pool = pool_options
        .connect_with(options)
        .await
        .context("failed to open database pool")?;

    tracing::info!(target: "shelf-db", url = %settings.url, "database pool ready");
    Ok(pool)
}

/// Apply every migration that is not yet recorded in the ledger.
///
/// Each migration runs in its own transaction together with its ledger row,
/// so a failed migration leaves no partial record. Returns how many ran.
pub async fn migrate(pool: &SqlitePool, migrations: &[(String, Migration)]) -> anyhow::Result<usize> {
    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {LEDGER_TABLE} (
            module TEXT NOT NULL,
            id TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (module, id)
        )"
    ))
    .execute(pool)
    .await
    .context("failed to create migration ledger")?;

    let mut applied = 0;
    for (module, migration) in migrations {
        let mut tx = pool.begin().await?;

        let seen: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {LEDGER_TABLE} WHERE module = ? AND id = ?"
        ))
        .bind(module)
        .bind(migration.id)
        .fetch_one(&mut *tx)
        .await?;
        if seen > 0 {
            continue;
        }

        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("migration {}/{} failed", module, migration.id))?;
        sqlx::query(&format!(
            "INSERT INTO {LEDGER_TABLE} (module, id) VALUES (?, ?)"
        ))
        .bind(module)
        .bind(migration.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(target: "shelf-db", module = %module, migration = migration.id, "migration applied");
        applied += 1;
    }

    Ok(applied)
}
