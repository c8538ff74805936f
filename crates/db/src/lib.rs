//! SQLite pool factory and migration runner.

use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use bookshelf_kernel::{settings::DatabaseSettings, Migration};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

const MIGRATIONS_TABLE: &str = "CREATE TABLE IF NOT EXISTS _migrations (
    module     TEXT NOT NULL,
    id         TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (module, id)
)";

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Open a connection pool for the configured database.
///
/// In-memory databases live only as long as their connection, so they get a
/// single connection that is never reaped.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&settings.url)
        .with_context(|| format!("invalid database url '{}'", settings.url))?
        .create_if_missing(true);

    let pool_options = if is_in_memory(&settings.url) {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
    } else {
        SqlitePoolOptions::new().max_connections(settings.max_connections.max(1))
    };

    let pool = pool_options
        .connect_with(options)
        .await
        .with_context(|| format!("failed to connect to '{}'", settings.url))?;

    tracing::info!(target: "bookshelf-db", url = %settings.url, "database pool ready");
    Ok(pool)
}

/// Apply every migration not yet recorded in `_migrations`.
///
/// Each migration runs in its own transaction together with its bookkeeping
/// row. Returns the number of migrations applied.
pub async fn run_migrations(
    pool: &SqlitePool,
    migrations: &[(String, Migration)],
) -> anyhow::Result<usize> {
    sqlx::query(MIGRATIONS_TABLE)
        .execute(pool)
        .await
        .context("failed to create migrations table")?;

    let mut applied = 0;
    for (module, migration) in migrations {
        let seen: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM _migrations WHERE module = ? AND id = ?")
                .bind(module.as_str())
                .bind(migration.id)
                .fetch_one(pool)
                .await
                .context("failed to read migration state")?;
        if seen > 0 {
            tracing::debug!(target: "bookshelf-db", %module, id = migration.id, "migration already applied");
            continue;
        }

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("migration {}/{} failed", module, migration.id))?;
        sqlx::query("INSERT INTO _migrations (module, id) VALUES (?, ?)")
            .bind(module.as_str())
            .bind(migration.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(target: "bookshelf-db", %module, id = migration.id, "applied migration");
        applied += 1;
    }

    Ok(applied)
}
