use crate::config::DatabaseConfig;
use crate::utils::random_string;
use anyhow::{bail, Result};
use futures::future::BoxFuture;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};
use std::str::FromStr;
use tokio::sync::Mutex;
use tracing::{debug, info};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS visit_stats (
        datetime INTEGER PRIMARY KEY,
        visits INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS unique_visit_stats (
        visits INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS visit_tracing (
        site TEXT NOT NULL,
        datetime INTEGER NOT NULL,
        visits INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (site, datetime)
    )",
    "CREATE TABLE IF NOT EXISTS ip_bans (
        ip_hash TEXT PRIMARY KEY
    )",
    "INSERT INTO unique_visit_stats (visits)
        SELECT 0 WHERE NOT EXISTS (SELECT 1 FROM unique_visit_stats)",
];

pub const DEFAULT_UID_LENGTH: usize = 20;

/// SQLite access serialized behind one process-wide lock.
///
/// All work goes through [`RowStore::transaction`], which holds the lock for
/// the whole begin/execute/commit sequence and releases it on every path.
pub struct RowStore {
    conn: Mutex<SqliteConnection>,
}

impl RowStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        if let Some(parent) = config.file_path().as_deref().and_then(|p| p.parent()) {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut conn = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .connect()
            .await?;

        // Test connection
        sqlx::query("SELECT 1").execute(&mut conn).await?;
        info!("Connected to {}", config.url);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub async fn in_memory() -> Result<Self> {
        Self::connect(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
        })
        .await
    }

    /// Run `f` inside a transaction while holding the store lock. The
    /// transaction commits when `f` succeeds and rolls back otherwise.
    pub async fn transaction<T, F>(&self, f: F) -> Result<T, sqlx::Error>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T, sqlx::Error>>
            + Send,
    {
        let mut conn = self.conn.lock().await;
        let mut tx = conn.begin().await?;

        let value = f(&mut *tx).await?;

        tx.commit().await?;
        Ok(value)
    }

    /// Create missing tables and seed the unique-visitor counter
    pub async fn migrate(&self) -> Result<()> {
        self.transaction(|conn| {
            Box::pin(async move {
                for &statement in SCHEMA {
                    sqlx::query(statement).execute(&mut *conn).await?;
                }
                Ok(())
            })
        })
        .await?;

        debug!("Schema ready");
        Ok(())
    }

    /// Random id of `length` characters not yet present in `table.column`
    pub async fn generate_uid(&self, table: &str, column: &str, length: usize) -> Result<String> {
        if !is_identifier(table) || !is_identifier(column) {
            bail!("Invalid identifier: {}.{}", table, column);
        }
        if length == 0 {
            bail!("uid length must be positive");
        }

        let query = format!("SELECT COUNT(*) FROM {} WHERE {} = ?", table, column);

        loop {
            let candidate = random_string(length, false);
            let check = candidate.clone();
            let query = query.clone();

            let taken = self
                .transaction(move |conn| {
                    Box::pin(async move {
                        sqlx::query_scalar::<_, i64>(&query)
                            .bind(check)
                            .fetch_one(&mut *conn)
                            .await
                    })
                })
                .await?;

            if taken == 0 {
                return Ok(candidate);
            }
            debug!("uid collision in {}.{}, retrying", table, column);
        }
    }
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit())
}
