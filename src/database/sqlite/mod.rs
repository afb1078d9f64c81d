use anyhow::{Context, Result, bail};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};

use crate::config::Config;


pub mod models;
pub mod queries;

pub type DbPool = Pool<Sqlite>;

#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open (or create) a database at the given path. WAL with relaxed
    /// synchronous mode keeps concurrent read-heavy traffic cheap.
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let database = Self { pool };
        database.ensure_query_cache_table().await?;

        Ok(database)
    }

    /// Open the database named by the configuration. The qa/qa_vec tables
    /// belong to the ingestion pipeline, so the file must already exist.
    pub async fn open_from_config(config: &Config) -> Result<Self> {
        let db_path = config
            .db_path()
            .context("Failed to resolve database path")?;

        if !db_path.exists() {
            bail!(
                "Database not found at {}. Run the ingestion pipeline first or set FAQ_DB_PATH.",
                db_path.display()
            );
        }

        info!("Opening FAQ database at {}", db_path.display());
        Self::new(&db_path).await
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Create the query-embedding cache table if it is missing. The cache is
    /// the only table this crate owns.
    pub async fn ensure_query_cache_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS qa_query_cache (
                query_hash TEXT PRIMARY KEY,
                query_text TEXT,
                created_ts INTEGER NOT NULL,
                dim INTEGER NOT NULL,
                q_emb BLOB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create query cache table")?;

        debug!("Query cache table ready");
        Ok(())
    }
}
