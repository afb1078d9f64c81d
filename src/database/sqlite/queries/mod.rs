
use super::models::{FaqRecord, StoredVector};
use crate::config::VectorVariant;
use crate::vector::{blob_to_vec, vec_to_blob};
use anyhow::{Context, Result};
use chrono::Utc;
use itertools::Itertools;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, warn};

pub struct RecordQueries;

impl RecordQueries {
    #[inline]
    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<FaqRecord>> {
        sqlx::query_as::<_, FaqRecord>(
            "SELECT id, page, question, answer_text, source_url FROM qa WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get record by id")
    }

    /// Batched lookup. Missing ids are simply absent from the map; the
    /// caller decides what to do about them.
    #[inline]
    pub async fn fetch_by_ids(pool: &SqlitePool, ids: &[i64]) -> Result<HashMap<i64, FaqRecord>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = ids.iter().map(|_| "?").join(",");
        let sql = format!(
            "SELECT id, page, question, answer_text, source_url FROM qa WHERE id IN ({placeholders})"
        );

        let mut query = sqlx::query_as::<_, FaqRecord>(&sql);
        for id in ids {
            query = query.bind(id);
        }

        let records = query
            .fetch_all(pool)
            .await
            .context("Failed to fetch records by ids")?;

        Ok(records.into_iter().map(|r| (r.id, r)).collect())
    }

    #[inline]
    pub async fn count(pool: &SqlitePool) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM qa")
            .fetch_one(pool)
            .await
            .context("Failed to count records")
    }
}

pub struct VectorQueries;

impl VectorQueries {
    /// Load all stored item vectors for the given model name and variant.
    ///
    /// When no rows carry the requested model name, every row is loaded
    /// instead and the returned flag is true. That degraded-compatibility
    /// path keeps an index built by an older model usable, but callers must
    /// treat it as a warning condition.
    #[inline]
    pub async fn load_for_model(
        pool: &SqlitePool,
        model_name: &str,
        variant: VectorVariant,
    ) -> Result<(Vec<StoredVector>, bool)> {
        let column = variant.column();

        let sql = format!(
            "SELECT qa_id, dim, {column} AS blob FROM qa_vec WHERE model_name = ? ORDER BY qa_id"
        );
        let rows = sqlx::query_as::<_, StoredVector>(&sql)
            .bind(model_name)
            .fetch_all(pool)
            .await
            .context("Failed to load item vectors")?;

        if !rows.is_empty() {
            debug!(
                "Loaded {} item vectors for model {}",
                rows.len(),
                model_name
            );
            return Ok((rows, false));
        }

        warn!(
            "No item vectors recorded for model {}; falling back to all stored vectors",
            model_name
        );

        let sql = format!("SELECT qa_id, dim, {column} AS blob FROM qa_vec ORDER BY qa_id");
        let rows = sqlx::query_as::<_, StoredVector>(&sql)
            .fetch_all(pool)
            .await
            .context("Failed to load item vectors in fallback mode")?;

        Ok((rows, true))
    }

    #[inline]
    pub async fn count(pool: &SqlitePool) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM qa_vec")
            .fetch_one(pool)
            .await
            .context("Failed to count item vectors")
    }
}

pub struct QueryCacheQueries;

impl QueryCacheQueries {
    #[inline]
    pub async fn get(pool: &SqlitePool, query_hash: &str) -> Result<Option<Vec<f32>>> {
        let row = sqlx::query("SELECT q_emb, dim FROM qa_query_cache WHERE query_hash = ?")
            .bind(query_hash)
            .fetch_optional(pool)
            .await
            .context("Failed to read query cache")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let blob: Vec<u8> = row.get("q_emb");
        let dim: i64 = row.get("dim");
        let dim = usize::try_from(dim).context("Cached embedding has invalid dimension")?;

        let vector = blob_to_vec(&blob, dim).context("Failed to decode cached embedding")?;
        Ok(Some(vector))
    }

    /// Idempotent write: re-inserting the same hash replaces the prior
    /// entry, which is equivalent since the hash determines the text.
    #[inline]
    pub async fn put(
        pool: &SqlitePool,
        query_hash: &str,
        query_text: &str,
        embedding: &[f32],
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO qa_query_cache (query_hash, query_text, created_ts, dim, q_emb)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(query_hash)
        .bind(query_text)
        .bind(Utc::now().timestamp())
        .bind(i64::try_from(embedding.len()).context("Embedding too large")?)
        .bind(vec_to_blob(embedding))
        .execute(pool)
        .await
        .context("Failed to write query cache")?;

        Ok(())
    }

    #[inline]
    pub async fn count(pool: &SqlitePool) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM qa_query_cache")
            .fetch_one(pool)
            .await
            .context("Failed to count cached queries")
    }
}
