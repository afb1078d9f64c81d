
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::database::sqlite::Database;
use crate::database::sqlite::models::FaqRecord;
use crate::database::sqlite::queries::{QueryCacheQueries, RecordQueries, VectorQueries};
use crate::embeddings::{EmbeddingProvider, OllamaClient};
use crate::vector::{FlatIpIndex, build_index};
use crate::{Result, SearchError};

/// Collapse whitespace runs to a single space and trim the edges.
#[inline]
pub fn normalize_query(text: &str) -> String {
    itertools::join(text.split_whitespace(), " ")
}

/// Deterministic cache key for a normalized query.
#[inline]
pub fn query_hash(normalized: &str) -> String {
    let digest = Sha256::digest(normalized.as_bytes());
    format!("{digest:x}")
}

/// One raw candidate from the index, before any trimming.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Candidate {
    pub id: i64,
    pub similarity: f32,
}

/// Per-query diagnostics, returned whether or not the query was accepted.
/// Lets operators inspect near-misses and retune thresholds without
/// re-running inference.
#[derive(Debug, Clone, Serialize)]
pub struct SearchDiagnostics {
    pub sem_thr: f32,
    pub best_sim: Option<f32>,
    pub candidates: Vec<Candidate>,
    pub rejected: bool,
    pub cache_hit: bool,
    pub model_fallback: bool,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub best: Option<FaqRecord>,
    pub records: Vec<FaqRecord>,
    pub diagnostics: SearchDiagnostics,
}

/// Everything a request handler needs to answer queries: configuration, the
/// storage pool, the embedding provider, and the startup-built index.
/// Constructed once per process and shared by reference; the index and id
/// array are immutable after construction.
pub struct RetrievalContext {
    config: Config,
    database: Database,
    provider: Arc<dyn EmbeddingProvider>,
    ids: Vec<i64>,
    index: FlatIpIndex,
    model_fallback: bool,
}

impl RetrievalContext {
    /// Full production startup: open storage, health-check the embedding
    /// backend, load the stored vectors, and build the index. Any failure
    /// here is fatal; the system cannot serve queries without all three.
    #[inline]
    pub async fn initialize(config: Config) -> Result<Self> {
        let database = Database::open_from_config(&config)
            .await
            .map_err(storage_err)?;

        let provider = OllamaClient::new(&config)?;
        provider.health_check()?;

        Self::with_parts(config, database, Arc::new(provider)).await
    }

    /// Assemble a context from pre-built collaborators. Loads vectors for
    /// the provider's model (falling back to all stored vectors when none
    /// match) and builds the in-memory index.
    #[inline]
    pub async fn with_parts(
        config: Config,
        database: Database,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let (rows, model_fallback) = VectorQueries::load_for_model(
            database.pool(),
            provider.model_name(),
            config.search.which_vec,
        )
        .await
        .map_err(storage_err)?;

        let loaded = build_index(rows)?;

        info!(
            "Retrieval context ready: {} vectors, dimension {}, model {}{}",
            loaded.index.len(),
            loaded.index.dim(),
            provider.model_name(),
            if model_fallback {
                " (model-name fallback)"
            } else {
                ""
            }
        );

        Ok(Self {
            config,
            database,
            provider,
            ids: loaded.ids,
            index: loaded.index,
            model_fallback,
        })
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn database(&self) -> &Database {
        &self.database
    }

    #[inline]
    pub fn index(&self) -> &FlatIpIndex {
        &self.index
    }

    #[inline]
    pub fn model_fallback(&self) -> bool {
        self.model_fallback
    }

    /// Answer a free-text query with up to `final_k` ranked records.
    ///
    /// A best similarity below the acceptance threshold yields a rejected
    /// outcome: no records, full diagnostics. Rejection is an expected
    /// result of the precision-over-recall policy, not an error.
    #[inline]
    pub async fn hybrid_search(&self, query: &str, final_k: usize) -> Result<SearchOutcome> {
        let mut diagnostics = SearchDiagnostics {
            sem_thr: self.config.search.sem_thr,
            best_sim: None,
            candidates: Vec::new(),
            rejected: false,
            cache_hit: false,
            model_fallback: self.model_fallback,
        };

        let normalized = normalize_query(query);
        if normalized.is_empty() {
            debug!("Query empty after normalization; skipping search");
            return Ok(SearchOutcome {
                best: None,
                records: Vec::new(),
                diagnostics,
            });
        }

        let embedding = self.query_embedding(&normalized, &mut diagnostics).await?;

        // The raw pool is never smaller than what we return, so diagnostics
        // always cover at least the returned records.
        let pool_size = final_k.max(self.config.search.top_n);
        let hits = self.index.search(&embedding, pool_size);

        diagnostics.candidates = hits
            .iter()
            .take(self.config.search.top_n)
            .map(|&(position, similarity)| Candidate {
                id: self.ids[position],
                similarity,
            })
            .collect();

        let Some(&(_, best_sim)) = hits.first() else {
            debug!("Index returned no candidates for query");
            return Ok(SearchOutcome {
                best: None,
                records: Vec::new(),
                diagnostics,
            });
        };

        diagnostics.best_sim = Some(best_sim);

        if best_sim < self.config.search.sem_thr {
            diagnostics.rejected = true;
            info!(
                "Query rejected: best similarity {:.3} below threshold {:.3}",
                best_sim, self.config.search.sem_thr
            );
            return Ok(SearchOutcome {
                best: None,
                records: Vec::new(),
                diagnostics,
            });
        }

        let out_ids: Vec<i64> = hits
            .iter()
            .take(final_k)
            .map(|&(position, _)| self.ids[position])
            .collect();

        let mut fetched = RecordQueries::fetch_by_ids(self.database.pool(), &out_ids)
            .await
            .map_err(storage_err)?;

        // Batched fetches do not preserve input order; restore the
        // similarity ranking and silently drop ids that no longer resolve.
        let records: Vec<FaqRecord> = out_ids
            .iter()
            .filter_map(|id| fetched.remove(id))
            .collect();

        let best = records.first().cloned();

        debug!(
            "Query accepted: {} records, best similarity {:.3}",
            records.len(),
            best_sim
        );

        Ok(SearchOutcome {
            best,
            records,
            diagnostics,
        })
    }

    /// Resolve the query embedding through the cache when enabled. Cache
    /// failures in either direction degrade to recomputation; only the
    /// provider itself can fail the search.
    async fn query_embedding(
        &self,
        normalized: &str,
        diagnostics: &mut SearchDiagnostics,
    ) -> Result<Vec<f32>> {
        let caching = self.config.search.cache_queries;
        let hash = query_hash(normalized);

        if caching {
            match QueryCacheQueries::get(self.database.pool(), &hash).await {
                Ok(Some(embedding)) => {
                    debug!("Query cache hit for {}", hash);
                    diagnostics.cache_hit = true;
                    return Ok(embedding);
                }
                Ok(None) => {}
                Err(e) => warn!("Query cache read failed, recomputing: {e:#}"),
            }
        }

        let embedding = self.provider.embed(normalized)?;

        if caching
            && let Err(e) =
                QueryCacheQueries::put(self.database.pool(), &hash, normalized, &embedding).await
        {
            warn!("Failed to persist query embedding: {e:#}");
        }

        Ok(embedding)
    }
}

fn storage_err(e: anyhow::Error) -> SearchError {
    SearchError::Database(format!("{e:#}"))
}
