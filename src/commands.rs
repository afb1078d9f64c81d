use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::database::sqlite::Database;
use crate::database::sqlite::queries::{QueryCacheQueries, RecordQueries, VectorQueries};
use crate::search::RetrievalContext;
use crate::vector::build_index;

/// Run a single query against the knowledge base and print the ranked
/// answers, or the rejection diagnostics when nothing clears the threshold.
#[inline]
pub async fn run_search(query: &str, limit: Option<usize>) -> Result<()> {
    let config = Config::load()?;
    let final_k = limit.unwrap_or(config.search.final_k);

    info!("Initializing retrieval context");
    let context = RetrievalContext::initialize(config)
        .await
        .context("Failed to initialize retrieval context")?;

    let outcome = context
        .hybrid_search(query, final_k)
        .await
        .context("Search failed")?;

    let diagnostics = &outcome.diagnostics;

    if diagnostics.model_fallback {
        println!("⚠ Index was built from vectors recorded for a different model name.");
    }

    if outcome.records.is_empty() {
        if diagnostics.rejected {
            println!(
                "No confident answer (best similarity {:.3} < threshold {:.3}).",
                diagnostics.best_sim.unwrap_or(-1.0),
                diagnostics.sem_thr
            );
        } else {
            println!("No results.");
        }
        return Ok(());
    }

    println!(
        "Found {} answer(s), best similarity {:.3}:",
        outcome.records.len(),
        diagnostics.best_sim.unwrap_or(-1.0)
    );
    println!();

    for (rank, record) in outcome.records.iter().enumerate() {
        let similarity = diagnostics
            .candidates
            .iter()
            .find(|c| c.id == record.id)
            .map(|c| c.similarity);

        match similarity {
            Some(sim) => println!(
                "{}. [id:{} | {} | sim {:.3}]",
                rank + 1,
                record.id,
                record.page_label(),
                sim
            ),
            None => println!("{}. [id:{} | {}]", rank + 1, record.id, record.page_label()),
        }
        println!("   Q: {}", record.question);
        println!("   A: {}", record.answer);
        if let Some(url) = &record.source_url {
            println!("   Source: {}", url);
        }
        println!();
    }

    Ok(())
}

/// Print the full record for a single id (direct lookup, no search).
#[inline]
pub async fn show_record(id: i64) -> Result<()> {
    let config = Config::load()?;
    let database = Database::open_from_config(&config).await?;

    let Some(record) = RecordQueries::get_by_id(database.pool(), id).await? else {
        println!("No record with id {}.", id);
        return Ok(());
    };

    println!("id: {}", record.id);
    println!("page: {}", record.page_label());
    println!("Q: {}", record.question);
    println!("A: {}", record.answer);
    if let Some(url) = &record.source_url {
        println!("Source: {}", url);
    }

    Ok(())
}

/// Summarize the knowledge base the process would serve from.
#[inline]
pub async fn show_status() -> Result<()> {
    let config = Config::load()?;
    let db_path = config.db_path()?;
    let database = Database::open_from_config(&config).await?;

    let records = RecordQueries::count(database.pool()).await?;
    let vectors = VectorQueries::count(database.pool()).await?;
    let cached_queries = QueryCacheQueries::count(database.pool()).await?;

    println!("Database: {}", db_path.display());
    println!("Records: {}", records);
    println!("Item vectors: {}", vectors);
    println!("Cached query embeddings: {}", cached_queries);

    let (rows, fallback) = VectorQueries::load_for_model(
        database.pool(),
        &config.ollama.model,
        config.search.which_vec,
    )
    .await?;

    match build_index(rows) {
        Ok(loaded) => println!(
            "Index: {} vectors, dimension {}{}",
            loaded.index.len(),
            loaded.index.dim(),
            if fallback { " (model-name fallback)" } else { "" }
        ),
        Err(e) => println!("Index: unavailable ({e})"),
    }
    println!();
    println!("Embedding model: {}", config.ollama.model);
    println!("Indexed vector variant: {}", config.search.which_vec);
    println!(
        "Thresholds: sem_thr={}, top_n={}, final_k={}",
        config.search.sem_thr, config.search.top_n, config.search.final_k
    );
    println!(
        "Query cache: {}",
        if config.search.cache_queries {
            "enabled"
        } else {
            "disabled"
        }
    );

    Ok(())
}
