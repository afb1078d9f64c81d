#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// End-to-end retrieval tests over a real SQLite file, with the embedding
// backend replaced by a deterministic in-process provider.

use anyhow::Result;
use faq_search::Result as SearchResult;
use faq_search::config::Config;
use faq_search::database::sqlite::Database;
use faq_search::database::sqlite::queries::RecordQueries;
use faq_search::embeddings::EmbeddingProvider;
use faq_search::search::RetrievalContext;
use faq_search::vector::vec_to_blob;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

const MODEL: &str = "fixture-embed";

/// Keyword-matching provider: maps known phrases to fixed unit vectors, so
/// ranking outcomes are fully deterministic without a model server.
struct FixtureProvider {
    calls: AtomicUsize,
}

impl FixtureProvider {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingProvider for FixtureProvider {
    fn model_name(&self) -> &str {
        MODEL
    }

    fn embed(&self, text: &str) -> SearchResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let vector = if text.contains("enroll") {
            vec![0.95, 0.05, 0.0]
        } else if text.contains("document") {
            vec![0.05, 0.95, 0.0]
        } else if text.contains("dormitory") {
            vec![0.0, 0.05, 0.95]
        } else {
            // Off-topic: far from every stored item.
            vec![0.577, 0.577, 0.577]
        };
        Ok(vector)
    }
}

async fn seed_knowledge_base(path: &Path) -> Result<Database> {
    let database = Database::new(path).await?;

    sqlx::query(
        r#"
        CREATE TABLE qa (
            id INTEGER PRIMARY KEY,
            page TEXT,
            question TEXT NOT NULL,
            answer_text TEXT NOT NULL,
            source_url TEXT
        )
        "#,
    )
    .execute(database.pool())
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE qa_vec (
            qa_id INTEGER PRIMARY KEY,
            model_name TEXT NOT NULL,
            dim INTEGER NOT NULL,
            q_vec BLOB,
            a_vec BLOB
        )
        "#,
    )
    .execute(database.pool())
    .await?;

    let items: [(i64, &str, &str, Option<&str>, [f32; 3]); 3] = [
        (
            1,
            "How do I enroll?",
            "Submit the application form before the deadline.",
            Some("https://example.edu/enroll"),
            [1.0, 0.0, 0.0],
        ),
        (
            2,
            "What documents do I need?",
            "Passport, diploma, and two photos.",
            None,
            [0.0, 1.0, 0.0],
        ),
        (
            3,
            "Where is the dormitory?",
            "Building 4, across from the main campus.",
            None,
            [0.0, 0.0, 1.0],
        ),
    ];

    for (id, question, answer, url, vector) in items {
        sqlx::query(
            "INSERT INTO qa (id, page, question, answer_text, source_url) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind("admissions")
        .bind(question)
        .bind(answer)
        .bind(url)
        .execute(database.pool())
        .await?;

        sqlx::query(
            "INSERT INTO qa_vec (qa_id, model_name, dim, q_vec, a_vec) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(MODEL)
        .bind(3_i64)
        .bind(vec_to_blob(&vector))
        .bind(Option::<Vec<u8>>::None)
        .execute(database.pool())
        .await?;
    }

    Ok(database)
}

#[tokio::test]
async fn accepted_query_returns_ranked_records() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let database = seed_knowledge_base(&temp_dir.path().join("qa.db")).await?;
    let provider = FixtureProvider::new();

    let context = RetrievalContext::with_parts(Config::default(), database, provider as _).await?;
    let outcome = context.hybrid_search("how do I enroll this year", 5).await?;

    assert!(!outcome.diagnostics.rejected);

    let best = outcome.best.expect("should accept the enrollment question");
    assert_eq!(best.id, 1);
    assert_eq!(best.question, "How do I enroll?");
    assert_eq!(
        best.source_url.as_deref(),
        Some("https://example.edu/enroll")
    );
    assert_eq!(best.page_label(), "admissions");

    // Ranked output mirrors the candidate ordering.
    assert_eq!(outcome.records[0].id, 1);
    assert_eq!(outcome.diagnostics.candidates[0].id, 1);
    assert!(outcome.diagnostics.best_sim.expect("should score") > 0.9);

    Ok(())
}

#[tokio::test]
async fn off_topic_query_is_rejected_not_answered() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let database = seed_knowledge_base(&temp_dir.path().join("qa.db")).await?;
    let provider = FixtureProvider::new();

    let context = RetrievalContext::with_parts(Config::default(), database, provider as _).await?;
    let outcome = context
        .hybrid_search("what is the weather like today", 5)
        .await?;

    assert!(outcome.diagnostics.rejected);
    assert!(outcome.best.is_none());
    assert!(outcome.records.is_empty());

    // Diagnostics still expose the near-misses for threshold tuning.
    let best_sim = outcome.diagnostics.best_sim.expect("should score");
    assert!(best_sim < outcome.diagnostics.sem_thr);
    assert_eq!(outcome.diagnostics.candidates.len(), 3);

    Ok(())
}

#[tokio::test]
async fn cached_embeddings_survive_a_restart() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("qa.db");

    let provider = FixtureProvider::new();
    {
        let database = seed_knowledge_base(&db_path).await?;
        let context =
            RetrievalContext::with_parts(Config::default(), database, Arc::clone(&provider) as _)
                .await?;
        let outcome = context.hybrid_search("where is the dormitory", 5).await?;
        assert!(!outcome.diagnostics.cache_hit);
        assert_eq!(provider.calls(), 1);
    }

    // New process over the same file: the cache row must still be there.
    let database = Database::new(db_path).await?;
    let context =
        RetrievalContext::with_parts(Config::default(), database, Arc::clone(&provider) as _)
            .await?;
    let outcome = context.hybrid_search("where is the dormitory", 5).await?;

    assert!(outcome.diagnostics.cache_hit);
    assert_eq!(provider.calls(), 1);
    assert_eq!(outcome.best.expect("should accept").id, 3);

    Ok(())
}

#[tokio::test]
async fn limit_caps_results_below_candidate_pool() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let database = seed_knowledge_base(&temp_dir.path().join("qa.db")).await?;
    let provider = FixtureProvider::new();

    let context = RetrievalContext::with_parts(Config::default(), database, provider as _).await?;
    let outcome = context.hybrid_search("which documents", 1).await?;

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].id, 2);
    assert_eq!(outcome.diagnostics.candidates.len(), 3);

    Ok(())
}

#[tokio::test]
async fn direct_lookup_bypasses_search() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let database = seed_knowledge_base(&temp_dir.path().join("qa.db")).await?;

    let record = RecordQueries::get_by_id(database.pool(), 2)
        .await?
        .expect("record 2 should exist");
    assert_eq!(record.question, "What documents do I need?");
    assert_eq!(record.answer, "Passport, diploma, and two photos.");

    let missing = RecordQueries::get_by_id(database.pool(), 999).await?;
    assert!(missing.is_none());

    Ok(())
}
