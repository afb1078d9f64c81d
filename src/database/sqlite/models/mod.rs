use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One question/answer entry from the knowledge base. Immutable once loaded;
/// rows are written only by the external ingestion process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FaqRecord {
    pub id: i64,
    pub page: Option<String>,
    pub question: String,
    #[sqlx(rename = "answer_text")]
    pub answer: String,
    pub source_url: Option<String>,
}

impl FaqRecord {
    /// Category label for display; records without one show as "unknown".
    #[inline]
    pub fn page_label(&self) -> &str {
        self.page.as_deref().unwrap_or("unknown")
    }
}

/// A precomputed item embedding as stored in `qa_vec`. The blob is a
/// little-endian f32 array of length `dim`; ingestion may leave it NULL.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct StoredVector {
    pub qa_id: i64,
    pub dim: i64,
    pub blob: Option<Vec<u8>>,
}

/// A cached query embedding, keyed by the digest of the normalized query.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CachedEmbedding {
    pub query_hash: String,
    pub query_text: Option<String>,
    pub created_ts: i64,
    pub dim: i64,
    pub q_emb: Vec<u8>,
}
