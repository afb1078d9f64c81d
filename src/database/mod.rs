// Storage access module
// SQLite holds the question/answer records, their precomputed embeddings,
// and the query-embedding cache.

pub mod sqlite;

pub use sqlite::{Database, DbPool};
