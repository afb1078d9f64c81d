
use crate::database::sqlite::models::StoredVector;
use crate::{Result, SearchError};
use tracing::{debug, warn};

/// Serialize a float vector as a little-endian f32 byte blob.
#[inline]
pub fn vec_to_blob(vector: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

/// Deserialize a little-endian f32 byte blob of the given dimension.
#[inline]
pub fn blob_to_vec(blob: &[u8], dim: usize) -> Result<Vec<f32>> {
    if blob.len() < dim * 4 {
        return Err(SearchError::Database(format!(
            "Vector blob too short: {} bytes for dimension {}",
            blob.len(),
            dim
        )));
    }

    let mut vector = Vec::with_capacity(dim);
    for chunk in blob.chunks_exact(4).take(dim) {
        let bytes: [u8; 4] = chunk.try_into().map_err(|_| {
            SearchError::Database("Vector blob not aligned to 4 bytes".to_string())
        })?;
        vector.push(f32::from_le_bytes(bytes));
    }

    Ok(vector)
}

/// Scale a vector to unit L2 norm in place. Zero vectors are left untouched
/// so they cannot produce NaN components.
#[inline]
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

/// Exact inner-product nearest-neighbor index over unit-normalized rows.
///
/// Every stored row is compared on each search (O(rows * dim)); with the rows
/// L2-normalized, inner product equals cosine similarity. The index is built
/// once at startup and is immutable afterwards, so it is safe to share across
/// any number of concurrent readers.
#[derive(Debug, Clone)]
pub struct FlatIpIndex {
    dim: usize,
    data: Vec<f32>,
    rows: usize,
}

impl FlatIpIndex {
    /// Build an index from raw rows, normalizing each to unit length.
    /// All rows must share the same dimensionality.
    #[inline]
    pub fn build(dim: usize, rows: Vec<Vec<f32>>) -> Result<Self> {
        if dim == 0 {
            return Err(SearchError::Database(
                "Vector dimension must be non-zero".to_string(),
            ));
        }

        let mut data = Vec::with_capacity(rows.len() * dim);
        let row_count = rows.len();

        for (position, mut row) in rows.into_iter().enumerate() {
            if row.len() != dim {
                return Err(SearchError::Database(format!(
                    "Row {} has dimension {} but the index expects {}",
                    position,
                    row.len(),
                    dim
                )));
            }
            l2_normalize(&mut row);
            data.extend_from_slice(&row);
        }

        Ok(Self {
            dim,
            data,
            rows: row_count,
        })
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Top-k search by inner product, in descending similarity order.
    ///
    /// Returns `(row position, similarity)` pairs; equal similarities keep
    /// ascending position order, but callers must not depend on tie order.
    /// A query of the wrong dimension yields no candidates.
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if query.len() != self.dim {
            warn!(
                "Query dimension {} does not match index dimension {}",
                query.len(),
                self.dim
            );
            return Vec::new();
        }

        if k == 0 || self.rows == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(position, row)| {
                let dot = row.iter().zip(query).map(|(a, b)| a * b).sum::<f32>();
                (position, dot)
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        scored
    }
}

/// An index plus the item ids its row positions map back to.
#[derive(Debug, Clone)]
pub struct LoadedIndex {
    pub ids: Vec<i64>,
    pub index: FlatIpIndex,
}

/// Build the startup index from stored item vectors. Rows with missing blobs
/// are skipped; zero usable rows is fatal since the system cannot answer
/// anything without an index.
#[inline]
pub fn build_index(rows: Vec<StoredVector>) -> Result<LoadedIndex> {
    let mut ids = Vec::with_capacity(rows.len());
    let mut vectors = Vec::with_capacity(rows.len());
    let mut dim: Option<usize> = None;

    for row in rows {
        let Some(blob) = row.blob else {
            debug!("Skipping item {} with missing vector blob", row.qa_id);
            continue;
        };

        let row_dim = usize::try_from(row.dim).map_err(|_| {
            SearchError::Database(format!(
                "Item {} has invalid dimension {}",
                row.qa_id, row.dim
            ))
        })?;

        match dim {
            None => dim = Some(row_dim),
            Some(expected) if expected != row_dim => {
                return Err(SearchError::Database(format!(
                    "Item {} has dimension {} but the index expects {}",
                    row.qa_id, row_dim, expected
                )));
            }
            Some(_) => {}
        }

        vectors.push(blob_to_vec(&blob, row_dim)?);
        ids.push(row.qa_id);
    }

    let Some(dim) = dim else {
        return Err(SearchError::EmptyIndex);
    };

    let index = FlatIpIndex::build(dim, vectors)?;
    debug!("Built flat index: {} vectors, dimension {}", index.len(), dim);

    Ok(LoadedIndex { ids, index })
}
