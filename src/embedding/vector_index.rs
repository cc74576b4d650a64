/// Flat inner-product index for exact similarity search
use ndarray::{Array2, ArrayView1, Axis};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VectorIndexError {
    #[error("Invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Row mapping has {mapped} ids for {rows} rows")]
    RowMappingMismatch { rows: usize, mapped: usize },

    #[error("Invalid index shape: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

/// A single ranked row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexHit {
    /// Row in the index
    pub row: usize,
    /// Entry position the row was built from
    pub entry_id: usize,
    /// Cosine similarity in [-1, 1]
    pub score: f32,
}

/// Scale a vector to unit length in place. Zero vectors are left untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 && norm.is_finite() {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Exact nearest-neighbor index over unit vectors
///
/// Every row is L2-normalized on the way in, so the inner product computed at
/// query time is the cosine similarity. `row_ids` maps each row to the
/// position of the entry it was embedded from.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Array2<f32>,
    row_ids: Vec<usize>,
}

impl FlatIndex {
    /// Create an index with zero rows
    pub fn empty(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Array2::zeros((0, dimension)),
            row_ids: Vec::new(),
        }
    }

    /// Build from raw vectors; row `i` maps to entry `i`
    pub fn from_vectors(
        dimension: usize,
        vectors: Vec<Vec<f32>>,
    ) -> Result<Self, VectorIndexError> {
        let rows = vectors.len();
        let mut flat = Vec::with_capacity(rows * dimension);
        for vector in vectors {
            if vector.len() != dimension {
                return Err(VectorIndexError::InvalidDimension {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            flat.extend(vector);
        }
        Self::from_parts(dimension, flat, (0..rows).collect())
    }

    /// Rebuild from a flat row-major buffer and an explicit row mapping
    pub fn from_parts(
        dimension: usize,
        flat: Vec<f32>,
        row_ids: Vec<usize>,
    ) -> Result<Self, VectorIndexError> {
        if dimension == 0 {
            return Err(VectorIndexError::InvalidDimension {
                expected: 1,
                actual: 0,
            });
        }
        if flat.len() % dimension != 0 {
            return Err(VectorIndexError::InvalidDimension {
                expected: dimension,
                actual: flat.len() % dimension,
            });
        }

        let rows = flat.len() / dimension;
        if row_ids.len() != rows {
            return Err(VectorIndexError::RowMappingMismatch {
                rows,
                mapped: row_ids.len(),
            });
        }

        let mut vectors = Array2::from_shape_vec((rows, dimension), flat)?;
        for mut row in vectors.axis_iter_mut(Axis(0)) {
            let norm = row.dot(&row).sqrt();
            if norm > 0.0 && norm.is_finite() {
                row.mapv_inplace(|x| x / norm);
            }
        }

        Ok(Self {
            dimension,
            vectors,
            row_ids,
        })
    }

    /// Rank rows by inner product against `query`.
    ///
    /// Returns at most `k` hits ordered by descending score; equal scores keep
    /// row order. The query is normalized here, so callers may pass raw
    /// encoder output.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<IndexHit>, VectorIndexError> {
        if query.len() != self.dimension {
            return Err(VectorIndexError::InvalidDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut normalized = query.to_vec();
        l2_normalize(&mut normalized);

        let scores = self.vectors.dot(&ArrayView1::from(&normalized[..]));

        let mut order: Vec<usize> = (0..self.len()).collect();
        // Stable: ties stay in ascending row order
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
        order.truncate(k);

        Ok(order
            .into_iter()
            .map(|row| IndexHit {
                row,
                entry_id: self.row_ids[row],
                score: scores[row].clamp(-1.0, 1.0),
            })
            .collect())
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.row_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_ids.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn row_ids(&self) -> &[usize] {
        &self.row_ids
    }

    /// Row-major copy of the stored (normalized) vectors
    pub fn to_flat(&self) -> Vec<f32> {
        self.vectors.iter().copied().collect()
    }
}
