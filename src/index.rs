//! Flat inner-product vector index with a JSON metadata sidecar.
//!
//! Search is exact: every stored vector is compared against the query.
//! Vectors are L2-normalized at insert, so inner product equals cosine
//! similarity and scores stay in [-1, 1]. The serving path never mutates
//! the index; `push` exists for the offline build tool only.

use std::fs;
use std::path::Path;

use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::normalize::l2_normalize_in_place;
use crate::types::Product;

/// On-disk shape of the vector store.
#[derive(Serialize, Deserialize)]
struct StoredVectors {
    dimension: u32,
    count: u32,
    data: Vec<f32>,
}

#[derive(Debug)]
pub struct VectorIndex {
    dimension: usize,
    /// Row-major, `len * dimension` floats.
    vectors: Vec<f32>,
    /// Position-aligned catalog records.
    products: Vec<Product>,
}

impl VectorIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
            products: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors (== catalog size).
    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn product(&self, position: usize) -> Option<&Product> {
        self.products.get(position)
    }

    /// Append one (vector, product) pair. Build-time only.
    pub fn push(&mut self, mut vector: Vec<f32>, product: Product) -> Result<(), SearchError> {
        if vector.len() != self.dimension {
            return Err(SearchError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        l2_normalize_in_place(&mut vector);
        self.vectors.extend_from_slice(&vector);
        self.products.push(product);
        Ok(())
    }

    /// Exact inner-product search. Returns up to `min(k, len)` positions
    /// sorted by descending similarity; ties keep catalog order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, SearchError> {
        if query.len() != self.dimension {
            return Err(SearchError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dimension)
            .map(|row| row.iter().zip(query).map(|(a, b)| a * b).sum::<f32>())
            .enumerate()
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k.min(self.products.len()));
        Ok(scored)
    }

    /// Persist the vector store and the metadata sidecar.
    pub fn save(
        &self,
        index_path: impl AsRef<Path>,
        meta_path: impl AsRef<Path>,
    ) -> Result<(), SearchError> {
        let stored = StoredVectors {
            dimension: self.dimension as u32,
            count: self.products.len() as u32,
            data: self.vectors.clone(),
        };
        let bytes = encode_to_vec(&stored, standard())
            .map_err(|e| SearchError::IndexLoad(format!("vector store encode failed: {e}")))?;
        fs::write(&index_path, bytes)?;

        let meta = serde_json::to_vec_pretty(&self.products)
            .map_err(|e| SearchError::IndexLoad(format!("metadata encode failed: {e}")))?;
        fs::write(&meta_path, meta)?;
        Ok(())
    }

    /// Load both artifacts atomically at startup. Either file missing, a
    /// decode failure, or a record-count disagreement is fatal — there is no
    /// partial-load or repair mode.
    pub fn load(
        index_path: impl AsRef<Path>,
        meta_path: impl AsRef<Path>,
    ) -> Result<Self, SearchError> {
        let index_path = index_path.as_ref();
        let meta_path = meta_path.as_ref();
        if !index_path.exists() || !meta_path.exists() {
            return Err(SearchError::IndexLoad(format!(
                "index or metadata not found ({} / {}); run build-index first",
                index_path.display(),
                meta_path.display()
            )));
        }

        let bytes = fs::read(index_path)?;
        let (stored, _): (StoredVectors, usize) = decode_from_slice(&bytes, standard())
            .map_err(|e| SearchError::IndexLoad(format!("vector store decode failed: {e}")))?;

        let meta = fs::read(meta_path)?;
        let products: Vec<Product> = serde_json::from_slice(&meta)
            .map_err(|e| SearchError::IndexLoad(format!("metadata decode failed: {e}")))?;

        let dimension = stored.dimension as usize;
        let count = stored.count as usize;
        if stored.data.len() != dimension * count {
            return Err(SearchError::IndexLoad(format!(
                "vector store claims {count} x {dimension} but holds {} floats",
                stored.data.len()
            )));
        }
        if products.len() != count {
            return Err(SearchError::IndexLoad(format!(
                "vector store holds {count} records but metadata holds {}",
                products.len()
            )));
        }

        tracing::info!(count, dimension, "vector index loaded");
        Ok(Self {
            dimension,
            vectors: stored.data,
            products,
        })
    }
}
