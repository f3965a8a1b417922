//! Embedding provider seam.
//!
//! The embedding model itself is an external collaborator; services only
//! depend on this trait. `HashEmbedder` gives tests and the demo CLI a
//! deterministic, unit-normalized vector without any network dependency.

use async_trait::async_trait;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

use crate::graph::error::{GraphError, GraphResult};

/// Anything that can turn text into a fixed-dimension vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> GraphResult<Vec<f32>>;

    fn dimension(&self) -> usize;
}

/// Deterministic local embedder: seeds a ChaCha stream from the SHA-256 of
/// the input and projects to a unit vector. Equal texts embed equally;
/// unrelated texts are near-orthogonal at reasonable dimensions.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> GraphResult<Vec<f32>> {
        if text.is_empty() {
            return Err(GraphError::InvalidQuery {
                query: "embed".to_string(),
                message: "cannot embed empty text".to_string(),
            });
        }
        let digest = Sha256::digest(text.as_bytes());
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&digest);
        let mut rng = ChaCha8Rng::from_seed(seed);

        let mut vector: Vec<f32> = (0..self.dimension)
            .map(|_| rng.gen_range(-1.0f32..1.0f32))
            .collect();
        let norm = vector.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
        if norm > 1e-12 {
            for x in &mut vector {
                *x = (*x as f64 / norm) as f32;
            }
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
