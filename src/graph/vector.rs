//! Vector similarity search contract.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::graph::error::{GraphError, GraphResult};

pub const DEFAULT_TOP_K: usize = 10;
pub const MAX_TOP_K: usize = 1000;

/// A similarity query against one vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorSearchRequest {
    pub embedding: Vec<f32>,
    pub top_k: usize,
    pub min_similarity: f64,
    /// Restrict hits to a single node type.
    pub node_type: Option<String>,
    /// Equality filters on node properties, applied before ranking.
    pub filters: HashMap<String, Value>,
}

impl VectorSearchRequest {
    pub fn new(embedding: Vec<f32>) -> Self {
        Self {
            embedding,
            top_k: DEFAULT_TOP_K,
            min_similarity: 0.0,
            node_type: None,
            filters: HashMap::new(),
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_min_similarity(mut self, min_similarity: f64) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    pub fn with_node_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = Some(node_type.into());
        self
    }

    pub fn with_filter(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.filters.insert(key.to_string(), value.into());
        self
    }

    /// Contract checks shared by every store implementation.
    pub fn validate(&self) -> GraphResult<()> {
        if self.top_k == 0 || self.top_k > MAX_TOP_K {
            return Err(GraphError::InvalidQuery {
                query: "vectorSearch".to_string(),
                message: format!("topK must be in 1..={}, got {}", MAX_TOP_K, self.top_k),
            });
        }
        if self.embedding.is_empty() {
            return Err(GraphError::InvalidQuery {
                query: "vectorSearch".to_string(),
                message: "embedding is empty".to_string(),
            });
        }
        if self.embedding.iter().any(|x| !x.is_finite()) {
            return Err(GraphError::InvalidQuery {
                query: "vectorSearch".to_string(),
                message: "embedding contains non-finite values".to_string(),
            });
        }
        Ok(())
    }
}

/// A single ranked hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorSearchHit {
    pub id: String,
    pub node_type: String,
    pub properties: HashMap<String, Value>,
    pub similarity: f64,
}

/// Hits ordered by similarity descending, plus timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorSearchResponse {
    pub results: Vec<VectorSearchHit>,
    pub execution_time_ms: f64,
    pub count: usize,
}

/// Cosine similarity between two vectors of equal dimension.
///
/// Mismatched dimensions or zero-norm inputs score 0 rather than erroring;
/// the store treats such pairs as unrelated.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += *x as f64 * *y as f64;
        norm_a += (*x as f64).powi(2);
        norm_b += (*y as f64).powi(2);
    }
    if norm_a < 1e-15 || norm_b < 1e-15 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
