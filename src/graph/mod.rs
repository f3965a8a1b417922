//! Graph store adapter, edge scoring, vector search, and traversal.

pub mod client;
pub mod edge_scoring;
pub mod error;
pub mod memory;
pub mod store;
pub mod traversal;
pub mod vector;
pub mod wire;

pub use client::{backoff_delay, HelixClient};
pub use edge_scoring::{
    edge_weight, follows, priority, prioritize_edges, threshold_for, EdgeScoringOptions,
};
pub use error::{GraphError, GraphResult};
pub use memory::MemoryGraph;
pub use store::{GraphStore, HealthStatus, QueryOutput, FALLBACK_EDGE_TYPES, FALLBACK_NODE_TYPES};
pub use traversal::{traverse, TraversalOptions, TraversalPath, TraversalResult};
pub use vector::{
    cosine_similarity, VectorSearchHit, VectorSearchRequest, VectorSearchResponse,
};
pub use wire::{normalize_value, unwrap_f64, unwrap_string, unwrap_u32, HelixScalar, QueryParams};
