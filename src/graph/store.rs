//! Uniform query surface over the typed property graph.
//!
//! `GraphStore` is the seam between retrieval/ingestion logic and the
//! backing engine. The production implementation speaks the Helix wire
//! protocol; tests and the demo CLI run against the in-memory store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::graph::error::GraphResult;
use crate::graph::vector::{VectorSearchRequest, VectorSearchResponse};
use crate::graph::wire::QueryParams;
use crate::models::{Direction, GraphEdge, GraphNode};

/// Raw output of a named query.
#[derive(Debug, Clone)]
pub struct QueryOutput {
    pub data: Value,
    pub execution_time_ms: f64,
}

/// Result of the adapter's health probe.
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub healthy: bool,
    pub latency_ms: f64,
    pub error: Option<String>,
}

/// Fallback catalogue used when the store cannot enumerate its own types.
pub const FALLBACK_NODE_TYPES: &[&str] = &[
    "TradeDecision",
    "TradeLifecycleEvent",
    "ExternalEvent",
    "FilingChunk",
    "TranscriptChunk",
    "NewsItem",
    "Company",
    "MacroEntity",
];

/// Fallback edge-type catalogue.
pub const FALLBACK_EDGE_TYPES: &[&str] = &[
    "INFLUENCED_DECISION",
    "HAS_EVENT",
    "MENTIONS_COMPANY",
    "IN_SECTOR",
    "RELATED_TO",
];

/// Property keys holding weight-like values, clamped to [0, 1] on write.
const CLAMPED_PROPERTY_KEYS: &[&str] = &[
    "weight",
    "score",
    "strength",
    "confidence_score",
    "influence_score",
    "sensitivity",
    "probability_of_overfit",
];

/// Clamp weight-like properties in place. Every write path runs this before
/// the record reaches the store.
pub fn clamp_weight_properties(properties: &mut std::collections::HashMap<String, Value>) {
    for key in CLAMPED_PROPERTY_KEYS {
        if let Some(value) = properties.get_mut(*key) {
            if let Some(x) = value.as_f64() {
                let clamped = x.clamp(0.0, 1.0);
                if clamped != x {
                    *value = Value::from(clamped);
                }
            }
        }
    }
}

/// Merge an incoming node into the stored one.
///
/// Fields the new record is silent on keep their prior values; present
/// fields overwrite. `created_at` survives from the first insert.
pub fn merge_node(existing: &mut GraphNode, incoming: GraphNode, now: DateTime<Utc>) {
    for (key, value) in incoming.properties {
        if value.is_null() {
            continue;
        }
        existing.properties.insert(key, value);
    }
    if let Some(embedding) = incoming.embedding {
        existing.embedding = Some(embedding);
    }
    existing.updated_at = Some(now);
}

/// Uniform async query surface over the property graph.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Issue a named parameterized query and return its raw JSON payload.
    async fn query(&self, name: &str, params: QueryParams) -> GraphResult<QueryOutput>;

    /// Similarity search over a vector index.
    async fn vector_search(
        &self,
        request: &VectorSearchRequest,
    ) -> GraphResult<VectorSearchResponse>;

    /// Expand a node's incident edges in the given direction, optionally
    /// restricted to `edge_types` (empty slice = all types).
    async fn neighbors(
        &self,
        node_id: &str,
        direction: Direction,
        edge_types: &[String],
    ) -> GraphResult<Vec<(GraphEdge, GraphNode)>>;

    /// Total degree (in + out) of a node; hub detection input.
    async fn node_degree(&self, node_id: &str) -> GraphResult<usize>;

    async fn get_node(&self, node_id: &str) -> GraphResult<Option<GraphNode>>;

    /// All nodes of one type; dedupe scans and catalogue walks.
    async fn get_nodes_by_type(&self, node_type: &str) -> GraphResult<Vec<GraphNode>>;

    /// Idempotent upsert keyed by node ID, with merge semantics.
    async fn upsert_node(&self, node: GraphNode) -> GraphResult<()>;

    /// Idempotent upsert keyed by `(source, target, type)`.
    async fn upsert_edge(&self, edge: GraphEdge) -> GraphResult<()>;

    /// Scan nodes, optionally restricted to those changed since `since`.
    async fn export_nodes(&self, since: Option<DateTime<Utc>>) -> GraphResult<Vec<GraphNode>>;

    /// Scan edges, optionally restricted to those changed since `since`.
    async fn export_edges(&self, since: Option<DateTime<Utc>>) -> GraphResult<Vec<GraphEdge>>;

    /// Enumerate node types, falling back to the static catalogue.
    async fn node_types(&self) -> GraphResult<Vec<String>>;

    /// Enumerate edge types, falling back to the static catalogue.
    async fn edge_types(&self) -> GraphResult<Vec<String>>;

    /// Minimal round-trip probe.
    async fn health_check(&self) -> HealthStatus;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clamps_weight_like_properties_only() {
        let mut props = std::collections::HashMap::new();
        props.insert("confidence_score".to_string(), json!(1.7));
        props.insert("sensitivity".to_string(), json!(-0.2));
        props.insert("weight".to_string(), json!(0.4));
        props.insert("pnl".to_string(), json!(250.0));
        clamp_weight_properties(&mut props);

        assert_eq!(props["confidence_score"], json!(1.0));
        assert_eq!(props["sensitivity"], json!(0.0));
        assert_eq!(props["weight"], json!(0.4));
        // Non-weight fields are untouched.
        assert_eq!(props["pnl"], json!(250.0));
    }

    #[test]
    fn merge_preserves_silent_fields() {
        let now = Utc::now();
        let mut existing = GraphNode::new("dec-1", "TradeDecision")
            .with_property("action", json!("BUY"))
            .with_property("rationale_text", json!("initial view"));
        existing.created_at = Some(now);

        let incoming = GraphNode::new("dec-1", "TradeDecision")
            .with_property("realized_outcome", json!(r#"{"pnl": 5.0}"#))
            .with_property("rationale_text", Value::Null);
        merge_node(&mut existing, incoming, now);

        assert_eq!(existing.properties["action"], json!("BUY"));
        // Null in the incoming record means "silent", not "clear".
        assert_eq!(existing.properties["rationale_text"], json!("initial view"));
        assert_eq!(
            existing.properties["realized_outcome"],
            json!(r#"{"pnl": 5.0}"#)
        );
        assert_eq!(existing.updated_at, Some(now));
    }
}
