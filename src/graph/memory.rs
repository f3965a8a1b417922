//! In-memory graph store.
//!
//! Backs unit tests and the demo CLI with the same trait surface the Helix
//! adapter exposes, so retrieval and ingestion logic run unchanged against
//! either.

use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;

use crate::graph::error::{GraphError, GraphResult};
use crate::graph::store::{
    clamp_weight_properties, merge_node, GraphStore, HealthStatus, QueryOutput,
    FALLBACK_EDGE_TYPES, FALLBACK_NODE_TYPES,
};
use crate::graph::vector::{
    cosine_similarity, VectorSearchHit, VectorSearchRequest, VectorSearchResponse,
};
use crate::graph::wire::QueryParams;
use crate::models::{Direction, GraphEdge, GraphNode};

type EdgeKey = (String, String, String);

#[derive(Default)]
struct Inner {
    nodes: HashMap<String, GraphNode>,
    edges: HashMap<EdgeKey, GraphEdge>,
}

/// Process-local `GraphStore` implementation.
#[derive(Default)]
pub struct MemoryGraph {
    inner: RwLock<Inner>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.inner.read().nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.read().edges.len()
    }

    fn edge_key(edge: &GraphEdge) -> EdgeKey {
        (
            edge.source_id.clone(),
            edge.target_id.clone(),
            edge.edge_type.clone(),
        )
    }

    fn matches_filters(node: &GraphNode, filters: &HashMap<String, Value>) -> bool {
        filters
            .iter()
            .all(|(key, expected)| node.properties.get(key) == Some(expected))
    }
}

#[async_trait]
impl GraphStore for MemoryGraph {
    async fn query(&self, name: &str, _params: QueryParams) -> GraphResult<QueryOutput> {
        let started = Instant::now();
        match name {
            "getNodeTypes" => {
                let mut types: Vec<String> = {
                    let inner = self.inner.read();
                    let mut set: Vec<String> =
                        inner.nodes.values().map(|n| n.node_type.clone()).collect();
                    set.sort();
                    set.dedup();
                    set
                };
                if types.is_empty() {
                    types = FALLBACK_NODE_TYPES.iter().map(|s| s.to_string()).collect();
                }
                Ok(QueryOutput {
                    data: serde_json::json!({ "types": types }),
                    execution_time_ms: started.elapsed().as_secs_f64() * 1000.0,
                })
            }
            "getEdgeTypes" => {
                let mut types: Vec<String> = {
                    let inner = self.inner.read();
                    let mut set: Vec<String> =
                        inner.edges.values().map(|e| e.edge_type.clone()).collect();
                    set.sort();
                    set.dedup();
                    set
                };
                if types.is_empty() {
                    types = FALLBACK_EDGE_TYPES.iter().map(|s| s.to_string()).collect();
                }
                Ok(QueryOutput {
                    data: serde_json::json!({ "types": types }),
                    execution_time_ms: started.elapsed().as_secs_f64() * 1000.0,
                })
            }
            other => Err(GraphError::InvalidQuery {
                query: other.to_string(),
                message: "named query not supported by the in-memory store".to_string(),
            }),
        }
    }

    async fn vector_search(
        &self,
        request: &VectorSearchRequest,
    ) -> GraphResult<VectorSearchResponse> {
        request.validate()?;
        let started = Instant::now();

        let mut hits: Vec<VectorSearchHit> = {
            let inner = self.inner.read();
            inner
                .nodes
                .values()
                .filter(|node| {
                    request
                        .node_type
                        .as_deref()
                        .map(|t| node.node_type == t)
                        .unwrap_or(true)
                })
                .filter(|node| Self::matches_filters(node, &request.filters))
                .filter_map(|node| {
                    let embedding = node.embedding.as_ref()?;
                    let similarity = cosine_similarity(embedding, &request.embedding);
                    if similarity >= request.min_similarity {
                        Some(VectorSearchHit {
                            id: node.id.clone(),
                            node_type: node.node_type.clone(),
                            properties: node.properties.clone(),
                            similarity,
                        })
                    } else {
                        None
                    }
                })
                .collect()
        };

        // Similarity descending, ID ascending on ties, so equal scores
        // rank deterministically.
        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(request.top_k);

        let count = hits.len();
        Ok(VectorSearchResponse {
            results: hits,
            execution_time_ms: started.elapsed().as_secs_f64() * 1000.0,
            count,
        })
    }

    async fn neighbors(
        &self,
        node_id: &str,
        direction: Direction,
        edge_types: &[String],
    ) -> GraphResult<Vec<(GraphEdge, GraphNode)>> {
        let inner = self.inner.read();
        let mut expanded = Vec::new();

        for edge in inner.edges.values() {
            if !edge_types.is_empty() && !edge_types.contains(&edge.edge_type) {
                continue;
            }
            let other_id = if edge.source_id == node_id
                && matches!(direction, Direction::Outgoing | Direction::Both)
            {
                &edge.target_id
            } else if edge.target_id == node_id
                && matches!(direction, Direction::Incoming | Direction::Both)
            {
                &edge.source_id
            } else {
                continue;
            };
            if let Some(node) = inner.nodes.get(other_id) {
                expanded.push((edge.clone(), node.clone()));
            }
        }
        Ok(expanded)
    }

    async fn node_degree(&self, node_id: &str) -> GraphResult<usize> {
        let inner = self.inner.read();
        Ok(inner
            .edges
            .values()
            .filter(|e| e.source_id == node_id || e.target_id == node_id)
            .count())
    }

    async fn get_node(&self, node_id: &str) -> GraphResult<Option<GraphNode>> {
        Ok(self.inner.read().nodes.get(node_id).cloned())
    }

    async fn get_nodes_by_type(&self, node_type: &str) -> GraphResult<Vec<GraphNode>> {
        Ok(self
            .inner
            .read()
            .nodes
            .values()
            .filter(|n| n.node_type == node_type)
            .cloned()
            .collect())
    }

    async fn upsert_node(&self, mut node: GraphNode) -> GraphResult<()> {
        clamp_weight_properties(&mut node.properties);
        let now = Utc::now();
        let mut inner = self.inner.write();
        match inner.nodes.get_mut(&node.id) {
            Some(existing) => merge_node(existing, node, now),
            None => {
                node.created_at = node.created_at.or(Some(now));
                node.updated_at = Some(now);
                inner.nodes.insert(node.id.clone(), node);
            }
        }
        Ok(())
    }

    async fn upsert_edge(&self, mut edge: GraphEdge) -> GraphResult<()> {
        clamp_weight_properties(&mut edge.properties);
        let now = Utc::now();
        let key = Self::edge_key(&edge);
        let mut inner = self.inner.write();
        match inner.edges.get_mut(&key) {
            Some(existing) => {
                for (k, v) in edge.properties {
                    if !v.is_null() {
                        existing.properties.insert(k, v);
                    }
                }
                existing.updated_at = Some(now);
            }
            None => {
                edge.created_at = edge.created_at.or(Some(now));
                edge.updated_at = Some(now);
                inner.edges.insert(key, edge);
            }
        }
        Ok(())
    }

    async fn export_nodes(&self, since: Option<DateTime<Utc>>) -> GraphResult<Vec<GraphNode>> {
        let inner = self.inner.read();
        Ok(inner
            .nodes
            .values()
            .filter(|node| match since {
                None => true,
                Some(since) => {
                    node.created_at.map(|t| t >= since).unwrap_or(false)
                        || node.updated_at.map(|t| t >= since).unwrap_or(false)
                }
            })
            .cloned()
            .collect())
    }

    async fn export_edges(&self, since: Option<DateTime<Utc>>) -> GraphResult<Vec<GraphEdge>> {
        let inner = self.inner.read();
        Ok(inner
            .edges
            .values()
            .filter(|edge| match since {
                None => true,
                Some(since) => {
                    edge.created_at.map(|t| t >= since).unwrap_or(false)
                        || edge.updated_at.map(|t| t >= since).unwrap_or(false)
                }
            })
            .cloned()
            .collect())
    }

    async fn node_types(&self) -> GraphResult<Vec<String>> {
        let output = self.query("getNodeTypes", QueryParams::new()).await?;
        Ok(output
            .data
            .get("types")
            .and_then(Value::as_array)
            .map(|xs| xs.iter().filter_map(Value::as_str).map(String::from).collect())
            .unwrap_or_default())
    }

    async fn edge_types(&self) -> GraphResult<Vec<String>> {
        let output = self.query("getEdgeTypes", QueryParams::new()).await?;
        Ok(output
            .data
            .get("types")
            .and_then(Value::as_array)
            .map(|xs| xs.iter().filter_map(Value::as_str).map(String::from).collect())
            .unwrap_or_default())
    }

    async fn health_check(&self) -> HealthStatus {
        HealthStatus {
            healthy: true,
            latency_ms: 0.0,
            error: None,
        }
    }
}
