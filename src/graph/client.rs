//! HTTP adapter for the Helix graph store.
//!
//! Issues named parameterized queries as `POST {base}/{query_name}` with a
//! JSON body. The connection is established lazily on first use; failures
//! are classified into the typed error set and retried with exponential
//! backoff when the kind allows it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use reqwest::StatusCode;
use serde_json::Value;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::config::HelixConfig;
use crate::graph::error::{GraphError, GraphResult};
use crate::graph::store::{
    clamp_weight_properties, GraphStore, HealthStatus, QueryOutput, FALLBACK_EDGE_TYPES,
    FALLBACK_NODE_TYPES,
};
use crate::graph::vector::{VectorSearchHit, VectorSearchRequest, VectorSearchResponse};
use crate::graph::wire::{normalize_value, unwrap_f64, unwrap_string, QueryParams};
use crate::models::{node_types, Direction, GraphEdge, GraphNode};

const INITIAL_BACKOFF_MS: u64 = 100;

/// Pure backoff schedule: `base · 2^(attempt-1)` for 1-based attempts.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base * 2u32.saturating_pow(attempt.saturating_sub(1))
}

/// Graph store adapter speaking the Helix wire protocol.
///
/// Holds the process's one lazily-built connection; everything else in the
/// crate is stateless given its inputs.
pub struct HelixClient {
    config: HelixConfig,
    client: RwLock<Option<reqwest::Client>>,
}

impl HelixClient {
    pub fn new(config: HelixConfig) -> Self {
        Self {
            config,
            client: RwLock::new(None),
        }
    }

    pub fn from_env() -> Self {
        Self::new(HelixConfig::from_env())
    }

    /// Drop the connection; in-flight retries fail on their next attempt.
    pub fn close(&self) {
        *self.client.write() = None;
    }

    fn connection(&self) -> GraphResult<reqwest::Client> {
        if let Some(client) = self.client.read().as_ref() {
            return Ok(client.clone());
        }
        let mut slot = self.client.write();
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }
        let client = reqwest::Client::builder()
            .timeout(self.config.timeout)
            .build()
            .map_err(|e| GraphError::ConnectionFailed {
                message: e.to_string(),
            })?;
        debug!(url = %self.config.base_url(), "helix connection established");
        *slot = Some(client.clone());
        Ok(client)
    }

    /// One attempt of a named query, without retry.
    async fn query_once(&self, name: &str, params: &Value) -> GraphResult<QueryOutput> {
        let client = self.connection()?;
        let url = format!("{}/{}", self.config.base_url(), name);
        let started = Instant::now();

        let response = timeout(self.config.timeout, client.post(&url).json(params).send())
            .await
            .map_err(|_| GraphError::Timeout {
                query: name.to_string(),
                timeout_ms: self.config.timeout.as_millis() as u64,
            })?
            .map_err(|e| {
                if e.is_connect() {
                    GraphError::ConnectionFailed {
                        message: e.to_string(),
                    }
                } else if e.is_timeout() {
                    GraphError::Timeout {
                        query: name.to_string(),
                        timeout_ms: self.config.timeout.as_millis() as u64,
                    }
                } else {
                    GraphError::QueryFailed {
                        query: name.to_string(),
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        let execution_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        match status {
            s if s.is_success() => Ok(QueryOutput {
                data: body,
                execution_time_ms,
            }),
            StatusCode::NOT_FOUND => Err(GraphError::NotFound {
                query: name.to_string(),
                entity: unwrap_string(&body, "entity"),
            }),
            StatusCode::BAD_REQUEST => Err(GraphError::InvalidQuery {
                query: name.to_string(),
                message: unwrap_string(&body, "error"),
            }),
            StatusCode::UNPROCESSABLE_ENTITY => Err(GraphError::SchemaError {
                query: name.to_string(),
                message: unwrap_string(&body, "error"),
            }),
            s => Err(GraphError::QueryFailed {
                query: name.to_string(),
                message: format!("status {}: {}", s, unwrap_string(&body, "error")),
            }),
        }
    }

    /// Retry loop over `query_once`. Non-retryable kinds surface
    /// immediately; retryable kinds back off exponentially.
    async fn query_with_retry(&self, name: &str, params: Value) -> GraphResult<QueryOutput> {
        let mut last_err = None;
        for attempt in 1..=self.config.max_retries.max(1) {
            match self.query_once(name, &params).await {
                Ok(output) => return Ok(output),
                Err(err) if err.retryable() && attempt < self.config.max_retries.max(1) => {
                    let delay = backoff_delay(Duration::from_millis(INITIAL_BACKOFF_MS), attempt);
                    warn!(
                        query = name,
                        kind = err.kind(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "query failed, retrying"
                    );
                    sleep(delay).await;
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_err.unwrap_or(GraphError::QueryFailed {
            query: name.to_string(),
            message: "retries exhausted".to_string(),
        }))
    }
}

fn parse_wire_node(value: &Value) -> GraphNode {
    let normalized = normalize_value(value);
    let properties: HashMap<String, Value> = normalized
        .get("properties")
        .and_then(Value::as_object)
        .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();
    let embedding = normalized
        .get("embedding")
        .and_then(Value::as_array)
        .map(|xs| xs.iter().filter_map(|x| x.as_f64()).map(|x| x as f32).collect());

    GraphNode {
        id: unwrap_string(&normalized, "id"),
        node_type: unwrap_string(&normalized, "type"),
        properties,
        embedding,
        created_at: parse_timestamp(&normalized, "created_at"),
        updated_at: parse_timestamp(&normalized, "updated_at"),
    }
}

fn parse_wire_edge(value: &Value) -> GraphEdge {
    let normalized = normalize_value(value);
    let properties: HashMap<String, Value> = normalized
        .get("properties")
        .and_then(Value::as_object)
        .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();

    GraphEdge {
        source_id: unwrap_string(&normalized, "source"),
        target_id: unwrap_string(&normalized, "target"),
        edge_type: unwrap_string(&normalized, "type"),
        properties,
        created_at: parse_timestamp(&normalized, "created_at"),
        updated_at: parse_timestamp(&normalized, "updated_at"),
    }
}

fn parse_timestamp(obj: &Value, key: &str) -> Option<DateTime<Utc>> {
    let raw = unwrap_string(obj, key);
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(&raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn upsert_query_for(node_type: &str) -> &'static str {
    match node_type {
        node_types::TRADE_DECISION => "upsertTradeDecision",
        node_types::TRADE_LIFECYCLE_EVENT => "createLifecycleEvent",
        node_types::EXTERNAL_EVENT => "upsertExternalEvent",
        node_types::MACRO_ENTITY => "upsertMacroEntity",
        node_types::INDICATOR => "InsertIndicator",
        _ => "upsertNode",
    }
}

fn direction_str(direction: Direction) -> &'static str {
    match direction {
        Direction::Outgoing => "outgoing",
        Direction::Incoming => "incoming",
        Direction::Both => "both",
    }
}

#[async_trait]
impl GraphStore for HelixClient {
    async fn query(&self, name: &str, params: QueryParams) -> GraphResult<QueryOutput> {
        self.query_with_retry(name, params.into_value()).await
    }

    async fn vector_search(
        &self,
        request: &VectorSearchRequest,
    ) -> GraphResult<VectorSearchResponse> {
        request.validate()?;
        let params = QueryParams::new()
            .set(
                "embedding",
                Value::Array(
                    request
                        .embedding
                        .iter()
                        .map(|x| Value::from(*x as f64))
                        .collect(),
                ),
            )
            .set("topK", request.top_k as u64)
            .set("minSimilarity", request.min_similarity)
            .set_opt("nodeType", request.node_type.clone())
            .set(
                "filters",
                Value::Object(request.filters.clone().into_iter().collect()),
            );

        let output = self.query_with_retry("vectorSearch", params.into_value()).await?;
        let results: Vec<VectorSearchHit> = output
            .data
            .get("results")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|item| {
                        let node = parse_wire_node(item);
                        VectorSearchHit {
                            id: node.id,
                            node_type: node.node_type,
                            properties: node.properties,
                            similarity: unwrap_f64(item, "similarity"),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let count = results.len();
        Ok(VectorSearchResponse {
            results,
            execution_time_ms: output.execution_time_ms,
            count,
        })
    }

    async fn neighbors(
        &self,
        node_id: &str,
        direction: Direction,
        edge_types: &[String],
    ) -> GraphResult<Vec<(GraphEdge, GraphNode)>> {
        let params = QueryParams::new()
            .set("startNodeId", node_id)
            .set("maxDepth", 1u64)
            .set("direction", direction_str(direction))
            .set(
                "edgeTypes",
                Value::Array(edge_types.iter().map(|t| Value::from(t.clone())).collect()),
            );
        let output = self.query_with_retry("traverse", params.into_value()).await?;

        let mut expanded = Vec::new();
        if let Some(paths) = output.data.get("paths").and_then(Value::as_array) {
            for path in paths {
                let edges = path.get("edges").and_then(Value::as_array);
                let nodes = path.get("nodes").and_then(Value::as_array);
                if let (Some(edges), Some(nodes)) = (edges, nodes) {
                    // A depth-1 path is [start, neighbor] joined by one edge.
                    if let (Some(edge), Some(neighbor)) = (edges.first(), nodes.get(1)) {
                        expanded.push((parse_wire_edge(edge), parse_wire_node(neighbor)));
                    }
                }
            }
        }
        Ok(expanded)
    }

    async fn node_degree(&self, node_id: &str) -> GraphResult<usize> {
        Ok(self.neighbors(node_id, Direction::Both, &[]).await?.len())
    }

    async fn get_node(&self, node_id: &str) -> GraphResult<Option<GraphNode>> {
        let params = QueryParams::new().set("nodeId", node_id);
        match self.query_with_retry("getNode", params.into_value()).await {
            Ok(output) => {
                let node_value = output.data.get("node").unwrap_or(&output.data);
                if node_value.is_null() {
                    return Ok(None);
                }
                Ok(Some(parse_wire_node(node_value)))
            }
            Err(GraphError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn get_nodes_by_type(&self, node_type: &str) -> GraphResult<Vec<GraphNode>> {
        let params = QueryParams::new().set("type", node_type);
        let output = self
            .query_with_retry("getNodesByType", params.into_value())
            .await?;
        Ok(output
            .data
            .get("nodes")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(parse_wire_node).collect())
            .unwrap_or_default())
    }

    async fn upsert_node(&self, mut node: GraphNode) -> GraphResult<()> {
        clamp_weight_properties(&mut node.properties);
        let query = upsert_query_for(&node.node_type);
        let params = QueryParams::new()
            .set("id", node.id.clone())
            .set("type", node.node_type.clone())
            .set(
                "properties",
                Value::Object(node.properties.into_iter().collect()),
            )
            .set_opt(
                "embedding",
                node.embedding.map(|e| {
                    Value::Array(e.iter().map(|x| Value::from(*x as f64)).collect())
                }),
            );
        self.query_with_retry(query, params.into_value()).await?;
        Ok(())
    }

    async fn upsert_edge(&self, mut edge: GraphEdge) -> GraphResult<()> {
        clamp_weight_properties(&mut edge.properties);
        let params = QueryParams::new()
            .set("source", edge.source_id.clone())
            .set("target", edge.target_id.clone())
            .set("type", edge.edge_type.clone())
            .set(
                "properties",
                Value::Object(edge.properties.into_iter().collect()),
            );
        self.query_with_retry("createEdge", params.into_value()).await?;
        Ok(())
    }

    async fn export_nodes(&self, since: Option<DateTime<Utc>>) -> GraphResult<Vec<GraphNode>> {
        let (query, params) = match since {
            Some(since) => (
                "exportNodesChangedSince",
                QueryParams::new().set("since", since.to_rfc3339()),
            ),
            None => ("exportNodes", QueryParams::new()),
        };
        let output = self.query_with_retry(query, params.into_value()).await?;
        Ok(output
            .data
            .get("nodes")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(parse_wire_node).collect())
            .unwrap_or_default())
    }

    async fn export_edges(&self, since: Option<DateTime<Utc>>) -> GraphResult<Vec<GraphEdge>> {
        let (query, params) = match since {
            Some(since) => (
                "exportEdgesChangedSince",
                QueryParams::new().set("since", since.to_rfc3339()),
            ),
            None => ("exportEdges", QueryParams::new()),
        };
        let output = self.query_with_retry(query, params.into_value()).await?;
        Ok(output
            .data
            .get("edges")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(parse_wire_edge).collect())
            .unwrap_or_default())
    }

    async fn node_types(&self) -> GraphResult<Vec<String>> {
        match self.query_with_retry("getNodeTypes", Value::Null).await {
            Ok(output) => {
                let types: Vec<String> = output
                    .data
                    .get("types")
                    .and_then(Value::as_array)
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(Value::as_str)
                            .map(String::from)
                            .collect()
                    })
                    .unwrap_or_default();
                if types.is_empty() {
                    Ok(FALLBACK_NODE_TYPES.iter().map(|s| s.to_string()).collect())
                } else {
                    Ok(types)
                }
            }
            Err(err) => {
                warn!(error = %err, "node type enumeration failed, using fallback catalogue");
                Ok(FALLBACK_NODE_TYPES.iter().map(|s| s.to_string()).collect())
            }
        }
    }

    async fn edge_types(&self) -> GraphResult<Vec<String>> {
        match self.query_with_retry("getEdgeTypes", Value::Null).await {
            Ok(output) => {
                let types: Vec<String> = output
                    .data
                    .get("types")
                    .and_then(Value::as_array)
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(Value::as_str)
                            .map(String::from)
                            .collect()
                    })
                    .unwrap_or_default();
                if types.is_empty() {
                    Ok(FALLBACK_EDGE_TYPES.iter().map(|s| s.to_string()).collect())
                } else {
                    Ok(types)
                }
            }
            Err(err) => {
                warn!(error = %err, "edge type enumeration failed, using fallback catalogue");
                Ok(FALLBACK_EDGE_TYPES.iter().map(|s| s.to_string()).collect())
            }
        }
    }

    async fn health_check(&self) -> HealthStatus {
        let started = Instant::now();
        // Single minimal round-trip; the health probe never retries.
        match self.query_once("getNodeTypes", &Value::Null).await {
            Ok(_) => HealthStatus {
                healthy: true,
                latency_ms: started.elapsed().as_secs_f64() * 1000.0,
                error: None,
            },
            Err(err) => HealthStatus {
                healthy: false,
                latency_ms: started.elapsed().as_secs_f64() * 1000.0,
                error: Some(err.to_string()),
            },
        }
    }
}
