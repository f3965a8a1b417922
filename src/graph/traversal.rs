//! Bounded multi-hop graph traversal.
//!
//! Breadth-first expansion from a start node, following only edges that
//! pass the per-type weight thresholds, capped per node, per depth, and by
//! wall-clock budget. One to two hops is the useful range; deeper walks
//! mostly add noise.

use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use crate::graph::edge_scoring::{prioritize_edges, EdgeScoringOptions};
use crate::graph::error::GraphResult;
use crate::graph::store::GraphStore;
use crate::models::{Direction, GraphEdge, GraphNode};

/// Traversal tuning. Defaults follow the retrieval contract.
#[derive(Debug, Clone)]
pub struct TraversalOptions {
    pub max_depth: usize,
    pub limit: usize,
    /// Empty = all edge types.
    pub edge_types: Vec<String>,
    pub direction: Direction,
    pub timeout: Duration,
    pub scoring: EdgeScoringOptions,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self {
            max_depth: 2,
            limit: 100,
            edge_types: Vec::new(),
            direction: Direction::Outgoing,
            timeout: Duration::from_millis(1000),
            scoring: EdgeScoringOptions::default(),
        }
    }
}

/// One root-to-node walk.
#[derive(Debug, Clone, Serialize)]
pub struct TraversalPath {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub length: usize,
}

/// Traversal output: every recorded path plus the deduplicated node set.
#[derive(Debug, Clone, Serialize)]
pub struct TraversalResult {
    pub paths: Vec<TraversalPath>,
    pub nodes: Vec<GraphNode>,
    pub execution_time_ms: f64,
}

struct Frontier {
    node: GraphNode,
    depth: usize,
    path_nodes: Vec<GraphNode>,
    path_edges: Vec<GraphEdge>,
}

/// Breadth-first traversal from `start_node_id`.
///
/// A node may appear in several paths but only once in `nodes`; paths are
/// deduplicated by edge ID, so each traversed edge terminates exactly one
/// recorded path. An absent start node yields an empty result.
pub async fn traverse<S>(
    store: &S,
    start_node_id: &str,
    opts: &TraversalOptions,
) -> GraphResult<TraversalResult>
where
    S: GraphStore + ?Sized,
{
    let started = Instant::now();
    let now = Utc::now();

    let Some(start) = store.get_node(start_node_id).await? else {
        return Ok(TraversalResult {
            paths: Vec::new(),
            nodes: Vec::new(),
            execution_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        });
    };

    let mut paths: Vec<TraversalPath> = Vec::new();
    let mut nodes: Vec<GraphNode> = vec![start.clone()];
    let mut seen_nodes: HashSet<String> = HashSet::from([start.id.clone()]);
    let mut seen_edges: HashSet<String> = HashSet::new();

    let mut queue: VecDeque<Frontier> = VecDeque::new();
    queue.push_back(Frontier {
        node: start.clone(),
        depth: 0,
        path_nodes: vec![start],
        path_edges: Vec::new(),
    });

    'expand: while let Some(frontier) = queue.pop_front() {
        if frontier.depth >= opts.max_depth
            || paths.len() >= opts.limit
            || started.elapsed() >= opts.timeout
        {
            if started.elapsed() >= opts.timeout {
                debug!(
                    start = start_node_id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "traversal timeout, returning partial result"
                );
                break;
            }
            if paths.len() >= opts.limit {
                break;
            }
            continue;
        }

        let incident = store
            .neighbors(&frontier.node.id, opts.direction, &opts.edge_types)
            .await?;

        // Score candidates against their targets' degrees before capping.
        let mut candidates = Vec::with_capacity(incident.len());
        let mut targets = Vec::with_capacity(incident.len());
        for (edge, target) in incident {
            let degree = store.node_degree(&target.id).await?;
            candidates.push((edge, degree));
            targets.push(target);
        }
        let target_by_edge: std::collections::HashMap<String, GraphNode> = candidates
            .iter()
            .map(|(e, _)| e.edge_id())
            .zip(targets)
            .collect();

        for (edge, _priority) in prioritize_edges(candidates, now, &opts.scoring) {
            if paths.len() >= opts.limit || started.elapsed() >= opts.timeout {
                break 'expand;
            }
            let Some(target) = target_by_edge.get(&edge.edge_id()) else {
                continue;
            };
            // Cycle guard: never revisit a node within its own path.
            if frontier.path_nodes.iter().any(|n| n.id == target.id) {
                continue;
            }
            // Shared-prefix dedupe: each edge terminates one path.
            if !seen_edges.insert(edge.edge_id()) {
                continue;
            }

            let mut path_nodes = frontier.path_nodes.clone();
            let mut path_edges = frontier.path_edges.clone();
            path_nodes.push(target.clone());
            path_edges.push(edge);

            if seen_nodes.insert(target.id.clone()) {
                nodes.push(target.clone());
            }
            paths.push(TraversalPath {
                nodes: path_nodes.clone(),
                edges: path_edges.clone(),
                length: path_edges.len(),
            });
            queue.push_back(Frontier {
                node: target.clone(),
                depth: frontier.depth + 1,
                path_nodes,
                path_edges,
            });
        }
    }

    Ok(TraversalResult {
        paths,
        nodes,
        execution_time_ms: started.elapsed().as_secs_f64() * 1000.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::memory::MemoryGraph;
    use crate::models::edge_types;
    use serde_json::json;

    async fn seed_chain(store: &MemoryGraph) {
        for id in ["a", "b", "c", "d"] {
            store
                .upsert_node(GraphNode::new(id, "ExternalEvent"))
                .await
                .unwrap();
        }
        for (src, dst) in [("a", "b"), ("b", "c"), ("c", "d")] {
            store
                .upsert_edge(
                    GraphEdge::new(src, dst, edge_types::INFLUENCED_DECISION)
                        .with_property("confidence_score", json!(0.9)),
                )
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn depth_limits_expansion() {
        let store = MemoryGraph::new();
        seed_chain(&store).await;

        let result = traverse(&store, "a", &TraversalOptions::default()).await.unwrap();
        // max_depth 2: reach b (1 hop) and c (2 hops), never d.
        let ids: Vec<&str> = result.nodes.iter().map(|n| n.id.as_str()).collect();
        assert!(ids.contains(&"a") && ids.contains(&"b") && ids.contains(&"c"));
        assert!(!ids.contains(&"d"));
        assert_eq!(result.paths.len(), 2);
        assert_eq!(result.paths[0].length, 1);
        assert_eq!(result.paths[1].length, 2);
    }

    #[tokio::test]
    async fn limit_caps_path_count() {
        let store = MemoryGraph::new();
        store
            .upsert_node(GraphNode::new("hub", "TradeDecision"))
            .await
            .unwrap();
        for i in 0..10 {
            let id = format!("n{i}");
            store.upsert_node(GraphNode::new(&id, "ExternalEvent")).await.unwrap();
            store
                .upsert_edge(
                    GraphEdge::new("hub", &id, edge_types::RELATED_TO)
                        .with_property("weight", json!(0.9)),
                )
                .await
                .unwrap();
        }

        let opts = TraversalOptions {
            limit: 3,
            ..Default::default()
        };
        let result = traverse(&store, "hub", &opts).await.unwrap();
        assert_eq!(result.paths.len(), 3);
    }

    #[tokio::test]
    async fn weight_threshold_blocks_weak_edges() {
        let store = MemoryGraph::new();
        store.upsert_node(GraphNode::new("ev", "ExternalEvent")).await.unwrap();
        store.upsert_node(GraphNode::new("dec", "TradeDecision")).await.unwrap();
        store
            .upsert_edge(
                GraphEdge::new("ev", "dec", edge_types::INFLUENCED_DECISION)
                    .with_property("confidence_score", json!(0.5)),
            )
            .await
            .unwrap();

        let result = traverse(&store, "ev", &TraversalOptions::default()).await.unwrap();
        assert!(result.paths.is_empty(), "0.5 < 0.6 type threshold");
        assert_eq!(result.nodes.len(), 1);
    }

    #[tokio::test]
    async fn cycles_do_not_loop() {
        let store = MemoryGraph::new();
        store.upsert_node(GraphNode::new("x", "Company")).await.unwrap();
        store.upsert_node(GraphNode::new("y", "Company")).await.unwrap();
        for (src, dst) in [("x", "y"), ("y", "x")] {
            store
                .upsert_edge(
                    GraphEdge::new(src, dst, edge_types::RELATED_TO)
                        .with_property("weight", json!(0.9)),
                )
                .await
                .unwrap();
        }

        let result = traverse(&store, "x", &TraversalOptions::default()).await.unwrap();
        // x -> y recorded; y -> x suppressed by the in-path cycle guard.
        assert_eq!(result.paths.len(), 1);
        assert_eq!(result.nodes.len(), 2);
    }

    #[tokio::test]
    async fn missing_start_node_yields_empty_result() {
        let store = MemoryGraph::new();
        let result = traverse(&store, "ghost", &TraversalOptions::default()).await.unwrap();
        assert!(result.paths.is_empty());
        assert!(result.nodes.is_empty());
    }

    #[tokio::test]
    async fn direction_is_honored() {
        let store = MemoryGraph::new();
        store.upsert_node(GraphNode::new("ev", "ExternalEvent")).await.unwrap();
        store.upsert_node(GraphNode::new("dec", "TradeDecision")).await.unwrap();
        store
            .upsert_edge(
                GraphEdge::new("ev", "dec", edge_types::INFLUENCED_DECISION)
                    .with_property("confidence_score", json!(0.9)),
            )
            .await
            .unwrap();

        let incoming = TraversalOptions {
            direction: Direction::Incoming,
            ..Default::default()
        };
        let from_decision = traverse(&store, "dec", &incoming).await.unwrap();
        assert_eq!(from_decision.paths.len(), 1);

        let from_event = traverse(&store, "ev", &incoming).await.unwrap();
        assert!(from_event.paths.is_empty());
    }
}
