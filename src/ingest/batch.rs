//! Batched graph mutations with partial-failure semantics.
//!
//! One request per item, fanned out under a bounded concurrency ceiling.
//! A failing item lands in the failure list without touching its
//! neighbors; `continue_on_error = false` switches to abort-and-propagate.

use std::sync::Arc;
use std::time::Instant;

use futures_util::future::join_all;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::graph::error::GraphResult;
use crate::graph::store::GraphStore;
use crate::models::{GraphEdge, GraphNode};

/// Batch tuning.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Concurrency ceiling for the fan-out.
    pub batch_size: usize,
    /// Collect per-item failures instead of aborting the batch.
    pub continue_on_error: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 100,
            continue_on_error: true,
        }
    }
}

/// One failed item.
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub item_id: String,
    pub error: String,
}

/// Outcome of a batch mutation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchMutationResult {
    pub successful: Vec<String>,
    pub failed: Vec<BatchFailure>,
    pub total_processed: usize,
    pub execution_time_ms: f64,
}

impl BatchMutationResult {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Upsert a batch of edges.
pub async fn batch_upsert_edges<S>(
    store: &S,
    edges: Vec<GraphEdge>,
    options: &BatchOptions,
) -> GraphResult<BatchMutationResult>
where
    S: GraphStore + ?Sized,
{
    let started = Instant::now();
    let total = edges.len();

    let mut result = if options.continue_on_error {
        let semaphore = Arc::new(Semaphore::new(options.batch_size.max(1)));
        let outcomes = join_all(edges.into_iter().map(|edge| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let _permit = semaphore.acquire().await.expect("semaphore never closes");
                let id = edge.edge_id();
                (id, store.upsert_edge(edge).await)
            }
        }))
        .await;
        collect_outcomes(outcomes)
    } else {
        let mut collected = BatchMutationResult::default();
        for edge in edges {
            let id = edge.edge_id();
            match store.upsert_edge(edge).await {
                Ok(()) => collected.successful.push(id),
                Err(err) => {
                    warn!(edge = %id, error = %err, "edge batch aborted");
                    return Err(err);
                }
            }
        }
        collected
    };

    result.total_processed = total;
    result.execution_time_ms = started.elapsed().as_secs_f64() * 1000.0;
    debug!(
        total,
        ok = result.successful.len(),
        failed = result.failed.len(),
        "edge batch complete"
    );
    Ok(result)
}

/// Upsert a batch of nodes.
pub async fn batch_upsert_nodes<S>(
    store: &S,
    nodes: Vec<GraphNode>,
    options: &BatchOptions,
) -> GraphResult<BatchMutationResult>
where
    S: GraphStore + ?Sized,
{
    let started = Instant::now();
    let total = nodes.len();

    let mut result = if options.continue_on_error {
        let semaphore = Arc::new(Semaphore::new(options.batch_size.max(1)));
        let outcomes = join_all(nodes.into_iter().map(|node| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let _permit = semaphore.acquire().await.expect("semaphore never closes");
                let id = node.id.clone();
                (id, store.upsert_node(node).await)
            }
        }))
        .await;
        collect_outcomes(outcomes)
    } else {
        let mut collected = BatchMutationResult::default();
        for node in nodes {
            let id = node.id.clone();
            match store.upsert_node(node).await {
                Ok(()) => collected.successful.push(id),
                Err(err) => {
                    warn!(node = %id, error = %err, "node batch aborted");
                    return Err(err);
                }
            }
        }
        collected
    };

    result.total_processed = total;
    result.execution_time_ms = started.elapsed().as_secs_f64() * 1000.0;
    Ok(result)
}

fn collect_outcomes(outcomes: Vec<(String, GraphResult<()>)>) -> BatchMutationResult {
    let mut result = BatchMutationResult::default();
    for (id, outcome) in outcomes {
        match outcome {
            Ok(()) => result.successful.push(id),
            Err(err) => result.failed.push(BatchFailure {
                item_id: id,
                error: err.to_string(),
            }),
        }
    }
    result
}
