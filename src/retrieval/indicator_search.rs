//! Indicator lookup surface.
//!
//! Semantic search over indicator embeddings plus the category and status
//! scans the synthesis loop uses to take stock of what already exists.

use serde::Serialize;
use tracing::debug;

use crate::graph::error::GraphResult;
use crate::graph::store::GraphStore;
use crate::graph::vector::VectorSearchRequest;
use crate::models::{node_types, GraphNode, IndicatorStatus};

/// A semantic indicator hit.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarIndicator {
    pub indicator_id: String,
    pub name: String,
    pub category: String,
    pub status: String,
    pub similarity: f64,
}

/// Indicators closest to the given embedding.
pub async fn search_similar_indicators<S>(
    store: &S,
    embedding: Vec<f32>,
    top_k: usize,
    min_similarity: f64,
) -> GraphResult<Vec<SimilarIndicator>>
where
    S: GraphStore + ?Sized,
{
    let request = VectorSearchRequest::new(embedding)
        .with_top_k(top_k)
        .with_min_similarity(min_similarity)
        .with_node_type(node_types::INDICATOR);
    let response = store.vector_search(&request).await?;

    let hits = response
        .results
        .into_iter()
        .map(|hit| SimilarIndicator {
            indicator_id: hit.id,
            name: hit
                .properties
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            category: hit
                .properties
                .get("category")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            status: hit
                .properties
                .get("status")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            similarity: hit.similarity,
        })
        .collect::<Vec<_>>();
    debug!(hits = hits.len(), "similar indicator search");
    Ok(hits)
}

/// All indicators in one category, sorted by ID.
pub async fn search_indicators_by_category<S>(
    store: &S,
    category: &str,
) -> GraphResult<Vec<GraphNode>>
where
    S: GraphStore + ?Sized,
{
    let mut nodes: Vec<GraphNode> = store
        .get_nodes_by_type(node_types::INDICATOR)
        .await?
        .into_iter()
        .filter(|n| n.str_prop("category") == Some(category))
        .collect();
    nodes.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(nodes)
}

/// All indicators in one lifecycle status, sorted by ID.
pub async fn search_indicators_by_status<S>(
    store: &S,
    status: IndicatorStatus,
) -> GraphResult<Vec<GraphNode>>
where
    S: GraphStore + ?Sized,
{
    let mut nodes: Vec<GraphNode> = store
        .get_nodes_by_type(node_types::INDICATOR)
        .await?
        .into_iter()
        .filter(|n| n.str_prop("status") == Some(status.as_str()))
        .collect();
    nodes.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingProvider, HashEmbedder};
    use crate::graph::memory::MemoryGraph;
    use crate::ingest::{IndicatorIngestor, IngestionOptions};
    use crate::models::{Indicator, MetricEnvironment};

    fn indicator(id: &str, category: &str, status: IndicatorStatus, hypothesis: &str) -> Indicator {
        Indicator {
            indicator_id: id.to_string(),
            name: id.to_string(),
            category: category.to_string(),
            status,
            hypothesis: hypothesis.to_string(),
            economic_rationale: "persistent flows".to_string(),
            code_hash: None,
            ast_signature: None,
            deflated_sharpe: None,
            probability_of_overfit: None,
            information_coefficient: None,
            environment: MetricEnvironment::Backtest,
            embedding: None,
        }
    }

    async fn seed(store: &MemoryGraph, embedder: &HashEmbedder) {
        let ingestor = IndicatorIngestor::new(store, embedder);
        let drafts = vec![
            indicator("ind-mom", "momentum", IndicatorStatus::Production, "breakout continuation"),
            indicator("ind-rev", "mean_reversion", IndicatorStatus::Paper, "fade the spike"),
            indicator("ind-vol", "momentum", IndicatorStatus::Staging, "vol regime shift"),
        ];
        ingestor.ingest(drafts, &IngestionOptions::default()).await.unwrap();
    }

    #[tokio::test]
    async fn semantic_search_finds_nearest_hypothesis() {
        let store = MemoryGraph::new();
        let embedder = HashEmbedder::default();
        seed(&store, &embedder).await;

        let query = embedder
            .embed("breakout continuation\n\npersistent flows")
            .await
            .unwrap();
        let hits = search_similar_indicators(&store, query, 3, 0.0).await.unwrap();
        assert_eq!(hits[0].indicator_id, "ind-mom");
        assert!((hits[0].similarity - 1.0).abs() < 1e-6);
        assert_eq!(hits[0].category, "momentum");
    }

    #[tokio::test]
    async fn category_and_status_scans_filter_and_sort() {
        let store = MemoryGraph::new();
        let embedder = HashEmbedder::default();
        seed(&store, &embedder).await;

        let momentum = search_indicators_by_category(&store, "momentum").await.unwrap();
        let ids: Vec<&str> = momentum.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["ind-mom", "ind-vol"]);

        let paper = search_indicators_by_status(&store, IndicatorStatus::Paper).await.unwrap();
        assert_eq!(paper.len(), 1);
        assert_eq!(paper[0].id, "ind-rev");

        let retired = search_indicators_by_status(&store, IndicatorStatus::Retired).await.unwrap();
        assert!(retired.is_empty());
    }
}
