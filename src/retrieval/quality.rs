//! Result-set quality assessment and corrective retrieval.
//!
//! A fused result set that is too thin or too weak triggers one broadened
//! re-query; the replacement is accepted only when it strictly improves on
//! the prior count.

use serde::Serialize;
use tracing::{debug, info};

use crate::graph::error::GraphResult;
use crate::graph::store::GraphStore;
use crate::graph::vector::VectorSearchRequest;
use crate::retrieval::fusion::{fuse, FusedResult, RankedList, DEFAULT_RRF_K};

/// Quality thresholds for a fused result set.
#[derive(Debug, Clone)]
pub struct QualityOptions {
    /// Fewer fused results than this is correctable.
    pub min_results: usize,
    /// A top fused score below this is correctable.
    pub min_top_score: f64,
}

impl Default for QualityOptions {
    fn default() -> Self {
        Self {
            min_results: 3,
            min_top_score: 1.0 / (DEFAULT_RRF_K + 10.0),
        }
    }
}

/// Outcome of the quality heuristic.
#[derive(Debug, Clone, Serialize)]
pub struct QualityAssessment {
    pub correctable: bool,
    pub result_count: usize,
    pub top_score: f64,
    pub reasons: Vec<String>,
}

/// Evaluate a fused result set against the configured floors.
pub fn assess(results: &[FusedResult], opts: &QualityOptions) -> QualityAssessment {
    let mut reasons = Vec::new();
    let top_score = results.first().map(|r| r.rrf_score).unwrap_or(0.0);

    if results.len() < opts.min_results {
        reasons.push(format!(
            "result count {} below floor {}",
            results.len(),
            opts.min_results
        ));
    }
    if top_score < opts.min_top_score {
        reasons.push(format!(
            "top score {:.6} below floor {:.6}",
            top_score, opts.min_top_score
        ));
    }

    QualityAssessment {
        correctable: !reasons.is_empty(),
        result_count: results.len(),
        top_score,
        reasons,
    }
}

/// Broadening factors for the corrective pass.
const CORRECTIVE_TOP_K_FACTOR: usize = 3;
const CORRECTIVE_SIMILARITY_FACTOR: f64 = 0.7;

/// Re-issue a vector search with broadened parameters.
///
/// Returns the vector-only fused replacement when the broadened search
/// strictly beats `prior_count`, otherwise `None`.
pub async fn corrective_search<S>(
    store: &S,
    original: &VectorSearchRequest,
    prior_count: usize,
    rrf_k: f64,
    top_k: usize,
) -> GraphResult<Option<Vec<FusedResult>>>
where
    S: GraphStore + ?Sized,
{
    let mut broadened = original.clone();
    broadened.top_k = (original.top_k * CORRECTIVE_TOP_K_FACTOR).min(crate::graph::vector::MAX_TOP_K);
    broadened.min_similarity = original.min_similarity * CORRECTIVE_SIMILARITY_FACTOR;

    debug!(
        top_k = broadened.top_k,
        min_similarity = broadened.min_similarity,
        "corrective retrieval: re-querying with broadened parameters"
    );
    let response = store.vector_search(&broadened).await?;

    if response.count <= prior_count {
        debug!(
            broadened = response.count,
            prior = prior_count,
            "corrective retrieval did not improve result count, keeping original"
        );
        return Ok(None);
    }

    info!(
        broadened = response.count,
        prior = prior_count,
        "corrective retrieval applied"
    );
    let vector_list = RankedList::new(
        "vector",
        response
            .results
            .iter()
            .map(|hit| (hit.id.clone(), hit.similarity))
            .collect(),
    );
    Ok(Some(fuse(&[vector_list], rrf_k, top_k)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::memory::MemoryGraph;
    use crate::models::GraphNode;

    fn fused(node_id: &str, score: f64) -> FusedResult {
        FusedResult {
            node_id: node_id.to_string(),
            rrf_score: score,
            sources: vec!["vector".to_string()],
            ranks: Default::default(),
            scores: Default::default(),
        }
    }

    #[test]
    fn thin_result_set_is_correctable() {
        let opts = QualityOptions::default();
        let assessment = assess(&[fused("a", 0.02)], &opts);
        assert!(assessment.correctable);
        assert_eq!(assessment.result_count, 1);
        assert_eq!(assessment.reasons.len(), 1);
    }

    #[test]
    fn weak_top_score_is_correctable() {
        let opts = QualityOptions::default();
        let results = vec![fused("a", 0.001), fused("b", 0.0009), fused("c", 0.0008)];
        let assessment = assess(&results, &opts);
        assert!(assessment.correctable);
        assert!(assessment.reasons[0].contains("top score"));
    }

    #[test]
    fn healthy_result_set_passes() {
        let opts = QualityOptions::default();
        let results = vec![fused("a", 0.03), fused("b", 0.02), fused("c", 0.01)];
        let assessment = assess(&results, &opts);
        assert!(!assessment.correctable);
        assert!(assessment.reasons.is_empty());
    }

    #[test]
    fn empty_set_reports_both_reasons() {
        let assessment = assess(&[], &QualityOptions::default());
        assert!(assessment.correctable);
        assert_eq!(assessment.result_count, 0);
        assert_eq!(assessment.top_score, 0.0);
        assert_eq!(assessment.reasons.len(), 2);
    }

    #[tokio::test]
    async fn corrective_search_replaces_only_on_strict_improvement() {
        let store = MemoryGraph::new();
        // Three decisions, one close to the query and two moderately far.
        for (id, x, y) in [("d1", 1.0, 0.0), ("d2", 0.8, 0.6), ("d3", 0.75, 0.66)] {
            store
                .upsert_node(
                    GraphNode::new(id, "TradeDecision").with_embedding(vec![x as f32, y as f32]),
                )
                .await
                .unwrap();
        }

        // Strict original: only d1 clears 0.9 similarity.
        let original = VectorSearchRequest::new(vec![1.0, 0.0])
            .with_node_type("TradeDecision")
            .with_min_similarity(0.9);

        let replaced = corrective_search(&store, &original, 1, DEFAULT_RRF_K, 10)
            .await
            .unwrap();
        // Broadened floor 0.63 admits all three, strictly more than 1.
        let replaced = replaced.expect("broadened search should improve on 1 result");
        assert_eq!(replaced.len(), 3);
        assert_eq!(replaced[0].node_id, "d1");

        // With a prior count equal to the broadened count, keep the original.
        let kept = corrective_search(&store, &original, 3, DEFAULT_RRF_K, 10)
            .await
            .unwrap();
        assert!(kept.is_none());
    }
}
