//! Reciprocal Rank Fusion.
//!
//! Combines ranked lists from heterogeneous retrievers into one ranking.
//! Each list contributes `1/(k + rank)` per node; attribution keeps the
//! originating source, rank, and raw score per list.

use std::collections::HashMap;

use serde::Serialize;

pub const DEFAULT_RRF_K: f64 = 60.0;

/// One retriever's ranked output. Entries are `(node_id, raw_score)` in
/// rank order, best first.
#[derive(Debug, Clone)]
pub struct RankedList {
    pub source: String,
    pub entries: Vec<(String, f64)>,
}

impl RankedList {
    pub fn new(source: impl Into<String>, entries: Vec<(String, f64)>) -> Self {
        Self {
            source: source.into(),
            entries,
        }
    }
}

/// A fused node with full source attribution.
#[derive(Debug, Clone, Serialize)]
pub struct FusedResult {
    pub node_id: String,
    pub rrf_score: f64,
    /// Sources that ranked this node, in list order.
    pub sources: Vec<String>,
    /// 1-based rank per contributing source.
    pub ranks: HashMap<String, usize>,
    /// Raw score per contributing source.
    pub scores: HashMap<String, f64>,
}

/// Fuse ranked lists with constant `k`, truncating to `top_k`.
///
/// Ties keep first-encountered order (list order, then rank order); a
/// single non-empty list still maps through `1/(k + rank)` so downstream
/// consumers see one deterministic scale.
pub fn fuse(lists: &[RankedList], k: f64, top_k: usize) -> Vec<FusedResult> {
    let mut order: Vec<String> = Vec::new();
    let mut fused: HashMap<String, FusedResult> = HashMap::new();

    for list in lists {
        for (rank0, (node_id, score)) in list.entries.iter().enumerate() {
            let rank = rank0 + 1;
            let contribution = 1.0 / (k + rank as f64);
            let entry = fused.entry(node_id.clone()).or_insert_with(|| {
                order.push(node_id.clone());
                FusedResult {
                    node_id: node_id.clone(),
                    rrf_score: 0.0,
                    sources: Vec::new(),
                    ranks: HashMap::new(),
                    scores: HashMap::new(),
                }
            });
            entry.rrf_score += contribution;
            if !entry.sources.contains(&list.source) {
                entry.sources.push(list.source.clone());
            }
            entry.ranks.entry(list.source.clone()).or_insert(rank);
            entry.scores.entry(list.source.clone()).or_insert(*score);
        }
    }

    // Stable sort over first-encountered order keeps ties deterministic.
    let mut results: Vec<FusedResult> = order
        .into_iter()
        .filter_map(|id| fused.remove(&id))
        .collect();
    results.sort_by(|a, b| {
        b.rrf_score
            .partial_cmp(&a.rrf_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results.truncate(top_k);
    results
}
