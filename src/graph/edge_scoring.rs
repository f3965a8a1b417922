//! Edge weight extraction and traversal prioritization.
//!
//! Every candidate edge gets a typed weight, a recency boost, and a hub
//! penalty on its target; the composite priority decides expansion order
//! and the per-type threshold decides whether the edge is followed at all.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::models::{edge_types, GraphEdge, MentionType};

/// Default per-type weight thresholds. Types not listed fall back to the
/// caller's `edge_weight_threshold`.
pub fn default_type_threshold(edge_type: &str) -> Option<f64> {
    match edge_type {
        edge_types::INFLUENCED_DECISION => Some(0.6),
        edge_types::DEPENDS_ON => Some(0.3),
        edge_types::AFFECTED_BY => Some(0.3),
        edge_types::MENTIONED_IN => Some(0.5),
        _ => None,
    }
}

/// Tuning knobs for edge scoring during traversal.
#[derive(Debug, Clone)]
pub struct EdgeScoringOptions {
    /// Fallback threshold for types without a specific entry.
    pub edge_weight_threshold: f64,
    /// Caller overrides, taking precedence over the type defaults.
    pub edge_type_weights: HashMap<String, f64>,
    pub recency_boost_days: i64,
    pub recency_boost_multiplier: f64,
    pub hub_penalty_threshold: usize,
    pub hub_penalty_multiplier: f64,
    pub max_neighbors_per_node: usize,
}

impl Default for EdgeScoringOptions {
    fn default() -> Self {
        Self {
            edge_weight_threshold: 0.3,
            edge_type_weights: HashMap::new(),
            recency_boost_days: 30,
            recency_boost_multiplier: 1.5,
            hub_penalty_threshold: 500,
            hub_penalty_multiplier: 0.5,
            max_neighbors_per_node: 50,
        }
    }
}

/// Priority weight used when an edge carries no recognizable weight field.
const UNWEIGHTED_PRIORITY_WEIGHT: f64 = 0.5;

/// Extract the typed weight of an edge, if it carries one.
pub fn edge_weight(edge: &GraphEdge) -> Option<f64> {
    match edge.edge_type.as_str() {
        edge_types::INFLUENCED_DECISION => edge
            .f64_prop("confidence_score")
            .or_else(|| edge.f64_prop("influence_score")),
        edge_types::DEPENDS_ON => edge.f64_prop("strength"),
        edge_types::AFFECTED_BY => edge.f64_prop("sensitivity"),
        edge_types::MENTIONED_IN => edge
            .str_prop("mention_type")
            .and_then(MentionType::parse)
            .map(|m| m.weight())
            .or_else(|| edge.f64_prop("weight")),
        _ => edge
            .f64_prop("weight")
            .or_else(|| edge.f64_prop("score"))
            .or_else(|| edge.f64_prop("strength")),
    }
}

/// First timestamp found among the edge's recency fields.
fn edge_timestamp(edge: &GraphEdge) -> Option<DateTime<Utc>> {
    for key in ["created_at", "timestamp", "computed_at", "derived_at"] {
        if let Some(raw) = edge.str_prop(key) {
            if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
                return Some(t.with_timezone(&Utc));
            }
        }
    }
    edge.created_at
}

/// Recency boost multiplier for an edge relative to `now`.
pub fn recency_multiplier(edge: &GraphEdge, now: DateTime<Utc>, opts: &EdgeScoringOptions) -> f64 {
    match edge_timestamp(edge) {
        Some(t) if now - t <= Duration::days(opts.recency_boost_days) => {
            opts.recency_boost_multiplier
        }
        _ => 1.0,
    }
}

/// Hub penalty multiplier given the target node's total degree.
pub fn hub_multiplier(target_degree: usize, opts: &EdgeScoringOptions) -> f64 {
    if target_degree > opts.hub_penalty_threshold {
        opts.hub_penalty_multiplier
    } else {
        1.0
    }
}

/// Composite expansion priority: `weight · recency · hub`.
pub fn priority(
    edge: &GraphEdge,
    target_degree: usize,
    now: DateTime<Utc>,
    opts: &EdgeScoringOptions,
) -> f64 {
    let weight = edge_weight(edge).unwrap_or(UNWEIGHTED_PRIORITY_WEIGHT);
    weight * recency_multiplier(edge, now, opts) * hub_multiplier(target_degree, opts)
}

/// Threshold applied to an edge type: caller override, then type default,
/// then the generic fallback.
pub fn threshold_for(edge_type: &str, opts: &EdgeScoringOptions) -> f64 {
    opts.edge_type_weights
        .get(edge_type)
        .copied()
        .or_else(|| default_type_threshold(edge_type))
        .unwrap_or(opts.edge_weight_threshold)
}

/// Whether traversal may follow this edge. Edges without a weight pass the
/// filter; only a present weight below threshold blocks.
pub fn follows(edge: &GraphEdge, opts: &EdgeScoringOptions) -> bool {
    match edge_weight(edge) {
        Some(w) => w >= threshold_for(&edge.edge_type, opts),
        None => true,
    }
}

/// Filter, rank, and cap a node's candidate expansions.
///
/// Input pairs are `(edge, target_degree)`. Output is sorted by priority
/// descending and truncated to `max_neighbors_per_node`.
pub fn prioritize_edges(
    candidates: Vec<(GraphEdge, usize)>,
    now: DateTime<Utc>,
    opts: &EdgeScoringOptions,
) -> Vec<(GraphEdge, f64)> {
    let mut scored: Vec<(GraphEdge, f64)> = candidates
        .into_iter()
        .filter(|(edge, _)| follows(edge, opts))
        .map(|(edge, degree)| {
            let p = priority(&edge, degree, now, opts);
            (edge, p)
        })
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(opts.max_neighbors_per_node);
    scored
}
