//! Trade-memory retrieval orchestration.
//!
//! Builds the situation brief, runs the vector and graph retrievers,
//! fuses, corrects when quality is low, enriches with influencing events,
//! and summarizes realized outcomes.

use std::collections::HashMap;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::graph::edge_scoring::EdgeScoringOptions;
use crate::graph::error::GraphResult;
use crate::graph::store::GraphStore;
use crate::graph::traversal::{traverse, TraversalOptions};
use crate::graph::vector::VectorSearchRequest;
use crate::models::{
    edge_types, node_types, Direction, GraphNode, RealizedOutcome, TradeDecision,
};
use crate::retrieval::fusion::{fuse, FusedResult, RankedList, DEFAULT_RRF_K};
use crate::retrieval::quality::{assess, corrective_search, QualityAssessment, QualityOptions};

/// Market state the retrieval is anchored to.
#[derive(Debug, Clone, Default)]
pub struct MarketSnapshot {
    pub instrument_id: String,
    pub underlying_symbol: Option<String>,
    pub regime_label: String,
    /// Ordered key indicators rendered into the situation brief.
    pub key_indicators: Vec<(String, f64)>,
    pub position_context: Option<String>,
}

/// Retrieval tuning.
#[derive(Debug, Clone)]
pub struct RetrievalOptions {
    pub top_k: usize,
    pub min_similarity: f64,
    pub rrf_k: f64,
    pub include_graph_traversal: bool,
    pub enable_corrective: bool,
    pub enrich_influencing_events: bool,
    pub quality: QualityOptions,
    pub scoring: EdgeScoringOptions,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            top_k: 10,
            min_similarity: 0.0,
            rrf_k: DEFAULT_RRF_K,
            include_graph_traversal: true,
            enable_corrective: true,
            enrich_influencing_events: true,
            quality: QualityOptions::default(),
            scoring: EdgeScoringOptions::default(),
        }
    }
}

/// One retrieved decision with its attribution and context.
#[derive(Debug, Clone, Serialize)]
pub struct TradeMemory {
    pub decision: TradeDecision,
    pub fused: FusedResult,
    pub influencing_events: Vec<GraphNode>,
}

/// Aggregate outcome statistics over the returned decisions.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TradeMemoryStatistics {
    pub outcome_count: usize,
    pub win_rate: Option<f64>,
    pub avg_return: Option<f64>,
    pub avg_holding_time_hours: Option<f64>,
    pub action_distribution: HashMap<String, usize>,
}

/// Stage timings in milliseconds.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetrievalTimings {
    pub vector_search_ms: f64,
    pub graph_traversal_ms: f64,
    pub total_ms: f64,
}

/// Full retrieval output.
#[derive(Debug, Clone, Serialize)]
pub struct TradeMemoryRetrievalResult {
    pub memories: Vec<TradeMemory>,
    pub statistics: TradeMemoryStatistics,
    pub quality: QualityAssessment,
    pub timings: RetrievalTimings,
    pub correction_applied: bool,
}

/// Render the canonical situation brief used as the embedding source.
///
/// Numeric indicator values are formatted to two decimals so the same
/// snapshot always embeds to the same text.
pub fn situation_brief(snapshot: &MarketSnapshot) -> String {
    let mut brief = format!("Trading {}", snapshot.instrument_id);
    if let Some(underlying) = &snapshot.underlying_symbol {
        brief.push_str(&format!(" (underlying: {})", underlying));
    }
    brief.push_str(&format!(" in {} regime.", snapshot.regime_label));

    if !snapshot.key_indicators.is_empty() {
        let rendered: Vec<String> = snapshot
            .key_indicators
            .iter()
            .map(|(k, v)| format!("{}: {:.2}", k, v))
            .collect();
        brief.push_str(&format!(" Key indicators: {}.", rendered.join(", ")));
    }
    if let Some(position) = &snapshot.position_context {
        brief.push_str(&format!(" Position: {}.", position));
    }
    brief
}

/// How many top vector hits seed the graph retriever.
const GRAPH_SEED_COUNT: usize = 3;

/// Retrieve decisions similar to the given situation.
///
/// `embedding` is the vector for the snapshot's situation brief; the
/// caller owns embedding generation.
pub async fn retrieve_trade_memories<S>(
    store: &S,
    embedding: Vec<f32>,
    snapshot: &MarketSnapshot,
    options: &RetrievalOptions,
) -> GraphResult<TradeMemoryRetrievalResult>
where
    S: GraphStore + ?Sized,
{
    let started = Instant::now();
    let mut timings = RetrievalTimings::default();

    // Hard filters: regime always; the underlying symbol when known,
    // otherwise the exact instrument.
    let mut request = VectorSearchRequest::new(embedding)
        .with_top_k(options.top_k * 2)
        .with_min_similarity(options.min_similarity)
        .with_node_type(node_types::TRADE_DECISION)
        .with_filter("regime_label", snapshot.regime_label.clone());
    request = match &snapshot.underlying_symbol {
        Some(symbol) => request.with_filter("underlying_symbol", symbol.clone()),
        None => request.with_filter("instrument_id", snapshot.instrument_id.clone()),
    };

    let vector_started = Instant::now();
    let vector_response = store.vector_search(&request).await?;
    timings.vector_search_ms = vector_started.elapsed().as_secs_f64() * 1000.0;
    debug!(
        hits = vector_response.count,
        ms = timings.vector_search_ms,
        "vector search complete"
    );

    let vector_list = RankedList::new(
        "vector",
        vector_response
            .results
            .iter()
            .map(|hit| (hit.id.clone(), hit.similarity))
            .collect(),
    );

    // Graph retriever: walk INFLUENCED_DECISION around the top vector hits
    // and collect other decisions reached through shared events.
    let mut lists = vec![vector_list];
    if options.include_graph_traversal && !vector_response.results.is_empty() {
        let graph_started = Instant::now();
        let mut graph_entries: Vec<(String, f64)> = Vec::new();
        let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();

        let traversal_opts = TraversalOptions {
            max_depth: 2,
            direction: Direction::Both,
            edge_types: vec![edge_types::INFLUENCED_DECISION.to_string()],
            scoring: options.scoring.clone(),
            ..Default::default()
        };
        for seed in vector_response.results.iter().take(GRAPH_SEED_COUNT) {
            let result = traverse(store, &seed.id, &traversal_opts).await?;
            for node in result.nodes {
                if node.node_type == node_types::TRADE_DECISION
                    && node.id != seed.id
                    && seen.insert(node.id.clone())
                {
                    // Later discoveries rank lower.
                    let score = 1.0 / (1.0 + graph_entries.len() as f64);
                    graph_entries.push((node.id, score));
                }
            }
        }
        timings.graph_traversal_ms = graph_started.elapsed().as_secs_f64() * 1000.0;
        if !graph_entries.is_empty() {
            lists.push(RankedList::new("graph", graph_entries));
        }
    }

    let mut fused = fuse(&lists, options.rrf_k, options.top_k);
    let mut correction_applied = false;

    let quality = assess(&fused, &options.quality);
    if quality.correctable && options.enable_corrective {
        if let Some(replacement) =
            corrective_search(store, &request, fused.len(), options.rrf_k, options.top_k).await?
        {
            fused = replacement;
            correction_applied = true;
        }
    }
    let quality = if correction_applied {
        assess(&fused, &options.quality)
    } else {
        quality
    };

    // Materialize decisions and optionally attach influencing events.
    let mut memories = Vec::with_capacity(fused.len());
    for result in fused {
        let Some(node) = store.get_node(&result.node_id).await? else {
            warn!(node_id = %result.node_id, "fused node vanished before materialization");
            continue;
        };
        let Some(decision) = TradeDecision::from_node(&node) else {
            warn!(node_id = %result.node_id, "fused node is not a decodable decision");
            continue;
        };

        let influencing_events = if options.enrich_influencing_events {
            store
                .neighbors(
                    &result.node_id,
                    Direction::Incoming,
                    &[edge_types::INFLUENCED_DECISION.to_string()],
                )
                .await?
                .into_iter()
                .map(|(_, event)| event)
                .collect()
        } else {
            Vec::new()
        };

        memories.push(TradeMemory {
            decision,
            fused: result,
            influencing_events,
        });
    }

    let statistics = compute_statistics(&memories);
    timings.total_ms = started.elapsed().as_secs_f64() * 1000.0;
    info!(
        memories = memories.len(),
        outcomes = statistics.outcome_count,
        correction_applied,
        total_ms = timings.total_ms,
        "trade memory retrieval complete"
    );

    Ok(TradeMemoryRetrievalResult {
        memories,
        statistics,
        quality,
        timings,
        correction_applied,
    })
}

/// Summarize realized outcomes across the returned memories.
///
/// Malformed outcome payloads are skipped; the action histogram covers
/// every decision regardless of outcome availability.
pub fn compute_statistics(memories: &[TradeMemory]) -> TradeMemoryStatistics {
    let mut stats = TradeMemoryStatistics::default();
    let mut wins = 0usize;
    let mut return_sum = 0.0;
    let mut return_count = 0usize;
    let mut holding_sum = 0.0;
    let mut holding_count = 0usize;

    for memory in memories {
        *stats
            .action_distribution
            .entry(memory.decision.action.as_str().to_string())
            .or_insert(0) += 1;

        let Some(raw) = &memory.decision.realized_outcome else {
            continue;
        };
        let Some(outcome) = RealizedOutcome::parse(raw) else {
            continue;
        };
        if !outcome.has_any() {
            continue;
        }
        stats.outcome_count += 1;
        if outcome.pnl.map(|p| p > 0.0).unwrap_or(false) {
            wins += 1;
        }
        if let Some(ret) = outcome.return_pct {
            return_sum += ret;
            return_count += 1;
        }
        if let Some(hours) = outcome.holding_hours {
            holding_sum += hours;
            holding_count += 1;
        }
    }

    if stats.outcome_count > 0 {
        stats.win_rate = Some(wins as f64 / stats.outcome_count as f64);
    }
    if return_count > 0 {
        stats.avg_return = Some(return_sum / return_count as f64);
    }
    if holding_count > 0 {
        stats.avg_holding_time_hours = Some(holding_sum / holding_count as f64);
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brief_includes_all_present_sections() {
        let snapshot = MarketSnapshot {
            instrument_id: "AAPL-2026C".to_string(),
            underlying_symbol: Some("AAPL".to_string()),
            regime_label: "risk_on".to_string(),
            key_indicators: vec![("rsi".to_string(), 71.2345), ("vix".to_string(), 14.0)],
            position_context: Some("long 200 shares".to_string()),
        };
        assert_eq!(
            situation_brief(&snapshot),
            "Trading AAPL-2026C (underlying: AAPL) in risk_on regime. \
             Key indicators: rsi: 71.23, vix: 14.00. Position: long 200 shares."
        );
    }

    #[test]
    fn brief_omits_absent_sections() {
        let snapshot = MarketSnapshot {
            instrument_id: "BTC-PERP".to_string(),
            regime_label: "high_vol".to_string(),
            ..Default::default()
        };
        assert_eq!(situation_brief(&snapshot), "Trading BTC-PERP in high_vol regime.");
    }

    fn memory_with_outcome(action: crate::models::TradeAction, outcome: Option<&str>) -> TradeMemory {
        TradeMemory {
            decision: TradeDecision {
                decision_id: "d".to_string(),
                action,
                instrument_id: "X".to_string(),
                underlying_symbol: None,
                regime_label: "r".to_string(),
                rationale_text: String::new(),
                realized_outcome: outcome.map(String::from),
                embedding: None,
                embedding_model: None,
            },
            fused: FusedResult {
                node_id: "d".to_string(),
                rrf_score: 0.0,
                sources: vec![],
                ranks: Default::default(),
                scores: Default::default(),
            },
            influencing_events: Vec::new(),
        }
    }

    #[test]
    fn statistics_skip_malformed_outcomes() {
        use crate::models::TradeAction;
        let memories = vec![
            memory_with_outcome(
                TradeAction::Buy,
                Some(r#"{"pnl": 10.0, "return_pct": 0.05, "holding_hours": 4.0}"#),
            ),
            memory_with_outcome(
                TradeAction::Buy,
                Some(r#"{"pnl": -5.0, "return_pct": -0.02, "holding_hours": 2.0}"#),
            ),
            memory_with_outcome(TradeAction::Sell, Some("garbage")),
            memory_with_outcome(TradeAction::Hold, None),
        ];
        let stats = compute_statistics(&memories);
        assert_eq!(stats.outcome_count, 2);
        assert_eq!(stats.win_rate, Some(0.5));
        assert!((stats.avg_return.unwrap() - 0.015).abs() < 1e-12);
        assert!((stats.avg_holding_time_hours.unwrap() - 3.0).abs() < 1e-12);
        assert_eq!(stats.action_distribution["BUY"], 2);
        assert_eq!(stats.action_distribution["SELL"], 1);
        assert_eq!(stats.action_distribution["HOLD"], 1);
    }

    #[test]
    fn statistics_on_empty_input_are_all_absent() {
        let stats = compute_statistics(&[]);
        assert_eq!(stats.outcome_count, 0);
        assert!(stats.win_rate.is_none());
        assert!(stats.avg_return.is_none());
        assert!(stats.avg_holding_time_hours.is_none());
        assert!(stats.action_distribution.is_empty());
    }
}
