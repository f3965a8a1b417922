//! Trade decision and lifecycle ingestion.
//!
//! Decisions carry their rationale embedding; lifecycle events hang off
//! them via `HAS_EVENT`, and known influences become
//! `INFLUENCED_DECISION` edges back from the event nodes.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::embedding::EmbeddingProvider;
use crate::graph::error::GraphResult;
use crate::graph::store::GraphStore;
use crate::ingest::{IngestionOptions, IngestionReport};
use crate::models::{clamp_unit, edge_types, node_types, GraphEdge, GraphNode, TradeDecision};

/// One lifecycle event attached to a decision.
#[derive(Debug, Clone)]
pub struct LifecycleEventDraft {
    pub event_id: String,
    /// Stage tag (`submitted`, `filled`, `stopped_out`, …).
    pub event_type: String,
    pub occurred_at: DateTime<Utc>,
    pub details: Value,
}

/// A decision plus its context, ready for ingestion.
#[derive(Debug, Clone)]
pub struct DecisionDraft {
    pub decision: TradeDecision,
    pub lifecycle_events: Vec<LifecycleEventDraft>,
    /// External events that influenced this decision, with confidence.
    pub influenced_by: Vec<(String, f64)>,
}

/// Ingest a batch of decisions with their lifecycle context.
pub async fn ingest_decisions<S, E>(
    store: &S,
    embedder: &E,
    drafts: Vec<DecisionDraft>,
    options: &IngestionOptions,
) -> GraphResult<IngestionReport>
where
    S: GraphStore + ?Sized,
    E: EmbeddingProvider + ?Sized,
{
    let started = Instant::now();
    let mut report = IngestionReport::default();

    for draft in drafts {
        let id = draft.decision.decision_id.clone();
        match ingest_one(store, embedder, draft, options).await {
            Ok(updated) => {
                if updated {
                    report.updated.push(id);
                } else {
                    report.ingested.push(id);
                }
            }
            Err(err) if options.continue_on_error => {
                report.errors.push(format!("decision '{}': {}", id, err));
            }
            Err(err) => return Err(err),
        }
    }

    report.execution_time_ms = started.elapsed().as_secs_f64() * 1000.0;
    debug!(
        ingested = report.ingested.len(),
        errors = report.errors.len(),
        "decision ingestion complete"
    );
    Ok(report)
}

async fn ingest_one<S, E>(
    store: &S,
    embedder: &E,
    draft: DecisionDraft,
    options: &IngestionOptions,
) -> GraphResult<bool>
where
    S: GraphStore + ?Sized,
    E: EmbeddingProvider + ?Sized,
{
    let mut decision = draft.decision;
    let exists = store.get_node(&decision.decision_id).await?.is_some();

    if options.generate_embeddings && decision.embedding.is_none() {
        decision.embedding = Some(embedder.embed(&decision.rationale_text).await?);
    }
    store.upsert_node(decision.to_node()).await?;

    for event in &draft.lifecycle_events {
        let node = GraphNode::new(&event.event_id, node_types::TRADE_LIFECYCLE_EVENT)
            .with_property("event_id", Value::from(event.event_id.clone()))
            .with_property("event_type", Value::from(event.event_type.clone()))
            .with_property("occurred_at", Value::from(event.occurred_at.to_rfc3339()))
            .with_property("details", Value::from(event.details.to_string()));
        store.upsert_node(node).await?;

        let edge = GraphEdge::new(
            decision.decision_id.clone(),
            event.event_id.clone(),
            edge_types::HAS_EVENT,
        )
        .with_property("timestamp", Value::from(event.occurred_at.to_rfc3339()));
        store.upsert_edge(edge).await?;
    }

    for (event_id, confidence) in &draft.influenced_by {
        let edge = GraphEdge::new(
            event_id.clone(),
            decision.decision_id.clone(),
            edge_types::INFLUENCED_DECISION,
        )
        .with_property("confidence_score", Value::from(clamp_unit(*confidence)));
        store.upsert_edge(edge).await?;
    }

    Ok(exists)
}
