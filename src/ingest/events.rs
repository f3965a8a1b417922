//! External event ingestion.
//!
//! Maps raw feed types onto the event taxonomy, embeds summaries, and
//! links MACRO events to the macro entities they move. Factor
//! identification is best-effort enrichment; a miss never fails the batch.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::embedding::EmbeddingProvider;
use crate::graph::error::GraphResult;
use crate::graph::store::GraphStore;
use crate::ingest::{IngestionOptions, IngestionReport};
use crate::models::{edge_types, ExternalEvent, ExternalEventType, GraphEdge};

/// One numeric data point attached to a raw event.
#[derive(Debug, Clone)]
pub struct DataPoint {
    pub metric: String,
    pub value: f64,
}

/// A raw extracted event before classification.
#[derive(Debug, Clone)]
pub struct ExternalEventDraft {
    pub event_id: String,
    /// Feed-side type tag (`earnings`, `guidance`, `macro_release`, …).
    pub event_type: String,
    /// Feed-side source tag; `macro` overrides the event type.
    pub source_type: String,
    pub event_time: DateTime<Utc>,
    pub payload: Value,
    pub text_summary: String,
    pub related_instrument_ids: Vec<String>,
    pub data_points: Vec<DataPoint>,
}

/// Classify a raw event into the stored taxonomy.
///
/// A `macro` source wins over whatever the feed called the event.
pub fn map_event_type(event_type: &str, source_type: &str) -> ExternalEventType {
    if source_type.eq_ignore_ascii_case("macro") {
        return ExternalEventType::Macro;
    }
    match event_type.to_ascii_lowercase().as_str() {
        "earnings" | "guidance" | "dividend" => ExternalEventType::Earnings,
        "macro_release" => ExternalEventType::Macro,
        _ => ExternalEventType::News,
    }
}

/// Keyword table over data-point metric names.
const METRIC_FACTORS: &[(&str, &str)] = &[
    ("gdp", "macro_gdp"),
    ("cpi", "macro_cpi"),
    ("unemployment", "macro_employment"),
    ("nonfarm payrolls", "macro_employment"),
    ("pmi manufacturing", "macro_pmi_mfg"),
    ("pmi services", "macro_pmi_srv"),
];

/// Keyword table over the summary text.
const SUMMARY_FACTORS: &[(&str, &str)] = &[
    ("fomc", "macro_fed_policy"),
    ("fed funds", "macro_fed_policy"),
    ("interest rate", "macro_fed_policy"),
    ("opec", "macro_oil"),
    ("crude oil", "macro_oil"),
    ("treasury yield", "macro_treasury"),
];

/// Identify the macro entities a MACRO event relates to.
///
/// Case-insensitive substring scan over metric names and the summary;
/// the result is deduplicated in discovery order.
pub fn identify_macro_factors(data_points: &[DataPoint], summary: &str) -> Vec<String> {
    let mut factors: Vec<String> = Vec::new();
    let mut push = |id: &str| {
        if !factors.iter().any(|f| f == id) {
            factors.push(id.to_string());
        }
    };

    for point in data_points {
        let metric = point.metric.to_ascii_lowercase();
        for (keyword, factor) in METRIC_FACTORS {
            if metric.contains(keyword) {
                push(factor);
            }
        }
    }
    let summary = summary.to_ascii_lowercase();
    for (keyword, factor) in SUMMARY_FACTORS {
        if summary.contains(keyword) {
            push(factor);
        }
    }
    factors
}

/// Ingest a batch of raw events.
pub async fn ingest_external_events<S, E>(
    store: &S,
    embedder: &E,
    drafts: Vec<ExternalEventDraft>,
    options: &IngestionOptions,
) -> GraphResult<IngestionReport>
where
    S: GraphStore + ?Sized,
    E: EmbeddingProvider + ?Sized,
{
    let started = Instant::now();
    let mut report = IngestionReport::default();

    for draft in drafts {
        match ingest_one(store, embedder, &draft, options, &mut report).await {
            Ok(()) => {}
            Err(err) if options.continue_on_error => {
                report
                    .errors
                    .push(format!("event '{}': {}", draft.event_id, err));
            }
            Err(err) => return Err(err),
        }
    }

    report.execution_time_ms = started.elapsed().as_secs_f64() * 1000.0;
    debug!(
        ingested = report.ingested.len(),
        errors = report.errors.len(),
        "external event ingestion complete"
    );
    Ok(report)
}

async fn ingest_one<S, E>(
    store: &S,
    embedder: &E,
    draft: &ExternalEventDraft,
    options: &IngestionOptions,
    report: &mut IngestionReport,
) -> GraphResult<()>
where
    S: GraphStore + ?Sized,
    E: EmbeddingProvider + ?Sized,
{
    let event_type = map_event_type(&draft.event_type, &draft.source_type);
    let exists = store.get_node(&draft.event_id).await?.is_some();

    let embedding = if options.generate_embeddings && !draft.text_summary.is_empty() {
        Some(embedder.embed(&draft.text_summary).await?)
    } else {
        None
    };

    let event = ExternalEvent {
        event_id: draft.event_id.clone(),
        event_type,
        event_time: draft.event_time,
        payload: draft.payload.clone(),
        text_summary: draft.text_summary.clone(),
        related_instrument_ids: draft.related_instrument_ids.clone(),
        embedding,
    };
    store.upsert_node(event.to_node()).await?;

    if event_type == ExternalEventType::Macro {
        let factors = identify_macro_factors(&draft.data_points, &draft.text_summary);
        for factor in &factors {
            let edge = GraphEdge::new(
                draft.event_id.clone(),
                factor.clone(),
                edge_types::RELATES_TO_MACRO,
            )
            .with_property("timestamp", Value::from(draft.event_time.to_rfc3339()));
            if let Err(err) = store.upsert_edge(edge).await {
                // Enrichment only; the event itself already landed.
                warn!(event = %draft.event_id, factor = %factor, error = %err,
                      "macro factor edge failed");
                report.warnings.push(format!(
                    "event '{}': macro factor edge to '{}' failed: {}",
                    draft.event_id, factor, err
                ));
            }
        }
        if factors.is_empty() {
            report.warnings.push(format!(
                "event '{}': no macro factors identified",
                draft.event_id
            ));
        }
    }

    if exists {
        report.updated.push(draft.event_id.clone());
    } else {
        report.ingested.push(draft.event_id.clone());
    }
    Ok(())
}
