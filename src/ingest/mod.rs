//! Ingestion services: dedupe, embedding, upsert, and graph building.

pub mod batch;
pub mod company_graph;
pub mod decisions;
pub mod events;
pub mod indicators;
pub mod macro_entities;
pub mod news;

use serde::Serialize;

pub use batch::{
    batch_upsert_edges, batch_upsert_nodes, BatchFailure, BatchMutationResult, BatchOptions,
};
pub use company_graph::{
    build_company_graph, correlated_pairs, ingest_supply_chain, CompanyGraphOptions,
    CompanyReturns, SupplyChainLink,
};
pub use decisions::{ingest_decisions, DecisionDraft, LifecycleEventDraft};
pub use events::{
    identify_macro_factors, ingest_external_events, map_event_type, DataPoint,
    ExternalEventDraft,
};
pub use indicators::{code_hash, IndicatorIngestor};
pub use macro_entities::{
    all_macro_entities, companies_affected_by_macro, link_company_sensitivity,
    macro_factors_for_company, upsert_macro_entity, MacroSensitivity,
};
pub use news::{ingest_news, news_embedding_text, NewsDraft, DEFAULT_MAX_BODY_LEN};

/// Shared ingestion options.
#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub generate_embeddings: bool,
    pub deduplicate_by_code_hash: bool,
    /// Semantic-similarity floor above which a duplicate warning fires.
    pub similarity_threshold: f64,
    pub batch_size: usize,
    pub continue_on_error: bool,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            generate_embeddings: true,
            deduplicate_by_code_hash: true,
            similarity_threshold: 0.90,
            batch_size: 20,
            continue_on_error: true,
        }
    }
}

/// Per-batch ingestion report. Failures are collected, not thrown, unless
/// `continue_on_error` is off.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestionReport {
    pub ingested: Vec<String>,
    pub updated: Vec<String>,
    pub skipped: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub execution_time_ms: f64,
}

impl IngestionReport {
    pub fn total_written(&self) -> usize {
        self.ingested.len() + self.updated.len()
    }
}
