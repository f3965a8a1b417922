//! Hybrid retrieval: fusion, quality gating, orchestration, and
//! cross-type context search.

pub mod context;
pub mod fusion;
pub mod indicator_search;
pub mod orchestrator;
pub mod quality;

#[cfg(test)]
mod orchestrator_tests;

pub use context::{
    search_graph_context, CompanySource, ContextEvent, DocumentChunk, GraphContext,
    GraphContextOptions, TaggedCompany,
};
pub use indicator_search::{
    search_indicators_by_category, search_indicators_by_status, search_similar_indicators,
    SimilarIndicator,
};
pub use fusion::{fuse, FusedResult, RankedList, DEFAULT_RRF_K};
pub use orchestrator::{
    compute_statistics, retrieve_trade_memories, situation_brief, MarketSnapshot,
    RetrievalOptions, RetrievalTimings, TradeMemory, TradeMemoryRetrievalResult,
    TradeMemoryStatistics,
};
pub use quality::{assess, corrective_search, QualityAssessment, QualityOptions};
