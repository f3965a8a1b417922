//! Trading-memory retrieval and indicator validation core.
//!
//! Two subsystems share this crate: hybrid vector + graph retrieval over a
//! typed property graph of trade decisions, events, filings, and macro
//! entities; and the statistical validation pipeline that gates newly
//! synthesized indicators (structural dedupe, deflated Sharpe,
//! walk-forward, paper trading).
//!
//! The graph store is an external engine reached through the
//! [`graph::GraphStore`] trait; [`graph::MemoryGraph`] backs tests and the
//! demo CLI with the same surface.

pub mod config;
pub mod embedding;
pub mod export;
pub mod graph;
pub mod ingest;
pub mod models;
pub mod retrieval;
pub mod validation;

// Re-export the high-traffic types at the crate root for binaries and
// integration tests.
pub use config::HelixConfig;
pub use embedding::{EmbeddingProvider, HashEmbedder};
pub use export::{
    export_incremental, export_snapshot, import_export, merge_exports, read_export_file,
    validate_export_document, write_export_file, GraphExport, ImportResult,
    EXPORT_FORMAT_VERSION,
};
pub use graph::{
    traverse, EdgeScoringOptions, GraphError, GraphResult, GraphStore, HealthStatus,
    HelixClient, MemoryGraph, TraversalOptions, TraversalResult, VectorSearchRequest,
    VectorSearchResponse,
};
pub use models::{
    Company, Direction, ExternalEvent, ExternalEventType, GraphEdge, GraphNode, Indicator,
    IndicatorStatus, MacroEntity, MarketCapBucket, RealizedOutcome, TradeAction, TradeDecision,
};
pub use retrieval::{
    retrieve_trade_memories, search_graph_context, situation_brief, GraphContext,
    GraphContextOptions, MarketSnapshot, RetrievalOptions, TradeMemoryRetrievalResult,
};
pub use validation::{
    deflated_sharpe_ratio, evaluate_paper_trading, should_trigger, walk_forward,
    DeflatedSharpeInput, PaperTradingConfig, PaperTradingInput, TriggerInput,
    TriggerThresholds, WalkForwardConfig,
};
